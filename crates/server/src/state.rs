use std::sync::Arc;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusHandle;
use ragchat::generation::build_generator;
use ragchat::index::build_retriever;
use ragchat::semantic::build_embedder;
use ragchat::{ChatPipeline, ConfigurationError};

use crate::config::ServerConfig;

/// Shared application state
#[derive(Clone)]
pub struct ServerState {
    /// Server configuration
    pub config: Arc<ServerConfig>,

    /// Query pipeline; read-only and shared by every request
    pub pipeline: ChatPipeline,

    /// Prometheus render handle, when metrics are enabled
    pub metrics: Option<PrometheusHandle>,

    pub started_at: Instant,
}

impl ServerState {
    /// Builds every provider client from `config`.
    ///
    /// Fails on missing credentials or unusable settings; no network calls are
    /// made here.
    pub fn new(config: ServerConfig) -> Result<Self, ConfigurationError> {
        config.validate()?;

        let embedder = build_embedder(&config.embedder)?;
        let retriever = build_retriever(&config.retriever)?;
        let generator = build_generator(&config.generator)?;
        let pipeline = ChatPipeline::new(embedder, retriever, generator, config.pipeline.clone());

        Ok(Self::with_pipeline(config, pipeline))
    }

    /// State around an already-built pipeline.
    pub fn with_pipeline(config: ServerConfig, pipeline: ChatPipeline) -> Self {
        Self {
            config: Arc::new(config),
            pipeline,
            metrics: None,
            started_at: Instant::now(),
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
