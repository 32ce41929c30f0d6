use std::net::SocketAddr;
use std::time::Duration;

use ragchat::generation::GeneratorConfig;
use ragchat::index::RetrieverConfig;
use ragchat::semantic::EmbedderConfig;
use ragchat::{ConfigurationError, PipelineConfig};
use serde::{Deserialize, Serialize};

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Server bind address
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Timeout for non-streaming routes, in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum request body size in KB
    #[serde(default = "default_max_body_size_kb")]
    pub max_body_size_kb: usize,

    /// Allowed CORS origins; `*` allows any
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Log filter directive, e.g. `info` or `server=debug,info`
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// `json` or `pretty`
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Metrics endpoint enabled
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,

    /// Probe the vector collection before accepting requests
    #[serde(default = "default_true")]
    pub check_collection_on_startup: bool,

    #[serde(default)]
    pub embedder: EmbedderConfig,

    #[serde(default)]
    pub retriever: RetrieverConfig,

    #[serde(default)]
    pub generator: GeneratorConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            port: default_port(),
            timeout_secs: default_timeout_secs(),
            max_body_size_kb: default_max_body_size_kb(),
            cors_origins: default_cors_origins(),
            log_level: default_log_level(),
            log_format: default_log_format(),
            metrics_enabled: default_true(),
            check_collection_on_startup: default_true(),
            embedder: EmbedderConfig::default(),
            retriever: RetrieverConfig::default(),
            generator: GeneratorConfig::default(),
            pipeline: PipelineConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from `.env`, an optional `ragchat` config file and
    /// `RAGCHAT__*` environment variables, in increasing precedence.
    ///
    /// Conventional provider variables (`OPENAI_API_KEY`, `COHERE_API_KEY`,
    /// `QDRANT_URL`, `QDRANT_API_KEY`) fill whatever is still unset.
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let builder = config::Config::builder()
            .add_source(config::File::with_name("ragchat").required(false))
            .add_source(
                config::Environment::with_prefix("RAGCHAT")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("cors_origins"),
            );

        let mut config: ServerConfig = builder.build()?.try_deserialize()?;
        config.apply_env_fallbacks(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Fills missing credentials and endpoints from conventional variable names.
    pub fn apply_env_fallbacks(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if self.embedder.api_key.is_none() {
            let var = match self.embedder.provider.to_ascii_lowercase().as_str() {
                "openai" | "gpt" => "OPENAI_API_KEY",
                _ => "COHERE_API_KEY",
            };
            self.embedder.api_key = lookup(var);
        }
        if self.generator.api_key.is_none() {
            self.generator.api_key = lookup("OPENAI_API_KEY");
        }
        if self.retriever.api_key.is_none() {
            self.retriever.api_key = lookup("QDRANT_API_KEY");
        }
        if self.retriever.url == RetrieverConfig::default().url {
            if let Some(url) = lookup("QDRANT_URL") {
                self.retriever.url = url;
            }
        }
    }

    /// Rejects configurations that could not serve a single request.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let missing = |key: &Option<String>| key.as_deref().is_none_or(|k| k.trim().is_empty());

        match self.embedder.provider.to_ascii_lowercase().as_str() {
            "cohere" if missing(&self.embedder.api_key) => {
                return Err(ConfigurationError::MissingCredential("COHERE_API_KEY"));
            }
            "openai" | "gpt" if missing(&self.embedder.api_key) => {
                return Err(ConfigurationError::MissingCredential("OPENAI_API_KEY"));
            }
            _ => {}
        }
        if self.generator.provider.to_ascii_lowercase() != "stub"
            && missing(&self.generator.api_key)
        {
            return Err(ConfigurationError::MissingCredential("OPENAI_API_KEY"));
        }
        if self.retriever.backend.to_ascii_lowercase() == "qdrant"
            && self.retriever.collection.trim().is_empty()
        {
            return Err(ConfigurationError::Invalid("retriever.collection is empty".into()));
        }
        self.pipeline.validate()
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        let addr_str = format!("{}:{}", self.bind_addr, self.port);
        Ok(addr_str.parse()?)
    }

    /// Get request timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Get max body size in bytes
    pub fn max_body_size(&self) -> usize {
        self.max_body_size_kb * 1024
    }
}

fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_body_size_kb() -> usize {
    256
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}
