//! Embed a query with a hosted provider.
//!
//! ```bash
//! COHERE_API_KEY=... cargo run -p query-semantic --example embed_query -- "what is physical ai?"
//! ```
//!
//! Without `COHERE_API_KEY` the deterministic stub embedder is used instead.

use semantic::{build_embedder, EmbedderConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let query = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "what is physical ai?".to_string());

    let cfg = match std::env::var("COHERE_API_KEY") {
        Ok(key) => EmbedderConfig {
            api_key: Some(key),
            ..Default::default()
        },
        Err(_) => EmbedderConfig::stub(384),
    };

    let embedder = build_embedder(&cfg)?;
    let vector = embedder.embed_query(&query).await?;

    println!("model: {}", embedder.model_name());
    println!("dim:   {}", vector.dim());
    println!("head:  {:?}", &vector.as_slice()[..vector.dim().min(8)]);
    Ok(())
}
