//! Search an in-memory index with stub embeddings.
//!
//! ```bash
//! cargo run -p passage-index --example index_demo -- "how do humanoids balance?"
//! ```

use index::{MemoryIndex, MemoryPoint, Retriever};
use semantic::{Embedder, StubEmbedder};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let query = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "how do humanoids balance?".to_string());

    let embedder = StubEmbedder::new(64, true);
    let texts = [
        ("balance", "Humanoids balance with a zero moment point controller."),
        ("vision", "Stereo cameras give the robot depth perception."),
        ("hands", "Dexterous hands use tendon-driven fingers."),
    ];
    let points = texts
        .iter()
        .map(|(id, text)| {
            MemoryPoint::new(*id, *text, embedder.vector_for(text).into_inner())
                .with_url(format!("https://book.example/{id}"))
        })
        .collect();
    let index = MemoryIndex::new(points);

    let vector = embedder.embed_query(&query).await?;
    for passage in index.retrieve(&vector, 2).await? {
        println!("{:.3}  {}  {}", passage.score, passage.id, passage.text);
    }
    Ok(())
}
