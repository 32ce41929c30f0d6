//! Streams one answer from a running ragchat server.
//!
//! ```text
//! cargo run -p ragchat-server --example chat_client -- "What is Physical AI?"
//! ```

use futures::StreamExt;
use reqwest::Client;
use serde_json::{json, Value};

const SERVER_URL: &str = "http://localhost:8000";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let question = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "What is Physical AI?".to_string());
    let selected = std::env::args().nth(2);

    let client = Client::new();

    println!("1. Service info:");
    let resp = client.get(format!("{SERVER_URL}/")).send().await?;
    println!("Status: {}", resp.status());
    println!("Body: {}", resp.text().await?);
    println!();

    println!("2. Chat: {question}");
    let mut body = json!({ "query": question });
    if let Some(selected) = selected {
        body["selectedText"] = Value::String(selected);
    }
    let resp = client
        .post(format!("{SERVER_URL}/chat"))
        .json(&body)
        .send()
        .await?;
    println!("Status: {}", resp.status());
    if !resp.status().is_success() {
        println!("Body: {}", resp.text().await?);
        return Ok(());
    }

    let mut stream = resp.bytes_stream();
    let mut buffer = String::new();
    while let Some(chunk) = stream.next().await {
        buffer.push_str(&String::from_utf8_lossy(&chunk?));
        while let Some(end) = buffer.find("\n\n") {
            let frame: String = buffer.drain(..end + 2).collect();
            let Some(data) = frame.trim_end().strip_prefix("data: ") else {
                continue;
            };
            let event: Value = serde_json::from_str(data)?;
            if let Some(sources) = event.get("sources").and_then(Value::as_array) {
                println!("[{} sources]", sources.len());
                for source in sources {
                    println!("  - {} ({})", source["id"], source["score"]);
                }
            } else if let Some(content) = event.get("content").and_then(Value::as_str) {
                print!("{content}");
            } else if let Some(error) = event.get("error").and_then(Value::as_str) {
                println!("\n[error] {error}");
            }
        }
    }
    println!();

    Ok(())
}
