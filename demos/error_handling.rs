//! Example demonstrating how failures show up in the result envelope.
//!
//! This example shows how to:
//! - Branch on `ok` and `error.kind()`
//! - Read the parsed body of an HTTP error
//! - Recognise timeouts and cancellations
//! - Serialize an envelope for another layer
//!
//! Run with: `cargo run --example error_handling`

use fetchwell::{Client, Error, ErrorKind};
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter("fetchwell=info")
        .init();

    let client = Client::builder()
        .base_url("https://jsonplaceholder.typicode.com")?
        .build()?;

    println!("=== Example 1: Handling HTTP Errors ===");
    let result = client.get("/posts/999999").await;
    match &result.error {
        None => println!("Success: {:?}", result.data),
        Some(Error::HttpError { status, data, .. }) => {
            println!("HTTP Error!");
            println!("  Status: {}", status);
            println!("  Is client error (4xx): {}", status.is_client_error());
            println!("  Body: {:?}", data);
        }
        Some(e) => println!("Other error: {}", e),
    }
    println!();

    println!("=== Example 2: Timeouts ===");
    let impatient = Client::builder()
        .base_url("https://jsonplaceholder.typicode.com")?
        .timeout(Duration::from_millis(1))
        .build()?;

    let result = impatient.get("/posts").await;
    if result.error_kind() == Some(ErrorKind::Timeout) {
        println!("Timed out, status is {}", result.status);
    }
    println!();

    println!("=== Example 3: Cancellation ===");
    let pending = tokio::spawn({
        let client = client.clone();
        async move { client.get("/comments").await }
    });
    tokio::time::sleep(Duration::from_millis(5)).await;
    client.cancel();

    let result = pending.await?;
    match result.error_kind() {
        Some(ErrorKind::Cancelled) => println!("Request was cancelled"),
        Some(kind) => println!("Request failed: {}", kind),
        None => println!("Request finished before it could be cancelled"),
    }
    println!();

    println!("=== Example 4: Network Errors ===");
    let offline = Client::builder().base_url("http://127.0.0.1:1")?.build()?;
    let result = offline.get("/anything").await;
    println!("Error kind: {:?}", result.error_kind());
    println!();

    println!("=== Example 5: Serializing an Envelope ===");
    let result = client.get("/posts/999999").await;
    println!("{}", serde_json::to_string_pretty(&result)?);

    Ok(())
}
