//! Basic example demonstrating GET and POST requests, caching and deduplication.
//!
//! This example shows how to:
//! - Create a client with caching and deduplication turned on
//! - Make GET requests and read the result envelope
//! - Make POST requests with a JSON body
//! - Observe cache hits and shared in-flight calls
//!
//! Run with: `cargo run --example basic_call`

use fetchwell::{Client, Error, RequestBody};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct Post {
    #[serde(rename = "userId")]
    user_id: u32,
    id: u32,
    title: String,
    body: String,
}

#[derive(Debug, Serialize)]
struct NewPost {
    title: String,
    body: String,
    #[serde(rename = "userId")]
    user_id: u32,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter("fetchwell=debug,basic_call=info")
        .init();

    let client = Client::builder()
        .base_url("https://jsonplaceholder.typicode.com")?
        .cache(true)
        .deduplicate(true)
        .build()?;

    println!("=== GET Request Example ===");
    let result = client.get("/posts/1").await;
    let post: Post = result.json()?;

    println!("Post ID: {}", post.id);
    println!("Title: {}", post.title);
    println!("Status code: {}", result.status);
    println!("Request latency: {:?}", result.latency);
    println!();

    println!("=== Cached GET ===");
    let cached = client.get("/posts/1").await;
    println!("From cache: {}", cached.from_cache);
    println!("Attempts: {}", cached.attempts);
    println!();

    println!("=== Deduplicated GETs ===");
    let (a, b) = tokio::join!(client.get("/posts/2"), client.get("/posts/2"));
    println!("Both ok: {}", a.ok && b.ok);
    println!("Same data: {}", a.data == b.data);
    println!();

    println!("=== POST Request Example ===");
    let new_post = NewPost {
        title: "My New Post".to_string(),
        body: "This is the content of my new post!".to_string(),
        user_id: 1,
    };

    let result = client.post("/posts", RequestBody::json(&new_post)?).await;
    let created: Post = result.json()?;

    println!("Created post ID: {}", created.id);
    println!("Status code: {}", result.status);
    println!("Content-Type: {:?}", result.header("content-type"));
    println!("Was retried: {}", result.was_retried());

    Ok(())
}
