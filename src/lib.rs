//! # fetchwell - a deduplicating, caching, retrying HTTP client
//!
//! fetchwell executes HTTP requests with per-attempt timeouts, linear-backoff
//! retries, response caching, deduplication of identical concurrent calls and
//! cooperative cancellation. Every call resolves to the same [`Envelope`]
//! shape, so callers branch on `ok` and `error.kind()` instead of handling a
//! different error type per failure mode.
//!
//! ## Quick Start
//!
//! ```no_run
//! use fetchwell::{Client, ErrorKind};
//! use serde::Deserialize;
//! use serde_json::json;
//! use std::time::Duration;
//!
//! #[derive(Deserialize)]
//! struct Product {
//!     id: u64,
//!     name: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), fetchwell::Error> {
//!     let client = Client::builder()
//!         .base_url("https://api.example.com")?
//!         .timeout(Duration::from_secs(10))
//!         .retries(2)
//!         .retry_delay(Duration::from_millis(500))
//!         .cache(true)
//!         .deduplicate(true)
//!         .build()?;
//!
//!     // GET, served from the cache on the second call
//!     let result = client.get("/products/1").await;
//!     if result.ok {
//!         let product: Product = result.json()?;
//!         println!("{} ({})", product.name, product.id);
//!     }
//!
//!     // POST with a JSON body
//!     let created = client.post("/cart", json!({"product_id": 1, "qty": 2})).await;
//!     match created.error_kind() {
//!         None => println!("added to cart"),
//!         Some(ErrorKind::Timeout) => eprintln!("the server is slow, try again"),
//!         Some(kind) => eprintln!("failed: {}", kind),
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Uniform result envelope** - `data`, `ok`, `status` and a categorized `error` for every call
//! - **Deduplication** - identical concurrent calls share one transport request
//! - **Caching** - successful `GET` responses are kept until [`Client::clear_cache`]
//! - **Timeouts** - each attempt races a timer; the losing request is aborted
//! - **Retries** - linear backoff by default, exponential and custom strategies available
//! - **Cancellation** - [`Client::cancel`], per-signature and caller-owned tokens
//! - **Pluggable transport** - `reqwest` by default, any [`transport::Transport`] otherwise
//! - **Logging** - structured events through `tracing`
//!
//! ## Cancellation
//!
//! ```no_run
//! use fetchwell::{Client, ErrorKind};
//!
//! # async fn example() -> Result<(), fetchwell::Error> {
//! let client = Client::builder()
//!     .base_url("https://api.example.com")?
//!     .build()?;
//!
//! let pending = tokio::spawn({
//!     let client = client.clone();
//!     async move { client.get("/search?q=lamp").await }
//! });
//!
//! // The user typed another character.
//! tokio::time::sleep(std::time::Duration::from_millis(20)).await;
//! client.cancel();
//!
//! let result = pending.await.expect("task panicked");
//! assert_eq!(result.error_kind(), Some(ErrorKind::Cancelled));
//! # Ok(())
//! # }
//! ```

mod cancel;
mod client;
mod config;
mod envelope;
mod error;
pub mod metadata;
pub mod retry;
pub mod retry_after;
pub mod transport;

pub use cancel::CancellationToken;
pub use client::Client;
pub use config::{ClientBuilder, ClientConfig, DEFAULT_RETRY_DELAY, DEFAULT_TIMEOUT};
pub use envelope::{Body, ClientState, Envelope};
pub use error::{Error, ErrorKind, Result};
pub use metadata::{RequestBody, RequestOptions, Signature};
pub use retry::{RetryPredicate, RetryStrategy};
