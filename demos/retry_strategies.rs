//! Example demonstrating different retry strategies.
//!
//! This example shows how to:
//! - Configure linear backoff through `retries` and `retry_delay`
//! - Configure exponential backoff
//! - Configure custom retry logic
//! - Control retry behavior with predicates
//!
//! Run with: `cargo run --example retry_strategies`

use fetchwell::retry::{OrPredicate, RetryOn5xx, RetryOnTimeout};
use fetchwell::{Client, Error, RetryStrategy};
use std::time::{Duration, Instant};

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter("fetchwell=info,retry_strategies=info")
        .init();

    println!("=== Linear Backoff ===");
    println!("Delays: 200ms, 400ms, 600ms");
    let client_linear = Client::builder()
        .base_url("https://jsonplaceholder.typicode.com")?
        .retries(3)
        .retry_delay(Duration::from_millis(200))
        .timeout(Duration::from_secs(5))
        .build()?;

    let start = Instant::now();
    let result = client_linear.get("/posts/999999").await;
    println!("ok={} attempts={}", result.ok, result.attempts);
    println!("Total time: {:?}", start.elapsed());
    println!();

    println!("=== Exponential Backoff Strategy ===");
    println!("Delays: 100ms, 200ms, 400ms (with jitter)");
    let client_exponential = Client::builder()
        .base_url("https://jsonplaceholder.typicode.com")?
        .retry_strategy(RetryStrategy::ExponentialBackoff {
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(30),
            max_retries: 3,
            jitter: true,
        })
        .retry_predicate(Box::new(OrPredicate::new(vec![
            Box::new(RetryOn5xx),
            Box::new(RetryOnTimeout),
        ])))
        .build()?;

    let result = client_exponential.get("/posts/1").await;
    println!("ok={} attempts={}", result.ok, result.attempts);
    println!();

    println!("=== Custom Retry Strategy ===");
    println!("Custom delay function: retry 1=100ms, 2=300ms, 3=1000ms");
    let client_custom = Client::builder()
        .base_url("https://jsonplaceholder.typicode.com")?
        .retry_strategy(RetryStrategy::Custom {
            delay_fn: |attempt| match attempt {
                1 => Some(Duration::from_millis(100)),
                2 => Some(Duration::from_millis(300)),
                3 => Some(Duration::from_millis(1000)),
                _ => None,
            },
        })
        .build()?;

    let result = client_custom.get("/posts/1").await;
    println!("ok={} attempts={}", result.ok, result.attempts);

    Ok(())
}
