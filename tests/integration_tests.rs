//! Integration tests using wiremock to simulate HTTP servers.

use fetchwell::retry_after::RetryAfterConfig;
use fetchwell::{Body, CancellationToken, Client, Error, ErrorKind, RequestOptions};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use wiremock::matchers::{body_json, body_string, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
struct Item {
    id: u32,
    name: String,
}

fn item() -> Item {
    Item {
        id: 1,
        name: "Lamp".to_string(),
    }
}

async fn request_count(mock_server: &MockServer) -> usize {
    mock_server
        .received_requests()
        .await
        .map(|requests| requests.len())
        .unwrap_or_default()
}

#[tokio::test]
async fn test_successful_get_request() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/items/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(item()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = Client::builder()
        .base_url(mock_server.uri())
        .unwrap()
        .build()
        .unwrap();

    let result = client.get("/items/1").await;

    assert!(result.ok);
    assert_eq!(result.status, 200);
    assert!(result.error.is_none());
    assert_eq!(result.attempts, 1);
    assert!(!result.from_cache);
    assert_eq!(result.json::<Item>().unwrap(), item());
    assert_eq!(result.header("content-type"), Some("application/json"));
}

#[tokio::test]
async fn test_cache_serves_second_get() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/items"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 1})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = Client::builder()
        .base_url(mock_server.uri())
        .unwrap()
        .cache(true)
        .build()
        .unwrap();

    let first = client.get("/items").await;
    let second = client.get("/items").await;

    assert!(first.ok);
    assert_eq!(first.data, Some(Body::Json(json!({"id": 1}))));
    assert!(!first.from_cache);

    assert!(second.ok);
    assert_eq!(second.status, 200);
    assert_eq!(second.data, first.data);
    assert!(second.from_cache);
    assert_eq!(second.attempts, 0);
}

#[tokio::test]
async fn test_clear_cache_forces_new_request() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/items"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(2)
        .mount(&mock_server)
        .await;

    let client = Client::builder()
        .base_url(mock_server.uri())
        .unwrap()
        .cache(true)
        .build()
        .unwrap();

    assert!(client.get("/items").await.ok);
    assert!(client.get("/items").await.from_cache);

    client.clear_cache();

    let after_clear = client.get("/items").await;
    assert!(after_clear.ok);
    assert!(!after_clear.from_cache);
}

#[tokio::test]
async fn test_cache_disabled_by_default() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/items"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(2)
        .mount(&mock_server)
        .await;

    let client = Client::builder()
        .base_url(mock_server.uri())
        .unwrap()
        .build()
        .unwrap();

    client.get("/items").await;
    let second = client.get("/items").await;
    assert!(!second.from_cache);
}

#[tokio::test]
async fn test_post_is_never_cached() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/cart"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"ok": true})))
        .expect(2)
        .mount(&mock_server)
        .await;

    let client = Client::builder()
        .base_url(mock_server.uri())
        .unwrap()
        .cache(true)
        .build()
        .unwrap();

    let first = client.post("/cart", json!({"product_id": 1})).await;
    let second = client.post("/cart", json!({"product_id": 1})).await;

    assert_eq!(first.status, 201);
    assert!(!second.from_cache);
}

#[tokio::test]
async fn test_concurrent_identical_calls_are_deduplicated() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/items"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{"id": 1}]))
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = Client::builder()
        .base_url(mock_server.uri())
        .unwrap()
        .deduplicate(true)
        .build()
        .unwrap();

    let calls = (0..5).map(|_| client.get("/items"));
    let results = futures::future::join_all(calls).await;

    assert_eq!(results.len(), 5);
    for result in &results {
        assert!(result.ok);
        assert_eq!(result.data, Some(Body::Json(json!([{"id": 1}]))));
        assert_eq!(result.attempts, 1);
    }
    assert_eq!(client.in_flight_count(), 0);
}

#[tokio::test]
async fn test_deduplicated_callers_share_failures() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/items"))
        .respond_with(
            ResponseTemplate::new(503)
                .set_body_string("maintenance")
                .set_delay(Duration::from_millis(100)),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = Client::builder()
        .base_url(mock_server.uri())
        .unwrap()
        .deduplicate(true)
        .build()
        .unwrap();

    let (a, b) = tokio::join!(client.get("/items"), client.get("/items"));

    for result in [a, b] {
        assert!(!result.ok);
        assert_eq!(result.status, 503);
        assert_eq!(result.error_kind(), Some(ErrorKind::HttpError));
    }
}

#[tokio::test]
async fn test_no_deduplication_when_disabled() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/items"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([]))
                .set_delay(Duration::from_millis(100)),
        )
        .expect(3)
        .mount(&mock_server)
        .await;

    let client = Client::builder()
        .base_url(mock_server.uri())
        .unwrap()
        .build()
        .unwrap();

    let results =
        futures::future::join_all((0..3).map(|_| client.get("/items"))).await;
    assert!(results.iter().all(|r| r.ok));
}

#[tokio::test]
async fn test_retry_until_success_with_linear_backoff() {
    let mock_server = MockServer::start().await;
    let attempt_count = Arc::new(AtomicUsize::new(0));
    let attempt_count_clone = attempt_count.clone();

    // First two requests fail with 500, third succeeds
    Mock::given(method("POST"))
        .and(path("/items"))
        .respond_with(move |_req: &wiremock::Request| {
            let count = attempt_count_clone.fetch_add(1, Ordering::SeqCst);
            if count < 2 {
                ResponseTemplate::new(500).set_body_string("Server error")
            } else {
                ResponseTemplate::new(201).set_body_json(item())
            }
        })
        .mount(&mock_server)
        .await;

    let client = Client::builder()
        .base_url(mock_server.uri())
        .unwrap()
        .retries(2)
        .retry_delay(Duration::from_millis(100))
        .build()
        .unwrap();

    let start = Instant::now();
    let result = client.post("/items", json!({"name": "x"})).await;

    assert!(result.ok);
    assert_eq!(result.attempts, 3);
    assert!(result.was_retried());
    assert_eq!(attempt_count.load(Ordering::SeqCst), 3);
    // 100ms + 200ms of backoff
    assert!(start.elapsed() >= Duration::from_millis(300));
}

#[tokio::test]
async fn test_retries_exhausted_surface_last_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/items"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Server error"))
        .mount(&mock_server)
        .await;

    let client = Client::builder()
        .base_url(mock_server.uri())
        .unwrap()
        .retries(2)
        .retry_delay(Duration::from_millis(10))
        .build()
        .unwrap();

    let result = client.get("/items").await;

    // retries: 2 means 3 total attempts (1 initial + 2 retries)
    assert_eq!(result.attempts, 3);
    assert_eq!(request_count(&mock_server).await, 3);
    assert!(!result.ok);
    assert!(result.data.is_none());
    assert_eq!(result.status, 500);
    match result.error {
        Some(Error::HttpError { status, data, .. }) => {
            assert_eq!(status.as_u16(), 500);
            assert_eq!(data, Some(Body::Text("Server error".to_string())));
        }
        other => panic!("Expected HttpError, got {:?}", other),
    }
}

#[tokio::test]
async fn test_client_errors_are_retried_by_default() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/items"))
        .respond_with(ResponseTemplate::new(404))
        .expect(2)
        .mount(&mock_server)
        .await;

    let client = Client::builder()
        .base_url(mock_server.uri())
        .unwrap()
        .retries(1)
        .retry_delay(Duration::from_millis(5))
        .build()
        .unwrap();

    let result = client.get("/items").await;
    assert_eq!(result.status, 404);
    assert_eq!(result.attempts, 2);
}

#[tokio::test]
async fn test_custom_retry_predicate() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/items"))
        .respond_with(ResponseTemplate::new(400).set_body_string("Bad request"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = Client::builder()
        .base_url(mock_server.uri())
        .unwrap()
        .retries(3)
        .retry_delay(Duration::from_millis(10))
        .retry_predicate(Box::new(fetchwell::retry::RetryOnTransient))
        .build()
        .unwrap();

    // 400 is not transient, so no retry happens
    let result = client.get("/items").await;
    assert_eq!(result.attempts, 1);
    assert_eq!(result.status, 400);
}

#[tokio::test]
async fn test_combined_retry_predicate() {
    use fetchwell::retry::{OrPredicate, RetryOn5xx, RetryOnTimeout};

    let mock_server = MockServer::start().await;
    let attempt_count = Arc::new(AtomicUsize::new(0));
    let attempt_count_clone = attempt_count.clone();

    // Slow first response, then a 503, then success
    Mock::given(method("GET"))
        .and(path("/items"))
        .respond_with(move |_req: &wiremock::Request| {
            match attempt_count_clone.fetch_add(1, Ordering::SeqCst) {
                0 => ResponseTemplate::new(200)
                    .set_body_json(item())
                    .set_delay(Duration::from_millis(500)),
                1 => ResponseTemplate::new(503).set_body_string("Unavailable"),
                _ => ResponseTemplate::new(200).set_body_json(item()),
            }
        })
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = Client::builder()
        .base_url(mock_server.uri())
        .unwrap()
        .timeout(Duration::from_millis(100))
        .retries(3)
        .retry_delay(Duration::from_millis(10))
        .retry_predicate(Box::new(OrPredicate::new(vec![
            Box::new(RetryOn5xx),
            Box::new(RetryOnTimeout),
        ])))
        .build()
        .unwrap();

    let result = client.get("/items").await;
    assert!(result.ok);
    assert_eq!(result.attempts, 3);
    assert_eq!(result.json::<Item>().unwrap(), item());

    // 404 matches neither predicate
    let result = client.get("/missing").await;
    assert_eq!(result.attempts, 1);
    assert_eq!(result.status, 404);
}

#[tokio::test]
async fn test_timeout() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({}))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&mock_server)
        .await;

    let client = Client::builder()
        .base_url(mock_server.uri())
        .unwrap()
        .timeout(Duration::from_millis(50))
        .build()
        .unwrap();

    let start = Instant::now();
    let result = client.get("/slow").await;
    let elapsed = start.elapsed();

    assert!(!result.ok);
    assert_eq!(result.status, 0);
    assert_eq!(result.error_kind(), Some(ErrorKind::Timeout));
    assert!(elapsed >= Duration::from_millis(50));
    assert!(elapsed < Duration::from_millis(400), "took {:?}", elapsed);
}

#[tokio::test]
async fn test_cancel_pending_request() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({}))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&mock_server)
        .await;

    let client = Client::builder()
        .base_url(mock_server.uri())
        .unwrap()
        .retries(3)
        .build()
        .unwrap();

    let start = Instant::now();
    let pending = tokio::spawn({
        let client = client.clone();
        async move { client.get("/slow").await }
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(client.state().loading);
    client.cancel();

    let result = pending.await.unwrap();
    assert!(!result.ok);
    assert_eq!(result.status, 0);
    assert_eq!(result.error_kind(), Some(ErrorKind::Cancelled));
    assert_eq!(result.attempts, 1);
    assert!(start.elapsed() < Duration::from_secs(1));
    assert!(!client.state().loading);
}

#[tokio::test]
async fn test_cancel_during_backoff() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/items"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = Client::builder()
        .base_url(mock_server.uri())
        .unwrap()
        .retries(1)
        .retry_delay(Duration::from_secs(5))
        .build()
        .unwrap();

    let pending = tokio::spawn({
        let client = client.clone();
        async move { client.get("/items").await }
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    client.cancel();

    let result = pending.await.unwrap();
    assert_eq!(result.error_kind(), Some(ErrorKind::Cancelled));
}

#[tokio::test]
async fn test_cancel_only_reaches_latest_call() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({}))
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&mock_server)
        .await;

    let client = Client::builder()
        .base_url(mock_server.uri())
        .unwrap()
        .build()
        .unwrap();

    let first = tokio::spawn({
        let client = client.clone();
        async move { client.get("/first").await }
    });
    tokio::time::sleep(Duration::from_millis(30)).await;
    let second = tokio::spawn({
        let client = client.clone();
        async move { client.get("/second").await }
    });
    tokio::time::sleep(Duration::from_millis(30)).await;

    client.cancel();

    assert!(first.await.unwrap().ok);
    assert_eq!(
        second.await.unwrap().error_kind(),
        Some(ErrorKind::Cancelled)
    );
}

#[tokio::test]
async fn test_cancel_request_by_signature() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({}))
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&mock_server)
        .await;

    let client = Client::builder()
        .base_url(mock_server.uri())
        .unwrap()
        .build()
        .unwrap();

    let products = tokio::spawn({
        let client = client.clone();
        async move { client.get("/products").await }
    });
    let reviews = tokio::spawn({
        let client = client.clone();
        async move { client.get("/reviews").await }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    let signature = client.signature("/products", &RequestOptions::new()).unwrap();
    assert!(client.cancel_request(&signature));

    assert_eq!(
        products.await.unwrap().error_kind(),
        Some(ErrorKind::Cancelled)
    );
    assert!(reviews.await.unwrap().ok);
    assert!(!client.cancel_request(&signature));
}

#[tokio::test]
async fn test_caller_signal_cancels() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({}))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&mock_server)
        .await;

    let client = Client::builder()
        .base_url(mock_server.uri())
        .unwrap()
        .build()
        .unwrap();

    let signal = CancellationToken::new();
    let pending = tokio::spawn({
        let client = client.clone();
        let options = RequestOptions::new().signal(signal.clone());
        async move { client.get_with("/slow", options).await }
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    signal.cancel();

    let result = pending.await.unwrap();
    assert_eq!(result.error_kind(), Some(ErrorKind::Cancelled));
}

#[tokio::test]
async fn test_reset_cancels_and_clears_state_but_keeps_cache() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/items"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([1])))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({}))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&mock_server)
        .await;

    let client = Client::builder()
        .base_url(mock_server.uri())
        .unwrap()
        .cache(true)
        .build()
        .unwrap();

    assert!(client.get("/items").await.ok);
    assert!(client.state().data.is_some());

    let pending = tokio::spawn({
        let client = client.clone();
        async move { client.get("/slow").await }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    client.reset();

    assert_eq!(
        pending.await.unwrap().error_kind(),
        Some(ErrorKind::Cancelled)
    );
    let state = client.state();
    assert!(state.data.is_none());
    assert!(state.error.is_none());

    // Still cached: the mock expects a single request
    assert!(client.get("/items").await.from_cache);
}

#[tokio::test]
async fn test_state_tracks_last_outcome() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/items"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([1, 2])))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "not found"})))
        .mount(&mock_server)
        .await;

    let client = Client::builder()
        .base_url(mock_server.uri())
        .unwrap()
        .build()
        .unwrap();

    client.get("/items").await;
    let missing = client.get("/missing").await;
    assert_eq!(
        missing.error.as_ref().and_then(Error::data),
        Some(&Body::Json(json!({"message": "not found"})))
    );

    let state = client.state();
    assert_eq!(state.data, Some(Body::Json(json!([1, 2]))));
    assert_eq!(
        state.error.as_ref().map(Error::kind),
        Some(ErrorKind::HttpError)
    );

    client.get("/items").await;
    assert!(client.state().error.is_none());
}

#[tokio::test]
async fn test_network_error() {
    let client = Client::builder()
        .base_url("http://127.0.0.1:1")
        .unwrap()
        .build()
        .unwrap();

    let result = client.get("/items").await;

    assert!(!result.ok);
    assert_eq!(result.status, 0);
    assert_eq!(result.error_kind(), Some(ErrorKind::NetworkError));
}

#[tokio::test]
async fn test_absolute_paths_without_base_url() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_string("up"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = Client::builder().build().unwrap();
    let result = client.get(format!("{}/health", mock_server.uri())).await;

    assert!(result.ok);
    assert_eq!(result.data, Some(Body::Text("up".to_string())));
}

#[tokio::test]
async fn test_invalid_json_response() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/items"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/json")
                .set_body_string("invalid json"),
        )
        .mount(&mock_server)
        .await;

    let client = Client::builder()
        .base_url(mock_server.uri())
        .unwrap()
        .build()
        .unwrap();

    let result = client.get("/items").await;

    assert_eq!(result.error_kind(), Some(ErrorKind::UnknownError));
    match result.error {
        Some(Error::DeserializationFailed {
            raw_response,
            status,
            ..
        }) => {
            assert_eq!(status.as_u16(), 200);
            assert_eq!(raw_response, "invalid json");
        }
        other => panic!("Expected DeserializationFailed, got {:?}", other),
    }
}

#[tokio::test]
async fn test_default_headers_are_overridable() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/items"))
        .and(header("apikey", "per-call"))
        .and(header("x-client", "storefront"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = Client::builder()
        .base_url(mock_server.uri())
        .unwrap()
        .default_header("apikey", "default")
        .unwrap()
        .default_header("x-client", "storefront")
        .unwrap()
        .build()
        .unwrap();

    let options = RequestOptions::new().with_header("apikey", "per-call").unwrap();
    let result = client.get_with("/items", options).await;
    assert!(result.ok);
}

#[tokio::test]
async fn test_json_body_and_content_type() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/items/1"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({"name": "Desk lamp"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 1, "name": "Desk lamp"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = Client::builder()
        .base_url(mock_server.uri())
        .unwrap()
        .build()
        .unwrap();

    let result = client.patch("/items/1", json!({"name": "Desk lamp"})).await;
    assert!(result.ok);
}

#[tokio::test]
async fn test_string_body_sent_verbatim() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/items/1"))
        .and(body_string(r#"{"name":"pre-serialized"}"#))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = Client::builder()
        .base_url(mock_server.uri())
        .unwrap()
        .build()
        .unwrap();

    let result = client.put("/items/1", r#"{"name":"pre-serialized"}"#).await;
    assert!(result.ok);
    assert_eq!(result.status, 204);
    assert_eq!(result.data, Some(Body::Text(String::new())));
}

#[tokio::test]
async fn test_query_parameters() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/products"))
        .and(query_param("category", "lamps"))
        .and(query_param("limit", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = Client::builder()
        .base_url(mock_server.uri())
        .unwrap()
        .build()
        .unwrap();

    let options = RequestOptions::new()
        .with_query_param("category", "lamps")
        .with_query_param("limit", "10");
    assert!(client.get_with("/products", options).await.ok);
}

#[tokio::test]
async fn test_delete_request() {
    let mock_server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/wishlist/3"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = Client::builder()
        .base_url(mock_server.uri())
        .unwrap()
        .build()
        .unwrap();

    let result = client.delete("/wishlist/3").await;
    assert!(result.ok);
    assert_eq!(result.status, 204);
}

#[tokio::test]
async fn test_retry_after_is_honoured_when_enabled() {
    let mock_server = MockServer::start().await;
    let attempt_count = Arc::new(AtomicUsize::new(0));
    let attempt_count_clone = attempt_count.clone();

    Mock::given(method("GET"))
        .and(path("/items"))
        .respond_with(move |_req: &wiremock::Request| {
            let count = attempt_count_clone.fetch_add(1, Ordering::SeqCst);
            if count == 0 {
                ResponseTemplate::new(429)
                    .insert_header("retry-after", "1")
                    .set_body_string("Rate limited")
            } else {
                ResponseTemplate::new(200).set_body_json(json!([]))
            }
        })
        .mount(&mock_server)
        .await;

    let client = Client::builder()
        .base_url(mock_server.uri())
        .unwrap()
        .retries(1)
        .retry_delay(Duration::from_millis(10))
        .retry_after(RetryAfterConfig::enabled(Duration::from_secs(5)))
        .build()
        .unwrap();

    let start = Instant::now();
    let result = client.get("/items").await;

    assert!(result.ok);
    assert_eq!(result.attempts, 2);
    assert!(start.elapsed() >= Duration::from_millis(900));
}

#[tokio::test]
async fn test_retry_after_ignored_by_default() {
    let mock_server = MockServer::start().await;
    let attempt_count = Arc::new(AtomicUsize::new(0));
    let attempt_count_clone = attempt_count.clone();

    Mock::given(method("GET"))
        .and(path("/items"))
        .respond_with(move |_req: &wiremock::Request| {
            let count = attempt_count_clone.fetch_add(1, Ordering::SeqCst);
            if count == 0 {
                ResponseTemplate::new(429).insert_header("retry-after", "10")
            } else {
                ResponseTemplate::new(200).set_body_json(json!([]))
            }
        })
        .mount(&mock_server)
        .await;

    let client = Client::builder()
        .base_url(mock_server.uri())
        .unwrap()
        .retries(1)
        .retry_delay(Duration::from_millis(10))
        .build()
        .unwrap();

    let start = Instant::now();
    let result = client.get("/items").await;

    assert!(result.ok);
    assert!(start.elapsed() < Duration::from_secs(2));
}
