//! Integration tests for RetryingFetch against a mock HTTP server.

use std::time::Duration;

use moverly_core::{CancellationToken, FetchOptions, MoverlyError, RetryConfig, RetryingFetch};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fast_retry() -> RetryConfig {
    RetryConfig::default()
        .with_base_delay(Duration::from_millis(5))
        .with_max_delay(Duration::from_millis(20))
}

async fn request_count(server: &MockServer) -> usize {
    server.received_requests().await.map_or(0, |r| r.len())
}

#[tokio::test]
async fn test_persistent_503_uses_all_three_attempts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/quotes"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let fetch = RetryingFetch::new(fast_retry()).unwrap();
    let err = fetch
        .get(&format!("{}/quotes", server.uri()))
        .await
        .unwrap_err();

    assert!(matches!(err, MoverlyError::ServerError { status: 503, .. }));
    assert_eq!(request_count(&server).await, 3);
}

#[tokio::test]
async fn test_404_is_returned_after_one_attempt() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/blog/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let fetch = RetryingFetch::new(fast_retry()).unwrap();
    let response = fetch
        .get(&format!("{}/blog/missing", server.uri()))
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 404);
    assert_eq!(request_count(&server).await, 1);
}

#[tokio::test]
async fn test_recovers_after_transient_failures() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/locations"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/locations"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"data":[]}"#))
        .mount(&server)
        .await;

    let fetch = RetryingFetch::new(fast_retry()).unwrap();
    let response = fetch
        .get(&format!("{}/locations", server.uri()))
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(request_count(&server).await, 3);
}

#[tokio::test]
async fn test_attempt_budget_override() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/sms/send"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let fetch = RetryingFetch::new(fast_retry()).unwrap();
    let request = fetch
        .client()
        .post(format!("{}/auth/sms/send", server.uri()))
        .body("{}")
        .build()
        .unwrap();
    let err = fetch
        .fetch_with(request, FetchOptions::new().with_max_attempts(1))
        .await
        .unwrap_err();

    assert!(matches!(err, MoverlyError::ServerError { status: 500, .. }));
    assert_eq!(request_count(&server).await, 1);
}

#[tokio::test]
async fn test_per_request_timeout_is_retried_then_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .mount(&server)
        .await;

    let fetch = RetryingFetch::new(fast_retry().with_max_attempts(2)).unwrap();
    let request = fetch
        .client()
        .get(format!("{}/slow", server.uri()))
        .build()
        .unwrap();
    let err = fetch
        .fetch_with(
            request,
            FetchOptions::new().with_timeout(Duration::from_millis(50)),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, MoverlyError::Timeout(t) if t == Duration::from_millis(50)));
    assert_eq!(request_count(&server).await, 2);
}

#[tokio::test]
async fn test_pre_cancelled_request_never_hits_network() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let cancel = CancellationToken::new();
    cancel.cancel();

    let fetch = RetryingFetch::new(fast_retry()).unwrap();
    let request = fetch.client().get(server.uri()).build().unwrap();
    let err = fetch
        .fetch_with(request, FetchOptions::new().with_cancel(cancel))
        .await
        .unwrap_err();

    assert!(matches!(err, MoverlyError::Cancelled));
    assert_eq!(request_count(&server).await, 0);
}
