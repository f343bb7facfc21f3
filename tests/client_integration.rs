//! Integration tests for the resilient client over real HTTP.

use novelcrawl_core::client::{
    BreakerConfig, ClientConfig, FetchError, PauseShape, ResilientClient, RetryClientConfig,
    RetryCondition,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(retry: RetryClientConfig, breaker: BreakerConfig) -> ResilientClient {
    ResilientClient::new(&ClientConfig {
        timeout_secs: 5,
        circuit_breaker: breaker,
        retry,
        ..ClientConfig::default()
    })
    .expect("client should build")
}

fn no_retry() -> RetryClientConfig {
    RetryClientConfig {
        max_retry_weight: 1,
        conditions: Vec::new(),
    }
}

#[tokio::test]
async fn test_get_html_returns_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/book/1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<h1>book</h1>"))
        .mount(&server)
        .await;

    let client = client(no_retry(), BreakerConfig::default());
    let body = client
        .get_html(&format!("{}/book/1", server.uri()))
        .await
        .unwrap();

    assert_eq!(body, "<h1>book</h1>");
}

#[tokio::test]
async fn test_get_html_rejects_error_status() {
    let server = MockServer::start().await;

    let client = client(no_retry(), BreakerConfig::default());
    let err = client
        .get_html(&format!("{}/missing", server.uri()))
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::HttpStatus { status: 404, .. }));
}

#[tokio::test]
async fn test_retry_recovers_after_transient_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_string("recovered"))
        .mount(&server)
        .await;

    let retry = RetryClientConfig {
        max_retry_weight: 5,
        conditions: vec![RetryCondition::status_code([503], 1, 0, PauseShape::Const)],
    };
    let client = client(retry, BreakerConfig::default());
    let body = client
        .get_html(&format!("{}/flaky", server.uri()))
        .await
        .unwrap();

    assert_eq!(body, "recovered");
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_retry_on_soft_failure_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/busy"))
        .respond_with(ResponseTemplate::new(200).set_body_string("server busy, try later"))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/busy"))
        .respond_with(ResponseTemplate::new(200).set_body_string("content"))
        .mount(&server)
        .await;

    let retry = RetryClientConfig {
        max_retry_weight: 3,
        conditions: vec![RetryCondition::body_contains("busy", 1, 0, PauseShape::Linear)],
    };
    let client = client(retry, BreakerConfig::default());
    let body = client
        .get_html(&format!("{}/busy", server.uri()))
        .await
        .unwrap();

    assert_eq!(body, "content");
}

#[tokio::test]
async fn test_retry_budget_returns_last_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/down"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let retry = RetryClientConfig {
        max_retry_weight: 4,
        conditions: vec![RetryCondition::status_code([503], 2, 0, PauseShape::Const)],
    };
    let breaker = BreakerConfig {
        failure_threshold: 100,
        ..BreakerConfig::default()
    };
    let client = client(retry, breaker);
    let err = client
        .get_html(&format!("{}/down", server.uri()))
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::HttpStatus { status: 503, .. }));
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_breaker_opens_after_consecutive_failures() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/down"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let breaker = BreakerConfig {
        failure_threshold: 2,
        cooldown_secs: 60,
        ..BreakerConfig::default()
    };
    let client = client(no_retry(), breaker);
    let url = format!("{}/down", server.uri());

    for _ in 0..2 {
        let err = client.get_html(&url).await.unwrap_err();
        assert!(!err.is_circuit_open());
    }
    let err = client.get_html(&url).await.unwrap_err();

    assert!(err.is_circuit_open());
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}
