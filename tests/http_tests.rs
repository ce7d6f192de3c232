use openalex_works::http::{HttpExecutor, Pacing};
use openalex_works::OpenAlexError;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn executor(max_retries: u32) -> (HttpExecutor, Arc<Mutex<Vec<Duration>>>) {
    let (pacing, log) = Pacing::recording(Duration::ZERO);
    let executor = HttpExecutor::new("openalex-works-tests", max_retries, pacing).unwrap();
    (executor, log)
}

fn sleeps(log: &Arc<Mutex<Vec<Duration>>>) -> Vec<Duration> {
    log.lock().unwrap().clone()
}

#[tokio::test]
async fn test_success_returns_body_and_sends_params() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/works"))
        .and(query_param("search", "soil carbon"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"results": []})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (executor, log) = executor(2);
    let params = vec![("search".to_string(), "soil carbon".to_string())];
    let body = executor
        .execute(&format!("{}/works", mock_server.uri()), &params)
        .await
        .unwrap();

    assert_eq!(body, serde_json::json!({"results": []}));
    assert!(sleeps(&log).is_empty());
}

#[tokio::test]
async fn test_rate_limit_exhausted_waits_retry_after() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/works"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "1"))
        .expect(2)
        .mount(&mock_server)
        .await;

    let (executor, log) = executor(1);
    let err = executor
        .execute(&format!("{}/works", mock_server.uri()), &[])
        .await
        .unwrap_err();

    assert!(matches!(err, OpenAlexError::RateLimited { wait_secs: 1 }));
    assert_eq!(err.to_string(), "Rate limit exceeded. Retry after 1 seconds.");
    assert_eq!(sleeps(&log), vec![Duration::from_secs(1)]);
}

#[tokio::test]
async fn test_rate_limit_without_header_defaults_to_sixty_seconds() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (executor, log) = executor(0);
    let err = executor.execute(&mock_server.uri(), &[]).await.unwrap_err();

    assert!(matches!(err, OpenAlexError::RateLimited { wait_secs: 60 }));
    assert!(sleeps(&log).is_empty());
}

#[tokio::test]
async fn test_rate_limit_then_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "3"))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
        .mount(&mock_server)
        .await;

    let (executor, log) = executor(2);
    let body = executor.execute(&mock_server.uri(), &[]).await.unwrap();

    assert_eq!(body["ok"], true);
    assert_eq!(sleeps(&log), vec![Duration::from_secs(3)]);
}

#[tokio::test]
async fn test_server_errors_back_off_exponentially() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&mock_server)
        .await;

    let (executor, log) = executor(2);
    let err = executor.execute(&mock_server.uri(), &[]).await.unwrap_err();

    match err {
        OpenAlexError::Api(cause) => assert!(cause.contains("500"), "unexpected cause: {}", cause),
        other => panic!("expected Api error, got {:?}", other),
    }
    assert_eq!(sleeps(&log), vec![Duration::from_secs(1), Duration::from_secs(2)]);
}

#[tokio::test]
async fn test_transport_error_becomes_api_error() {
    // Nothing listens on port 1
    let (executor, log) = executor(1);
    let err = executor.execute("http://127.0.0.1:1/works", &[]).await.unwrap_err();

    assert!(matches!(err, OpenAlexError::Api(_)));
    assert!(err.to_string().starts_with("API request failed: "));
    assert_eq!(sleeps(&log), vec![Duration::from_secs(1)]);
}

#[tokio::test]
async fn test_invalid_json_is_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .expect(2)
        .mount(&mock_server)
        .await;

    let (executor, _log) = executor(1);
    let err = executor.execute(&mock_server.uri(), &[]).await.unwrap_err();
    assert!(matches!(err, OpenAlexError::Api(_)));
}
