//! Unit tests for registry client

use super::*;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use wiremock::{MockServer, Mock, ResponseTemplate};
use wiremock::matchers::{method, path, query_param};

fn fast_retry(max_retries: u32) -> RetryConfig {
    RetryConfig {
        max_retries,
        initial_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(5),
        multiplier: 2.0,
    }
}

fn test_client(base_url: &str, max_retries: u32) -> RegistryClient {
    RegistryClient::with_config(base_url, fast_retry(max_retries), Duration::from_millis(200), "wpaudit-test")
        .unwrap()
}

#[tokio::test]
async fn test_registry_client_creation() {
    let client = RegistryClient::new().unwrap();
    assert_eq!(client.base_url(), DEFAULT_BASE_URL);
    assert_eq!(client.retry_config().max_retries, 5);
}

#[test]
fn test_retry_config_default() {
    let config = RetryConfig::default();
    assert_eq!(config.max_retries, 5);
    assert_eq!(config.initial_delay, Duration::from_secs(5));
    assert_eq!(config.max_delay, Duration::from_secs(60));
    assert_eq!(config.multiplier, 2.0);
}

#[test]
fn test_backoff_grows_and_caps() {
    let config = RetryConfig::default();
    let mut delay = config.initial_delay;
    let mut seen = Vec::new();
    for _ in 0..6 {
        seen.push(delay.as_secs());
        delay = config.next_delay(delay);
    }
    assert_eq!(seen, vec![5, 10, 20, 40, 60, 60]);
}

#[test]
fn test_query_plugins_url() {
    let client = RegistryClient::new().unwrap();
    assert_eq!(
        client.query_plugins_url(3, 10, None),
        "https://api.wordpress.org/plugins/info/1.2/?action=query_plugins&request[page]=3&request[per_page]=10"
    );
    assert!(client
        .query_plugins_url(1, 100, Some("popular"))
        .ends_with("&request[browse]=popular"));
}

#[tokio::test]
async fn test_fetch_returns_non_success_status_without_retry() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/listing"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server.uri(), 3);
    let fetched = client.fetch(&format!("{}/listing", mock_server.uri())).await.unwrap();
    assert_eq!(fetched.status.as_u16(), 503);
}

#[tokio::test]
async fn test_fetch_retries_timeout_then_succeeds() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(1000)))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server.uri(), 3);
    let fetched = client.fetch(&format!("{}/slow", mock_server.uri())).await.unwrap();
    assert_eq!(fetched.status.as_u16(), 200);
    assert_eq!(fetched.body, b"ok");
}

#[tokio::test]
async fn test_fetch_gives_up_after_max_retries() {
    // Reserve a port, then free it so connections are refused
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let url = format!("http://{}/listing", addr);
    let client = test_client(&format!("http://{}", addr), 2);

    match client.fetch(&url).await {
        Err(AuditError::RetriesExhausted { url: failed, attempts, .. }) => {
            assert_eq!(failed, url);
            assert_eq!(attempts, 3);
        }
        other => panic!("Expected RetriesExhausted, got {:?}", other.map(|f| f.status)),
    }
}

#[tokio::test]
async fn test_download_archive_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/plugin/foo.zip"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"PK\x03\x04fake".to_vec()))
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server.uri(), 0);
    let bytes = client
        .download_archive(&format!("{}/plugin/foo.zip", mock_server.uri()))
        .await
        .unwrap();
    assert_eq!(&bytes[..4], b"PK\x03\x04");
}

#[tokio::test]
async fn test_download_archive_status_is_an_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/plugin/gone.zip"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server.uri(), 0);
    let result = client
        .download_archive(&format!("{}/plugin/gone.zip", mock_server.uri()))
        .await;

    match result.unwrap_err() {
        AuditError::HttpStatus { status, .. } => assert_eq!(status, 404),
        other => panic!("Expected HttpStatus error, got {}", other),
    }
}

#[tokio::test]
async fn test_query_url_hits_listing_endpoint() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(query_param("action", "query_plugins"))
        .and(query_param("request[page]", "2"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&format!("{}/", mock_server.uri()), 0);
    let url = client.query_plugins_url(2, 10, None);
    let fetched = client.fetch(&url).await.unwrap();
    assert!(fetched.status.is_success());
}

/// Raw HTTP server whose first `stalls` connections announce a 1000 byte
/// body, send two bytes of it and go quiet. Later connections get the full body.
async fn stalling_server(stalls: usize, body: &'static [u8]) -> (String, Arc<AtomicUsize>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let connections = Arc::new(AtomicUsize::new(0));
    let counter = connections.clone();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let seen = counter.fetch_add(1, Ordering::SeqCst);
            tokio::spawn(async move {
                let mut request = [0u8; 4096];
                let _ = socket.read(&mut request).await;

                if seen < stalls {
                    let _ = socket
                        .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 1000\r\n\r\nPK")
                        .await;
                    tokio::time::sleep(Duration::from_secs(10)).await;
                } else {
                    let head = format!(
                        "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                        body.len()
                    );
                    let _ = socket.write_all(head.as_bytes()).await;
                    let _ = socket.write_all(body).await;
                }
            });
        }
    });

    (format!("http://{}", addr), connections)
}

#[tokio::test]
async fn test_stalled_body_is_retried() {
    let (base, connections) = stalling_server(1, b"PK\x03\x04complete").await;
    let client = test_client(&base, 3);

    let bytes = client.download_archive(&format!("{}/plugin/big.zip", base)).await.unwrap();

    assert_eq!(bytes, b"PK\x03\x04complete");
    assert_eq!(connections.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_stalled_body_counts_against_max_retries() {
    let (base, connections) = stalling_server(usize::MAX, b"").await;
    let client = test_client(&base, 2);

    match client.download_archive(&format!("{}/plugin/big.zip", base)).await {
        Err(AuditError::RetriesExhausted { attempts, .. }) => assert_eq!(attempts, 3),
        other => panic!("Expected RetriesExhausted, got {:?}", other.map(|b| b.len())),
    }
    assert_eq!(connections.load(Ordering::SeqCst), 3);
}
