//! HttpClient over the real reqwest transport, against a local server

use std::time::Duration;

use libconduit::{HttpClient, HttpError};
use reqwest::Url;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Serve one canned response per connection, forever
async fn serve(status_line: &'static str, body: &'static str) -> Url {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            tokio::spawn(async move {
                let mut request = Vec::new();
                let mut chunk = [0u8; 1024];
                let header_end = loop {
                    if let Some(pos) = request.windows(4).position(|w| w == b"\r\n\r\n") {
                        break pos + 4;
                    }
                    match socket.read(&mut chunk).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => request.extend_from_slice(&chunk[..n]),
                    }
                };
                let headers = String::from_utf8_lossy(&request[..header_end]).to_lowercase();
                let content_length = headers
                    .lines()
                    .find_map(|line| line.strip_prefix("content-length:"))
                    .and_then(|value| value.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                while request.len() < header_end + content_length {
                    match socket.read(&mut chunk).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => request.extend_from_slice(&chunk[..n]),
                    }
                }

                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status_line,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    Url::parse(&format!("http://{}/api/articles", addr)).unwrap()
}

#[tokio::test]
async fn test_status_300_is_success() {
    let url = serve("300 Multiple Choices", r#"{"articles":[]}"#).await;
    let client = HttpClient::reqwest().unwrap();

    let value: serde_json::Value = client.get(&url).await.unwrap();
    assert_eq!(value, serde_json::json!({"articles": []}));
}

#[tokio::test]
async fn test_status_301_is_bad_status() {
    let url = serve("301 Moved Permanently", r#"{"moved":true}"#).await;
    let client = HttpClient::reqwest().unwrap();

    let result: Result<serde_json::Value, HttpError> = client.get(&url).await;
    match result {
        Err(HttpError::BadStatus { status, body }) => {
            assert_eq!(status, 301);
            assert_eq!(body, br#"{"moved":true}"#.to_vec());
        }
        other => panic!("expected BadStatus, got {:?}", other),
    }
}

#[tokio::test]
async fn test_undecodable_body_is_bad_body() {
    let url = serve("200 OK", "<html>not json</html>").await;
    let client = HttpClient::reqwest().unwrap();

    let result: Result<serde_json::Value, HttpError> = client.get(&url).await;
    assert!(matches!(result, Err(HttpError::BadBody { .. })));
}

#[tokio::test]
async fn test_post_sends_json_headers() {
    let url = serve("200 OK", r#"{"user":{"token":"t","username":"u","image":null}}"#).await;
    let client = HttpClient::reqwest().unwrap();

    let user: libconduit::User = client
        .post(&url, Some(br#"{"user":{"email":"e","password":"p"}}"#.to_vec()))
        .await
        .unwrap();
    assert_eq!(user.username, "u");
}

#[tokio::test]
async fn test_refused_connection_is_session_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    tokio::time::sleep(Duration::from_millis(10)).await;

    let client = HttpClient::reqwest().unwrap();
    let url = Url::parse(&format!("http://{}/api/articles", addr)).unwrap();

    let result: Result<serde_json::Value, HttpError> = client.get(&url).await;
    assert!(matches!(result, Err(HttpError::Session { .. })), "got {:?}", result);
}
