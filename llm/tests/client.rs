//! Integration tests against a throwaway HTTP server on localhost.

use llm::{CancellationToken, Client, Error, Message, Request};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Read one HTTP request (headers plus Content-Length body) from the socket.
async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        let text = String::from_utf8_lossy(&buf).to_string();
        if let Some(header_end) = text.find("\r\n\r\n") {
            let content_length = text[..header_end]
                .lines()
                .find_map(|line| {
                    let lower = line.to_ascii_lowercase();
                    lower
                        .strip_prefix("content-length:")
                        .map(|v| v.trim().parse::<usize>().unwrap_or(0))
                })
                .unwrap_or(0);
            if buf.len() >= header_end + 4 + content_length {
                return text;
            }
        }
    }
    String::from_utf8_lossy(&buf).to_string()
}

/// Serve exactly one request with the given status and body.
async fn serve_once(status: &'static str, body: &'static str) -> (String, tokio::task::JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let request = read_request(&mut socket).await;
        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();
        request
    });
    (format!("http://{addr}/v1"), handle)
}

#[tokio::test]
async fn test_complete_round_trip() {
    let (base_url, server) = serve_once(
        "200 OK",
        r#"{"id":"c1","model":"m","choices":[{"message":{"role":"assistant","content":"A goblin appears!"},"finish_reason":"stop"}]}"#,
    )
    .await;

    let client = Client::new(base_url, "secret").with_model("m");
    let response = client
        .complete(Request::new(vec![Message::user("I open the door")]).with_system("You are a GM"))
        .await
        .unwrap();

    assert_eq!(response.text(), "A goblin appears!");

    let raw_request = server.await.unwrap();
    assert!(raw_request.starts_with("POST /v1/chat/completions"));
    assert!(raw_request.to_ascii_lowercase().contains("authorization: bearer secret"));
    assert!(raw_request.contains("I open the door"));
}

#[tokio::test]
async fn test_unauthorized_is_authentication_error() {
    let (base_url, _server) = serve_once("401 Unauthorized", r#"{"error":"invalid key"}"#).await;

    let client = Client::new(base_url, "wrong");
    let err = client
        .complete(Request::new(vec![Message::user("hi")]))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Authentication { status: 401, .. }));
    assert!(err.is_connectivity());
}

#[tokio::test]
async fn test_connection_refused() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = Client::new(format!("http://{addr}/v1"), "k");
    let err = client
        .complete(Request::new(vec![Message::user("hi")]))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Connection(_)));
}

#[tokio::test]
async fn test_slow_server_times_out() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let _server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let _ = read_request(&mut socket).await;
        tokio::time::sleep(Duration::from_secs(10)).await;
    });

    let client =
        Client::new(format!("http://{addr}/v1"), "k").with_timeout(Duration::from_millis(200));
    let err = client
        .complete(Request::new(vec![Message::user("hi")]))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Timeout(_)));
}

#[tokio::test]
async fn test_cancellation_abandons_call() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let _server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let _ = read_request(&mut socket).await;
        tokio::time::sleep(Duration::from_secs(10)).await;
    });

    let client = Client::new(format!("http://{addr}/v1"), "k");
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let err = client
        .complete_cancellable(Request::new(vec![Message::user("hi")]), &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Cancelled));
}
