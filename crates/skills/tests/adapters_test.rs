use std::time::Duration;

use answer_engine_core::types::{SourceId, SourcePayload};
use answer_engine_core::SourceAdapter;
use answer_engine_skills::{ExaWebAdapter, ProviderEndpoint, SemanticScholarAdapter, SynthesisAdapter};
use secrecy::Secret;
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Serve one canned HTTP response per connection and return the base url.
async fn canned_server(status: u16, body: String) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let body = body.clone();
            tokio::spawn(async move {
                read_request(&mut socket).await;
                let response = format!(
                    "HTTP/1.1 {} X\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    format!("http://{}", addr)
}

/// Accept connections and never answer.
async fn silent_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    format!("http://{}", addr)
}

async fn read_request(socket: &mut tokio::net::TcpStream) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let Ok(n) = socket.read(&mut chunk).await else {
            return;
        };
        if n == 0 {
            return;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&buf[..end]).to_ascii_lowercase();
            let length = head
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= end + 4 + length {
                return;
            }
        }
    }
}

fn endpoint(base_url: &str, timeout: Duration) -> ProviderEndpoint {
    ProviderEndpoint::new(
        base_url,
        "",
        Some(Secret::new("test-key".to_string())),
        timeout,
    )
}

#[tokio::test]
async fn test_web_adapter_end_to_end() {
    let body = json!({
        "results": [
            {"title": "Tokio", "url": "https://tokio.rs/", "text": "An asynchronous runtime."},
            {"title": "Bad", "url": "mailto:someone@example.com"}
        ]
    })
    .to_string();
    let base = canned_server(200, body).await;

    let adapter = ExaWebAdapter::new(endpoint(&base, Duration::from_secs(5)));
    let result = adapter.run("what is tokio", 5).await;

    assert!(result.is_success(), "{:?}", result.error);
    assert_eq!(result.source, SourceId::Web);
    assert_eq!(result.citations.len(), 1);
    assert_eq!(result.citations[0].url, "https://tokio.rs/");
}

#[tokio::test]
async fn test_http_error_becomes_failed_result() {
    let base = canned_server(500, "{\"error\":\"upstream\"}".to_string()).await;

    let adapter = SemanticScholarAdapter::new(endpoint(&base, Duration::from_secs(5)));
    let result = adapter.run("transformers", 3).await;

    assert!(!result.is_success());
    assert!(result.data.is_none());
    assert!(result.error.unwrap().contains("HTTP 500"));
}

#[tokio::test]
async fn test_malformed_body_becomes_failed_result() {
    let base = canned_server(200, "<html>not json</html>".to_string()).await;

    let adapter = ExaWebAdapter::new(endpoint(&base, Duration::from_secs(5)));
    let result = adapter.run("q", 3).await;

    assert!(result.error.unwrap().starts_with("malformed payload"));
}

#[tokio::test]
async fn test_silent_provider_times_out() {
    let base = silent_server().await;

    let adapter = SynthesisAdapter::new(endpoint(&base, Duration::from_millis(200)), "sonar");
    let result = adapter.run("q", 3).await;

    assert_eq!(result.error.as_deref(), Some("timed out after 200 ms"));
    assert!(result.elapsed_ms >= 200);
}

#[tokio::test]
async fn test_missing_key_fails_without_request() {
    let adapter = SynthesisAdapter::new(
        ProviderEndpoint::new("http://127.0.0.1:9", "", None, Duration::from_secs(1)),
        "sonar",
    );
    let result = adapter.run("q", 3).await;
    assert!(result.error.unwrap().contains("not configured"));
}

#[tokio::test]
async fn test_synthesis_adapter_end_to_end() {
    let body = json!({
        "choices": [{"message": {"role": "assistant", "content": "Forty-two."}}],
        "citations": ["https://en.wikipedia.org/wiki/42"]
    })
    .to_string();
    let base = canned_server(200, body).await;

    let adapter = SynthesisAdapter::new(endpoint(&base, Duration::from_secs(5)), "sonar");
    let result = adapter.run("meaning of life", 3).await;

    assert_eq!(
        result.data,
        Some(SourcePayload::Synthesis {
            answer: "Forty-two.".into()
        })
    );
    assert_eq!(result.citations[0].title, "en.wikipedia.org");
}
