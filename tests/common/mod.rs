//! Helpers shared by the integration tests.

#![allow(dead_code)]

use livemap::LocationUpdate;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

pub fn location_frame(topic: &str, lat: f64, lon: f64) -> String {
    serde_json::json!({
        "_type": "location",
        "topic": topic,
        "lat": lat,
        "lon": lon,
        "tst": 1700000000,
    })
    .to_string()
}

pub fn update(topic: &str, lat: f64, lon: f64) -> LocationUpdate {
    LocationUpdate::new(topic, lat, lon)
}

/// Serves one canned HTTP response per connection, `count` times. Returns
/// the base URL and a handle yielding the request lines it saw.
pub async fn serve_http(
    status: &'static str,
    body: &'static str,
    count: usize,
) -> (String, tokio::task::JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let mut request_lines = Vec::new();
        for _ in 0..count {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            let request = String::from_utf8_lossy(&request).into_owned();
            request_lines.push(request.lines().next().unwrap_or_default().to_string());

            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
        }
        request_lines
    });

    (format!("http://{}", addr), handle)
}
