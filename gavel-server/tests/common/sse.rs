//! SSE test connection for protocol testing
//!
//! Reads a `text/event-stream` response incrementally and splits it into
//! frames so tests can assert on event names, payloads, and keep-alive
//! comments.
//!
//! Note: Some methods may appear unused because they're only used in specific
//! test files and clippy checks each test independently.

use std::net::SocketAddr;
use std::pin::Pin;
use std::time::Duration;

use futures::{Stream, StreamExt};

/// One parsed frame off the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestFrame {
    Event { name: String, data: String },
    Comment(String),
}

/// A live SSE connection to the test server
pub struct SseConnection {
    stream: Pin<Box<dyn Stream<Item = reqwest::Result<Vec<u8>>> + Send>>,
    buffer: String,
}

impl SseConnection {
    /// Open a stream and verify the content type
    pub async fn open(addr: SocketAddr, path: &str) -> Self {
        let response = reqwest::get(format!("http://{}{}", addr, path))
            .await
            .expect("Failed to connect");
        assert!(
            response.status().is_success(),
            "Unexpected status {}",
            response.status()
        );
        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        assert!(
            content_type.starts_with("text/event-stream"),
            "Unexpected content type: {}",
            content_type
        );

        let stream = response.bytes_stream().map(|chunk| chunk.map(|b| b.to_vec()));
        Self {
            stream: Box::pin(stream),
            buffer: String::new(),
        }
    }

    /// Next frame (event or comment), waiting up to two seconds
    pub async fn next_frame(&mut self) -> TestFrame {
        tokio::time::timeout(Duration::from_secs(2), self.read_frame())
            .await
            .expect("Timeout waiting for SSE frame")
    }

    /// Next named event, skipping keep-alive comments
    #[allow(dead_code)]
    pub async fn next_event(&mut self) -> (String, String) {
        loop {
            match self.next_frame().await {
                TestFrame::Event { name, data } => return (name, data),
                TestFrame::Comment(_) => continue,
            }
        }
    }

    async fn read_frame(&mut self) -> TestFrame {
        loop {
            if let Some(frame) = self.pop_frame() {
                return frame;
            }
            let chunk = self
                .stream
                .next()
                .await
                .expect("SSE stream ended")
                .expect("SSE stream errored");
            self.buffer.push_str(&String::from_utf8_lossy(&chunk));
        }
    }

    /// Split one `\n\n`-terminated block off the buffer, if complete
    fn pop_frame(&mut self) -> Option<TestFrame> {
        let end = self.buffer.find("\n\n")?;
        let block: String = self.buffer.drain(..end + 2).collect();

        let mut name = None;
        let mut data_lines = Vec::new();
        let mut comment = None;
        for line in block.lines() {
            if let Some(rest) = line.strip_prefix("event:") {
                name = Some(rest.trim_start().to_string());
            } else if let Some(rest) = line.strip_prefix("data:") {
                data_lines.push(rest.trim_start().to_string());
            } else if let Some(rest) = line.strip_prefix(':') {
                comment = Some(rest.trim_start().to_string());
            }
        }

        if let Some(name) = name {
            Some(TestFrame::Event {
                name,
                data: data_lines.join("\n"),
            })
        } else if !data_lines.is_empty() {
            // Unnamed events default to "message" per the SSE wire format
            Some(TestFrame::Event {
                name: "message".to_string(),
                data: data_lines.join("\n"),
            })
        } else {
            Some(TestFrame::Comment(comment.unwrap_or_default()))
        }
    }
}
