//! Incremental `text/event-stream` decoder
//!
//! Accumulates raw transport chunks and yields complete frames. Field
//! handling follows the SSE wire format: `event:` names the next dispatch,
//! `data:` lines accumulate (joined with newlines), a line starting with `:`
//! is a comment, and a blank line dispatches the accumulated event. `id:` and
//! `retry:` fields are ignored. CRLF line endings are tolerated.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireFrame {
    /// A named event with its payload
    Event { name: String, data: String },
    /// A comment line (keep-alive ping)
    Comment(String),
}

/// Streaming decoder; one instance per connection
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    event_name: Option<String>,
    data_lines: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a transport chunk, returning every frame completed by it.
    ///
    /// Chunks may split lines (and even UTF-8 sequences) arbitrarily; bytes
    /// are only interpreted once a full line is available.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<WireFrame> {
        self.buffer.extend_from_slice(chunk);

        let mut frames = Vec::new();
        while let Some(newline) = self.buffer.iter().position(|&b| b == b'\n') {
            let mut line_bytes: Vec<u8> = self.buffer.drain(..=newline).collect();
            line_bytes.pop(); // the newline itself
            if line_bytes.last() == Some(&b'\r') {
                line_bytes.pop();
            }
            let line = String::from_utf8_lossy(&line_bytes).into_owned();

            if let Some(frame) = self.process_line(&line) {
                frames.push(frame);
            }
        }
        frames
    }

    fn process_line(&mut self, line: &str) -> Option<WireFrame> {
        if line.is_empty() {
            return self.dispatch();
        }
        if let Some(comment) = line.strip_prefix(':') {
            return Some(WireFrame::Comment(comment.trim_start().to_string()));
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            // A field name with no colon has an empty value
            None => (line, ""),
        };
        match field {
            "event" => self.event_name = Some(value.to_string()),
            "data" => self.data_lines.push(value.to_string()),
            // id/retry are EventSource bookkeeping this client does not use
            _ => {}
        }
        None
    }

    /// Emit the accumulated event, if any, and reset for the next block
    fn dispatch(&mut self) -> Option<WireFrame> {
        if self.event_name.is_none() && self.data_lines.is_empty() {
            return None;
        }
        // Unnamed events default to "message" per the SSE wire format
        let name = self
            .event_name
            .take()
            .unwrap_or_else(|| "message".to_string());
        let data = std::mem::take(&mut self.data_lines).join("\n");
        Some(WireFrame::Event { name, data })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_a_named_event() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.feed(b"event: bid_pending\ndata: {\"txHash\":\"0x1\"}\n\n");
        assert_eq!(
            frames,
            vec![WireFrame::Event {
                name: "bid_pending".to_string(),
                data: r#"{"txHash":"0x1"}"#.to_string(),
            }]
        );
    }

    #[test]
    fn decodes_comment_lines_immediately() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.feed(b": ping 1700000000000\n\n");
        assert_eq!(
            frames,
            vec![WireFrame::Comment("ping 1700000000000".to_string())]
        );
    }

    #[test]
    fn joins_multi_line_data_with_newlines() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.feed(b"event: note\ndata: first\ndata: second\n\n");
        assert_eq!(
            frames,
            vec![WireFrame::Event {
                name: "note".to_string(),
                data: "first\nsecond".to_string(),
            }]
        );
    }

    #[test]
    fn reassembles_frames_split_across_chunks() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b"event: bid_pe").is_empty());
        assert!(decoder.feed(b"nding\ndata: {}").is_empty());
        let frames = decoder.feed(b"\n\n");
        assert_eq!(
            frames,
            vec![WireFrame::Event {
                name: "bid_pending".to_string(),
                data: "{}".to_string(),
            }]
        );
    }

    #[test]
    fn tolerates_crlf_line_endings() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.feed(b"event: ready\r\ndata: {\"ok\":true}\r\n\r\n");
        assert_eq!(
            frames,
            vec![WireFrame::Event {
                name: "ready".to_string(),
                data: r#"{"ok":true}"#.to_string(),
            }]
        );
    }

    #[test]
    fn event_name_resets_between_frames() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.feed(b"event: ready\ndata: {}\n\ndata: later\n\n");
        assert_eq!(frames.len(), 2);
        assert_eq!(
            frames[1],
            WireFrame::Event {
                name: "message".to_string(),
                data: "later".to_string(),
            }
        );
    }

    #[test]
    fn ignores_id_and_retry_fields() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.feed(b"id: 7\nretry: 500\nevent: ready\ndata: {}\n\n");
        assert_eq!(
            frames,
            vec![WireFrame::Event {
                name: "ready".to_string(),
                data: "{}".to_string(),
            }]
        );
    }

    #[test]
    fn blank_line_without_accumulated_event_emits_nothing() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b"\n\n\n").is_empty());
    }
}
