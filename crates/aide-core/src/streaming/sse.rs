//! Incremental decoder for `text/event-stream` bodies.
//!
//! Bytes are buffered until a blank line closes a frame, so frames (and UTF-8
//! sequences inside them) may be split across any number of network reads.

use serde_json::Value;

pub const DONE_SENTINEL: &str = "[DONE]";

#[derive(Debug, Clone, PartialEq)]
pub enum SseFrame {
    /// The joined `data:` payload of one event.
    Data(String),
    Done,
}

/// Longest frame delimiter, `\r\n\r\n`.
const MAX_DELIMITER_LEN: usize = 4;

#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    /// Bytes of `buffer` already searched without finding a delimiter.
    scanned: usize,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return every frame it completed, in order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buffer.extend_from_slice(chunk);

        let mut frames = Vec::new();
        while let Some((end, delimiter_len)) = find_frame_end(&self.buffer, self.scanned) {
            let raw: Vec<u8> = self.buffer.drain(..end + delimiter_len).take(end).collect();
            self.scanned = 0;
            if let Some(frame) = parse_frame(&String::from_utf8_lossy(&raw)) {
                frames.push(frame);
            }
        }
        // a delimiter may straddle the next read
        self.scanned = self.buffer.len().saturating_sub(MAX_DELIMITER_LEN - 1);
        frames
    }

    /// Flush a trailing frame that was not followed by a blank line.
    pub fn finish(&mut self) -> Option<SseFrame> {
        if self.buffer.is_empty() {
            return None;
        }
        let raw = std::mem::take(&mut self.buffer);
        self.scanned = 0;
        parse_frame(&String::from_utf8_lossy(&raw))
    }

    pub fn pending_bytes(&self) -> usize {
        self.buffer.len()
    }
}

/// Earliest blank line at or after `from`, as (frame length, delimiter length).
fn find_frame_end(buffer: &[u8], from: usize) -> Option<(usize, usize)> {
    let tail = buffer.get(from..)?;
    let lf = tail.windows(2).position(|w| w == b"\n\n").map(|i| (from + i, 2));
    let crlf = tail
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .map(|i| (from + i, 4));
    match (lf, crlf) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (a, b) => a.or(b),
    }
}

fn parse_frame(raw: &str) -> Option<SseFrame> {
    let mut data_lines = Vec::new();
    for line in raw.lines() {
        let line = line.trim_end_matches('\r');
        if let Some(data) = line.strip_prefix("data:") {
            data_lines.push(data.strip_prefix(' ').unwrap_or(data));
        }
        // comments (":") and event/id/retry fields carry nothing we use
    }

    if data_lines.is_empty() {
        return None;
    }

    let data = data_lines.join("\n");
    if data.trim() == DONE_SENTINEL {
        Some(SseFrame::Done)
    } else {
        Some(SseFrame::Data(data))
    }
}

/// Text delta of one chat-completion chunk: `choices[0].delta.content`.
///
/// `Ok(None)` for chunks without content (role announcements, finish
/// reasons); `Err` when the payload is not JSON.
pub fn extract_delta(payload: &str) -> Result<Option<String>, serde_json::Error> {
    let value: Value = serde_json::from_str(payload)?;
    Ok(value
        .pointer("/choices/0/delta/content")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string))
}
