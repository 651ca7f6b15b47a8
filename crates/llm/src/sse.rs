//! Incremental decoding of the Messages API server-sent event stream
//!
//! Network chunks do not respect event (or UTF-8) boundaries, so bytes are
//! buffered until a blank line closes an event.

use serde::Deserialize;

/// One decoded stream payload that matters to the caller
#[derive(Debug, PartialEq)]
pub(crate) enum StreamItem {
    Delta(String),
    Stop,
    Error(String),
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum StreamPayload {
    ContentBlockDelta {
        delta: BlockDelta,
    },
    MessageStop,
    Error {
        error: StreamApiError,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum BlockDelta {
    TextDelta {
        text: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct StreamApiError {
    #[serde(rename = "type")]
    error_type: String,
    message: String,
}

#[derive(Debug, Default)]
pub(crate) struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes; returns items for every event completed by this chunk
    pub(crate) fn push(&mut self, chunk: &[u8]) -> Vec<StreamItem> {
        self.buffer
            .extend(chunk.iter().copied().filter(|b| *b != b'\r'));

        let mut items = Vec::new();
        while let Some(end) = find_event_end(&self.buffer) {
            let raw: Vec<u8> = self.buffer.drain(..end + 2).collect();
            let text = String::from_utf8_lossy(&raw[..end]);
            if let Some(item) = parse_event(&text) {
                items.push(item);
            }
        }
        items
    }
}

fn find_event_end(buffer: &[u8]) -> Option<usize> {
    buffer.windows(2).position(|w| w == b"\n\n")
}

fn parse_event(text: &str) -> Option<StreamItem> {
    let data: Vec<&str> = text
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(str::trim_start)
        .collect();
    if data.is_empty() {
        return None;
    }

    let payload: StreamPayload = match serde_json::from_str(&data.join("\n")) {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!(error = %e, "Skipping undecodable stream event");
            return None;
        }
    };

    match payload {
        StreamPayload::ContentBlockDelta {
            delta: BlockDelta::TextDelta { text },
        } if !text.is_empty() => Some(StreamItem::Delta(text)),
        StreamPayload::MessageStop => Some(StreamItem::Stop),
        StreamPayload::Error { error } => Some(StreamItem::Error(format!(
            "{}: {}",
            error.error_type, error.message
        ))),
        _ => None,
    }
}
