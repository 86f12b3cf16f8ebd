//! Content sniffing of PUBLISH payloads for log output.

use log::{debug, info, log_enabled, Level};

const HEX_PREVIEW_BYTES: usize = 32;
const TEXT_PREVIEW_CHARS: usize = 200;
const PRINTABLE_RATIO: f64 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    /// Opaque binary data
    Bytes,
    /// Mostly printable UTF-8
    Text,
    /// A JSON object or array
    Structured,
}

impl PayloadKind {
    pub const fn tag(self) -> &'static str {
        match self {
            PayloadKind::Bytes => "BYTES",
            PayloadKind::Text => "TEXT",
            PayloadKind::Structured => "JSON",
        }
    }
}

pub fn classify(payload: &[u8]) -> PayloadKind {
    if payload.is_empty() {
        return PayloadKind::Bytes;
    }
    if is_json(payload) {
        return PayloadKind::Structured;
    }
    match core::str::from_utf8(payload) {
        Ok(text) if is_mostly_printable(text) => PayloadKind::Text,
        _ => PayloadKind::Bytes,
    }
}

fn is_json(payload: &[u8]) -> bool {
    if payload.len() < 2 {
        return false;
    }
    let Some(first) = payload.iter().find(|b| !b.is_ascii_whitespace()) else {
        return false;
    };
    if !matches!(first, b'{' | b'[') {
        return false;
    }
    serde_json::from_slice::<serde_json::Value>(payload).is_ok()
}

fn is_mostly_printable(text: &str) -> bool {
    let mut total = 0usize;
    let mut printable = 0usize;
    for c in text.chars() {
        total += 1;
        if !c.is_control() || matches!(c, '\n' | '\r' | '\t') {
            printable += 1;
        }
    }
    total > 0 && printable as f64 / total as f64 > PRINTABLE_RATIO
}

/// Space separated upper-case hex of the first bytes, e.g. `[0A 1B ...]`
pub fn hex_preview(payload: &[u8]) -> String {
    let shown: Vec<String> = payload
        .iter()
        .take(HEX_PREVIEW_BYTES)
        .map(|b| format!("{:02X}", b))
        .collect();
    if payload.len() > HEX_PREVIEW_BYTES {
        format!("[{} ...]", shown.join(" "))
    } else {
        format!("[{}]", shown.join(" "))
    }
}

pub fn text_preview(text: &str) -> String {
    match text.char_indices().nth(TEXT_PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

/// Log one accepted PUBLISH according to its payload kind
pub fn log_publish(topic: &str, payload: &[u8], from: &str) {
    let kind = classify(payload);
    match kind {
        PayloadKind::Bytes => {
            info!(
                "[{}] topic='{}' size={} from={}",
                kind.tag(),
                topic,
                payload.len(),
                from
            );
            debug!("[{}] preview {}", kind.tag(), hex_preview(payload));
        }
        PayloadKind::Text => {
            let text = String::from_utf8_lossy(payload);
            info!(
                "[{}] topic='{}' from={} message={}",
                kind.tag(),
                topic,
                from,
                text_preview(&text)
            );
        }
        PayloadKind::Structured => {
            let text = String::from_utf8_lossy(payload);
            info!(
                "[{}] topic='{}' from={} message={}",
                kind.tag(),
                topic,
                from,
                text_preview(text.trim())
            );
            if log_enabled!(Level::Debug) {
                if let Ok(value) = serde_json::from_slice::<serde_json::Value>(payload) {
                    if let Ok(pretty) = serde_json::to_string_pretty(&value) {
                        debug!("[{}] document:\n{}", kind.tag(), pretty);
                    }
                }
            }
        }
    }
}
