//! Incremental decoder for `text/event-stream` bodies.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{Result, ShilpError};

/// One dispatched server-sent event, before its payload is interpreted.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SseMessage {
    pub event: Option<String>,
    pub id: Option<String>,
    pub data: String,
}

/// Splits a byte stream into events. Chunks may cut lines and events anywhere.
///
/// Lines end with `\n`, `\r\n` or a lone `\r`.
#[derive(Debug, Default)]
pub struct SseDecoder {
    pending: Vec<u8>,
    // the previous line ended with `\r`; a leading `\n` belongs to it
    after_cr: bool,
    data: Vec<String>,
    event: Option<String>,
    id: Option<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the next chunk; returns every event completed by it.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseMessage> {
        let mut out = Vec::new();
        for &byte in chunk {
            if std::mem::take(&mut self.after_cr) && byte == b'\n' {
                continue;
            }
            if byte != b'\n' && byte != b'\r' {
                self.pending.push(byte);
                continue;
            }
            self.after_cr = byte == b'\r';
            let line = std::mem::take(&mut self.pending);
            let line = String::from_utf8_lossy(&line);
            if let Some(msg) = self.process_line(&line) {
                out.push(msg);
            }
        }
        out
    }

    fn process_line(&mut self, line: &str) -> Option<SseMessage> {
        if line.is_empty() {
            return self.dispatch();
        }
        // comment / keep-alive
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((f, v)) => (f, v.strip_prefix(' ').unwrap_or(v)),
            None => (line, ""),
        };
        match field {
            "data" => self.data.push(value.to_string()),
            "event" => self.event = Some(value.to_string()),
            "id" => self.id = Some(value.to_string()),
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseMessage> {
        let event = self.event.take();
        if self.data.is_empty() {
            return None;
        }
        let data = std::mem::take(&mut self.data).join("\n");
        Some(SseMessage {
            event,
            id: self.id.clone(),
            data,
        })
    }
}

/// Ingestion statistics pushed by the server, decoded from the event's JSON payload.
#[derive(Clone, Debug, PartialEq)]
pub struct IngestStatsEvent {
    pub event: Option<String>,
    pub id: Option<String>,
    pub data: Value,
}

impl IngestStatsEvent {
    pub(crate) fn from_message(msg: SseMessage) -> Result<Self> {
        let data = serde_json::from_str(&msg.data).map_err(|e| {
            ShilpError::Decode(format!("event payload is not valid json: {e}"))
        })?;
        Ok(Self {
            event: msg.event,
            id: msg.id,
            data,
        })
    }

    /// Interpret the payload as a caller-defined structure.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        T::deserialize(&self.data).map_err(|e| ShilpError::Decode(e.to_string()))
    }
}
