// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Events and the per-feature upload payload format

/// An already-encoded event as handed over by a producer
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Event {
    /// Encoded payload, opaque to the pipeline
    pub data: Vec<u8>,
    /// Optional producer-defined metadata persisted alongside the payload
    pub metadata: Option<Vec<u8>>,
}

impl Event {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: data.into(),
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: impl Into<Vec<u8>>) -> Self {
        self.metadata = Some(metadata.into());
        self
    }
}

impl From<Vec<u8>> for Event {
    fn from(data: Vec<u8>) -> Self {
        Event::new(data)
    }
}

impl From<&[u8]> for Event {
    fn from(data: &[u8]) -> Self {
        Event::new(data)
    }
}

impl From<&str> for Event {
    fn from(data: &str) -> Self {
        Event::new(data.as_bytes())
    }
}

/// Byte tokens joining a batch of events into one upload payload
///
/// The payload is `prefix + e1 + separator + e2 + ... + suffix`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataFormat {
    pub prefix: Vec<u8>,
    pub suffix: Vec<u8>,
    pub separator: Vec<u8>,
}

impl DataFormat {
    pub fn new(
        prefix: impl Into<Vec<u8>>,
        suffix: impl Into<Vec<u8>>,
        separator: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            prefix: prefix.into(),
            suffix: suffix.into(),
            separator: separator.into(),
        }
    }

    /// `[e1,e2,...]`
    pub fn json_array() -> Self {
        Self::new("[", "]", ",")
    }

    /// One event per line
    pub fn newline_delimited() -> Self {
        Self::new("", "", "\n")
    }

    /// Join event payloads into a single body
    pub fn format(&self, events: &[Event]) -> Vec<u8> {
        let payload_len: usize = events.iter().map(|e| e.data.len()).sum();
        let mut body = Vec::with_capacity(
            self.prefix.len()
                + payload_len
                + self.separator.len() * events.len().saturating_sub(1)
                + self.suffix.len(),
        );
        body.extend_from_slice(&self.prefix);
        for (index, event) in events.iter().enumerate() {
            if index > 0 {
                body.extend_from_slice(&self.separator);
            }
            body.extend_from_slice(&event.data);
        }
        body.extend_from_slice(&self.suffix);
        body
    }
}

impl Default for DataFormat {
    fn default() -> Self {
        Self::json_array()
    }
}
