// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Block framing for event records inside a batch file
//!
//! Each record is stored as one or two blocks:
//!
//! ```text
//! ┌──────┬────────────┬────────────┬──────────────┐
//! │ type │ length u32 │ crc32  u32 │ length bytes │
//! │  u8  │     LE     │     LE     │              │
//! └──────┴────────────┴────────────┴──────────────┘
//! ```
//!
//! An `event` block carries the payload; an optional `metadata` block
//! directly following it belongs to the same event. Length prefixes make
//! splitting lossless whatever the payload contains, and the checksum
//! detects torn or bit-flipped writes. Everything before a torn tail is
//! still readable.

use spool_core::Event;
use std::io::{self, Read};
use thiserror::Error;

const HEADER_LEN: usize = 9;

/// Upper bound on a single block; anything larger is treated as corruption
pub const MAX_BLOCK_LEN: u32 = 64 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum BlockError {
    #[error("truncated block at offset {offset}")]
    Truncated { offset: u64 },
    #[error("checksum mismatch at offset {offset}")]
    ChecksumMismatch { offset: u64 },
    #[error("unknown block type {kind:#04x} at offset {offset}")]
    UnknownType { kind: u8, offset: u64 },
    #[error("block of {len} bytes at offset {offset} exceeds limit")]
    TooLarge { len: u32, offset: u64 },
    #[error("metadata block without event at offset {offset}")]
    OrphanMetadata { offset: u64 },
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BlockType {
    Event = 0x01,
    Metadata = 0x02,
}

impl BlockType {
    fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(BlockType::Event),
            0x02 => Some(BlockType::Metadata),
            _ => None,
        }
    }
}

fn push_block(out: &mut Vec<u8>, kind: BlockType, data: &[u8]) {
    out.push(kind as u8);
    out.extend_from_slice(&(data.len() as u32).to_le_bytes());
    out.extend_from_slice(&crc32fast::hash(data).to_le_bytes());
    out.extend_from_slice(data);
}

/// Encode one event into its on-disk record
pub fn encode_event(event: &Event) -> Vec<u8> {
    let mut out = Vec::with_capacity(encoded_len(event));
    push_block(&mut out, BlockType::Event, &event.data);
    if let Some(metadata) = &event.metadata {
        push_block(&mut out, BlockType::Metadata, metadata);
    }
    out
}

/// Size of the record `encode_event` would produce
pub fn encoded_len(event: &Event) -> usize {
    HEADER_LEN
        + event.data.len()
        + event
            .metadata
            .as_ref()
            .map(|m| HEADER_LEN + m.len())
            .unwrap_or(0)
}

/// Streaming reader splitting a batch file back into blocks
pub struct BlockReader<R> {
    inner: R,
    offset: u64,
}

impl<R: Read> BlockReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, offset: 0 }
    }

    /// Read the next block, or `None` at a clean end of stream
    pub fn next_block(&mut self) -> Result<Option<(BlockType, Vec<u8>)>, BlockError> {
        let start = self.offset;
        let mut header = [0u8; HEADER_LEN];
        match read_full(&mut self.inner, &mut header)? {
            0 => return Ok(None),
            n if n < HEADER_LEN => return Err(BlockError::Truncated { offset: start }),
            _ => {}
        }

        let kind = BlockType::from_byte(header[0]).ok_or(BlockError::UnknownType {
            kind: header[0],
            offset: start,
        })?;
        let len = u32::from_le_bytes([header[1], header[2], header[3], header[4]]);
        let checksum = u32::from_le_bytes([header[5], header[6], header[7], header[8]]);
        if len > MAX_BLOCK_LEN {
            return Err(BlockError::TooLarge { len, offset: start });
        }

        let mut data = vec![0u8; len as usize];
        if read_full(&mut self.inner, &mut data)? < data.len() {
            return Err(BlockError::Truncated { offset: start });
        }
        if crc32fast::hash(&data) != checksum {
            return Err(BlockError::ChecksumMismatch { offset: start });
        }

        self.offset += (HEADER_LEN + data.len()) as u64;
        Ok(Some((kind, data)))
    }

    /// Read every event in the stream, in append order
    ///
    /// Decoding stops at the first framing error; the events before it are
    /// kept and the error is returned as the tail. Only I/O errors fail the
    /// whole read.
    pub fn read_events(mut self) -> Result<DecodedEvents, BlockError> {
        let mut events: Vec<Event> = Vec::new();
        loop {
            let offset = self.offset;
            let (kind, data) = match self.next_block() {
                Ok(Some(block)) => block,
                Ok(None) => return Ok(DecodedEvents { events, tail: None }),
                Err(BlockError::Io(e)) => return Err(BlockError::Io(e)),
                Err(e) => {
                    return Ok(DecodedEvents {
                        events,
                        tail: Some(e),
                    })
                }
            };
            match kind {
                BlockType::Event => events.push(Event::new(data)),
                BlockType::Metadata => match events.last_mut() {
                    Some(event) if event.metadata.is_none() => event.metadata = Some(data),
                    _ => {
                        return Ok(DecodedEvents {
                            events,
                            tail: Some(BlockError::OrphanMetadata { offset }),
                        })
                    }
                },
            }
        }
    }
}

/// Events decoded from one batch file
#[derive(Debug)]
pub struct DecodedEvents {
    /// Complete events, in append order
    pub events: Vec<Event>,
    /// Framing error that ended decoding early, typically an append torn by
    /// a crash
    pub tail: Option<BlockError>,
}

/// Fill `buf` as far as the stream allows; returns bytes read
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
#[path = "block_tests.rs"]
mod tests;
