// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for batch storage

use crate::block::BlockError;
use spool_core::EncryptionError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("write rejected: {size} bytes exceeds the maximum object size of {max} bytes")]
    WriteRejected { size: u64, max: u64 },
    #[error("corrupt batch: {0}")]
    Block(#[from] BlockError),
    #[error("{0}")]
    Encryption(#[from] EncryptionError),
    #[error("no free file name after {0} attempts")]
    NameExhausted(u32),
    #[error("storage queue for {0} is closed")]
    QueueClosed(String),
}
