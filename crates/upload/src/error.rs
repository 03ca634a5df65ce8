// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the upload pipeline

use spool_storage::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("feature already registered: {0}")]
    DuplicateFeature(String),
    #[error("no tokio runtime to run the upload worker for {feature}: {message}")]
    NoRuntime { feature: String, message: String },
    #[error("upload worker for {feature} failed: {message}")]
    Join { feature: String, message: String },
}
