// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Optional at-rest encryption of event payloads
//!
//! When configured, payloads are encrypted right before they are framed into
//! a batch file and decrypted when the batch is read back. Metadata is stored
//! as given.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EncryptionError {
    #[error("encryption failed: {0}")]
    Encrypt(String),
    #[error("decryption failed: {0}")]
    Decrypt(String),
}

/// Host-provided cipher for event payloads
pub trait DataEncryption: Send + Sync + 'static {
    fn encrypt(&self, data: &[u8]) -> Result<Vec<u8>, EncryptionError>;
    fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>, EncryptionError>;
}
