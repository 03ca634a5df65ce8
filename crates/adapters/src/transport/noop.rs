// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! No-op transport for when uploads are disabled.

use super::{Transport, TransportError, TransportResponse};
use crate::request::Request;
use async_trait::async_trait;

/// Transport that accepts everything without sending it.
///
/// Every request is answered with `202 Accepted`, so batches drain as if
/// they had been delivered.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpTransport;

impl NoOpTransport {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Transport for NoOpTransport {
    async fn send(&self, _request: Request) -> Result<TransportResponse, TransportError> {
        Ok(TransportResponse::new(202))
    }
}
