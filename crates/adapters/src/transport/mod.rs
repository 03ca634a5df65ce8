// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Transports delivering upload requests

mod http;
mod noop;

pub use http::HttpTransport;
pub use noop::NoOpTransport;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeTransport;

use crate::request::Request;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Errors from a transport attempt that produced no response
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connection(String),
    #[error("request timed out")]
    Timeout,
    #[error("transport task failed: {0}")]
    Task(String),
}

/// Response of a single attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportResponse {
    pub status_code: u16,
}

impl TransportResponse {
    pub fn new(status_code: u16) -> Self {
        Self { status_code }
    }
}

/// Delivers a request once; retries are the caller's business
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn send(&self, request: Request) -> Result<TransportResponse, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn send(&self, request: Request) -> Result<TransportResponse, TransportError> {
        (**self).send(request).await
    }
}
