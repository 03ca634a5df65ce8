// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced adapter wrappers for consistent observability

use crate::request::Request;
use crate::transport::{Transport, TransportError, TransportResponse};
use async_trait::async_trait;

/// Wrapper that adds tracing to any Transport
#[derive(Clone)]
pub struct TracedTransport<T> {
    inner: T,
}

impl<T> TracedTransport<T> {
    pub fn new(inner: T) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<T: Transport> Transport for TracedTransport<T> {
    async fn send(&self, request: Request) -> Result<TransportResponse, TransportError> {
        let span = tracing::info_span!(
            "transport.send",
            url = %request.url,
            request_id = request.request_id.as_deref().unwrap_or("-"),
        );
        let _guard = span.enter();

        tracing::debug!(bytes = request.body.len(), "sending");

        let start = std::time::Instant::now();
        let result = self.inner.send(request).await;
        let elapsed = start.elapsed();

        match &result {
            Ok(response) => tracing::info!(
                status = response.status_code,
                elapsed_ms = elapsed.as_millis() as u64,
                "response received"
            ),
            Err(e) => tracing::warn!(
                elapsed_ms = elapsed.as_millis() as u64,
                error = %e,
                "send failed"
            ),
        }

        result
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
