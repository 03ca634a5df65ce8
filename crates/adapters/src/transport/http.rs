// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP transport

use super::{Transport, TransportError, TransportResponse};
use crate::request::Request;
use async_trait::async_trait;
use std::time::Duration;

/// POSTs requests with a blocking `ureq` agent on the blocking pool
///
/// Non-2xx statuses are responses, not errors; only a failure to get a
/// response at all is a `TransportError`.
#[derive(Clone)]
pub struct HttpTransport {
    agent: ureq::Agent,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(timeout))
            .build();
        Self {
            agent: ureq::Agent::new_with_config(config),
        }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new(Duration::from_secs(60))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: Request) -> Result<TransportResponse, TransportError> {
        let agent = self.agent.clone();
        let result = tokio::task::spawn_blocking(move || {
            let mut builder = agent.post(request.url.as_str());
            for (name, value) in &request.headers {
                builder = builder.header(name.as_str(), value.as_str());
            }
            builder.send(&request.body[..])
        })
        .await
        .map_err(|e| TransportError::Task(e.to_string()))?;

        match result {
            Ok(response) => Ok(TransportResponse::new(response.status().as_u16())),
            Err(ureq::Error::Timeout(_)) => Err(TransportError::Timeout),
            Err(e) => Err(TransportError::Connection(e.to_string())),
        }
    }
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
