// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake transport for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{Transport, TransportError, TransportResponse};
use crate::request::Request;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Scripted outcome of one send
enum Outcome {
    Status(u16),
    Error(String),
}

/// Fake transport replaying scripted outcomes
///
/// Once the script runs out every request gets `202 Accepted`.
#[derive(Clone, Default)]
pub struct FakeTransport {
    script: Arc<Mutex<VecDeque<Outcome>>>,
    requests: Arc<Mutex<Vec<Request>>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer the next request with `status_code`
    pub fn push_status(&self, status_code: u16) -> &Self {
        self.push(Outcome::Status(status_code))
    }

    /// Fail the next request with a connection error
    pub fn push_error(&self, message: &str) -> &Self {
        self.push(Outcome::Error(message.to_string()))
    }

    fn push(&self, outcome: Outcome) -> &Self {
        self.script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(outcome);
        self
    }

    /// Get all sent requests
    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn send(&self, request: Request) -> Result<TransportResponse, TransportError> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request);

        let outcome = self
            .script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();
        match outcome {
            Some(Outcome::Status(code)) => Ok(TransportResponse::new(code)),
            Some(Outcome::Error(message)) => Err(TransportError::Connection(message)),
            None => Ok(TransportResponse::new(202)),
        }
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
