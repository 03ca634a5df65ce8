// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Request building

mod format;

pub use format::FormatRequestBuilder;

use crate::context::UploadContext;
use spool_core::Event;
use thiserror::Error;

/// Header carrying the generated request id
pub const REQUEST_ID_HEADER: &str = "X-Request-Id";

/// Errors from request builders
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("no events to upload")]
    EmptyBatch,
    #[error("missing client token")]
    MissingClientToken,
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),
    #[error("{0}")]
    Other(String),
}

/// A fully-formed upload request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    /// Echoed in upload status descriptions
    pub request_id: Option<String>,
}

impl Request {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Turns the events of a batch into a request
pub trait RequestBuilder: Send + Sync + 'static {
    fn build(&self, events: &[Event], context: &UploadContext) -> Result<Request, BuildError>;
}
