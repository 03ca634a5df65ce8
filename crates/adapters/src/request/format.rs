// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Request builder joining events with a data format

use super::{BuildError, Request, RequestBuilder, REQUEST_ID_HEADER};
use crate::context::UploadContext;
use spool_core::{DataFormat, Event};
use uuid::Uuid;

/// POSTs `prefix + e1 + separator + e2 + ... + suffix` to a fixed endpoint
#[derive(Debug, Clone)]
pub struct FormatRequestBuilder {
    url: String,
    format: DataFormat,
    content_type: String,
}

impl FormatRequestBuilder {
    /// JSON content type; use `with_content_type` for other formats
    pub fn new(url: impl Into<String>, format: DataFormat) -> Self {
        Self {
            url: url.into(),
            format,
            content_type: "application/json".to_string(),
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }
}

impl RequestBuilder for FormatRequestBuilder {
    fn build(&self, events: &[Event], context: &UploadContext) -> Result<Request, BuildError> {
        if events.is_empty() {
            return Err(BuildError::EmptyBatch);
        }
        if context.client_token.is_empty() {
            return Err(BuildError::MissingClientToken);
        }
        if !(self.url.starts_with("https://") || self.url.starts_with("http://")) {
            return Err(BuildError::InvalidEndpoint(self.url.clone()));
        }

        let request_id = Uuid::new_v4().to_string();
        let mut headers = vec![
            ("Content-Type".to_string(), self.content_type.clone()),
            (
                "User-Agent".to_string(),
                format!("{}/{}", context.source, context.sdk_version),
            ),
            ("X-Client-Token".to_string(), context.client_token.clone()),
            ("X-Source".to_string(), context.source.clone()),
            (REQUEST_ID_HEADER.to_string(), request_id.clone()),
        ];

        let tags: Vec<String> = [
            ("service", &context.service),
            ("env", &context.env),
            ("version", &context.app_version),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.as_ref().map(|v| format!("{key}:{v}")))
        .collect();
        if !tags.is_empty() {
            headers.push(("X-Tags".to_string(), tags.join(",")));
        }

        Ok(Request {
            url: self.url.clone(),
            headers,
            body: self.format.format(events),
            request_id: Some(request_id),
        })
    }
}

#[cfg(test)]
#[path = "format_tests.rs"]
mod tests;
