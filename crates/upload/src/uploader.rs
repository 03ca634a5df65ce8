// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Uploader: batch events in, classified status out

use crate::status::UploadStatus;
use async_trait::async_trait;
use spool_adapters::{ContextProvider, RequestBuilder, Transport};
use spool_core::Event;
use std::sync::Arc;

/// Uploads the events of one batch in a single attempt
#[async_trait]
pub trait Uploader: Send + Sync + 'static {
    async fn upload(&self, events: &[Event]) -> UploadStatus;
}

/// Builds a request with the current context and sends it once
pub struct DataUploader<B, T> {
    builder: B,
    transport: T,
    context: Arc<dyn ContextProvider>,
}

impl<B, T> DataUploader<B, T> {
    pub fn new(builder: B, transport: T, context: Arc<dyn ContextProvider>) -> Self {
        Self {
            builder,
            transport,
            context,
        }
    }
}

#[async_trait]
impl<B: RequestBuilder, T: Transport> Uploader for DataUploader<B, T> {
    async fn upload(&self, events: &[Event]) -> UploadStatus {
        let context = self.context.context();
        let request = match self.builder.build(events, &context) {
            Ok(request) => request,
            Err(e) => return UploadStatus::from_build_error(&e),
        };

        let request_id = request.request_id.clone();
        match self.transport.send(request).await {
            Ok(response) => UploadStatus::from_response(response, request_id.as_deref()),
            Err(e) => UploadStatus::from_transport_error(&e),
        }
    }
}

#[cfg(test)]
#[path = "uploader_tests.rs"]
mod tests;
