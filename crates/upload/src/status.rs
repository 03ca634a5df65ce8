// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Classification of upload attempts

use spool_adapters::{BuildError, TransportError, TransportResponse};
use spool_core::DeletionReason;

/// What to do with a batch after an attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadOutcome {
    /// Delivered; delete as uploaded
    Success,
    /// Transient failure; keep the batch for a later attempt
    Retryable,
    /// The batch will never be accepted; delete as invalid
    NonRetryable,
}

/// Classified result of one upload attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadStatus {
    pub outcome: UploadOutcome,
    pub response_code: Option<u16>,
    /// `[response code: 503 (service unavailable), request ID: abc]` or
    /// `[error: message]`
    pub debug_description: String,
    /// Actionable message for the host application's developer
    pub user_error_message: Option<String>,
    /// Condition worth reporting to internal monitoring
    pub monitoring_error_message: Option<String>,
}

const UNKNOWN_REQUEST_ID: &str = "(???)";

impl UploadStatus {
    pub fn from_response(response: TransportResponse, request_id: Option<&str>) -> Self {
        let code = response.status_code;
        let outcome = match code {
            200..=299 => UploadOutcome::Success,
            408 | 429 | 500..=599 => UploadOutcome::Retryable,
            _ => UploadOutcome::NonRetryable,
        };

        Self {
            outcome,
            response_code: Some(code),
            debug_description: format!(
                "[response code: {code} ({}), request ID: {}]",
                status_name(code),
                request_id.unwrap_or(UNKNOWN_REQUEST_ID)
            ),
            user_error_message: (code == 401)
                .then(|| "The client token you provided seems to be invalid.".to_string()),
            monitoring_error_message: matches!(code, 400 | 408 | 413 | 429)
                .then(|| format!("Data upload finished with status code: {code}")),
        }
    }

    /// No response at all; always worth another try
    pub fn from_transport_error(error: &TransportError) -> Self {
        Self::from_error(UploadOutcome::Retryable, &error.to_string())
    }

    /// The request could not be built, so it never will be
    pub fn from_build_error(error: &BuildError) -> Self {
        Self::from_error(UploadOutcome::NonRetryable, &error.to_string())
    }

    fn from_error(outcome: UploadOutcome, message: &str) -> Self {
        Self {
            outcome,
            response_code: None,
            debug_description: format!("[error: {message}]"),
            user_error_message: None,
            monitoring_error_message: None,
        }
    }

    pub fn needs_retry(&self) -> bool {
        self.outcome == UploadOutcome::Retryable
    }

    /// Why the batch gets deleted, or `None` when it must be kept
    pub fn deletion_reason(&self) -> Option<DeletionReason> {
        match self.outcome {
            UploadOutcome::Success => Some(DeletionReason::Uploaded),
            UploadOutcome::NonRetryable => Some(DeletionReason::Invalid),
            UploadOutcome::Retryable => None,
        }
    }
}

fn status_name(code: u16) -> &'static str {
    match code {
        100 => "continue",
        200 => "ok",
        201 => "created",
        202 => "accepted",
        204 => "no content",
        301 => "moved permanently",
        302 => "found",
        304 => "not modified",
        400 => "bad request",
        401 => "unauthorized",
        403 => "forbidden",
        404 => "not found",
        408 => "request timeout",
        413 => "payload too large",
        429 => "too many requests",
        500 => "internal server error",
        502 => "bad gateway",
        503 => "service unavailable",
        504 => "gateway timeout",
        507 => "insufficient storage",
        _ => "unexpected",
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
