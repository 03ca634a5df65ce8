// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Telemetry sink for storage and upload observability
//!
//! Every batch deletion, batch rotation and swallowed I/O error is reported
//! here. Reports never influence control flow.

use crate::preset::format_duration;
use std::fmt;
use std::time::Duration;

/// Why a batch file was removed from disk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeletionReason {
    /// Upload finished with a terminal outcome the intake accepted
    Uploaded,
    /// Drained by a forced flush
    Flushed,
    /// Too old to upload, or evicted to keep the directory within budget
    Obsolete,
    /// Unreadable, corrupt, or permanently rejected by the intake
    Invalid,
    /// Purged because consent was not granted
    ConsentRevoked,
    /// Wiped on host request
    Cleared,
}

impl DeletionReason {
    pub fn as_str(self) -> &'static str {
        match self {
            DeletionReason::Uploaded => "uploaded",
            DeletionReason::Flushed => "flushed",
            DeletionReason::Obsolete => "obsolete",
            DeletionReason::Invalid => "invalid",
            DeletionReason::ConsentRevoked => "consent_revoked",
            DeletionReason::Cleared => "cleared",
        }
    }
}

impl fmt::Display for DeletionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TelemetryKind {
    BatchDeleted,
    BatchClosed,
    Error,
}

impl TelemetryKind {
    pub fn name(self) -> &'static str {
        match self {
            TelemetryKind::BatchDeleted => "batch_deleted",
            TelemetryKind::BatchClosed => "batch_closed",
            TelemetryKind::Error => "error",
        }
    }
}

/// One observability record
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryEvent {
    pub kind: TelemetryKind,
    /// Feature (event category) the record belongs to
    pub feature: String,
    pub reason: Option<DeletionReason>,
    pub file_count: u64,
    pub total_bytes: u64,
    /// Events in the batch, when known
    pub object_count: Option<u64>,
    /// Age range in which a closed batch waits before it is readable
    pub uploader_window: Option<Duration>,
    pub message: Option<String>,
}

impl TelemetryEvent {
    pub fn deleted(feature: &str, reason: DeletionReason, total_bytes: u64) -> Self {
        Self {
            kind: TelemetryKind::BatchDeleted,
            feature: feature.to_string(),
            reason: Some(reason),
            file_count: 1,
            total_bytes,
            object_count: None,
            uploader_window: None,
            message: None,
        }
    }

    pub fn closed(feature: &str, total_bytes: u64, object_count: u64, forced: bool) -> Self {
        Self {
            kind: TelemetryKind::BatchClosed,
            feature: feature.to_string(),
            reason: None,
            file_count: 1,
            total_bytes,
            object_count: Some(object_count),
            uploader_window: None,
            message: forced.then(|| "forced new batch".to_string()),
        }
    }

    pub fn error(feature: &str, message: impl Into<String>) -> Self {
        Self {
            kind: TelemetryKind::Error,
            feature: feature.to_string(),
            reason: None,
            file_count: 0,
            total_bytes: 0,
            object_count: None,
            uploader_window: None,
            message: Some(message.into()),
        }
    }

    pub fn with_reason(mut self, reason: DeletionReason) -> Self {
        self.reason = Some(reason);
        self
    }

    pub fn with_uploader_window(mut self, window: Duration) -> Self {
        self.uploader_window = Some(window);
        self
    }

    pub fn with_files(mut self, file_count: u64, total_bytes: u64) -> Self {
        self.file_count = file_count;
        self.total_bytes = total_bytes;
        self
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }
}

/// Receiver of observability records
pub trait Telemetry: Send + Sync + 'static {
    fn report(&self, event: TelemetryEvent);
}

/// Discards every record
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpTelemetry;

impl Telemetry for NoOpTelemetry {
    fn report(&self, _event: TelemetryEvent) {}
}

/// Forwards records to `tracing`
#[derive(Clone, Copy, Debug, Default)]
pub struct TracedTelemetry;

impl Telemetry for TracedTelemetry {
    fn report(&self, event: TelemetryEvent) {
        let reason = event.reason.map(DeletionReason::as_str);
        match event.kind {
            TelemetryKind::BatchDeleted => tracing::debug!(
                feature = %event.feature,
                reason,
                files = event.file_count,
                bytes = event.total_bytes,
                "batch deleted"
            ),
            TelemetryKind::BatchClosed => tracing::debug!(
                feature = %event.feature,
                bytes = event.total_bytes,
                objects = event.object_count,
                window = event.uploader_window.map(format_duration).as_deref(),
                forced = event.message.is_some(),
                "batch closed"
            ),
            TelemetryKind::Error => tracing::warn!(
                feature = %event.feature,
                reason,
                error = event.message.as_deref().unwrap_or_default(),
                "storage error"
            ),
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeTelemetry;

#[cfg(any(test, feature = "test-support"))]
mod fake {
    #![cfg_attr(coverage_nightly, coverage(off))]

    use super::*;
    use std::sync::{Arc, Mutex};

    /// Records every report for assertions
    #[derive(Clone, Default)]
    pub struct FakeTelemetry {
        events: Arc<Mutex<Vec<TelemetryEvent>>>,
    }

    impl FakeTelemetry {
        pub fn new() -> Self {
            Self::default()
        }

        /// Get all recorded events
        pub fn events(&self) -> Vec<TelemetryEvent> {
            self.events.lock().unwrap_or_else(|e| e.into_inner()).clone()
        }

        /// Reasons of recorded deletions, in report order
        pub fn deletions(&self) -> Vec<DeletionReason> {
            self.events()
                .into_iter()
                .filter(|e| e.kind == TelemetryKind::BatchDeleted)
                .filter_map(|e| e.reason)
                .collect()
        }

        /// Messages of recorded errors
        pub fn errors(&self) -> Vec<String> {
            self.events()
                .into_iter()
                .filter(|e| e.kind == TelemetryKind::Error)
                .filter_map(|e| e.message)
                .collect()
        }

        pub fn clear(&self) {
            self.events.lock().unwrap_or_else(|e| e.into_inner()).clear();
        }
    }

    impl Telemetry for FakeTelemetry {
        fn report(&self, event: TelemetryEvent) {
            self.events
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push(event);
        }
    }
}
