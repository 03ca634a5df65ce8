// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! spool-core: shared vocabulary for the spool event pipeline
//!
//! This crate provides:
//! - Clock abstraction (real and fake) used for file naming and ageing
//! - Tracking consent and its routing rules
//! - Events and the per-feature upload data format
//! - Performance presets (storage + upload budgets) loadable from TOML
//! - The telemetry sink every deletion and I/O error is reported to
//! - The optional encryption seam applied to event payloads

pub mod clock;
pub mod consent;
pub mod encryption;
pub mod event;
pub mod preset;
pub mod telemetry;

pub use clock::{Clock, FakeClock, SystemClock};
pub use consent::TrackingConsent;
pub use encryption::{DataEncryption, EncryptionError};
pub use event::{DataFormat, Event};
pub use preset::{
    BatchSize, ConfigError, PerformancePreset, PresetOverride, StoragePreset, UploadFrequency,
    UploadPreset,
};
pub use telemetry::{
    DeletionReason, NoOpTelemetry, Telemetry, TelemetryEvent, TelemetryKind, TracedTelemetry,
};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use telemetry::FakeTelemetry;
