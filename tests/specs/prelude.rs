//! Shared fixture for the behavioural specs
//!
//! A [`Spool`] is one feature's storage on a temp directory, driven by a
//! fake clock, observed through fake telemetry and uploading through a
//! scripted fake transport.

pub use spool_adapters::{FakeTransport, FormatRequestBuilder, UploadContext};
pub use spool_core::{
    DataFormat, DeletionReason, Event, FakeClock, FakeTelemetry, StoragePreset, TrackingConsent,
    UploadPreset,
};
pub use spool_storage::{FeatureStorage, Reader, StorageConfig, Writer};
pub use spool_upload::{CycleOutcome, DataUploader, UploadLoop};
pub use std::sync::Arc;
pub use std::time::Duration;

use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const FEATURE: &str = "logs";

/// Small budgets so scenarios stay readable
pub fn storage_preset() -> StoragePreset {
    StoragePreset {
        max_file_size: 1_000,
        max_directory_size: 10_000,
        max_file_age_for_write: Duration::from_secs(10),
        min_file_age_for_read: Duration::from_secs(11),
        max_file_age_for_read: Duration::from_secs(3600),
        max_objects_in_file: 2,
        max_object_size: 100,
    }
}

pub fn upload_preset() -> UploadPreset {
    UploadPreset {
        initial_upload_delay: Duration::from_secs(5),
        min_upload_delay: Duration::from_secs(1),
        max_upload_delay: Duration::from_secs(50),
        upload_delay_change_rate: 0.1,
        max_batches_per_upload: 1,
    }
}

pub struct Spool {
    temp: TempDir,
    pub clock: FakeClock,
    pub telemetry: FakeTelemetry,
    pub transport: FakeTransport,
    pub storage: FeatureStorage,
}

impl Spool {
    pub fn granted() -> Self {
        Self::with(TrackingConsent::Granted, storage_preset())
    }

    pub fn with(consent: TrackingConsent, preset: StoragePreset) -> Self {
        Self::open_in(TempDir::new().unwrap(), consent, preset)
    }

    /// Open storage over a directory that may already hold files
    pub fn open_in(temp: TempDir, consent: TrackingConsent, preset: StoragePreset) -> Self {
        let clock = FakeClock::new();
        let telemetry = FakeTelemetry::new();
        let config = StorageConfig::new(temp.path(), FEATURE, preset)
            .with_consent(consent)
            .with_clock(Arc::new(clock.clone()))
            .with_telemetry(Arc::new(telemetry.clone()));

        Self {
            storage: FeatureStorage::open(config).unwrap(),
            temp,
            clock,
            telemetry,
            transport: FakeTransport::new(),
        }
    }

    pub fn authorized(&self) -> PathBuf {
        self.temp.path().join(FEATURE).join("authorized")
    }

    pub fn unauthorized(&self) -> PathBuf {
        self.temp.path().join(FEATURE).join("unauthorized")
    }

    /// Write `payloads` and wait until they reach disk
    pub async fn write(&self, payloads: &[&str]) {
        let writer = self.storage.writer();
        for payload in payloads {
            writer.write(Event::from(*payload));
        }
        self.storage.drain().await;
    }

    /// Age every file past the read threshold
    pub fn age_past_read(&self) {
        self.clock.advance(Duration::from_secs(11));
    }

    pub fn upload_loop(&self) -> UploadLoop {
        let uploader = DataUploader::new(
            FormatRequestBuilder::new("https://intake.test/v1", DataFormat::json_array()),
            self.transport.clone(),
            Arc::new(UploadContext::new("token", "rust")),
        );
        UploadLoop::new(
            FEATURE,
            Arc::new(self.storage.reader()),
            Arc::new(uploader),
            Arc::new(self.telemetry.clone()),
            &upload_preset(),
        )
    }
}

/// Sorted names of the files in `dir`; empty when it does not exist
pub fn file_names(dir: &Path) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

pub fn dir_size(dir: &Path) -> u64 {
    std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().metadata().unwrap().len())
        .sum()
}
