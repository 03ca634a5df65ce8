// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Performance presets
//!
//! Storage and upload budgets for one feature. Presets are derived from a
//! coarse `BatchSize` × `UploadFrequency` choice and can be adjusted with a
//! `PresetOverride`, either in code or from a TOML file:
//!
//! ```toml
//! batch_size = "small"
//! upload_frequency = "frequent"
//!
//! [override]
//! max_file_size = 1048576
//! min_upload_delay = "250ms"
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

const KB: u64 = 1024;
const MB: u64 = 1024 * KB;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid preset: {0}")]
    Invalid(String),
}

/// How long events accumulate in one batch file before it becomes uploadable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchSize {
    Small,
    #[default]
    Medium,
    Large,
}

impl BatchSize {
    fn mean_file_age(self) -> Duration {
        match self {
            BatchSize::Small => Duration::from_secs(3),
            BatchSize::Medium => Duration::from_secs(10),
            BatchSize::Large => Duration::from_secs(35),
        }
    }
}

/// How eagerly the uploader polls for batches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadFrequency {
    Frequent,
    #[default]
    Average,
    Rare,
}

impl UploadFrequency {
    fn min_upload_delay(self) -> Duration {
        match self {
            UploadFrequency::Frequent => Duration::from_millis(500),
            UploadFrequency::Average => Duration::from_secs(2),
            UploadFrequency::Rare => Duration::from_secs(5),
        }
    }
}

/// Budgets applied by the files orchestrator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoragePreset {
    /// Maximum size of a single batch file, in bytes
    pub max_file_size: u64,
    /// Maximum total size of one directory, in bytes; oldest files are
    /// purged past this
    pub max_directory_size: u64,
    /// A file younger than this may keep receiving writes
    #[serde(with = "humantime_serde")]
    pub max_file_age_for_write: Duration,
    /// A file older than this may be read for upload
    #[serde(with = "humantime_serde")]
    pub min_file_age_for_read: Duration,
    /// A file older than this is obsolete and deleted without upload
    #[serde(with = "humantime_serde")]
    pub max_file_age_for_read: Duration,
    /// Maximum number of events in one batch file
    pub max_objects_in_file: u64,
    /// Maximum size of a single encoded event, in bytes
    pub max_object_size: u64,
}

impl StoragePreset {
    /// Midpoint between the write and read age thresholds
    pub fn uploader_window(&self) -> Duration {
        (self.min_file_age_for_read + self.max_file_age_for_write) / 2
    }
}

/// Budgets applied by the upload worker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadPreset {
    #[serde(with = "humantime_serde")]
    pub initial_upload_delay: Duration,
    #[serde(with = "humantime_serde")]
    pub min_upload_delay: Duration,
    #[serde(with = "humantime_serde")]
    pub max_upload_delay: Duration,
    /// Fraction by which the delay shrinks or grows after each cycle
    pub upload_delay_change_rate: f64,
    /// Upper bound on batches uploaded in one cycle
    pub max_batches_per_upload: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformancePreset {
    pub storage: StoragePreset,
    pub upload: UploadPreset,
}

impl PerformancePreset {
    pub fn new(batch_size: BatchSize, upload_frequency: UploadFrequency) -> Self {
        let mean_file_age = batch_size.mean_file_age();
        let min_upload_delay = upload_frequency.min_upload_delay();

        Self {
            storage: StoragePreset {
                max_file_size: 4 * MB,
                max_directory_size: 512 * MB,
                // 5% either side of the mean keeps writer and reader apart
                max_file_age_for_write: mean_file_age.mul_f64(0.95),
                min_file_age_for_read: mean_file_age.mul_f64(1.05),
                max_file_age_for_read: Duration::from_secs(18 * 60 * 60),
                max_objects_in_file: 500,
                max_object_size: 512 * KB,
            },
            upload: UploadPreset {
                initial_upload_delay: min_upload_delay * 5,
                min_upload_delay,
                max_upload_delay: min_upload_delay * 10,
                upload_delay_change_rate: 0.1,
                max_batches_per_upload: 1,
            },
        }
    }

    /// Apply the fields set in `overrides`
    pub fn updated(&self, overrides: &PresetOverride) -> Self {
        let mut preset = self.clone();
        let storage = &mut preset.storage;
        let upload = &mut preset.upload;

        if let Some(v) = overrides.max_file_size {
            storage.max_file_size = v;
        }
        if let Some(v) = overrides.max_directory_size {
            storage.max_directory_size = v;
        }
        if let Some(v) = overrides.max_file_age_for_write {
            storage.max_file_age_for_write = v;
        }
        if let Some(v) = overrides.min_file_age_for_read {
            storage.min_file_age_for_read = v;
        }
        if let Some(v) = overrides.max_file_age_for_read {
            storage.max_file_age_for_read = v;
        }
        if let Some(v) = overrides.max_objects_in_file {
            storage.max_objects_in_file = v;
        }
        if let Some(v) = overrides.max_object_size {
            storage.max_object_size = v;
        }
        if let Some(v) = overrides.initial_upload_delay {
            upload.initial_upload_delay = v;
        }
        if let Some(v) = overrides.min_upload_delay {
            upload.min_upload_delay = v;
        }
        if let Some(v) = overrides.max_upload_delay {
            upload.max_upload_delay = v;
        }
        if let Some(v) = overrides.upload_delay_change_rate {
            upload.upload_delay_change_rate = v;
        }
        if let Some(v) = overrides.max_batches_per_upload {
            upload.max_batches_per_upload = v;
        }
        preset
    }

    /// Check the relationships the orchestrator and worker rely on
    pub fn validate(&self) -> Result<(), ConfigError> {
        let storage = &self.storage;
        let upload = &self.upload;

        if storage.max_object_size > storage.max_file_size {
            return Err(ConfigError::Invalid(format!(
                "max_object_size ({}) exceeds max_file_size ({})",
                storage.max_object_size, storage.max_file_size
            )));
        }
        if storage.max_file_size > storage.max_directory_size {
            return Err(ConfigError::Invalid(format!(
                "max_file_size ({}) exceeds max_directory_size ({})",
                storage.max_file_size, storage.max_directory_size
            )));
        }
        if storage.max_objects_in_file == 0 {
            return Err(ConfigError::Invalid(
                "max_objects_in_file must be at least 1".to_string(),
            ));
        }
        if storage.min_file_age_for_read < storage.max_file_age_for_write {
            return Err(ConfigError::Invalid(
                "min_file_age_for_read must not be below max_file_age_for_write".to_string(),
            ));
        }
        if storage.max_file_age_for_read < storage.min_file_age_for_read {
            return Err(ConfigError::Invalid(
                "max_file_age_for_read must not be below min_file_age_for_read".to_string(),
            ));
        }
        if upload.min_upload_delay > upload.max_upload_delay {
            return Err(ConfigError::Invalid(
                "min_upload_delay must not exceed max_upload_delay".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&upload.upload_delay_change_rate) {
            return Err(ConfigError::Invalid(format!(
                "upload_delay_change_rate must be in [0, 1), got {}",
                upload.upload_delay_change_rate
            )));
        }
        if upload.max_batches_per_upload == 0 {
            return Err(ConfigError::Invalid(
                "max_batches_per_upload must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Parse and validate a preset from TOML
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: PresetConfig = toml::from_str(source)?;
        let preset = PerformancePreset::new(config.batch_size, config.upload_frequency)
            .updated(&config.overrides);
        preset.validate()?;
        Ok(preset)
    }

    /// Load a preset from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }
}

impl Default for PerformancePreset {
    fn default() -> Self {
        Self::new(BatchSize::default(), UploadFrequency::default())
    }
}

/// Optional adjustments on top of a derived preset
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PresetOverride {
    pub max_file_size: Option<u64>,
    pub max_directory_size: Option<u64>,
    #[serde(with = "humantime_serde")]
    pub max_file_age_for_write: Option<Duration>,
    #[serde(with = "humantime_serde")]
    pub min_file_age_for_read: Option<Duration>,
    #[serde(with = "humantime_serde")]
    pub max_file_age_for_read: Option<Duration>,
    pub max_objects_in_file: Option<u64>,
    pub max_object_size: Option<u64>,
    #[serde(with = "humantime_serde")]
    pub initial_upload_delay: Option<Duration>,
    #[serde(with = "humantime_serde")]
    pub min_upload_delay: Option<Duration>,
    #[serde(with = "humantime_serde")]
    pub max_upload_delay: Option<Duration>,
    pub upload_delay_change_rate: Option<f64>,
    pub max_batches_per_upload: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct PresetConfig {
    batch_size: BatchSize,
    upload_frequency: UploadFrequency,
    #[serde(rename = "override")]
    overrides: PresetOverride,
}

/// Human-readable rendering used in log lines
pub fn format_duration(duration: Duration) -> String {
    humantime::format_duration(duration).to_string()
}

#[cfg(test)]
#[path = "preset_tests.rs"]
mod tests;
