// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Files orchestrator
//!
//! Decides which file of a directory receives the next write, which files
//! are ready for upload, and which files must go to keep the directory
//! within budget.
//!
//! ## File lifecycle
//!
//! ```text
//! create ──► active (writable) ──► closed ──► eligible (readable) ──► deleted
//!               │  age ≥ max_file_age_for_write,      age ≥ min_file_age_for_read
//!               │  file full, or object count reached
//!               └──────────────► evicted when the directory is over budget
//! ```
//!
//! File names are zero-padded microsecond timestamps, so lexicographic
//! order is creation order and a file's age is derived from its name.

use crate::directory::Directory;
use crate::error::StorageError;
use crate::file::{BatchFile, ReadableFile, WritableFile};
use spool_core::{Clock, DeletionReason, StoragePreset, Telemetry, TelemetryEvent};
use std::collections::HashSet;
use std::io;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

const MAX_NAME_ATTEMPTS: u32 = 1_000;

/// Width of a file name; fits any `u64` microsecond count
const NAME_WIDTH: usize = 20;

/// File name for a creation timestamp
pub fn file_name_from(micros: u64) -> String {
    format!("{:0width$}", micros, width = NAME_WIDTH)
}

/// Creation timestamp (microseconds since epoch) encoded in a file name
///
/// Names that are not timestamps map to the epoch, which makes them
/// obsolete and lets the read path clean them up.
pub fn creation_micros_from(name: &str) -> u64 {
    name.parse::<u64>().unwrap_or(0)
}

fn micros_since_epoch(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}

/// The file currently receiving writes
#[derive(Debug, Clone)]
struct ActiveFile {
    file: BatchFile,
    /// Writes handed out for this file; assumes nearly all of them succeed
    objects: u64,
    /// Sum of write sizes handed out for this file
    approximate_size: u64,
}

/// Orchestrates files in a single directory
pub struct FilesOrchestrator {
    feature: String,
    directory: Directory,
    preset: StoragePreset,
    clock: Arc<dyn Clock>,
    telemetry: Arc<dyn Telemetry>,
    active: Option<ActiveFile>,
    /// Creation timestamp of the newest name handed out or seen on disk
    last_created: u64,
    /// Estimated directory size, refreshed from disk on rotation
    directory_size: Option<u64>,
    ignore_files_age_when_reading: bool,
}

impl FilesOrchestrator {
    pub fn new(
        feature: &str,
        directory: Directory,
        preset: StoragePreset,
        clock: Arc<dyn Clock>,
        telemetry: Arc<dyn Telemetry>,
    ) -> Self {
        Self {
            feature: feature.to_string(),
            directory,
            preset,
            clock,
            telemetry,
            active: None,
            last_created: 0,
            directory_size: None,
            ignore_files_age_when_reading: false,
        }
    }

    pub fn directory(&self) -> &Directory {
        &self.directory
    }

    pub fn preset(&self) -> &StoragePreset {
        &self.preset
    }

    /// Disable the minimum-age filter when listing readable files (forced
    /// flush). The active file stays excluded regardless.
    pub fn set_ignore_files_age_when_reading(&mut self, ignore: bool) {
        self.ignore_files_age_when_reading = ignore;
    }

    pub fn ignores_files_age_when_reading(&self) -> bool {
        self.ignore_files_age_when_reading
    }

    // -------------------------------------------------------------------------
    // Writable file orchestration
    // -------------------------------------------------------------------------

    /// File that should receive a write of `write_size` bytes
    ///
    /// Reuses the active file while it is young enough and has room for one
    /// more object of this size; otherwise rotates to a new file. The
    /// directory budget is enforced before returning, so disk usage stays
    /// bounded even if nothing is ever uploaded.
    pub fn get_writable_file(&mut self, write_size: u64) -> Result<BatchFile, StorageError> {
        self.validate(write_size)?;

        let reusable = self.active_can_take(write_size);
        if !reusable {
            // Rotation re-reads the directory from disk
            self.directory_size = None;
        }
        self.enforce_directory_budget(write_size)?;

        if reusable {
            if let Some(active) = self.active.as_mut() {
                active.objects += 1;
                active.approximate_size += write_size;
                return Ok(active.file.clone());
            }
        }

        self.close_active(false);
        self.create_new_writable_file(write_size)
    }

    /// New file for a write of `write_size` bytes, bypassing reuse
    pub fn get_new_writable_file(&mut self, write_size: u64) -> Result<BatchFile, StorageError> {
        self.validate(write_size)?;
        self.close_active(true);
        self.directory_size = None;
        self.enforce_directory_budget(write_size)?;
        self.create_new_writable_file(write_size)
    }

    /// Stop writing to the active file; the next write starts a new one
    pub fn seal(&mut self) {
        self.close_active(true);
    }

    /// Forget everything derived from disk; used after files were moved or
    /// removed behind the orchestrator's back
    pub fn reset(&mut self) {
        self.active = None;
        self.directory_size = None;
    }

    /// Name of the file that may still receive writes, if any
    pub fn active_file_name(&self) -> Option<&str> {
        let active = self.active.as_ref()?;
        let name = WritableFile::name(&active.file);
        let young = self.age_of(name) < self.preset.max_file_age_for_write;
        let has_room = active.objects < self.preset.max_objects_in_file
            && active.approximate_size < self.preset.max_file_size;
        (young && has_room).then_some(name)
    }

    fn validate(&self, write_size: u64) -> Result<(), StorageError> {
        if write_size > self.preset.max_object_size {
            return Err(StorageError::WriteRejected {
                size: write_size,
                max: self.preset.max_object_size,
            });
        }
        Ok(())
    }

    fn active_can_take(&self, write_size: u64) -> bool {
        let Some(active) = &self.active else {
            return false;
        };
        // Expected when the file was uploaded, evicted or migrated
        if !active.file.exists() {
            return false;
        }
        let size = match WritableFile::size(&active.file) {
            Ok(size) => size,
            Err(e) => {
                self.report_error("failed to reuse last writable file", &e);
                return false;
            }
        };

        let recent_enough =
            self.age_of(WritableFile::name(&active.file)) < self.preset.max_file_age_for_write;
        let has_room = size + write_size <= self.preset.max_file_size;
        let can_hold_more = active.objects < self.preset.max_objects_in_file;

        recent_enough && has_room && can_hold_more
    }

    fn create_new_writable_file(&mut self, write_size: u64) -> Result<BatchFile, StorageError> {
        let now = micros_since_epoch(self.clock.now());
        let mut micros = now.max(self.last_created.saturating_add(1));

        for _ in 0..MAX_NAME_ATTEMPTS {
            let name = file_name_from(micros);
            match self.directory.create_file(&name) {
                Ok(file) => {
                    self.last_created = micros;
                    self.active = Some(ActiveFile {
                        file: file.clone(),
                        objects: 1,
                        approximate_size: write_size,
                    });
                    tracing::trace!(feature = %self.feature, file = %name, "created batch file");
                    return Ok(file);
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    micros = micros.saturating_add(1);
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(StorageError::NameExhausted(MAX_NAME_ATTEMPTS))
    }

    fn close_active(&mut self, forced: bool) {
        if let Some(active) = self.active.take() {
            self.telemetry.report(
                TelemetryEvent::closed(
                    &self.feature,
                    active.approximate_size,
                    active.objects,
                    forced,
                )
                .with_uploader_window(self.preset.uploader_window()),
            );
        }
    }

    // -------------------------------------------------------------------------
    // Directory size management
    // -------------------------------------------------------------------------

    /// Delete the oldest files until `write_size` more bytes fit the budget
    fn enforce_directory_budget(&mut self, write_size: u64) -> Result<(), StorageError> {
        let max = self.preset.max_directory_size;

        if let Some(size) = self.directory_size {
            if size + write_size <= max {
                self.directory_size = Some(size + write_size);
                return Ok(());
            }
        }

        let mut files = self.sorted_files_with_size()?;
        let mut total: u64 = files.iter().map(|(_, _, size)| size).sum();

        if total + write_size > max {
            let mut freed = 0u64;
            let mut evicted = 0u64;
            let mut oldest = files.drain(..);
            while total + write_size > max {
                let Some((_, file, size)) = oldest.next() else {
                    break;
                };
                file.delete()?;
                self.telemetry.report(TelemetryEvent::deleted(
                    &self.feature,
                    DeletionReason::Obsolete,
                    size,
                ));
                self.forget_if_active(ReadableFile::name(&file));
                total -= size;
                freed += size;
                evicted += 1;
            }
            tracing::debug!(
                feature = %self.feature,
                evicted,
                freed,
                remaining = total,
                "directory over budget, purged oldest files"
            );
        }

        self.directory_size = Some(total + write_size);
        Ok(())
    }

    fn sorted_files_with_size(&mut self) -> Result<Vec<(u64, BatchFile, u64)>, StorageError> {
        let mut files = Vec::new();
        for file in self.directory.files()? {
            let created = creation_micros_from(ReadableFile::name(&file));
            // A file can vanish between listing and stat; it no longer counts
            let size = ReadableFile::size(&file).unwrap_or(0);
            self.last_created = self.last_created.max(created);
            files.push((created, file, size));
        }
        files.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.path().cmp(b.1.path())));
        Ok(files)
    }

    // -------------------------------------------------------------------------
    // Readable file orchestration
    // -------------------------------------------------------------------------

    /// Files ready for upload, oldest first
    ///
    /// Skips the active file and every name in `excluding` (files already
    /// checked out). Files older than `max_file_age_for_read` are deleted as
    /// obsolete along the way.
    pub fn get_readable_files(
        &mut self,
        excluding: &HashSet<String>,
        limit: usize,
    ) -> Vec<BatchFile> {
        let files = match self.directory.files() {
            Ok(files) => files,
            Err(e) => {
                self.report_error("failed to obtain readable files", &e);
                return Vec::new();
            }
        };

        let active = self.active_file_name().map(str::to_string);
        let mut candidates = Vec::new();

        for file in files {
            let name = ReadableFile::name(&file);
            if active.as_deref() == Some(name) || excluding.contains(name) {
                continue;
            }

            let age = self.age_of(name);
            if age > self.preset.max_file_age_for_read {
                self.delete(&file, DeletionReason::Obsolete);
                continue;
            }
            if !self.ignore_files_age_when_reading && age < self.preset.min_file_age_for_read {
                continue;
            }
            candidates.push((creation_micros_from(name), file));
        }

        candidates.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.path().cmp(b.1.path())));
        candidates.into_iter().take(limit).map(|(_, file)| file).collect()
    }

    /// Oldest file ready for upload
    pub fn get_readable_file(&mut self, excluding: &HashSet<String>) -> Option<BatchFile> {
        self.get_readable_files(excluding, 1).into_iter().next()
    }

    /// Delete a file and report why
    pub fn delete(&mut self, file: &BatchFile, reason: DeletionReason) {
        let size = ReadableFile::size(file).unwrap_or(0);
        match file.delete() {
            Ok(()) => {
                if let Some(estimate) = self.directory_size.as_mut() {
                    *estimate = estimate.saturating_sub(size);
                }
                self.forget_if_active(ReadableFile::name(file));
                self.telemetry
                    .report(TelemetryEvent::deleted(&self.feature, reason, size));
            }
            Err(e) => self.report_error("failed to delete file", &e),
        }
    }

    // -------------------------------------------------------------------------
    // Helpers
    // -------------------------------------------------------------------------

    fn forget_if_active(&mut self, name: &str) {
        if self
            .active
            .as_ref()
            .is_some_and(|a| WritableFile::name(&a.file) == name)
        {
            self.active = None;
        }
    }

    /// Age of a file from its name; files from the future are age zero
    fn age_of(&self, name: &str) -> Duration {
        let created = creation_micros_from(name);
        let now = micros_since_epoch(self.clock.now());
        Duration::from_micros(now.saturating_sub(created))
    }

    fn report_error(&self, message: &str, error: &dyn std::fmt::Display) {
        self.telemetry.report(TelemetryEvent::error(
            &self.feature,
            format!("{message}: {error}"),
        ));
    }
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
