// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-feature storage
//!
//! `FeatureStorage` owns the directory pair of one feature and serializes
//! every write, read, migration and wipe on that feature's queue.

use crate::block::{self, BlockReader, DecodedEvents};
use crate::directory::MoveSummary;
use crate::error::StorageError;
use crate::file::{BatchFile, ReadableFile, WritableFile};
use crate::gate::{ConsentGate, FeatureDirectories, Migration, Route};
use crate::orchestrator::FilesOrchestrator;
use crate::queue::SerialQueue;
use crate::reader::FeatureReader;
use crate::writer::FeatureWriter;
use spool_core::{
    Clock, DataEncryption, DeletionReason, Event, StoragePreset, SystemClock, Telemetry,
    TelemetryEvent, TrackingConsent, TracedTelemetry,
};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

/// Everything needed to open the storage of one feature
#[derive(Clone)]
pub struct StorageConfig {
    pub root: PathBuf,
    pub feature: String,
    pub preset: StoragePreset,
    pub consent: TrackingConsent,
    pub clock: Arc<dyn Clock>,
    pub telemetry: Arc<dyn Telemetry>,
    pub encryption: Option<Arc<dyn DataEncryption>>,
}

impl StorageConfig {
    /// Consent starts pending; telemetry goes to the tracing log
    pub fn new(root: impl Into<PathBuf>, feature: &str, preset: StoragePreset) -> Self {
        Self {
            root: root.into(),
            feature: feature.to_string(),
            preset,
            consent: TrackingConsent::Pending,
            clock: Arc::new(SystemClock),
            telemetry: Arc::new(TracedTelemetry),
            encryption: None,
        }
    }

    pub fn with_consent(mut self, consent: TrackingConsent) -> Self {
        self.consent = consent;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_telemetry(mut self, telemetry: Arc<dyn Telemetry>) -> Self {
        self.telemetry = telemetry;
        self
    }

    pub fn with_encryption(mut self, encryption: Arc<dyn DataEncryption>) -> Self {
        self.encryption = Some(encryption);
        self
    }
}

/// A batch as read from disk, before it is checked out
#[derive(Debug)]
pub(crate) struct ReadBatch {
    pub file_name: String,
    pub size: u64,
    pub events: Vec<Event>,
}

/// State owned by a feature's queue thread
pub(crate) struct FeatureState {
    feature: String,
    directories: FeatureDirectories,
    gate: ConsentGate,
    authorized: FilesOrchestrator,
    unauthorized: FilesOrchestrator,
    /// Files handed to a reader and not yet released
    in_flight: HashSet<String>,
    encryption: Option<Arc<dyn DataEncryption>>,
    telemetry: Arc<dyn Telemetry>,
}

impl FeatureState {
    fn new(config: StorageConfig, directories: FeatureDirectories) -> Self {
        let orchestrator = |directory| {
            FilesOrchestrator::new(
                &config.feature,
                directory,
                config.preset.clone(),
                config.clock.clone(),
                config.telemetry.clone(),
            )
        };
        Self {
            authorized: orchestrator(directories.authorized.clone()),
            unauthorized: orchestrator(directories.unauthorized.clone()),
            feature: config.feature.clone(),
            directories,
            gate: ConsentGate::new(config.consent),
            in_flight: HashSet::new(),
            encryption: config.encryption.clone(),
            telemetry: config.telemetry.clone(),
        }
    }

    // -------------------------------------------------------------------------
    // Writes
    // -------------------------------------------------------------------------

    pub(crate) fn write(&mut self, event: Event, force_new_batch: bool) {
        let Some(route) = self.gate.route() else {
            tracing::trace!(feature = %self.feature, "consent not granted, event dropped");
            return;
        };
        if let Err(e) = self.try_write(route, event, force_new_batch) {
            tracing::warn!(feature = %self.feature, error = %e, "event dropped");
            self.report_error("failed to write data", &e);
        }
    }

    fn try_write(
        &mut self,
        route: Route,
        event: Event,
        force_new_batch: bool,
    ) -> Result<(), StorageError> {
        let event = self.encrypt(event)?;
        let record = block::encode_event(&event);
        let size = record.len() as u64;

        let orchestrator = match route {
            Route::Authorized => &mut self.authorized,
            Route::Unauthorized => &mut self.unauthorized,
        };
        let file = if force_new_batch {
            orchestrator.get_new_writable_file(size)?
        } else {
            orchestrator.get_writable_file(size)?
        };
        file.append(&record)?;
        Ok(())
    }

    fn encrypt(&self, event: Event) -> Result<Event, StorageError> {
        let Some(encryption) = &self.encryption else {
            return Ok(event);
        };
        Ok(Event {
            data: encryption.encrypt(&event.data)?,
            metadata: event.metadata,
        })
    }

    // -------------------------------------------------------------------------
    // Reads (authorized directory only)
    // -------------------------------------------------------------------------

    /// Check out the oldest readable batch
    ///
    /// Corrupt and empty files are deleted as invalid and the next file is
    /// tried.
    pub(crate) fn next_batch(&mut self, ignore_age: bool) -> Option<ReadBatch> {
        let previous = self.authorized.ignores_files_age_when_reading();
        self.authorized.set_ignore_files_age_when_reading(ignore_age || previous);
        let batch = self.next_valid_batch();
        self.authorized.set_ignore_files_age_when_reading(previous);

        if let Some(batch) = &batch {
            self.in_flight.insert(batch.file_name.clone());
        }
        batch
    }

    fn next_valid_batch(&mut self) -> Option<ReadBatch> {
        loop {
            let file = self.authorized.get_readable_file(&self.in_flight)?;
            let size = ReadableFile::size(&file).unwrap_or(0);
            match self.read_events(&file) {
                Ok(decoded) if !decoded.events.is_empty() => {
                    if let Some(tail) = &decoded.tail {
                        tracing::warn!(
                            feature = %self.feature,
                            file = %ReadableFile::name(&file),
                            events = decoded.events.len(),
                            error = %tail,
                            "batch file has a torn tail"
                        );
                        self.report_error("batch file has a torn tail", tail);
                    }
                    return Some(ReadBatch {
                        file_name: ReadableFile::name(&file).to_string(),
                        size,
                        events: decoded.events,
                    });
                }
                Ok(DecodedEvents { tail: None, .. }) => {
                    tracing::debug!(
                        feature = %self.feature,
                        file = %ReadableFile::name(&file),
                        "empty batch file"
                    );
                    self.authorized.delete(&file, DeletionReason::Invalid);
                }
                Ok(DecodedEvents { tail: Some(e), .. }) => {
                    self.discard_unreadable(&file, &e);
                }
                Err(e) => {
                    self.discard_unreadable(&file, &e);
                }
            }
        }
    }

    fn discard_unreadable(&mut self, file: &BatchFile, error: &dyn std::fmt::Display) {
        tracing::warn!(
            feature = %self.feature,
            file = %ReadableFile::name(file),
            error = %error,
            "unreadable batch file"
        );
        self.report_error("failed to read batch", error);
        self.authorized.delete(file, DeletionReason::Invalid);
    }

    /// Decode a batch file, keeping whatever precedes a torn tail
    fn read_events(&self, file: &BatchFile) -> Result<DecodedEvents, StorageError> {
        let decoded = BlockReader::new(file.stream()?).read_events()?;
        let Some(encryption) = &self.encryption else {
            return Ok(decoded);
        };

        let mut events = Vec::with_capacity(decoded.events.len());
        for event in decoded.events {
            match encryption.decrypt(&event.data) {
                Ok(data) => events.push(Event { data, ..event }),
                Err(e) => self.report_error("failed to decrypt event", &e),
            }
        }
        Ok(DecodedEvents {
            events,
            tail: decoded.tail,
        })
    }

    /// Delete a checked-out batch
    pub(crate) fn mark_as_read(&mut self, file_name: &str, reason: DeletionReason) {
        self.in_flight.remove(file_name);
        // Already gone if cleared while checked out
        if let Some(file) = self.directories.authorized.file(file_name) {
            self.authorized.delete(&file, reason);
        }
    }

    /// Return a checked-out batch to the eligible pool untouched
    pub(crate) fn release(&mut self, file_name: &str) {
        self.in_flight.remove(file_name);
    }

    /// Make everything written so far readable
    pub(crate) fn seal(&mut self) {
        self.authorized.seal();
    }

    // -------------------------------------------------------------------------
    // Consent and maintenance
    // -------------------------------------------------------------------------

    pub(crate) fn set_consent(&mut self, consent: TrackingConsent) {
        self.gate.set_consent(consent);
        self.migrate();
    }

    /// Run the migration owed for the current consent, if any
    pub(crate) fn migrate(&mut self) {
        let Some(migration) = self.gate.pending_migration() else {
            return;
        };

        match migration.apply(&self.directories) {
            Ok(summary) => {
                self.gate.mark_migrated();
                if summary.moved == 0 {
                    return;
                }
                tracing::info!(
                    feature = %self.feature,
                    consent = %self.gate.consent(),
                    files = summary.moved,
                    bytes = summary.bytes,
                    "consent migration"
                );
                if migration == Migration::DeleteUnauthorized {
                    self.report_files_deleted(DeletionReason::ConsentRevoked, summary);
                }
            }
            Err(e) => {
                tracing::warn!(feature = %self.feature, error = %e, "consent migration failed");
                self.report_error("failed to migrate data", &e);
            }
        }
        self.authorized.reset();
        self.unauthorized.reset();
    }

    /// Delete every file in both directories
    pub(crate) fn clear_all(&mut self) {
        for directory in [&self.directories.unauthorized, &self.directories.authorized] {
            match directory.delete_all_files() {
                Ok(summary) if summary.moved > 0 => {
                    self.report_files_deleted(DeletionReason::Cleared, summary)
                }
                Ok(_) => {}
                Err(e) => self.report_error("failed to clear data", &e),
            }
        }
        self.authorized.reset();
        self.unauthorized.reset();
    }

    fn report_files_deleted(&self, reason: DeletionReason, summary: MoveSummary) {
        self.telemetry.report(
            TelemetryEvent::deleted(&self.feature, reason, summary.bytes)
                .with_files(summary.moved, summary.bytes),
        );
    }

    fn report_error(&self, message: &str, error: &dyn std::fmt::Display) {
        self.telemetry.report(TelemetryEvent::error(
            &self.feature,
            format!("{message}: {error}"),
        ));
    }
}

/// Durable event storage of one feature
#[derive(Clone)]
pub struct FeatureStorage {
    feature: String,
    queue: SerialQueue<FeatureState>,
}

impl FeatureStorage {
    /// Open the feature's directories and start its queue
    ///
    /// The migration owed for the initial consent is the first job queued.
    pub fn open(config: StorageConfig) -> Result<Self, StorageError> {
        let directories = FeatureDirectories::open(&config.root, &config.feature)?;
        let feature = config.feature.clone();
        let state = FeatureState::new(config, directories);
        let queue = SerialQueue::spawn(&feature, state)?;
        queue.submit(FeatureState::migrate)?;

        tracing::debug!(feature = %feature, "feature storage opened");
        Ok(Self { feature, queue })
    }

    pub fn feature(&self) -> &str {
        &self.feature
    }

    /// Writer appending to the active batch of the routed directory
    pub fn writer(&self) -> FeatureWriter {
        FeatureWriter::new(self.queue.clone(), false)
    }

    /// Writer starting a new batch file for every event
    pub fn writer_forcing_new_batch(&self) -> FeatureWriter {
        FeatureWriter::new(self.queue.clone(), true)
    }

    pub fn reader(&self) -> FeatureReader {
        FeatureReader::new(self.queue.clone())
    }

    /// Apply a consent change; data is migrated before any later write
    pub fn set_consent(&self, consent: TrackingConsent) {
        if let Err(e) = self.queue.submit(move |state| state.set_consent(consent)) {
            tracing::warn!(feature = %self.feature, error = %e, "consent change dropped");
        }
    }

    /// Delete all data of this feature, authorized or not
    pub fn clear_all_data(&self) {
        if let Err(e) = self.queue.submit(FeatureState::clear_all) {
            tracing::warn!(feature = %self.feature, error = %e, "clear request dropped");
        }
    }

    /// Block until every operation submitted so far has run
    ///
    /// Must not be called from within an async runtime worker; use
    /// [`FeatureStorage::drain`] there.
    pub fn wait_until_idle(&self) {
        if let Err(e) = self.queue.run_blocking(|_| ()) {
            tracing::warn!(feature = %self.feature, error = %e, "queue closed while waiting");
        }
    }

    /// Await every operation submitted so far
    pub async fn drain(&self) {
        if let Err(e) = self.queue.run(|_| ()).await {
            tracing::warn!(feature = %self.feature, error = %e, "queue closed while draining");
        }
    }
}

#[cfg(test)]
#[path = "storage_tests.rs"]
mod tests;
