// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Feature registry: one storage and one upload worker per feature

use crate::error::WorkerError;
use crate::uploader::DataUploader;
use crate::worker::{DataUploadWorker, UploadLoop};
use spool_adapters::{ContextProvider, HttpTransport, RequestBuilder, TracedTransport, Transport};
use spool_core::{
    Clock, DataEncryption, PerformancePreset, SystemClock, Telemetry, TracedTelemetry,
    TrackingConsent,
};
use spool_storage::{FeatureStorage, FeatureWriter, StorageConfig};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Storage location and budgets shared by every feature
#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// Directory under which each feature gets `<feature>/{authorized,unauthorized}`
    pub root: PathBuf,
    pub preset: PerformancePreset,
    /// Consent at startup
    pub consent: TrackingConsent,
}

impl CoreConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            preset: PerformancePreset::default(),
            consent: TrackingConsent::Pending,
        }
    }

    pub fn with_preset(mut self, preset: PerformancePreset) -> Self {
        self.preset = preset;
        self
    }

    pub fn with_consent(mut self, consent: TrackingConsent) -> Self {
        self.consent = consent;
        self
    }
}

/// Collaborators shared by every feature
#[derive(Clone)]
pub struct CoreDeps {
    pub clock: Arc<dyn Clock>,
    pub telemetry: Arc<dyn Telemetry>,
    pub context: Arc<dyn ContextProvider>,
    pub transport: Arc<dyn Transport>,
    pub encryption: Option<Arc<dyn DataEncryption>>,
}

impl CoreDeps {
    /// Production collaborators: system clock, traced telemetry and a traced
    /// HTTP transport
    pub fn new(context: Arc<dyn ContextProvider>) -> Self {
        Self {
            clock: Arc::new(SystemClock),
            telemetry: Arc::new(TracedTelemetry),
            context,
            transport: Arc::new(TracedTransport::new(HttpTransport::default())),
            encryption: None,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_telemetry(mut self, telemetry: Arc<dyn Telemetry>) -> Self {
        self.telemetry = telemetry;
        self
    }

    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_encryption(mut self, encryption: Arc<dyn DataEncryption>) -> Self {
        self.encryption = Some(encryption);
        self
    }
}

struct RegisteredFeature {
    storage: FeatureStorage,
    worker: Arc<DataUploadWorker>,
}

/// Owns the storage and upload worker of every registered feature
///
/// Consent changes and data clearing are broadcast to all features. Workers
/// are spawned on the tokio runtime current at registration.
pub struct SpoolCore {
    config: CoreConfig,
    deps: CoreDeps,
    consent: Mutex<TrackingConsent>,
    features: Mutex<BTreeMap<String, RegisteredFeature>>,
}

impl SpoolCore {
    pub fn new(config: CoreConfig, deps: CoreDeps) -> Self {
        Self {
            consent: Mutex::new(config.consent),
            config,
            deps,
            features: Mutex::new(BTreeMap::new()),
        }
    }

    /// Open storage for `feature` and start its upload worker
    pub fn register<B: RequestBuilder>(
        &self,
        feature: &str,
        builder: B,
    ) -> Result<FeatureWriter, WorkerError> {
        let mut features = self.features.lock().unwrap_or_else(|e| e.into_inner());
        if features.contains_key(feature) {
            return Err(WorkerError::DuplicateFeature(feature.to_string()));
        }

        let preset = self.config.preset.storage.clone();
        let mut storage_config = StorageConfig::new(self.config.root.clone(), feature, preset)
            .with_consent(self.consent())
            .with_clock(Arc::clone(&self.deps.clock))
            .with_telemetry(Arc::clone(&self.deps.telemetry));
        if let Some(encryption) = &self.deps.encryption {
            storage_config = storage_config.with_encryption(Arc::clone(encryption));
        }
        let storage = FeatureStorage::open(storage_config)?;

        let uploader = DataUploader::new(
            builder,
            Arc::clone(&self.deps.transport),
            Arc::clone(&self.deps.context),
        );
        let upload_loop = UploadLoop::new(
            feature,
            Arc::new(storage.reader()),
            Arc::new(uploader),
            Arc::clone(&self.deps.telemetry),
            &self.config.preset.upload,
        );
        let worker = Arc::new(DataUploadWorker::spawn(upload_loop)?);

        tracing::info!(feature, root = %self.config.root.display(), "feature registered");
        let writer = storage.writer();
        features.insert(feature.to_string(), RegisteredFeature { storage, worker });
        Ok(writer)
    }

    /// Writer of an already registered feature
    pub fn writer(&self, feature: &str) -> Option<FeatureWriter> {
        let features = self.features.lock().unwrap_or_else(|e| e.into_inner());
        features.get(feature).map(|f| f.storage.writer())
    }

    pub fn features(&self) -> Vec<String> {
        let features = self.features.lock().unwrap_or_else(|e| e.into_inner());
        features.keys().cloned().collect()
    }

    pub fn consent(&self) -> TrackingConsent {
        *self.consent.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Record the new consent and migrate every feature's pending data
    pub fn set_consent(&self, consent: TrackingConsent) {
        *self.consent.lock().unwrap_or_else(|e| e.into_inner()) = consent;
        let features = self.features.lock().unwrap_or_else(|e| e.into_inner());
        for feature in features.values() {
            feature.storage.set_consent(consent);
        }
    }

    /// Delete all stored data of every feature
    pub fn clear_all_data(&self) {
        let features = self.features.lock().unwrap_or_else(|e| e.into_inner());
        for feature in features.values() {
            feature.storage.clear_all_data();
        }
    }

    /// Upload everything on disk for every feature, ignoring file age
    ///
    /// Returns the number of batches flushed.
    pub async fn flush(&self) -> usize {
        let mut flushed = 0;
        for (storage, worker) in self.snapshot() {
            storage.drain().await;
            flushed += worker.flush_synchronously().await;
        }
        flushed
    }

    /// Flush, then stop every worker and forget every feature
    pub async fn flush_and_tear_down(&self) -> Result<usize, WorkerError> {
        let flushed = self.flush().await;

        let features = {
            let mut features = self.features.lock().unwrap_or_else(|e| e.into_inner());
            std::mem::take(&mut *features)
        };
        for (name, feature) in features {
            feature.worker.stop().await?;
            feature.storage.drain().await;
            tracing::info!(feature = %name, "feature torn down");
        }
        Ok(flushed)
    }

    fn snapshot(&self) -> Vec<(FeatureStorage, Arc<DataUploadWorker>)> {
        let features = self.features.lock().unwrap_or_else(|e| e.into_inner());
        features
            .values()
            .map(|f| (f.storage.clone(), Arc::clone(&f.worker)))
            .collect()
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
