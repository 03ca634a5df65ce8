// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Background upload worker
//!
//! ```text
//! Sleeping ──delay──► Idle ──batch──► Uploading ──► delete (uploaded | invalid)
//!    ▲                 │                  │
//!    │                 │ none             └──► retain (retryable)
//!    └─────────────────┴──────────────────────────────┘
//! ```
//!
//! Cancellation interrupts both the sleep and an in-flight transfer; an
//! interrupted batch stays on disk.

use crate::delay::UploadDelay;
use crate::error::WorkerError;
use crate::status::UploadStatus;
use crate::uploader::Uploader;
use spool_core::preset::format_duration;
use spool_core::{DeletionReason, Telemetry, TelemetryEvent, UploadPreset};
use spool_storage::{Batch, Reader};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Result of one upload cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// No batch was eligible
    Idle,
    /// Every batch read was delivered or discarded
    Completed { batches: usize },
    /// A retryable failure stopped the cycle; that batch was kept
    Retained { batches: usize },
}

/// Shared pieces of the upload pipeline of one feature
#[derive(Clone)]
struct Pipeline {
    feature: String,
    reader: Arc<dyn Reader>,
    uploader: Arc<dyn Uploader>,
    telemetry: Arc<dyn Telemetry>,
}

impl Pipeline {
    async fn upload(&self, batch: &Batch) -> UploadStatus {
        let status = self.uploader.upload(batch.events()).await;
        tracing::debug!(
            feature = %self.feature,
            file = %batch.file_name(),
            events = batch.events().len(),
            status = %status.debug_description,
            "upload attempt"
        );
        if let Some(message) = &status.user_error_message {
            tracing::error!(feature = %self.feature, "{message}");
        }
        if let Some(message) = &status.monitoring_error_message {
            self.telemetry
                .report(TelemetryEvent::error(&self.feature, message.clone()));
        }
        status
    }
}

/// Upload loop state: the pipeline plus the adaptive delay it owns
pub struct UploadLoop {
    pipeline: Pipeline,
    delay: UploadDelay,
    max_batches_per_upload: usize,
}

impl UploadLoop {
    pub fn new(
        feature: &str,
        reader: Arc<dyn Reader>,
        uploader: Arc<dyn Uploader>,
        telemetry: Arc<dyn Telemetry>,
        preset: &UploadPreset,
    ) -> Self {
        Self {
            pipeline: Pipeline {
                feature: feature.to_string(),
                reader,
                uploader,
                telemetry,
            },
            delay: UploadDelay::new(preset),
            max_batches_per_upload: preset.max_batches_per_upload.max(1),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay.current()
    }

    /// Upload up to `max_batches_per_upload` batches, oldest first
    ///
    /// Stops at the first retryable outcome. The delay shrinks when every
    /// batch read was settled and grows otherwise, including when nothing
    /// was eligible.
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        let mut batches = 0;

        let outcome = loop {
            if batches == self.max_batches_per_upload {
                break CycleOutcome::Completed { batches };
            }
            let Some(batch) = self.pipeline.reader.next_batch().await else {
                break if batches == 0 {
                    CycleOutcome::Idle
                } else {
                    CycleOutcome::Completed { batches }
                };
            };

            let status = self.pipeline.upload(&batch).await;
            match status.deletion_reason() {
                Some(reason) => {
                    self.pipeline.reader.mark_as_read(batch, reason).await;
                    batches += 1;
                }
                None => {
                    tracing::debug!(
                        feature = %self.pipeline.feature,
                        file = %batch.file_name(),
                        "batch retained for retry"
                    );
                    drop(batch);
                    break CycleOutcome::Retained { batches };
                }
            }
        };

        match outcome {
            CycleOutcome::Completed { .. } => self.delay.decrease(),
            CycleOutcome::Idle | CycleOutcome::Retained { .. } => self.delay.increase(),
        }
        outcome
    }

    async fn run(mut self, cancel: CancellationToken, delay: watch::Sender<Duration>) {
        tracing::info!(feature = %self.pipeline.feature, "upload worker started");
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.delay.current()) => {}
            }
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                outcome = self.run_cycle() => outcome,
            };
            tracing::debug!(
                feature = %self.pipeline.feature,
                ?outcome,
                delay = %format_duration(self.delay.current()),
                "upload cycle finished"
            );
            let _ = delay.send(self.delay.current());
        }
        tracing::info!(feature = %self.pipeline.feature, "upload worker stopped");
    }
}

/// Handle to a running upload loop
pub struct DataUploadWorker {
    pipeline: Pipeline,
    cancel: CancellationToken,
    delay: watch::Receiver<Duration>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl DataUploadWorker {
    /// Spawn the loop on the current tokio runtime; the first cycle runs
    /// after the initial delay.
    ///
    /// Fails when called outside a runtime.
    pub fn spawn(upload_loop: UploadLoop) -> Result<Self, WorkerError> {
        let runtime = Handle::try_current().map_err(|e| WorkerError::NoRuntime {
            feature: upload_loop.pipeline.feature.clone(),
            message: e.to_string(),
        })?;
        let pipeline = upload_loop.pipeline.clone();
        let cancel = CancellationToken::new();
        let (delay_tx, delay_rx) = watch::channel(upload_loop.delay());
        let task = runtime.spawn(upload_loop.run(cancel.clone(), delay_tx));

        Ok(Self {
            pipeline,
            cancel,
            delay: delay_rx,
            task: Mutex::new(Some(task)),
        })
    }

    pub fn feature(&self) -> &str {
        &self.pipeline.feature
    }

    /// Delay before the next cycle, as of the last completed cycle
    pub fn current_delay(&self) -> Duration {
        *self.delay.borrow()
    }

    /// Upload every batch currently on disk, ignoring file age
    ///
    /// The active file is sealed first so everything written so far is
    /// included. Each batch gets one retry on a retryable outcome and is then
    /// deleted as flushed whatever the result. Returns the number of batches
    /// flushed.
    pub async fn flush_synchronously(&self) -> usize {
        let pipeline = &self.pipeline;
        pipeline.reader.seal().await;

        let mut flushed = 0;
        while let Some(batch) = pipeline.reader.next_batch_ignoring_age().await {
            let status = pipeline.upload(&batch).await;
            if status.needs_retry() {
                let retry = pipeline.upload(&batch).await;
                if retry.needs_retry() {
                    tracing::warn!(
                        feature = %pipeline.feature,
                        file = %batch.file_name(),
                        status = %retry.debug_description,
                        "flushed batch was not delivered"
                    );
                }
            }
            pipeline
                .reader
                .mark_as_read(batch, DeletionReason::Flushed)
                .await;
            flushed += 1;
        }

        tracing::debug!(feature = %pipeline.feature, flushed, "flush complete");
        flushed
    }

    /// Request cancellation without waiting for the loop to exit
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Cancel and wait for the loop to exit
    pub async fn stop(&self) -> Result<(), WorkerError> {
        self.cancel();
        let task = self.task.lock().unwrap_or_else(|e| e.into_inner()).take();
        match task {
            Some(task) => task.await.map_err(|e| WorkerError::Join {
                feature: self.pipeline.feature.clone(),
                message: e.to_string(),
            }),
            None => Ok(()),
        }
    }
}

impl Drop for DataUploadWorker {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
