// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::uploader::DataUploader;
use async_trait::async_trait;
use spool_adapters::{
    FakeTransport, FormatRequestBuilder, Request, Transport, TransportError, TransportResponse,
    UploadContext,
};
use spool_core::{
    DataFormat, Event, FakeClock, FakeTelemetry, StoragePreset, TrackingConsent,
};
use spool_storage::{FeatureStorage, StorageConfig, Writer};
use std::path::PathBuf;
use tempfile::TempDir;
use tokio::sync::Notify;

fn storage_preset() -> StoragePreset {
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

fn upload_preset(max_batches_per_upload: usize) -> UploadPreset {
    UploadPreset {
        initial_upload_delay: Duration::from_secs(1),
        min_upload_delay: Duration::from_millis(100),
        max_upload_delay: Duration::from_secs(2),
        upload_delay_change_rate: 0.5,
        max_batches_per_upload,
    }
}

struct Harness {
    temp: TempDir,
    clock: FakeClock,
    telemetry: FakeTelemetry,
    transport: FakeTransport,
    storage: FeatureStorage,
}

impl Harness {
    fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let clock = FakeClock::new();
        let telemetry = FakeTelemetry::new();
        let config = StorageConfig::new(temp.path(), "logs", storage_preset())
            .with_consent(TrackingConsent::Granted)
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

    fn uploader_with<T: Transport>(&self, transport: T) -> Arc<dyn Uploader> {
        Arc::new(DataUploader::new(
            FormatRequestBuilder::new("https://intake.test/v1", DataFormat::json_array()),
            transport,
            Arc::new(UploadContext::new("token", "rust")),
        ))
    }

    fn upload_loop_with(&self, uploader: Arc<dyn Uploader>, preset: &UploadPreset) -> UploadLoop {
        UploadLoop::new(
            "logs",
            Arc::new(self.storage.reader()),
            uploader,
            Arc::new(self.telemetry.clone()),
            preset,
        )
    }

    fn upload_loop(&self, max_batches_per_upload: usize) -> UploadLoop {
        let uploader = self.uploader_with(self.transport.clone());
        self.upload_loop_with(uploader, &upload_preset(max_batches_per_upload))
    }

    /// Write events into separate batch files and age them past the read
    /// threshold
    async fn write_batches(&self, count: usize) {
        let writer = self.storage.writer_forcing_new_batch();
        for i in 0..count {
            writer.write(Event::from(format!("{{\"n\":{i}}}").as_str()));
        }
        self.storage.drain().await;
        self.clock.advance(Duration::from_secs(11));
    }

    fn authorized(&self) -> PathBuf {
        self.temp.path().join("logs/authorized")
    }

    fn files_on_disk(&self) -> usize {
        std::fs::read_dir(self.authorized()).unwrap().count()
    }
}

#[tokio::test]
async fn successful_upload_deletes_batch_and_shrinks_delay() {
    let h = Harness::new();
    h.write_batches(1).await;
    let mut upload_loop = h.upload_loop(1);

    let outcome = upload_loop.run_cycle().await;

    assert_eq!(outcome, CycleOutcome::Completed { batches: 1 });
    assert_eq!(h.transport.request_count(), 1);
    assert_eq!(h.files_on_disk(), 0);
    assert_eq!(h.telemetry.deletions(), vec![DeletionReason::Uploaded]);
    assert_eq!(upload_loop.delay(), Duration::from_millis(500));
}

#[tokio::test]
async fn retryable_status_keeps_batch_and_grows_delay() {
    let h = Harness::new();
    h.write_batches(1).await;
    h.transport.push_status(503);
    let mut upload_loop = h.upload_loop(1);

    let outcome = upload_loop.run_cycle().await;

    assert_eq!(outcome, CycleOutcome::Retained { batches: 0 });
    assert_eq!(h.files_on_disk(), 1);
    assert!(h.telemetry.deletions().is_empty());
    assert_eq!(upload_loop.delay(), Duration::from_millis(1_500));

    // The retained batch is eligible again on the next cycle
    let outcome = upload_loop.run_cycle().await;
    assert_eq!(outcome, CycleOutcome::Completed { batches: 1 });
    assert_eq!(h.transport.request_count(), 2);
}

#[tokio::test]
async fn transport_error_keeps_batch() {
    let h = Harness::new();
    h.write_batches(1).await;
    h.transport.push_error("offline");
    let mut upload_loop = h.upload_loop(1);

    let outcome = upload_loop.run_cycle().await;

    assert_eq!(outcome, CycleOutcome::Retained { batches: 0 });
    assert_eq!(h.files_on_disk(), 1);
}

#[tokio::test]
async fn client_error_deletes_batch_as_invalid_without_retry() {
    let h = Harness::new();
    h.write_batches(1).await;
    h.transport.push_status(400);
    let mut upload_loop = h.upload_loop(1);

    let outcome = upload_loop.run_cycle().await;

    assert_eq!(outcome, CycleOutcome::Completed { batches: 1 });
    assert_eq!(h.telemetry.deletions(), vec![DeletionReason::Invalid]);
    assert_eq!(
        h.telemetry.errors(),
        vec!["Data upload finished with status code: 400".to_string()]
    );

    assert_eq!(upload_loop.run_cycle().await, CycleOutcome::Idle);
    assert_eq!(h.transport.request_count(), 1);
}

#[tokio::test]
async fn idle_cycle_grows_delay() {
    let h = Harness::new();
    let mut upload_loop = h.upload_loop(1);

    assert_eq!(upload_loop.run_cycle().await, CycleOutcome::Idle);
    assert_eq!(upload_loop.delay(), Duration::from_millis(1_500));
    assert_eq!(h.transport.request_count(), 0);
}

#[tokio::test]
async fn cycle_uploads_at_most_max_batches_oldest_first() {
    let h = Harness::new();
    h.write_batches(3).await;
    let mut upload_loop = h.upload_loop(2);

    let outcome = upload_loop.run_cycle().await;

    assert_eq!(outcome, CycleOutcome::Completed { batches: 2 });
    assert_eq!(h.files_on_disk(), 1);
    let bodies: Vec<_> = h.transport.requests().into_iter().map(|r| r.body).collect();
    assert_eq!(bodies, vec![b"[{\"n\":0}]".to_vec(), b"[{\"n\":1}]".to_vec()]);
}

#[tokio::test]
async fn cycle_stops_at_first_retryable_outcome() {
    let h = Harness::new();
    h.write_batches(3).await;
    h.transport.push_status(202).push_status(503);
    let mut upload_loop = h.upload_loop(3);

    let outcome = upload_loop.run_cycle().await;

    assert_eq!(outcome, CycleOutcome::Retained { batches: 1 });
    assert_eq!(h.transport.request_count(), 2);
    assert_eq!(h.files_on_disk(), 2);
}

#[test]
fn spawn_outside_a_runtime_is_an_error() {
    let h = Harness::new();

    let err = DataUploadWorker::spawn(h.upload_loop(1)).err().unwrap();

    assert!(matches!(err, WorkerError::NoRuntime { feature, .. } if feature == "logs"));
}

#[tokio::test]
async fn flush_uploads_active_and_young_files() {
    let h = Harness::new();
    h.storage.writer().write(Event::from("{}"));
    let worker = DataUploadWorker::spawn(h.upload_loop(1)).unwrap();

    let flushed = worker.flush_synchronously().await;

    assert_eq!(flushed, 1);
    assert_eq!(h.transport.request_count(), 1);
    assert_eq!(h.files_on_disk(), 0);
    assert_eq!(h.telemetry.deletions(), vec![DeletionReason::Flushed]);
    worker.stop().await.unwrap();
}

#[tokio::test]
async fn flush_retries_once_then_deletes() {
    let h = Harness::new();
    h.storage.writer().write(Event::from("{}"));
    h.transport.push_status(503).push_status(503);
    let worker = DataUploadWorker::spawn(h.upload_loop(1)).unwrap();

    let flushed = worker.flush_synchronously().await;

    assert_eq!(flushed, 1);
    assert_eq!(h.transport.request_count(), 2);
    assert_eq!(h.files_on_disk(), 0);
    assert_eq!(h.telemetry.deletions(), vec![DeletionReason::Flushed]);
    worker.stop().await.unwrap();
}

#[tokio::test]
async fn spawned_worker_uploads_in_background() {
    let h = Harness::new();
    h.write_batches(1).await;
    let preset = UploadPreset {
        initial_upload_delay: Duration::from_millis(10),
        min_upload_delay: Duration::from_millis(10),
        max_upload_delay: Duration::from_millis(50),
        ..upload_preset(1)
    };
    let uploader = h.uploader_with(h.transport.clone());
    let worker = DataUploadWorker::spawn(h.upload_loop_with(uploader, &preset)).unwrap();

    tokio::time::timeout(Duration::from_secs(5), async {
        while h.files_on_disk() > 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();

    assert_eq!(h.transport.request_count(), 1);
    worker.stop().await.unwrap();
}

/// Shared buffer the subscriber writes formatted lines into
#[derive(Clone, Default)]
struct LogBuffer(Arc<std::sync::Mutex<Vec<u8>>>);

impl std::io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[test]
fn finished_cycle_logs_outcome_and_next_delay() {
    let buffer = LogBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .without_time()
        .finish();
    let h = Harness::new();
    let preset = UploadPreset {
        initial_upload_delay: Duration::from_millis(10),
        min_upload_delay: Duration::from_millis(10),
        max_upload_delay: Duration::from_millis(50),
        ..upload_preset(1)
    };

    tracing::subscriber::with_default(subscriber, || {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
            .block_on(async {
                let uploader = h.uploader_with(h.transport.clone());
                let worker =
                    DataUploadWorker::spawn(h.upload_loop_with(uploader, &preset)).unwrap();
                tokio::time::timeout(Duration::from_secs(5), async {
                    while worker.current_delay() == Duration::from_millis(10) {
                        tokio::time::sleep(Duration::from_millis(5)).await;
                    }
                })
                .await
                .unwrap();
                worker.stop().await.unwrap();
            });
    });

    let logs = String::from_utf8_lossy(&buffer.0.lock().unwrap()).into_owned();
    assert!(logs.contains("upload cycle finished"), "{logs}");
    assert!(logs.contains("outcome=Idle"), "{logs}");
    assert!(logs.contains("delay=15ms"), "{logs}");
}

#[tokio::test]
async fn stop_interrupts_sleep() {
    let h = Harness::new();
    let preset = UploadPreset {
        initial_upload_delay: Duration::from_secs(3600),
        max_upload_delay: Duration::from_secs(3600),
        ..upload_preset(1)
    };
    let uploader = h.uploader_with(h.transport.clone());
    let worker = DataUploadWorker::spawn(h.upload_loop_with(uploader, &preset)).unwrap();

    tokio::time::timeout(Duration::from_secs(5), worker.stop())
        .await
        .unwrap()
        .unwrap();

    assert!(worker.is_cancelled());
    assert_eq!(worker.current_delay(), Duration::from_secs(3600));
}

/// Transport that never answers, announcing each attempt
#[derive(Clone, Default)]
struct StalledTransport {
    started: Arc<Notify>,
}

#[async_trait]
impl Transport for StalledTransport {
    async fn send(&self, _request: Request) -> Result<TransportResponse, TransportError> {
        self.started.notify_one();
        std::future::pending().await
    }
}

#[tokio::test]
async fn cancelled_transfer_leaves_batch_on_disk() {
    let h = Harness::new();
    h.write_batches(1).await;
    let transport = StalledTransport::default();
    let started = transport.started.clone();
    let preset = UploadPreset {
        initial_upload_delay: Duration::from_millis(10),
        min_upload_delay: Duration::from_millis(10),
        ..upload_preset(1)
    };
    let uploader = h.uploader_with(transport);
    let worker = DataUploadWorker::spawn(h.upload_loop_with(uploader, &preset)).unwrap();

    tokio::time::timeout(Duration::from_secs(5), started.notified())
        .await
        .unwrap();
    worker.stop().await.unwrap();

    assert_eq!(h.files_on_disk(), 1);
    // Released back to the pool: a fresh read sees it again
    let reader = h.storage.reader();
    assert!(spool_storage::Reader::next_batch(&reader).await.is_some());
}
