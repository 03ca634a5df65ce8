//! Upload outcome specs
//!
//! Verify what happens to a batch, the delay and telemetry for each class
//! of intake response.

use crate::prelude::*;

#[tokio::test]
async fn service_unavailable_retains_batch_and_backs_off() {
    let spool = Spool::granted();
    spool.write(&["{}"]).await;
    spool.age_past_read();
    spool.transport.push_status(503);
    let mut upload_loop = spool.upload_loop();
    let before = upload_loop.delay();

    let outcome = upload_loop.run_cycle().await;

    assert_eq!(outcome, CycleOutcome::Retained { batches: 0 });
    assert!(upload_loop.delay() > before);
    assert_eq!(file_names(&spool.authorized()).len(), 1);
    assert!(spool.telemetry.deletions().is_empty());
}

#[tokio::test]
async fn bad_request_deletes_batch_as_invalid_without_retry() {
    let spool = Spool::granted();
    spool.write(&["{}"]).await;
    spool.age_past_read();
    spool.transport.push_status(400);
    let mut upload_loop = spool.upload_loop();

    upload_loop.run_cycle().await;
    upload_loop.run_cycle().await;

    assert_eq!(spool.transport.request_count(), 1);
    assert!(file_names(&spool.authorized()).is_empty());
    assert_eq!(spool.telemetry.deletions(), vec![DeletionReason::Invalid]);
    assert_eq!(
        spool.telemetry.errors(),
        vec!["Data upload finished with status code: 400".to_string()]
    );
}

#[tokio::test]
async fn delivered_batch_is_sent_exactly_once() {
    let spool = Spool::granted();
    spool.write(&["{\"a\":1}", "{\"b\":2}"]).await;
    spool.age_past_read();
    let mut upload_loop = spool.upload_loop();
    let before = upload_loop.delay();

    assert_eq!(
        upload_loop.run_cycle().await,
        CycleOutcome::Completed { batches: 1 }
    );
    assert!(upload_loop.delay() < before);
    assert_eq!(upload_loop.run_cycle().await, CycleOutcome::Idle);

    let requests = spool.transport.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].body, b"[{\"a\":1},{\"b\":2}]");
    assert_eq!(spool.telemetry.deletions(), vec![DeletionReason::Uploaded]);
}

#[tokio::test]
async fn retained_batch_is_delivered_once_intake_recovers() {
    let spool = Spool::granted();
    spool.write(&["{}"]).await;
    spool.age_past_read();
    spool.transport.push_status(503).push_status(429);
    let mut upload_loop = spool.upload_loop();

    upload_loop.run_cycle().await;
    upload_loop.run_cycle().await;
    let outcome = upload_loop.run_cycle().await;

    assert_eq!(outcome, CycleOutcome::Completed { batches: 1 });
    assert_eq!(spool.transport.request_count(), 3);
    assert!(file_names(&spool.authorized()).is_empty());
}
