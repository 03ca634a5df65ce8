//! Batching specs
//!
//! Verify how writes are grouped into files and how the directory budget
//! is enforced.

use crate::prelude::*;
use spool_storage::orchestrator::file_name_from;

#[tokio::test]
async fn three_records_with_two_per_file_make_two_files() {
    let spool = Spool::granted();

    spool.write(&["0123456789", "abcdefghij", "klmnopqrst"]).await;

    assert_eq!(file_names(&spool.authorized()).len(), 2);

    spool.age_past_read();
    let reader = spool.storage.reader();
    let first = reader.next_batch().await.unwrap();
    assert_eq!(first.events().len(), 2);
    reader.mark_as_read(first, DeletionReason::Uploaded).await;
    let second = reader.next_batch().await.unwrap();
    assert_eq!(second.events(), &[Event::from("klmnopqrst")]);
}

#[tokio::test]
async fn files_never_exceed_max_file_size() {
    let spool = Spool::with(
        TrackingConsent::Granted,
        StoragePreset {
            max_file_size: 100,
            max_objects_in_file: 100,
            ..storage_preset()
        },
    );

    let payload = "x".repeat(20);
    spool.write(&[payload.as_str(); 10]).await;

    let dir = spool.authorized();
    let names = file_names(&dir);
    assert!(names.len() > 1);
    for name in names {
        assert!(std::fs::metadata(dir.join(name)).unwrap().len() <= 100);
    }
}

#[tokio::test]
async fn full_directory_evicts_oldest_files_before_writing() {
    let temp = tempfile::TempDir::new().unwrap();
    let authorized = temp.path().join(FEATURE).join("authorized");
    std::fs::create_dir_all(&authorized).unwrap();
    // 5 files of 24 bytes: 120 in total
    for micros in 1..=5 {
        std::fs::write(authorized.join(file_name_from(micros)), [0u8; 24]).unwrap();
    }
    let spool = Spool::open_in(
        temp,
        TrackingConsent::Granted,
        StoragePreset {
            max_directory_size: 100,
            ..storage_preset()
        },
    );

    // 9 bytes of framing + 15 bytes of payload
    spool.write(&["fifteen bytes!!"]).await;

    let names = file_names(&spool.authorized());
    assert_eq!(names.len(), 4);
    assert_eq!(names[..3], [3, 4, 5].map(file_name_from));
    assert!(dir_size(&spool.authorized()) <= 100);
    assert_eq!(
        spool.telemetry.deletions(),
        vec![DeletionReason::Obsolete, DeletionReason::Obsolete]
    );
}

#[tokio::test]
async fn oversized_event_is_dropped() {
    let spool = Spool::granted();

    let payload = "x".repeat(200);
    spool.write(&[payload.as_str()]).await;

    assert!(file_names(&spool.authorized()).is_empty());
    assert_eq!(spool.telemetry.errors().len(), 1);
}

#[tokio::test]
async fn append_torn_by_a_crash_keeps_earlier_events() {
    let spool = Spool::granted();
    spool.write(&["a", "b"]).await;
    let names = file_names(&spool.authorized());
    assert_eq!(names.len(), 1);
    let path = spool.authorized().join(&names[0]);
    let mut bytes = std::fs::read(&path).unwrap();
    bytes.extend_from_slice(&[0x01, 0x05, 0x00]);
    std::fs::write(&path, bytes).unwrap();
    spool.age_past_read();

    let reader = spool.storage.reader();
    let batch = reader.next_batch().await.unwrap();

    assert_eq!(batch.events(), &[Event::from("a"), Event::from("b")]);
    assert_eq!(file_names(&spool.authorized()).len(), 1);
    assert!(spool.telemetry.deletions().is_empty());
    assert_eq!(spool.telemetry.errors().len(), 1);
}

#[tokio::test]
async fn concurrent_writers_share_one_active_file() {
    let spool = Spool::granted();
    let writer = spool.storage.writer();

    let tasks: Vec<_> = (0..8)
        .map(|task| {
            let writer = writer.clone();
            tokio::spawn(async move {
                for i in 0..25 {
                    writer.write(Event::from(format!("{task}-{i}").as_str()));
                    tokio::task::yield_now().await;
                }
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap();
    }
    spool.storage.drain().await;

    assert_eq!(file_names(&spool.authorized()).len(), 100);
    spool.age_past_read();
    let reader = spool.storage.reader();
    let mut total = 0;
    while let Some(batch) = reader.next_batch().await {
        assert_eq!(batch.events().len(), 2);
        total += batch.events().len();
        reader.mark_as_read(batch, DeletionReason::Uploaded).await;
    }
    assert_eq!(total, 200);
}
