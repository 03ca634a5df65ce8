//! Consent specs
//!
//! Verify that pending data waits in `unauthorized/`, moves on grant, is
//! purged on denial, and that leftovers are migrated at startup.

use crate::prelude::*;

#[tokio::test]
async fn pending_data_is_held_back_until_granted() {
    let spool = Spool::with(TrackingConsent::Pending, storage_preset());
    spool.write(&["{\"a\":1}"]).await;
    spool.age_past_read();

    assert_eq!(file_names(&spool.unauthorized()).len(), 1);
    assert!(spool.storage.reader().next_batch().await.is_none());

    spool.storage.set_consent(TrackingConsent::Granted);
    spool.storage.drain().await;

    assert!(file_names(&spool.unauthorized()).is_empty());
    assert_eq!(file_names(&spool.authorized()).len(), 1);
    let batch = spool.storage.reader().next_batch().await.unwrap();
    assert_eq!(batch.events(), &[Event::from("{\"a\":1}")]);
}

#[tokio::test]
async fn denial_purges_pending_data_and_drops_new_writes() {
    let spool = Spool::with(TrackingConsent::Pending, storage_preset());
    spool.write(&["{}", "{}"]).await;

    spool.storage.set_consent(TrackingConsent::NotGranted);
    spool.write(&["{}"]).await;

    assert!(file_names(&spool.unauthorized()).is_empty());
    assert!(file_names(&spool.authorized()).is_empty());
    assert_eq!(
        spool.telemetry.deletions(),
        vec![DeletionReason::ConsentRevoked]
    );
}

#[tokio::test]
async fn repeating_the_same_consent_changes_nothing() {
    let spool = Spool::with(TrackingConsent::Pending, storage_preset());
    spool.write(&["{}"]).await;

    spool.storage.set_consent(TrackingConsent::Granted);
    spool.storage.set_consent(TrackingConsent::Granted);
    spool.write(&["{}"]).await;

    assert_eq!(file_names(&spool.authorized()).len(), 2);
    assert!(spool.telemetry.deletions().is_empty());
}

#[tokio::test]
async fn leftovers_from_a_previous_run_migrate_at_startup() {
    let temp = tempfile::TempDir::new().unwrap();
    let unauthorized = temp.path().join(FEATURE).join("unauthorized");
    std::fs::create_dir_all(&unauthorized).unwrap();
    std::fs::write(unauthorized.join("00000000000000000001"), b"").unwrap();

    let spool = Spool::open_in(temp, TrackingConsent::Granted, storage_preset());
    spool.storage.drain().await;

    assert!(file_names(&spool.unauthorized()).is_empty());
    assert_eq!(
        file_names(&spool.authorized()),
        vec!["00000000000000000001".to_string()]
    );
}
