// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Batch readers
//!
//! A batch is checked out when read and stays invisible to other reads
//! until it is either marked as read (deleted) or dropped (returned to the
//! eligible pool untouched).

use crate::queue::SerialQueue;
use crate::storage::{FeatureState, ReadBatch};
use async_trait::async_trait;
use spool_core::{DeletionReason, Event};
use std::fmt;

/// Source of batches for the upload worker
#[async_trait]
pub trait Reader: Send + Sync {
    /// Oldest batch whose age is within the read window
    async fn next_batch(&self) -> Option<Batch>;

    /// Oldest batch regardless of its age; the active file is still skipped
    async fn next_batch_ignoring_age(&self) -> Option<Batch>;

    /// Close the active file so it becomes readable
    async fn seal(&self);

    /// Delete the batch's file
    async fn mark_as_read(&self, batch: Batch, reason: DeletionReason);
}

/// Events of one batch file, checked out from storage
pub struct Batch {
    file_name: String,
    size: u64,
    events: Vec<Event>,
    lease: Lease,
}

impl Batch {
    fn checked_out(batch: ReadBatch, queue: SerialQueue<FeatureState>) -> Self {
        Self {
            lease: Lease {
                queue: Some(queue),
                file_name: batch.file_name.clone(),
            },
            file_name: batch.file_name,
            size: batch.size,
            events: batch.events,
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Size of the file on disk
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }
}

impl fmt::Debug for Batch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Batch")
            .field("file_name", &self.file_name)
            .field("size", &self.size)
            .field("events", &self.events.len())
            .finish_non_exhaustive()
    }
}

/// Returns the file to the eligible pool when dropped
struct Lease {
    queue: Option<SerialQueue<FeatureState>>,
    file_name: String,
}

impl Lease {
    fn disarm(&mut self) -> Option<SerialQueue<FeatureState>> {
        self.queue.take()
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        if let Some(queue) = self.queue.take() {
            let file_name = std::mem::take(&mut self.file_name);
            // Queue gone means the whole storage is gone
            let _ = queue.submit(move |state| state.release(&file_name));
        }
    }
}

/// Reader over the authorized directory of one feature
#[derive(Clone)]
pub struct FeatureReader {
    queue: SerialQueue<FeatureState>,
}

impl FeatureReader {
    pub(crate) fn new(queue: SerialQueue<FeatureState>) -> Self {
        Self { queue }
    }

    async fn checkout(&self, ignore_age: bool) -> Option<Batch> {
        let queue = self.queue.clone();
        // The lease is created on the queue so a batch dropped anywhere after
        // checkout is always released
        let result = self
            .queue
            .run(move |state| {
                state
                    .next_batch(ignore_age)
                    .map(|batch| Batch::checked_out(batch, queue))
            })
            .await;
        match result {
            Ok(batch) => batch,
            Err(e) => {
                tracing::warn!(feature = %self.queue.name(), error = %e, "batch read failed");
                None
            }
        }
    }
}

#[async_trait]
impl Reader for FeatureReader {
    async fn next_batch(&self) -> Option<Batch> {
        self.checkout(false).await
    }

    async fn next_batch_ignoring_age(&self) -> Option<Batch> {
        self.checkout(true).await
    }

    async fn seal(&self) {
        if let Err(e) = self.queue.run(FeatureState::seal).await {
            tracing::warn!(feature = %self.queue.name(), error = %e, "seal failed");
        }
    }

    async fn mark_as_read(&self, mut batch: Batch, reason: DeletionReason) {
        batch.lease.disarm();
        let file_name = std::mem::take(&mut batch.file_name);
        let result = self
            .queue
            .run(move |state| state.mark_as_read(&file_name, reason))
            .await;
        if let Err(e) = result {
            tracing::warn!(feature = %self.queue.name(), error = %e, "mark as read failed");
        }
    }
}

/// Reader that never has anything to read
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpReader;

#[async_trait]
impl Reader for NoOpReader {
    async fn next_batch(&self) -> Option<Batch> {
        None
    }

    async fn next_batch_ignoring_age(&self) -> Option<Batch> {
        None
    }

    async fn seal(&self) {}

    async fn mark_as_read(&self, _batch: Batch, _reason: DeletionReason) {}
}
