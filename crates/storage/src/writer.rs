// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event writers

use crate::queue::SerialQueue;
use crate::storage::FeatureState;
use spool_core::Event;

/// Fire-and-forget event sink
///
/// `write` returns as soon as the event is queued; failures are reported to
/// telemetry and never reach the caller.
pub trait Writer: Send + Sync {
    fn write(&self, event: Event);
}

/// Writer bound to one feature's storage queue
#[derive(Clone)]
pub struct FeatureWriter {
    queue: SerialQueue<FeatureState>,
    force_new_batch: bool,
}

impl FeatureWriter {
    pub(crate) fn new(queue: SerialQueue<FeatureState>, force_new_batch: bool) -> Self {
        Self {
            queue,
            force_new_batch,
        }
    }
}

impl Writer for FeatureWriter {
    fn write(&self, event: Event) {
        let force_new_batch = self.force_new_batch;
        if let Err(e) = self
            .queue
            .submit(move |state| state.write(event, force_new_batch))
        {
            tracing::warn!(feature = %self.queue.name(), error = %e, "event dropped");
        }
    }
}

/// Writer that discards everything
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpWriter;

impl Writer for NoOpWriter {
    fn write(&self, _event: Event) {}
}
