// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Serial execution context
//!
//! Every file operation of one feature runs as a job on a dedicated thread
//! that owns the feature's state. Jobs execute one at a time in submission
//! order, so the state needs no locking and writes never interleave with
//! reads or migrations.

use crate::error::StorageError;
use std::io;
use tokio::sync::{mpsc, oneshot};

type Job<S> = Box<dyn FnOnce(&mut S) + Send>;

/// Handle to a serial queue; cloning shares the same thread
pub struct SerialQueue<S> {
    name: String,
    tx: mpsc::UnboundedSender<Job<S>>,
}

impl<S> Clone for SerialQueue<S> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            tx: self.tx.clone(),
        }
    }
}

impl<S: Send + 'static> SerialQueue<S> {
    /// Start the queue thread; it exits once every handle is dropped and
    /// all submitted jobs have run.
    pub fn spawn(name: &str, state: S) -> io::Result<Self> {
        let (tx, mut rx) = mpsc::unbounded_channel::<Job<S>>();
        let mut state = state;

        std::thread::Builder::new()
            .name(format!("spool-{name}"))
            .spawn(move || {
                while let Some(job) = rx.blocking_recv() {
                    job(&mut state);
                }
                tracing::trace!("serial queue drained");
            })?;

        Ok(Self {
            name: name.to_string(),
            tx,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Enqueue a job without waiting for it
    pub fn submit(&self, job: impl FnOnce(&mut S) + Send + 'static) -> Result<(), StorageError> {
        self.tx
            .send(Box::new(job))
            .map_err(|_| StorageError::QueueClosed(self.name.clone()))
    }

    /// Enqueue a job and await its result
    pub async fn run<R: Send + 'static>(
        &self,
        job: impl FnOnce(&mut S) -> R + Send + 'static,
    ) -> Result<R, StorageError> {
        let (reply, response) = oneshot::channel();
        self.submit(move |state| {
            let _ = reply.send(job(state));
        })?;
        response
            .await
            .map_err(|_| StorageError::QueueClosed(self.name.clone()))
    }

    /// Enqueue a job and block the calling thread until it ran
    ///
    /// Must not be called from a job on this same queue.
    pub fn run_blocking<R: Send + 'static>(
        &self,
        job: impl FnOnce(&mut S) -> R + Send + 'static,
    ) -> Result<R, StorageError> {
        let (reply, response) = std::sync::mpsc::sync_channel(1);
        self.submit(move |state| {
            let _ = reply.send(job(state));
        })?;
        response
            .recv()
            .map_err(|_| StorageError::QueueClosed(self.name.clone()))
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
