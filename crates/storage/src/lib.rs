// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! spool-storage: durable on-disk event queue
//!
//! Events are appended to batch files in a per-feature directory pair
//! (`authorized` / `unauthorized`). The files orchestrator bounds file
//! size, age, object count and directory size; the consent gate routes
//! writes and migrates data when consent changes. All file operations of a
//! feature run on its serial queue.

pub mod block;
pub mod directory;
mod error;
pub mod file;
pub mod gate;
pub mod orchestrator;
mod queue;
pub mod reader;
mod storage;
pub mod writer;

pub use directory::{Directory, MoveSummary};
pub use error::StorageError;
pub use file::{BatchFile, ReadableFile, WritableFile};
pub use gate::{ConsentGate, FeatureDirectories, Migration, Route};
pub use orchestrator::FilesOrchestrator;
pub use queue::SerialQueue;
pub use reader::{Batch, FeatureReader, NoOpReader, Reader};
pub use storage::{FeatureStorage, StorageConfig};
pub use writer::{FeatureWriter, NoOpWriter, Writer};
