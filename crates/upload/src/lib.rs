// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! spool-upload: moves stored batches to the intake
//!
//! Each registered feature gets a [`DataUploadWorker`] that polls its
//! storage with an adaptive delay, sends batches through a [`Uploader`],
//! and deletes or retains them based on the classified [`UploadStatus`].

mod delay;
mod error;
mod registry;
mod status;
mod uploader;
mod worker;

pub use delay::UploadDelay;
pub use error::WorkerError;
pub use registry::{CoreConfig, CoreDeps, SpoolCore};
pub use status::{UploadOutcome, UploadStatus};
pub use uploader::{DataUploader, Uploader};
pub use worker::{CycleOutcome, DataUploadWorker, UploadLoop};
