// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Adapters for external I/O: request building and delivery

pub mod context;
pub mod request;
pub mod traced;
pub mod transport;

pub use context::{ContextProvider, UploadContext};
pub use request::{BuildError, FormatRequestBuilder, Request, RequestBuilder, REQUEST_ID_HEADER};
pub use traced::TracedTransport;
pub use transport::{HttpTransport, NoOpTransport, Transport, TransportError, TransportResponse};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use transport::FakeTransport;
