// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Consent gate
//!
//! Routes writes to the `authorized` or `unauthorized` directory of a
//! feature and migrates data between them when consent changes.

use crate::directory::{Directory, MoveSummary};
use spool_core::TrackingConsent;
use std::io;
use std::path::Path;

pub const AUTHORIZED_DIR: &str = "authorized";
pub const UNAUTHORIZED_DIR: &str = "unauthorized";

/// The directory pair of one feature: `<root>/<feature>/{authorized,unauthorized}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureDirectories {
    pub authorized: Directory,
    pub unauthorized: Directory,
}

impl FeatureDirectories {
    pub fn open(root: &Path, feature: &str) -> io::Result<Self> {
        let base = Directory::open(root.join(feature))?;
        Ok(Self {
            authorized: base.subdirectory(AUTHORIZED_DIR)?,
            unauthorized: base.subdirectory(UNAUTHORIZED_DIR)?,
        })
    }
}

/// Where a write lands under the current consent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Authorized,
    Unauthorized,
}

/// What has to happen to the unauthorized directory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Migration {
    /// Consent granted: unauthorized data becomes uploadable
    MoveToAuthorized,
    /// Consent denied: unauthorized data must never leave the device
    DeleteUnauthorized,
    /// Consent pending: keep waiting
    Keep,
}

impl Migration {
    fn for_consent(consent: TrackingConsent) -> Self {
        match consent {
            TrackingConsent::Granted => Migration::MoveToAuthorized,
            TrackingConsent::NotGranted => Migration::DeleteUnauthorized,
            TrackingConsent::Pending => Migration::Keep,
        }
    }

    /// Apply to `directories`; returns what was moved or deleted
    pub fn apply(self, directories: &FeatureDirectories) -> io::Result<MoveSummary> {
        match self {
            Migration::MoveToAuthorized => directories
                .unauthorized
                .move_all_files(&directories.authorized),
            Migration::DeleteUnauthorized => directories.unauthorized.delete_all_files(),
            Migration::Keep => Ok(MoveSummary::default()),
        }
    }
}

/// Current consent plus the last consent whose migration completed
#[derive(Debug, Clone)]
pub struct ConsentGate {
    consent: TrackingConsent,
    migrated: Option<TrackingConsent>,
}

impl ConsentGate {
    pub fn new(consent: TrackingConsent) -> Self {
        Self {
            consent,
            migrated: None,
        }
    }

    pub fn consent(&self) -> TrackingConsent {
        self.consent
    }

    pub fn route(&self) -> Option<Route> {
        match self.consent {
            TrackingConsent::Granted => Some(Route::Authorized),
            TrackingConsent::Pending => Some(Route::Unauthorized),
            TrackingConsent::NotGranted => None,
        }
    }

    pub fn set_consent(&mut self, consent: TrackingConsent) {
        self.consent = consent;
    }

    /// Migration still owed for the current consent
    ///
    /// `None` once it has completed; a consent repeated after its migration
    /// ran owes nothing.
    pub fn pending_migration(&self) -> Option<Migration> {
        if self.migrated == Some(self.consent) {
            return None;
        }
        Some(Migration::for_consent(self.consent))
    }

    /// Record that the migration for the current consent completed
    ///
    /// A failed migration is left pending and retried on the next consent
    /// signal or the next startup.
    pub fn mark_migrated(&mut self) {
        self.migrated = Some(self.consent);
    }
}

#[cfg(test)]
#[path = "gate_tests.rs"]
mod tests;
