// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tracking consent
//!
//! The host application decides whether collected data may leave the
//! device. Data collected while consent is pending is kept aside until the
//! decision is made.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Tri-state authorization signal gating uploads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingConsent {
    /// Data is collected and may be uploaded
    Granted,
    /// Data is collected but held back until a decision is made
    Pending,
    /// Data is neither collected nor uploaded
    NotGranted,
}

impl TrackingConsent {
    /// Whether events written under this consent are persisted at all
    pub fn collects(self) -> bool {
        !matches!(self, TrackingConsent::NotGranted)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TrackingConsent::Granted => "granted",
            TrackingConsent::Pending => "pending",
            TrackingConsent::NotGranted => "not_granted",
        }
    }
}

impl fmt::Display for TrackingConsent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown tracking consent: {0}")]
pub struct ParseConsentError(String);

impl FromStr for TrackingConsent {
    type Err = ParseConsentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "granted" => Ok(TrackingConsent::Granted),
            "pending" => Ok(TrackingConsent::Pending),
            "not_granted" | "denied" => Ok(TrackingConsent::NotGranted),
            other => Err(ParseConsentError(other.to_string())),
        }
    }
}
