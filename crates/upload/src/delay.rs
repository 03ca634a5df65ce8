// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Adaptive delay between upload cycles

use spool_core::UploadPreset;
use std::time::Duration;

/// Delay that shrinks after deliveries and grows after failures, always
/// staying within `[min, max]`
#[derive(Debug, Clone, PartialEq)]
pub struct UploadDelay {
    current: Duration,
    min: Duration,
    max: Duration,
    change_rate: f64,
}

impl UploadDelay {
    pub fn new(preset: &UploadPreset) -> Self {
        let min = preset.min_upload_delay;
        let max = preset.max_upload_delay.max(min);
        Self {
            current: preset.initial_upload_delay.clamp(min, max),
            min,
            max,
            change_rate: preset.upload_delay_change_rate,
        }
    }

    pub fn current(&self) -> Duration {
        self.current
    }

    /// Move toward `min` after a cycle where everything was delivered
    pub fn decrease(&mut self) {
        self.current = self.current.mul_f64(1.0 - self.change_rate).max(self.min);
    }

    /// Move toward `max` after a cycle that hit a failure or found nothing
    pub fn increase(&mut self) {
        self.current = self.current.mul_f64(1.0 + self.change_rate).min(self.max);
    }
}

#[cfg(test)]
#[path = "delay_tests.rs"]
mod tests;
