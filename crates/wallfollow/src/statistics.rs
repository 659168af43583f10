// Wallfollow: a PID line-following simulation core written in Rust
// Copyright (c) 2025 Security Union LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use serde::{Deserialize, Serialize};

/// Default error band for considering the run "settled".
pub const DEFAULT_SETTLED_THRESHOLD: f64 = 0.05;

/// Statistics about how well a run tracked the reference line.
///
/// All times are simulated seconds since the start of the run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunStatistics {
    pub average_error: f64,         // Mean absolute lateral error
    pub max_deviation: f64,         // Largest absolute lateral error
    pub rise_time: Option<f64>,     // First time the error entered the settled band
    pub settling_time: Option<f64>, // Start of the current stretch inside the band
    pub samples: u64,
}

/// Running accumulator behind [`RunStatistics`].
#[derive(Debug, Clone)]
pub struct ErrorStatistics {
    error_sum: f64,
    samples: u64,
    max_deviation: f64,
    rise_time: Option<f64>,
    settling_time: Option<f64>,
    settled_threshold: f64,
}

impl Default for ErrorStatistics {
    fn default() -> Self {
        Self::new(DEFAULT_SETTLED_THRESHOLD)
    }
}

impl ErrorStatistics {
    pub fn new(settled_threshold: f64) -> Self {
        ErrorStatistics {
            error_sum: 0.0,
            samples: 0,
            max_deviation: 0.0,
            rise_time: None,
            settling_time: None,
            settled_threshold: settled_threshold.abs(),
        }
    }

    /// Fold in the lateral error observed at simulated time `time`.
    pub fn observe(&mut self, time: f64, error: f64) {
        let magnitude = error.abs();
        self.error_sum += magnitude;
        self.samples += 1;

        if magnitude > self.max_deviation {
            self.max_deviation = magnitude;
        }

        let within_band = magnitude <= self.settled_threshold;
        if within_band && self.rise_time.is_none() {
            self.rise_time = Some(time);
        }

        if within_band {
            if self.settling_time.is_none() {
                self.settling_time = Some(time);
            }
        } else {
            // Leaving the band invalidates any earlier settling.
            self.settling_time = None;
        }
    }

    pub fn settled_threshold(&self) -> f64 {
        self.settled_threshold
    }

    pub fn snapshot(&self) -> RunStatistics {
        let average_error = if self.samples > 0 {
            self.error_sum / self.samples as f64
        } else {
            0.0
        };

        RunStatistics {
            average_error,
            max_deviation: self.max_deviation,
            rise_time: self.rise_time,
            settling_time: self.settling_time,
            samples: self.samples,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.settled_threshold);
    }
}
