// Wallfollow: a PID line-following simulation core written in Rust
// Copyright (c) 2025 Security Union LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::io::Write;

use serde::{Deserialize, Serialize};

use crate::driver::{Observer, TickView};

/// One line of telemetry for a tick of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickRecord {
    /// Identifies the run the record belongs to
    pub run_id: String,
    /// Simulated time in seconds
    pub time: f64,
    pub x: f64,
    pub y: f64,
    pub heading: f64,
    pub speed: f64,
    /// Setpoint minus measurement, as seen by the controller
    pub error: f64,
    /// Clamped controller output
    pub output: f64,
    /// Proportional term
    pub p_term: f64,
    /// Integral term
    pub i_term: f64,
    /// Derivative term
    pub d_term: f64,
}

/// Observer writing one JSON object per tick to `W`.
///
/// Write failures are logged and counted; they never interrupt the run.
pub struct TelemetryWriter<W: Write> {
    run_id: String,
    writer: W,
    sample_interval: Option<f64>,
    last_sample: Option<f64>,
    written: u64,
    failures: u64,
}

impl<W: Write> TelemetryWriter<W> {
    pub fn new(run_id: impl Into<String>, writer: W) -> Self {
        TelemetryWriter {
            run_id: run_id.into(),
            writer,
            sample_interval: None,
            last_sample: None,
            written: 0,
            failures: 0,
        }
    }

    /// Write at most `hz` records per simulated second.
    pub fn with_sample_rate_hz(mut self, hz: f64) -> Self {
        self.sample_interval = Some(1.0 / hz);
        self
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn failures(&self) -> u64 {
        self.failures
    }

    pub fn flush(&mut self) -> std::io::Result<()> {
        self.writer.flush()
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn due(&mut self, time: f64) -> bool {
        if let Some(last) = self.last_sample {
            // Paused frames repeat the previous time.
            if time <= last {
                return false;
            }
            if self.sample_interval.is_some_and(|interval| time - last < interval) {
                return false;
            }
        }
        self.last_sample = Some(time);
        true
    }

    fn write_record(&mut self, record: &TickRecord) {
        let result = serde_json::to_writer(&mut self.writer, record)
            .map_err(std::io::Error::from)
            .and_then(|()| self.writer.write_all(b"\n"));

        match result {
            Ok(()) => self.written += 1,
            Err(e) => {
                self.failures += 1;
                log::warn!("failed to write telemetry for run '{}': {}", self.run_id, e);
            }
        }
    }
}

impl<W: Write> Observer for TelemetryWriter<W> {
    fn observe(&mut self, view: &TickView<'_>) {
        // Nothing to report before the controller has run.
        let Some(output) = view.output else {
            return;
        };
        if !self.due(view.state.elapsed_time) {
            return;
        }

        let record = TickRecord {
            run_id: self.run_id.clone(),
            time: view.state.elapsed_time,
            x: view.state.position.x,
            y: view.state.position.y,
            heading: view.state.heading,
            speed: view.state.speed,
            error: output.error,
            output: output.output,
            p_term: output.p_term,
            i_term: output.i_term,
            d_term: output.d_term,
        };
        self.write_record(&record);
    }
}
