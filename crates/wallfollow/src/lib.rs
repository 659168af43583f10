// Wallfollow: a PID line-following simulation core written in Rust
// Copyright (c) 2025 Security Union LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! A discrete-time PID controller and the line-following simulation it drives.
//!
//! A [`SimulationStepper`] owns one run: an agent that starts near a reference
//! line, steers towards it with a [`PidController`], accelerates up to a
//! maximum speed and brakes to a stop once it has crossed an end boundary.
//! Time only moves when the caller ticks the stepper, so runs are fully
//! deterministic for a given sequence of time steps.
//!
//! ```
//! use wallfollow::{FixedStepDriver, Scenario, TickView};
//!
//! let mut stepper = Scenario::LineFollow.stepper();
//! let outcome = FixedStepDriver::new(0.02, 2_000).run(&mut stepper, &mut |view: &TickView<'_>| {
//!     let _ = view.state.position;
//! });
//!
//! assert!(outcome.is_stopped());
//! assert_eq!(stepper.state().speed, 0.0);
//! ```
//!
//! Per-channel traces of the error, output and P/I/D terms can be recorded
//! for plotting; see [`instrumentation`].

pub mod driver;
mod error;
pub mod instrumentation;
pub mod pid;
pub mod scenario;
mod state;
pub mod statistics;
pub mod stepper;
pub mod telemetry;

pub use driver::{drive, DriveOutcome, FixedStepDriver, Observer, TickView};
pub use error::ConfigError;
pub use instrumentation::{
    Channel, Instrumentation, PlotSink, Sample, Segment, SegmentRecorder, Trace,
};
pub use pid::{ControllerConfig, OutputLimits, PidController, PidOutput};
pub use scenario::Scenario;
pub use state::{Point2, SimulationState};
pub use statistics::{ErrorStatistics, RunStatistics};
pub use stepper::{RunState, SimulationStepper, StepperConfig};
pub use telemetry::{TelemetryWriter, TickRecord};
