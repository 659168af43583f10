// Wallfollow: a PID line-following simulation core written in Rust
// Copyright (c) 2025 Security Union LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Clock drivers that feed time steps to a [`SimulationStepper`].
//!
//! A driver keeps ticking until the stepper stops or its clock runs out, so a
//! configuration that never terminates (for example `max_speed = 0`) still
//! returns control to the caller.

use crate::instrumentation::PlotSink;
use crate::pid::PidOutput;
use crate::state::SimulationState;
use crate::stepper::{RunState, SimulationStepper};

/// What an observer sees after each tick.
#[derive(Debug, Clone, Copy)]
pub struct TickView<'a> {
    /// Zero-based index of the clock step.
    pub tick: u64,
    pub dt: f64,
    pub state: &'a SimulationState,
    pub run_state: RunState,
    /// `None` until the first integrating tick.
    pub output: Option<&'a PidOutput>,
}

/// Something that watches the run, typically a renderer.
pub trait Observer {
    fn observe(&mut self, view: &TickView<'_>);
}

impl<F> Observer for F
where
    F: FnMut(&TickView<'_>),
{
    fn observe(&mut self, view: &TickView<'_>) {
        self(view)
    }
}

/// How a drive ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveOutcome {
    /// The stepper reached its terminal state after `ticks` clock steps.
    Stopped { ticks: u64 },
    /// The clock ran out after `ticks` steps with the stepper still running.
    ClockExhausted { ticks: u64 },
}

impl DriveOutcome {
    pub fn ticks(&self) -> u64 {
        match *self {
            DriveOutcome::Stopped { ticks } | DriveOutcome::ClockExhausted { ticks } => ticks,
        }
    }

    pub fn is_stopped(&self) -> bool {
        matches!(self, DriveOutcome::Stopped { .. })
    }
}

/// Tick `stepper` with every `dt` from `clock` until it stops or the clock is
/// exhausted, notifying `observer` after each step.
pub fn drive<S, I, O>(
    stepper: &mut SimulationStepper<S>,
    clock: I,
    observer: &mut O,
) -> DriveOutcome
where
    S: PlotSink,
    I: IntoIterator<Item = f64>,
    O: Observer + ?Sized,
{
    let mut ticks = 0;
    if stepper.is_stopped() {
        return DriveOutcome::Stopped { ticks };
    }

    for dt in clock {
        let run_state = stepper.tick(dt);
        observer.observe(&TickView {
            tick: ticks,
            dt,
            state: stepper.state(),
            run_state,
            output: stepper.last_output(),
        });
        ticks += 1;

        if run_state == RunState::Stopped {
            return DriveOutcome::Stopped { ticks };
        }
    }

    log::warn!(
        "clock exhausted after {} ticks without the run stopping",
        ticks
    );
    DriveOutcome::ClockExhausted { ticks }
}

/// A fixed frame-rate clock with a tick budget.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedStepDriver {
    pub dt: f64,
    pub max_ticks: u64,
}

impl FixedStepDriver {
    pub fn new(dt: f64, max_ticks: u64) -> Self {
        FixedStepDriver { dt, max_ticks }
    }

    /// A driver ticking at `hz` frames per second for at most `seconds` of
    /// simulated time.
    pub fn from_rate(hz: f64, seconds: f64) -> Self {
        let dt = 1.0 / hz;
        FixedStepDriver {
            dt,
            max_ticks: (seconds * hz).ceil() as u64,
        }
    }

    pub fn run<S, O>(&self, stepper: &mut SimulationStepper<S>, observer: &mut O) -> DriveOutcome
    where
        S: PlotSink,
        O: Observer + ?Sized,
    {
        let clock = std::iter::repeat(self.dt).take(self.max_ticks as usize);
        drive(stepper, clock, observer)
    }
}
