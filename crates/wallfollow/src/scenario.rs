// Wallfollow: a PID line-following simulation core written in Rust
// Copyright (c) 2025 Security Union LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::instrumentation::Channel;
use crate::stepper::{SimulationStepper, StepperConfig};

/// Preset runs from the wall-following lecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scenario {
    /// Follow the line `y = 0` without plotting anything.
    LineFollow,
    /// Follow the line `y = -3` while plotting the error and steering traces.
    PlottedLineFollow,
}

impl Scenario {
    pub const ALL: [Scenario; 2] = [Scenario::LineFollow, Scenario::PlottedLineFollow];

    pub fn name(&self) -> &'static str {
        match self {
            Scenario::LineFollow => "line_follow",
            Scenario::PlottedLineFollow => "plotted_line_follow",
        }
    }

    pub fn config(&self) -> StepperConfig {
        match self {
            Scenario::LineFollow => StepperConfig::default(),
            Scenario::PlottedLineFollow => StepperConfig::default()
                .with_start(-5.0, -3.0)
                .with_reference_line(-3.0)
                .with_channels([Channel::Error, Channel::ControllerOutput]),
        }
    }

    pub fn stepper(&self) -> SimulationStepper {
        SimulationStepper::new(self.config())
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
