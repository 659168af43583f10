// Wallfollow: a PID line-following simulation core written in Rust
// Copyright (c) 2025 Security Union LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use serde::{Deserialize, Serialize};

/// A point in the plane.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    pub const fn new(x: f64, y: f64) -> Self {
        Point2 { x, y }
    }
}

/// Kinematic state of the simulated agent.
///
/// A plain snapshot: renderers copy it after each tick instead of
/// subscribing to live values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulationState {
    pub position: Point2,
    /// Radians, counter-clockwise from the +x axis.
    pub heading: f64,
    /// Never negative.
    pub speed: f64,
    /// Simulated seconds since the start of the run.
    pub elapsed_time: f64,
}

impl SimulationState {
    pub fn new(position: Point2, heading: f64, speed: f64) -> Self {
        SimulationState {
            position,
            heading,
            speed,
            elapsed_time: 0.0,
        }
    }
}
