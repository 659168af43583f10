// Wallfollow: a PID line-following simulation core written in Rust
// Copyright (c) 2025 Security Union LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use thiserror::Error;

/// Error type for loading and validating simulation configuration.
///
/// The simulation itself never fails; these only come from the opt-in
/// configuration checks.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration text could not be parsed.
    #[error("invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),

    /// A numeric field was NaN or infinite.
    #[error("{field} must be a finite number")]
    NonFinite { field: &'static str },

    /// With `max_speed <= 0` the agent never moves and the run never stops.
    #[error("max_speed must be positive for the run to terminate, got {max_speed}")]
    NonTerminating { max_speed: f64 },

    /// Without positive acceleration the agent never reaches the boundary.
    #[error("acceleration must be positive, got {0}")]
    NonPositiveAcceleration(f64),

    #[error("initial speed must not be negative, got {0}")]
    NegativeSpeed(f64),
}
