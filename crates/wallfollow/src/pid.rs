// Wallfollow: a PID line-following simulation core written in Rust
// Copyright (c) 2025 Security Union LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Discrete-time PID controller.
//!
//! The controller follows the textbook law
//! `u = Kp * e + Ki * ∫e dt + Kd * de/dt` with `e = setpoint - measurement`,
//! evaluated once per call to [`PidController::update`].

use serde::{Deserialize, Serialize};

/// Optional clamp bounds applied to the controller output.
///
/// Either side may be `None`, meaning "no limit on that side".
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutputLimits {
    pub low: Option<f64>,
    pub high: Option<f64>,
}

impl OutputLimits {
    /// No clamping in either direction.
    pub const UNBOUNDED: OutputLimits = OutputLimits {
        low: None,
        high: None,
    };

    pub fn new(low: Option<f64>, high: Option<f64>) -> Self {
        OutputLimits { low, high }
    }

    /// Limits of `[-limit, limit]`.
    pub fn symmetric(limit: f64) -> Self {
        OutputLimits {
            low: Some(-limit),
            high: Some(limit),
        }
    }

    /// Clamp `value` against the low bound first, then the high bound.
    ///
    /// With inverted bounds (`low > high`) the high bound wins.
    pub fn clamp(&self, value: f64) -> f64 {
        let mut value = value;
        if let Some(low) = self.low {
            if value < low {
                value = low;
            }
        }
        if let Some(high) = self.high {
            if value > high {
                value = high;
            }
        }
        value
    }
}

impl Default for OutputLimits {
    fn default() -> Self {
        OutputLimits::UNBOUNDED
    }
}

/// Configuration for a PID controller.
///
/// Uses a builder pattern to configure the controller parameters. Values are
/// accepted as-is: NaN or infinite gains are not rejected and simply propagate
/// through the arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub kp: f64,       // Proportional gain
    pub ki: f64,       // Integral gain
    pub kd: f64,       // Derivative gain
    pub setpoint: f64, // Target measurement
    pub output_limits: OutputLimits,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        ControllerConfig {
            kp: 0.0,
            ki: 0.0,
            kd: 0.0,
            setpoint: 0.0,
            output_limits: OutputLimits::default(),
        }
    }
}

impl ControllerConfig {
    /// Create a new PID controller configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the proportional gain (Kp).
    ///
    /// # Arguments
    ///
    /// * `kp` - Proportional gain coefficient
    ///
    /// # Returns
    ///
    /// * The updated configuration builder
    ///
    /// # Notes
    ///
    /// Negative and non-finite values are accepted as-is.
    pub fn with_kp(mut self, kp: f64) -> Self {
        self.kp = kp;
        self
    }

    /// Set the integral gain (Ki).
    ///
    /// # Arguments
    ///
    /// * `ki` - Integral gain coefficient
    ///
    /// # Returns
    ///
    /// * The updated configuration builder
    pub fn with_ki(mut self, ki: f64) -> Self {
        self.ki = ki;
        self
    }

    /// Set the derivative gain (Kd).
    ///
    /// # Arguments
    ///
    /// * `kd` - Derivative gain coefficient
    ///
    /// # Returns
    ///
    /// * The updated configuration builder
    pub fn with_kd(mut self, kd: f64) -> Self {
        self.kd = kd;
        self
    }

    /// Set the setpoint (target value).
    ///
    /// # Arguments
    ///
    /// * `setpoint` - The measurement the controller drives towards
    ///
    /// # Returns
    ///
    /// * The updated configuration builder
    pub fn with_setpoint(mut self, setpoint: f64) -> Self {
        self.setpoint = setpoint;
        self
    }

    /// Set the output limits (low, high).
    ///
    /// # Arguments
    ///
    /// * `low` - Lower clamp bound, or `None` for no lower limit
    /// * `high` - Upper clamp bound, or `None` for no upper limit
    ///
    /// # Returns
    ///
    /// * The updated configuration builder
    ///
    /// # Notes
    ///
    /// Without a call to this method the output is not clamped.
    pub fn with_output_limits(mut self, low: Option<f64>, high: Option<f64>) -> Self {
        self.output_limits = OutputLimits::new(low, high);
        self
    }
}

/// Result of a single controller update.
///
/// `output` is clamped to the configured limits; the three terms are the
/// unclamped weighted contributions after this update.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PidOutput {
    /// Setpoint minus measurement for this update.
    pub error: f64,
    pub output: f64,
    pub p_term: f64,
    pub i_term: f64,
    pub d_term: f64,
}

/// A PID controller with an explicit time step per update.
///
/// There is no anti-windup: when the output saturates the integral keeps
/// accumulating the raw error.
#[derive(Debug, Clone)]
pub struct PidController {
    config: ControllerConfig,
    integral: f64,               // Accumulated error * dt
    previous_error: Option<f64>, // Unset before the first update and after reset
}

impl PidController {
    /// Create a new PID controller with the given configuration.
    pub fn new(config: ControllerConfig) -> Self {
        PidController {
            config,
            integral: 0.0,
            previous_error: None,
        }
    }

    /// Compute the control output for `measurement`.
    ///
    /// # Arguments
    /// * `measurement` - The current measured value of the process variable
    /// * `dt` - Seconds since the previous update. `None`, zero, negative and
    ///   NaN values mean no time passed: the integral is left alone and the
    ///   derivative term is zero.
    ///
    /// The current error is always stored as the reference for the next
    /// derivative, even when `dt` was not usable.
    pub fn update(&mut self, measurement: f64, dt: impl Into<Option<f64>>) -> PidOutput {
        let error = self.config.setpoint - measurement;
        let dt = dt.into().filter(|dt| *dt > 0.0);

        if let Some(dt) = dt {
            self.integral += error * dt;
        }

        let derivative = match (dt, self.previous_error) {
            (Some(dt), Some(previous)) => (error - previous) / dt,
            _ => 0.0,
        };

        let p_term = self.config.kp * error;
        let i_term = self.config.ki * self.integral;
        let d_term = self.config.kd * derivative;
        let output = self.config.output_limits.clamp(p_term + i_term + d_term);

        self.previous_error = Some(error);

        PidOutput {
            error,
            output,
            p_term,
            i_term,
            d_term,
        }
    }

    /// Reset the controller to its freshly constructed state.
    pub fn reset(&mut self) {
        log::debug!("resetting PID controller (integral was {})", self.integral);
        self.integral = 0.0;
        self.previous_error = None;
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn setpoint(&self) -> f64 {
        self.config.setpoint
    }

    /// Accumulated `error * dt` since construction or the last reset.
    pub fn integral(&self) -> f64 {
        self.integral
    }

    pub fn previous_error(&self) -> Option<f64> {
        self.previous_error
    }
}
