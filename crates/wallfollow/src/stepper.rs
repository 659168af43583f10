// Wallfollow: a PID line-following simulation core written in Rust
// Copyright (c) 2025 Security Union LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Tick-driven kinematic simulation of an agent following a reference line.
//!
//! Each tick the stepper measures the agent's lateral offset from the line
//! `y = reference_line`, feeds it to a [`PidController`], turns the clamped
//! output into a heading rate and advances the agent. The agent accelerates
//! towards `max_speed` until it crosses `x = end_boundary`, then decelerates;
//! the run stops once it comes to rest past the boundary.

use std::f64::consts::FRAC_PI_4;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::instrumentation::{Channel, Instrumentation, PlotSink};
use crate::pid::{ControllerConfig, PidController, PidOutput};
use crate::state::{Point2, SimulationState};
use crate::statistics::{ErrorStatistics, RunStatistics};

/// Configuration for a single simulated run.
///
/// The defaults are the lecture's first segment: an agent starting on the
/// line `y = 0` at `x = -5`, heading 45° off the line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StepperConfig {
    pub controller: ControllerConfig,
    pub start: Point2,
    pub heading: f64,       // Initial heading in radians
    pub initial_speed: f64, // Initial speed
    pub acceleration: f64,  // Used for both speeding up and braking
    pub max_speed: f64,
    pub reference_line: f64, // y coordinate of the line to follow
    pub end_boundary: f64,   // x coordinate where braking starts
    pub channels: Vec<Channel>,
}

impl Default for StepperConfig {
    fn default() -> Self {
        StepperConfig {
            controller: ControllerConfig::new()
                .with_kp(2.0)
                .with_ki(0.1)
                .with_kd(2.0)
                .with_setpoint(0.0)
                .with_output_limits(Some(-2.0), Some(2.0)),
            start: Point2::new(-5.0, 0.0),
            heading: FRAC_PI_4,
            initial_speed: 0.0,
            acceleration: 2.0,
            max_speed: 1.5,
            reference_line: 0.0,
            end_boundary: 5.0,
            channels: Vec::new(),
        }
    }
}

impl StepperConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the steering controller configuration.
    ///
    /// # Arguments
    ///
    /// * `controller` - Gains, setpoint and output limits of the PID controller
    ///
    /// # Returns
    ///
    /// * The updated configuration builder
    pub fn with_controller(mut self, controller: ControllerConfig) -> Self {
        self.controller = controller;
        self
    }

    /// Set the starting position of the agent.
    ///
    /// # Arguments
    ///
    /// * `x` - Starting x coordinate
    /// * `y` - Starting y coordinate
    ///
    /// # Returns
    ///
    /// * The updated configuration builder
    pub fn with_start(mut self, x: f64, y: f64) -> Self {
        self.start = Point2::new(x, y);
        self
    }

    /// Set the initial heading.
    ///
    /// # Arguments
    ///
    /// * `heading` - Radians, counter-clockwise from the +x axis
    ///
    /// # Returns
    ///
    /// * The updated configuration builder
    pub fn with_heading(mut self, heading: f64) -> Self {
        self.heading = heading;
        self
    }

    /// Set the initial speed.
    ///
    /// # Arguments
    ///
    /// * `speed` - Speed at the start of the run
    ///
    /// # Returns
    ///
    /// * The updated configuration builder
    pub fn with_initial_speed(mut self, speed: f64) -> Self {
        self.initial_speed = speed;
        self
    }

    /// Set the acceleration magnitude.
    ///
    /// # Arguments
    ///
    /// * `acceleration` - Rate used both to speed up and to brake
    ///
    /// # Returns
    ///
    /// * The updated configuration builder
    pub fn with_acceleration(mut self, acceleration: f64) -> Self {
        self.acceleration = acceleration;
        self
    }

    /// Set the speed cap.
    ///
    /// # Arguments
    ///
    /// * `max_speed` - Speed the agent accelerates towards before the boundary
    ///
    /// # Returns
    ///
    /// * The updated configuration builder
    ///
    /// # Notes
    ///
    /// A cap of zero or less keeps the agent at rest and the run never stops;
    /// [`StepperConfig::validate`] rejects it.
    pub fn with_max_speed(mut self, max_speed: f64) -> Self {
        self.max_speed = max_speed;
        self
    }

    /// Set the line to follow.
    ///
    /// # Arguments
    ///
    /// * `y` - y coordinate of the reference line
    ///
    /// # Returns
    ///
    /// * The updated configuration builder
    pub fn with_reference_line(mut self, y: f64) -> Self {
        self.reference_line = y;
        self
    }

    /// Set where braking starts.
    ///
    /// # Arguments
    ///
    /// * `x` - x coordinate of the end boundary
    ///
    /// # Returns
    ///
    /// * The updated configuration builder
    pub fn with_end_boundary(mut self, x: f64) -> Self {
        self.end_boundary = x;
        self
    }

    /// Track `channels` in addition to any already configured.
    ///
    /// # Arguments
    ///
    /// * `channels` - Channels to trace; duplicates are ignored
    ///
    /// # Returns
    ///
    /// * The updated configuration builder
    pub fn with_channels(mut self, channels: impl IntoIterator<Item = Channel>) -> Self {
        for channel in channels {
            if !self.channels.contains(&channel) {
                self.channels.push(channel);
            }
        }
        self
    }

    /// Parse a JSON configuration. Missing fields take their default values.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Check that the configuration describes a run that terminates.
    ///
    /// The stepper accepts any configuration; this is for callers that want
    /// to reject degenerate ones up front.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fields = [
            ("controller.kp", self.controller.kp),
            ("controller.ki", self.controller.ki),
            ("controller.kd", self.controller.kd),
            ("controller.setpoint", self.controller.setpoint),
            ("start.x", self.start.x),
            ("start.y", self.start.y),
            ("heading", self.heading),
            ("initial_speed", self.initial_speed),
            ("acceleration", self.acceleration),
            ("max_speed", self.max_speed),
            ("reference_line", self.reference_line),
            ("end_boundary", self.end_boundary),
        ];
        if let Some(&(field, _)) = fields.iter().find(|(_, value)| !value.is_finite()) {
            return Err(ConfigError::NonFinite { field });
        }

        let limits = self.controller.output_limits;
        if limits.low.is_some_and(f64::is_nan) {
            return Err(ConfigError::NonFinite {
                field: "controller.output_limits.low",
            });
        }
        if limits.high.is_some_and(f64::is_nan) {
            return Err(ConfigError::NonFinite {
                field: "controller.output_limits.high",
            });
        }

        if self.max_speed <= 0.0 {
            return Err(ConfigError::NonTerminating {
                max_speed: self.max_speed,
            });
        }
        if self.acceleration <= 0.0 {
            return Err(ConfigError::NonPositiveAcceleration(self.acceleration));
        }
        if self.initial_speed < 0.0 {
            return Err(ConfigError::NegativeSpeed(self.initial_speed));
        }

        Ok(())
    }

    fn initial_state(&self) -> SimulationState {
        SimulationState::new(self.start, self.heading, self.initial_speed)
    }
}

/// Whether the stepper still integrates on [`SimulationStepper::tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    Running,
    /// Terminal: the agent came to rest past the end boundary.
    Stopped,
}

/// Owns one run: the controller, the agent's state and its instrumentation.
///
/// `S` receives instrumentation samples and segments; `()` discards them.
pub struct SimulationStepper<S = ()> {
    config: StepperConfig,
    controller: PidController,
    state: SimulationState,
    run_state: RunState,
    last_output: Option<PidOutput>,
    instrumentation: Instrumentation,
    statistics: ErrorStatistics,
    ticks: u64,
    sink: S,
}

impl SimulationStepper<()> {
    /// Create a stepper at the configured start state.
    pub fn new(config: StepperConfig) -> Self {
        log::debug!(
            "creating stepper at ({}, {}) heading {:.3} rad, reference line y = {}, end boundary x = {}",
            config.start.x,
            config.start.y,
            config.heading,
            config.reference_line,
            config.end_boundary
        );

        SimulationStepper {
            controller: PidController::new(config.controller),
            state: config.initial_state(),
            run_state: RunState::Running,
            last_output: None,
            instrumentation: Instrumentation::new(config.channels.iter().copied()),
            statistics: ErrorStatistics::default(),
            ticks: 0,
            sink: (),
            config,
        }
    }
}

impl<S: PlotSink> SimulationStepper<S> {
    /// Send instrumentation to `sink` from now on.
    pub fn with_sink<T: PlotSink>(self, sink: T) -> SimulationStepper<T> {
        SimulationStepper {
            config: self.config,
            controller: self.controller,
            state: self.state,
            run_state: self.run_state,
            last_output: self.last_output,
            instrumentation: self.instrumentation,
            statistics: self.statistics,
            ticks: self.ticks,
            sink,
        }
    }

    /// Advance the simulation by `dt` seconds.
    ///
    /// `None`, zero, negative and NaN time steps are ignored, as is every
    /// tick after the run has stopped. Returns the run state after the tick.
    pub fn tick(&mut self, dt: impl Into<Option<f64>>) -> RunState {
        let dt = match dt.into() {
            Some(dt) if dt > 0.0 => dt,
            _ => return self.run_state,
        };
        if self.run_state == RunState::Stopped {
            return self.run_state;
        }

        let lateral_error = self.state.position.y - self.config.reference_line;
        let pid = self.controller.update(lateral_error, dt);

        self.state.heading += pid.output * dt;
        self.state.elapsed_time += dt;
        self.ticks += 1;

        self.instrumentation.record(
            self.state.elapsed_time,
            lateral_error,
            &pid,
            &mut self.sink,
        );
        self.statistics.observe(self.state.elapsed_time, lateral_error);
        self.last_output = Some(pid);

        self.update_speed(dt);

        let distance = self.state.speed * dt;
        self.state.position.x += distance * self.state.heading.cos();
        self.state.position.y += distance * self.state.heading.sin();

        log::trace!(
            "tick {}: t = {:.3}, pos = ({:.4}, {:.4}), heading = {:.4}, speed = {:.3}, error = {:.4}, output = {:.4}",
            self.ticks,
            self.state.elapsed_time,
            self.state.position.x,
            self.state.position.y,
            self.state.heading,
            self.state.speed,
            lateral_error,
            pid.output
        );

        self.run_state
    }

    // Accelerate until the boundary, brake past it, stop once at rest.
    fn update_speed(&mut self, dt: f64) {
        let x = self.state.position.x;
        let step = self.config.acceleration * dt;

        if x < self.config.end_boundary {
            if self.state.speed < self.config.max_speed {
                self.state.speed = (self.state.speed + step)
                    .min(self.config.max_speed)
                    .max(0.0);
            }
        } else if x >= self.config.end_boundary {
            self.state.speed = (self.state.speed - step).max(0.0);
            if self.state.speed <= 0.0 {
                self.state.speed = 0.0;
                self.run_state = RunState::Stopped;
                log::info!(
                    "run stopped after {} ticks ({:.2}s) at ({:.3}, {:.3})",
                    self.ticks,
                    self.state.elapsed_time,
                    x,
                    self.state.position.y
                );
            }
        }
    }

    /// Return to the configured start state with a fresh controller and
    /// empty traces. The sink is left untouched.
    pub fn reset(&mut self) {
        log::debug!("resetting stepper after {} ticks", self.ticks);
        self.controller.reset();
        self.state = self.config.initial_state();
        self.run_state = RunState::Running;
        self.last_output = None;
        self.instrumentation.clear();
        self.statistics.reset();
        self.ticks = 0;
    }

    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    pub fn run_state(&self) -> RunState {
        self.run_state
    }

    pub fn is_stopped(&self) -> bool {
        self.run_state == RunState::Stopped
    }

    /// Controller output and terms from the most recent integrating tick.
    pub fn last_output(&self) -> Option<&PidOutput> {
        self.last_output.as_ref()
    }

    pub fn instrumentation(&self) -> &Instrumentation {
        &self.instrumentation
    }

    pub fn statistics(&self) -> RunStatistics {
        self.statistics.snapshot()
    }

    pub fn controller(&self) -> &PidController {
        &self.controller
    }

    pub fn config(&self) -> &StepperConfig {
        &self.config
    }

    /// Number of ticks that integrated.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instrumentation::SegmentRecorder;

    const DT: f64 = 0.02;

    fn run_to_completion<S: PlotSink>(stepper: &mut SimulationStepper<S>, max_ticks: usize) {
        for _ in 0..max_ticks {
            if stepper.tick(DT) == RunState::Stopped {
                break;
            }
        }
    }

    #[test]
    fn test_lecture_run_converges_and_stops() {
        println!("\n--- Lecture scenario, start offset 0.5 from the line ---");

        let config = StepperConfig::new().with_start(-5.0, 0.5);
        let mut stepper = SimulationStepper::new(config);

        let mut error_at_boundary = None;
        for i in 0..1000 {
            let run_state = stepper.tick(DT);
            let state = *stepper.state();

            if error_at_boundary.is_none() && state.position.x >= 5.0 {
                error_at_boundary = Some(state.position.y);
                println!("Crossed the boundary at tick {} with error {:.5}", i, state.position.y);
            }
            if i % 50 == 0 {
                println!(
                    "Tick {:4}: x = {:7.3}, y = {:7.4}, heading = {:7.4}, speed = {:5.3}",
                    i, state.position.x, state.position.y, state.heading, state.speed
                );
            }
            if run_state == RunState::Stopped {
                break;
            }
        }

        let error_at_boundary = error_at_boundary.expect("agent never reached the boundary");
        assert!(
            error_at_boundary.abs() < 0.1,
            "lateral error {error_at_boundary} at the boundary"
        );

        assert!(stepper.is_stopped());
        let state = stepper.state();
        assert_eq!(state.speed, 0.0);
        assert!(state.position.x >= 5.0);
        assert!(state.position.y.abs() < 0.1);
        assert!(stepper.ticks() < 600, "took {} ticks", stepper.ticks());
    }

    #[test]
    fn test_shifted_reference_line() {
        let config = StepperConfig::new()
            .with_start(-5.0, -3.0)
            .with_reference_line(-3.0);
        let mut stepper = SimulationStepper::new(config);
        run_to_completion(&mut stepper, 1000);

        assert!(stepper.is_stopped());
        assert!((stepper.state().position.y + 3.0).abs() < 0.1);
    }

    #[test]
    fn test_first_tick_kinematics() {
        let mut stepper = SimulationStepper::new(StepperConfig::new());
        stepper.tick(DT);

        // On the line with zero error the controller stays silent.
        let output = stepper.last_output().unwrap();
        assert_eq!(output.output, 0.0);

        let state = stepper.state();
        let speed = 2.0 * DT;
        assert!((state.speed - speed).abs() < 1e-12);
        assert!((state.heading - FRAC_PI_4).abs() < 1e-12);
        assert!((state.position.x - (-5.0 + speed * FRAC_PI_4.cos() * DT)).abs() < 1e-12);
        assert!((state.position.y - speed * FRAC_PI_4.sin() * DT).abs() < 1e-12);
        assert!((state.elapsed_time - DT).abs() < 1e-12);
    }

    #[test]
    fn test_heading_integrates_controller_output() {
        let config = StepperConfig::new().with_start(-5.0, 1.0);
        let mut stepper = SimulationStepper::new(config);
        stepper.tick(DT);

        let output = stepper.last_output().unwrap().output;
        // Lateral error 1.0: kp*-1 + ki*-0.02 = -2.002, clamped.
        assert_eq!(output, -2.0);
        assert!((stepper.state().heading - (FRAC_PI_4 - 2.0 * DT)).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_dt_is_ignored() {
        let mut stepper = SimulationStepper::new(StepperConfig::new());
        stepper.tick(DT);
        let before = *stepper.state();
        let integral = stepper.controller().integral();

        for dt in [None, Some(0.0), Some(-0.02), Some(f64::NAN)] {
            assert_eq!(stepper.tick(dt), RunState::Running);
        }

        assert_eq!(*stepper.state(), before);
        assert_eq!(stepper.ticks(), 1);
        assert_eq!(stepper.controller().integral(), integral);
    }

    #[test]
    fn test_stopped_is_idempotent() {
        let mut stepper = SimulationStepper::new(StepperConfig::new());
        run_to_completion(&mut stepper, 1000);
        assert!(stepper.is_stopped());

        let at_rest = *stepper.state();
        let ticks = stepper.ticks();
        for dt in [DT, 1.0, 1e-6, -1.0, 0.0] {
            assert_eq!(stepper.tick(dt), RunState::Stopped);
            assert_eq!(*stepper.state(), at_rest);
        }
        assert_eq!(stepper.ticks(), ticks);
    }

    #[test]
    fn test_speed_stays_within_bounds() {
        let mut stepper = SimulationStepper::new(StepperConfig::new());
        for _ in 0..1000 {
            let run_state = stepper.tick(DT);
            let speed = stepper.state().speed;
            assert!((0.0..=1.5).contains(&speed), "speed {speed} out of range");
            if run_state == RunState::Stopped {
                break;
            }
        }
        assert!(stepper.is_stopped());
    }

    #[test]
    fn test_zero_max_speed_never_stops() {
        let config = StepperConfig::new().with_max_speed(0.0);
        let mut stepper = SimulationStepper::new(config);

        for _ in 0..5000 {
            assert_eq!(stepper.tick(DT), RunState::Running);
        }
        assert_eq!(stepper.state().position, Point2::new(-5.0, 0.0));
        assert_eq!(stepper.state().speed, 0.0);
        assert_eq!(stepper.ticks(), 5000);
    }

    #[test]
    fn test_starting_past_boundary_at_rest_stops_immediately() {
        let config = StepperConfig::new().with_start(6.0, 0.0);
        let mut stepper = SimulationStepper::new(config);

        assert_eq!(stepper.tick(DT), RunState::Stopped);
        assert_eq!(stepper.state().position, Point2::new(6.0, 0.0));
        assert_eq!(stepper.ticks(), 1);
    }

    #[test]
    fn test_instrumentation_seed_rule() {
        let config =
            StepperConfig::new().with_channels([Channel::Error, Channel::ControllerOutput]);
        let mut stepper = SimulationStepper::new(config).with_sink(SegmentRecorder::new());

        stepper.tick(DT);
        let error = stepper.instrumentation().trace(Channel::Error).unwrap();
        assert_eq!(error.len(), 1);
        assert_eq!(error.segments().count(), 0);
        assert!(stepper.sink().segments().is_empty());

        stepper.tick(DT);
        let error = stepper.instrumentation().trace(Channel::Error).unwrap();
        assert_eq!(error.len(), 2);
        assert_eq!(error.segments().count(), 1);
        assert_eq!(stepper.sink().for_channel(Channel::Error).count(), 1);
        assert_eq!(stepper.sink().for_channel(Channel::ControllerOutput).count(), 1);
        assert!(stepper.instrumentation().trace(Channel::Integral).is_none());

        let segment = stepper.sink().segments()[0].1;
        assert!((segment.from.time - DT).abs() < 1e-12);
        assert!((segment.to.time - 2.0 * DT).abs() < 1e-12);
    }

    #[test]
    fn test_traces_cover_the_whole_run() {
        let config = StepperConfig::new().with_channels(Channel::ALL);
        let mut stepper = SimulationStepper::new(config).with_sink(SegmentRecorder::new());
        run_to_completion(&mut stepper, 1000);

        let ticks = stepper.ticks() as usize;
        for channel in Channel::ALL {
            let trace = stepper.instrumentation().trace(channel).unwrap();
            assert_eq!(trace.len(), ticks);
            assert_eq!(stepper.sink().for_channel(channel).count(), ticks - 1);
        }

        let times: Vec<f64> = stepper
            .instrumentation()
            .trace(Channel::Error)
            .unwrap()
            .samples()
            .iter()
            .map(|sample| sample.time)
            .collect();
        assert!(times.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn test_reset_restores_start() {
        let config = StepperConfig::new()
            .with_start(-5.0, 0.3)
            .with_channels([Channel::Error]);
        let mut stepper = SimulationStepper::new(config);
        run_to_completion(&mut stepper, 1000);
        let first_run_ticks = stepper.ticks();

        stepper.reset();
        assert_eq!(stepper.run_state(), RunState::Running);
        assert_eq!(stepper.state().position, Point2::new(-5.0, 0.3));
        assert_eq!(stepper.state().elapsed_time, 0.0);
        assert_eq!(stepper.controller().previous_error(), None);
        assert!(stepper.instrumentation().trace(Channel::Error).unwrap().is_empty());
        assert_eq!(stepper.statistics().samples, 0);

        run_to_completion(&mut stepper, 1000);
        assert_eq!(stepper.ticks(), first_run_ticks);
    }

    #[test]
    fn test_statistics_follow_run() {
        let mut stepper = SimulationStepper::new(StepperConfig::new().with_start(-5.0, 0.5));
        run_to_completion(&mut stepper, 1000);

        let stats = stepper.statistics();
        assert_eq!(stats.samples, stepper.ticks());
        assert!(stats.max_deviation >= 0.5);
        assert!(stats.average_error > 0.0 && stats.average_error < stats.max_deviation);
        assert!(stats.rise_time.is_some());
        assert!(stats.settling_time.is_some());
    }

    #[test]
    fn test_config_from_json() {
        let config = StepperConfig::from_json(
            r#"{
                "reference_line": -3.0,
                "start": { "x": -5.0, "y": -3.0 },
                "channels": ["error", "controller_output"],
                "controller": { "kp": 2.0, "ki": 0.1, "kd": 2.0,
                                "output_limits": { "low": -2.0, "high": 2.0 } }
            }"#,
        )
        .unwrap();

        assert_eq!(config.reference_line, -3.0);
        assert_eq!(config.max_speed, 1.5);
        assert_eq!(config.channels, vec![Channel::Error, Channel::ControllerOutput]);
        assert_eq!(config.controller.kd, 2.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_json_rejects_garbage() {
        assert!(matches!(
            StepperConfig::from_json("{ \"max_speed\": \"fast\" }"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_validate() {
        assert!(StepperConfig::default().validate().is_ok());

        assert!(matches!(
            StepperConfig::new().with_max_speed(0.0).validate(),
            Err(ConfigError::NonTerminating { .. })
        ));
        assert!(matches!(
            StepperConfig::new().with_acceleration(-1.0).validate(),
            Err(ConfigError::NonPositiveAcceleration(_))
        ));
        assert!(matches!(
            StepperConfig::new().with_initial_speed(-0.1).validate(),
            Err(ConfigError::NegativeSpeed(_))
        ));
        assert!(matches!(
            StepperConfig::new().with_heading(f64::NAN).validate(),
            Err(ConfigError::NonFinite { field: "heading" })
        ));

        let nan_limit = StepperConfig::new().with_controller(
            ControllerConfig::new().with_output_limits(Some(f64::NAN), None),
        );
        assert!(matches!(
            nan_limit.validate(),
            Err(ConfigError::NonFinite { .. })
        ));
    }

    #[test]
    fn test_with_channels_deduplicates() {
        let config = StepperConfig::new()
            .with_channels([Channel::Error])
            .with_channels([Channel::Error, Channel::Integral]);
        assert_eq!(config.channels, vec![Channel::Error, Channel::Integral]);
    }
}
