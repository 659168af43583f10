use std::error::Error;

use wallfollow::{FixedStepDriver, Scenario, SimulationStepper, StepperConfig, TickView};

// Simulation constants
const FRAME_RATE_HZ: f64 = 60.0; // Animation frame rate
const TIMEOUT_SECONDS: f64 = 60.0; // Give up if the run has not stopped by then
const PRINT_EVERY: u64 = 15; // Print a row every quarter second

/// # Line Following Simulation
///
/// This example drives an agent along a reference line with the wallfollow
/// PID controller, the same run the wall-following lecture animates.
///
/// The agent starts on the line at x = -5 heading 45° away from it. The
/// controller steers it back while it accelerates to 1.5 m/s, and once it
/// crosses x = 5 it brakes to a stop.
///
/// Pass a path to a JSON file to override any part of the configuration:
///
/// ```text
/// cargo run --example line_following -- my_run.json
/// ```
fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match std::env::args().nth(1) {
        Some(path) => {
            let config = StepperConfig::from_json(&std::fs::read_to_string(&path)?)?;
            config.validate()?;
            println!("Loaded configuration from {}", path);
            config
        }
        None => Scenario::LineFollow.config(),
    };

    println!("Line Following Simulation");
    println!("=========================");
    println!(
        "Gains: kp = {:.2}, ki = {:.2}, kd = {:.2}",
        config.controller.kp, config.controller.ki, config.controller.kd
    );
    println!("Reference line: y = {:.2}", config.reference_line);
    println!("End boundary: x = {:.2}", config.end_boundary);
    println!(
        "Start: ({:.2}, {:.2}) heading {:.1}°",
        config.start.x,
        config.start.y,
        config.heading.to_degrees()
    );
    println!();
    println!("Time(s) |       x |       y | Heading(°) | Speed | Steering");
    println!("--------|---------|---------|------------|-------|---------");

    let mut stepper = SimulationStepper::new(config);
    let driver = FixedStepDriver::from_rate(FRAME_RATE_HZ, TIMEOUT_SECONDS);

    let outcome = driver.run(&mut stepper, &mut |view: &TickView<'_>| {
        if view.tick % PRINT_EVERY != 0 {
            return;
        }
        let steering = view.output.map_or(0.0, |output| output.output);
        println!(
            "{:7.2} | {:7.3} | {:7.3} | {:10.1} | {:5.2} | {:8.3}",
            view.state.elapsed_time,
            view.state.position.x,
            view.state.position.y,
            view.state.heading.to_degrees(),
            view.state.speed,
            steering
        );
    });

    let state = stepper.state();
    if outcome.is_stopped() {
        println!(
            "\nStopped after {} frames at ({:.3}, {:.3}).",
            outcome.ticks(),
            state.position.x,
            state.position.y
        );
    } else {
        println!(
            "\nStill moving after {} frames ({:.0}s); giving up.",
            outcome.ticks(),
            TIMEOUT_SECONDS
        );
    }

    let stats = stepper.statistics();
    println!("\nRun Statistics:");
    println!("---------------");
    println!("Average lateral error: {:.3}", stats.average_error);
    println!("Max deviation: {:.3}", stats.max_deviation);
    match stats.rise_time {
        Some(time) => println!("Rise time: {:.2} seconds", time),
        None => println!("Rise time: never reached the line"),
    }
    match stats.settling_time {
        Some(time) => println!("Settling time: {:.2} seconds", time),
        None => println!("Settling time: not settled"),
    }

    Ok(())
}
