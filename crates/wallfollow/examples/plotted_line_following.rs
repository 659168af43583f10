use std::error::Error;
use std::fs::File;
use std::io::BufWriter;

use wallfollow::{Channel, FixedStepDriver, PlotSink, Scenario, Segment, TelemetryWriter};

const FRAME_RATE_HZ: f64 = 60.0;
const TIMEOUT_SECONDS: f64 = 60.0;

/// Counts the line segments a plotting routine would draw, per channel.
#[derive(Default)]
struct SegmentCounter {
    error: usize,
    steering: usize,
    largest_steering: f64,
}

impl PlotSink for SegmentCounter {
    fn segment(&mut self, channel: Channel, segment: Segment) {
        match channel {
            Channel::Error => self.error += 1,
            Channel::ControllerOutput => {
                self.steering += 1;
                self.largest_steering = self.largest_steering.max(segment.to.value.abs());
            }
            _ => {}
        }
    }
}

/// This example runs the lecture's second segment: the agent follows the line
/// y = -3 while the error and steering signals are traced for plotting.
///
/// Every tick's full controller state is also written as JSON lines to
/// `plotted_line_follow_telemetry.jsonl`, one object per frame.
fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let scenario = Scenario::PlottedLineFollow;
    let log_filename = format!("{}_telemetry.jsonl", scenario.name());

    println!("Plotted Line Following Simulation");
    println!("=================================");
    println!("Telemetry will be written to {}", log_filename);

    let mut stepper = scenario.stepper().with_sink(SegmentCounter::default());
    let mut telemetry = TelemetryWriter::new(
        scenario.name(),
        BufWriter::new(File::create(&log_filename)?),
    );

    let outcome = FixedStepDriver::from_rate(FRAME_RATE_HZ, TIMEOUT_SECONDS)
        .run(&mut stepper, &mut telemetry);
    telemetry.flush()?;

    let ending = if outcome.is_stopped() {
        "stopped"
    } else {
        "timed out"
    };
    println!(
        "\nRun {} after {} frames ({:.2}s simulated).",
        ending,
        outcome.ticks(),
        stepper.state().elapsed_time
    );
    println!(
        "Telemetry records: {} written, {} failed",
        telemetry.written(),
        telemetry.failures()
    );

    for channel in stepper.instrumentation().channels() {
        if let Some(trace) = stepper.instrumentation().trace(channel) {
            let (low, high) = trace
                .samples()
                .iter()
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(low, high), sample| {
                    (low.min(sample.value), high.max(sample.value))
                });
            println!(
                "{:>17}: {} samples, range [{:.3}, {:.3}]",
                channel.name(),
                trace.len(),
                low,
                high
            );
        }
    }

    let counter = stepper.sink();
    println!("\nSegments drawn:");
    println!("  Error:    {}", counter.error);
    println!("  Steering: {}", counter.steering);
    println!("  Largest steering command: {:.3}", counter.largest_steering);

    Ok(())
}
