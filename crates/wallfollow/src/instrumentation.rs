// Wallfollow: a PID line-following simulation core written in Rust
// Copyright (c) 2025 Security Union LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Per-channel sample traces for plotting a run.
//!
//! Every tracked channel owns an append-only [`Trace`]. The first sample of a
//! trace is only a seed point; each later sample forms a drawable
//! [`Segment`] with the one before it, which is handed to a [`PlotSink`].

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::pid::PidOutput;

/// A signal that can be traced over a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    /// Lateral offset of the agent from the reference line.
    Error,
    /// Clamped controller output (the steering rate).
    ControllerOutput,
    Proportional,
    Integral,
    Derivative,
}

impl Channel {
    pub const ALL: [Channel; 5] = [
        Channel::Error,
        Channel::ControllerOutput,
        Channel::Proportional,
        Channel::Integral,
        Channel::Derivative,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Channel::Error => "error",
            Channel::ControllerOutput => "controller_output",
            Channel::Proportional => "proportional",
            Channel::Integral => "integral",
            Channel::Derivative => "derivative",
        }
    }

    fn value(&self, lateral_error: f64, pid: &PidOutput) -> f64 {
        match self {
            Channel::Error => lateral_error,
            Channel::ControllerOutput => pid.output,
            Channel::Proportional => pid.p_term,
            Channel::Integral => pid.i_term,
            Channel::Derivative => pid.d_term,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A `(time, value)` point on a trace.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub time: f64,
    pub value: f64,
}

/// A line between two consecutive samples of the same channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub from: Sample,
    pub to: Sample,
}

/// Append-only sequence of samples for one channel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Trace {
    samples: Vec<Sample>,
}

impl Trace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a sample, returning the segment it closes if a previous sample
    /// exists.
    pub fn push(&mut self, sample: Sample) -> Option<Segment> {
        let segment = self.samples.last().map(|&from| Segment { from, to: sample });
        self.samples.push(sample);
        segment
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// All drawable segments, in order.
    pub fn segments(&self) -> impl Iterator<Item = Segment> + '_ {
        self.samples
            .windows(2)
            .map(|pair| Segment {
                from: pair[0],
                to: pair[1],
            })
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Receiver for instrumentation output, typically a line-drawing routine.
pub trait PlotSink {
    /// Called for every sample appended to a tracked channel.
    fn sample(&mut self, _channel: Channel, _sample: Sample) {}

    /// Called once for each new drawable segment.
    fn segment(&mut self, channel: Channel, segment: Segment);
}

impl PlotSink for () {
    fn segment(&mut self, _channel: Channel, _segment: Segment) {}
}

impl<S: PlotSink + ?Sized> PlotSink for &mut S {
    fn sample(&mut self, channel: Channel, sample: Sample) {
        (**self).sample(channel, sample)
    }

    fn segment(&mut self, channel: Channel, segment: Segment) {
        (**self).segment(channel, segment)
    }
}

/// Sink that keeps every emitted segment in memory.
#[derive(Debug, Clone, Default)]
pub struct SegmentRecorder {
    segments: Vec<(Channel, Segment)>,
}

impl SegmentRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Segments in emission order.
    pub fn segments(&self) -> &[(Channel, Segment)] {
        &self.segments
    }

    pub fn for_channel(&self, channel: Channel) -> impl Iterator<Item = &Segment> + '_ {
        self.segments
            .iter()
            .filter(move |(c, _)| *c == channel)
            .map(|(_, segment)| segment)
    }
}

impl PlotSink for SegmentRecorder {
    fn segment(&mut self, channel: Channel, segment: Segment) {
        self.segments.push((channel, segment));
    }
}

/// The set of tracked channels and their traces.
#[derive(Debug, Clone, Default)]
pub struct Instrumentation {
    traces: BTreeMap<Channel, Trace>,
}

impl Instrumentation {
    pub fn new(channels: impl IntoIterator<Item = Channel>) -> Self {
        let mut instrumentation = Self::default();
        for channel in channels {
            instrumentation.track(channel);
        }
        instrumentation
    }

    /// Start tracking `channel`. Tracking an already tracked channel keeps its
    /// existing samples.
    pub fn track(&mut self, channel: Channel) {
        self.traces.entry(channel).or_default();
    }

    pub fn is_tracking(&self, channel: Channel) -> bool {
        self.traces.contains_key(&channel)
    }

    pub fn channels(&self) -> impl Iterator<Item = Channel> + '_ {
        self.traces.keys().copied()
    }

    pub fn trace(&self, channel: Channel) -> Option<&Trace> {
        self.traces.get(&channel)
    }

    /// Append one sample per tracked channel at `time` and forward them, and
    /// any segments they close, to `sink`.
    pub fn record<S: PlotSink + ?Sized>(
        &mut self,
        time: f64,
        lateral_error: f64,
        pid: &PidOutput,
        sink: &mut S,
    ) {
        for (&channel, trace) in self.traces.iter_mut() {
            let sample = Sample {
                time,
                value: channel.value(lateral_error, pid),
            };
            sink.sample(channel, sample);
            if let Some(segment) = trace.push(sample) {
                sink.segment(channel, segment);
            }
        }
    }

    /// Drop all samples while keeping the tracked channel set.
    pub fn clear(&mut self) {
        for trace in self.traces.values_mut() {
            *trace = Trace::new();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid_output(output: f64) -> PidOutput {
        PidOutput {
            error: 0.0,
            output,
            p_term: 1.0,
            i_term: 2.0,
            d_term: 3.0,
        }
    }

    #[test]
    fn test_seed_then_draw() {
        let mut trace = Trace::new();
        assert!(trace
            .push(Sample {
                time: 0.1,
                value: 1.0
            })
            .is_none());
        assert_eq!(trace.len(), 1);
        assert_eq!(trace.segments().count(), 0);

        let segment = trace.push(Sample {
            time: 0.2,
            value: 3.0,
        });
        assert_eq!(
            segment,
            Some(Segment {
                from: Sample {
                    time: 0.1,
                    value: 1.0
                },
                to: Sample {
                    time: 0.2,
                    value: 3.0
                },
            })
        );
        assert_eq!(trace.len(), 2);
        assert_eq!(trace.segments().count(), 1);
    }

    #[test]
    fn test_segments_follow_append_order() {
        let mut trace = Trace::new();
        for i in 0..10 {
            trace.push(Sample {
                time: i as f64,
                value: (i * i) as f64,
            });
        }
        let segments: Vec<Segment> = trace.segments().collect();
        assert_eq!(segments.len(), 9);
        for (i, segment) in segments.iter().enumerate() {
            assert_eq!(segment.from.time, i as f64);
            assert_eq!(segment.to.time, (i + 1) as f64);
        }
    }

    #[test]
    fn test_record_only_tracked_channels() {
        let mut instrumentation = Instrumentation::new([Channel::Error, Channel::Derivative]);
        let mut recorder = SegmentRecorder::new();

        instrumentation.record(0.02, -0.5, &pid_output(0.7), &mut recorder);
        assert!(recorder.segments().is_empty());
        instrumentation.record(0.04, -0.4, &pid_output(0.6), &mut recorder);

        assert_eq!(recorder.segments().len(), 2);
        assert!(instrumentation.trace(Channel::ControllerOutput).is_none());
        assert!(instrumentation.is_tracking(Channel::Derivative));

        let error = instrumentation.trace(Channel::Error).unwrap();
        assert_eq!(error.samples()[1], Sample { time: 0.04, value: -0.4 });
        let derivative: Vec<&Segment> = recorder.for_channel(Channel::Derivative).collect();
        assert_eq!(derivative.len(), 1);
        assert_eq!(derivative[0].to.value, 3.0);
    }

    #[test]
    fn test_late_tracked_channel_seeds_separately() {
        let mut instrumentation = Instrumentation::new([Channel::Error]);
        let mut recorder = SegmentRecorder::new();

        instrumentation.record(0.1, 0.0, &pid_output(0.0), &mut recorder);
        instrumentation.track(Channel::ControllerOutput);
        instrumentation.record(0.2, 0.0, &pid_output(0.5), &mut recorder);

        assert_eq!(recorder.for_channel(Channel::Error).count(), 1);
        assert_eq!(recorder.for_channel(Channel::ControllerOutput).count(), 0);
        assert_eq!(
            instrumentation.trace(Channel::ControllerOutput).unwrap().len(),
            1
        );
    }

    #[test]
    fn test_clear_keeps_channels() {
        let mut instrumentation = Instrumentation::new(Channel::ALL);
        instrumentation.record(0.1, 0.0, &pid_output(0.0), &mut ());
        instrumentation.clear();

        assert_eq!(instrumentation.channels().count(), 5);
        assert!(instrumentation.trace(Channel::Integral).unwrap().is_empty());
    }

    #[test]
    fn test_channel_names() {
        assert_eq!(Channel::ControllerOutput.to_string(), "controller_output");
        assert_eq!(
            serde_json::to_string(&Channel::Proportional).unwrap(),
            "\"proportional\""
        );
    }
}
