#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the signal stabilisation minigames.
//!
//! This crate holds the pieces both engines build on: bounded numeric
//! helpers, the countdown used by transient messages and calm windows, the
//! simulation clock with its one-way `ended` latch, the [`Event`] values that
//! engines broadcast while they step, and the fire-after-delay primitive that
//! delivers the host's completion callback exactly once.
//!
//! Engines never schedule themselves. A host calls `update` and then renders
//! once per frame; every type here is a plain owned value mutated only from
//! that single thread of control.

mod completion;
mod message;

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

pub use completion::{
    CompletionCallback, CompletionNotice, ManualScheduler, Scheduler, ThreadScheduler,
    COMPLETION_GRACE,
};
pub use message::{Countdown, MessageBoard, COUNTDOWN_EPSILON};

/// Clamps `value` into `[min, max]`.
///
/// Unlike [`f32::clamp`] this never panics; when `min > max` the result is `min`.
#[must_use]
pub fn clamp(value: f32, min: f32, max: f32) -> f32 {
    min.max(value.min(max))
}

/// Linearly interpolates between `from` and `to` by `t`.
///
/// `t` is not clamped, so values outside `[0, 1]` extrapolate.
#[must_use]
pub fn lerp(from: f32, to: f32, t: f32) -> f32 {
    from + (to - from) * t
}

/// Pixel dimensions of the surface an engine is laid out against.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct SurfaceSize {
    /// Width of the surface in pixels.
    pub width: f32,
    /// Height of the surface in pixels.
    pub height: f32,
}

impl SurfaceSize {
    /// Creates a new surface descriptor.
    #[must_use]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// Pointer coordinate expressed in surface pixels, origin at the top-left.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Point {
    /// Horizontal offset from the left edge.
    pub x: f32,
    /// Vertical offset from the top edge.
    pub y: f32,
}

impl Point {
    /// Creates a new pointer coordinate.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Elapsed simulated time for a fixed-length run.
///
/// `ended` is a one-way latch: once the elapsed time reaches the duration the
/// clock stops advancing and never resets. Time is kept as a [`Duration`] so
/// that summing many fractional frame steps lands exactly on the deadline.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimulationClock {
    elapsed: Duration,
    duration: Duration,
    ended: bool,
}

impl SimulationClock {
    /// Creates a clock that ends after `duration` seconds.
    ///
    /// Durations too large to represent never end; negative ones end on the
    /// first advance.
    #[must_use]
    pub fn new(duration: f32) -> Self {
        Self {
            elapsed: Duration::ZERO,
            duration: Duration::try_from_secs_f32(duration.max(0.0)).unwrap_or(Duration::MAX),
            ended: false,
        }
    }

    /// Advances the clock by `dt`.
    ///
    /// Returns `true` only on the call that latches `ended`. Once ended the
    /// clock ignores further advances.
    pub fn advance(&mut self, dt: Duration) -> bool {
        if self.ended {
            return false;
        }

        self.elapsed = self.elapsed.saturating_add(dt);
        if self.elapsed >= self.duration {
            self.ended = true;
            return true;
        }
        false
    }

    /// Seconds of simulated time elapsed so far.
    #[must_use]
    pub fn elapsed(&self) -> f32 {
        self.elapsed.as_secs_f32()
    }

    /// Length of the run in seconds.
    #[must_use]
    pub fn duration(&self) -> f32 {
        self.duration.as_secs_f32()
    }

    /// Reports whether the run has finished.
    #[must_use]
    pub const fn is_ended(&self) -> bool {
        self.ended
    }
}

/// Events broadcast by the engines while they process input and time.
///
/// Events describe what already happened. Nothing inside the engines reads
/// them back, so hosts are free to log, record or drop them.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    /// The headline text changed.
    MessageChanged {
        /// Text now displayed.
        text: String,
    },
    /// A channel received a calm window, replacing any previous one.
    CalmWindowOpened {
        /// Index of the calmed channel.
        channel: usize,
    },
    /// A calm window ran out.
    CalmWindowExpired {
        /// Index of the channel whose calm window ended.
        channel: usize,
    },
    /// A channel reached the warning threshold while none was there before.
    InstabilityWarning,
    /// Every channel reached the critical threshold and a forced reset began.
    RecalibrationStarted,
    /// The forced reset finished and normal dynamics resumed.
    RecalibrationFinished {
        /// Channel granted the automatic calm window.
        calm_channel: usize,
    },
    /// The player started holding the suppression control.
    HoldStarted,
    /// The player released the suppression control.
    HoldReleased,
    /// Focus hit zero while the control was held.
    FocusDepleted,
    /// The run reached its duration and latched `ended`.
    Ended,
}

/// Errors reported when validating engine tuning.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum TuningError {
    /// A value that must be strictly positive was zero, negative or NaN.
    #[error("{field} must be positive (received {value})")]
    NotPositive {
        /// Name of the offending field.
        field: &'static str,
        /// Value supplied for the field.
        value: f32,
    },
    /// A rate or duration was negative or NaN.
    #[error("{field} must not be negative (received {value})")]
    Negative {
        /// Name of the offending field.
        field: &'static str,
        /// Value supplied for the field.
        value: f32,
    },
    /// A normalised value fell outside `[0, 1]`.
    #[error("{field} must lie within [0, 1] (received {value})")]
    OutsideUnitRange {
        /// Name of the offending field.
        field: &'static str,
        /// Value supplied for the field.
        value: f32,
    },
    /// The lane count was zero.
    #[error("at least one lane is required")]
    NoLanes,
    /// The warning threshold was configured above the critical threshold.
    #[error("warn threshold {warn} exceeds critical threshold {critical}")]
    WarnAboveCritical {
        /// Configured warning threshold.
        warn: f32,
        /// Configured critical threshold.
        critical: f32,
    },
    /// The critical threshold can never be reached.
    #[error("critical threshold {critical} exceeds amplitude ceiling {max}")]
    CriticalAboveMax {
        /// Configured critical threshold.
        critical: f32,
        /// Configured amplitude ceiling.
        max: f32,
    },
    /// The channel granted a calm window after recalibration does not exist.
    #[error("recalibration calm channel {channel} is out of range for {lanes} lanes")]
    CalmChannelOutOfRange {
        /// Requested channel index.
        channel: usize,
        /// Number of configured lanes.
        lanes: usize,
    },
}

/// Rejects values that are not strictly positive.
pub fn require_positive(field: &'static str, value: f32) -> Result<(), TuningError> {
    if value > 0.0 {
        Ok(())
    } else {
        Err(TuningError::NotPositive { field, value })
    }
}

/// Rejects negative or NaN values.
pub fn require_non_negative(field: &'static str, value: f32) -> Result<(), TuningError> {
    if value >= 0.0 {
        Ok(())
    } else {
        Err(TuningError::Negative { field, value })
    }
}

/// Rejects values outside `[0, 1]`.
pub fn require_unit(field: &'static str, value: f32) -> Result<(), TuningError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(TuningError::OutsideUnitRange { field, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_limits_both_ends() {
        assert_eq!(clamp(-0.5, 0.0, 1.0), 0.0);
        assert_eq!(clamp(1.5, 0.0, 1.0), 1.0);
        assert_eq!(clamp(0.25, 0.0, 1.0), 0.25);
    }

    #[test]
    fn clamp_prefers_minimum_when_bounds_cross() {
        assert_eq!(clamp(0.5, 1.0, 0.0), 1.0);
    }

    #[test]
    fn lerp_interpolates_and_extrapolates() {
        assert_eq!(lerp(2.0, 4.0, 0.5), 3.0);
        assert_eq!(lerp(2.0, 4.0, 0.0), 2.0);
        assert_eq!(lerp(2.0, 4.0, 1.5), 5.0);
    }

    #[test]
    fn clock_latches_on_reaching_duration() {
        let mut clock = SimulationClock::new(5.0);
        for _ in 0..4 {
            assert!(!clock.advance(Duration::from_secs(1)));
        }
        assert!(!clock.is_ended());
        assert!(clock.advance(Duration::from_secs(1)));
        assert!(clock.is_ended());
        assert!(
            !clock.advance(Duration::from_secs(1)),
            "latch must only report once"
        );
        assert_eq!(clock.elapsed(), 5.0);
    }

    #[test]
    fn clock_latches_on_time_with_fractional_steps() {
        let runs = [(20.0, 50, 400), (3.0, 100, 30), (2.0, 16, 125)];
        for (duration, step_ms, expected_steps) in runs {
            let mut clock = SimulationClock::new(duration);
            let mut steps = 0;
            while !clock.is_ended() {
                let _ = clock.advance(Duration::from_millis(step_ms));
                steps += 1;
            }
            assert_eq!(steps, expected_steps, "{duration}s at {step_ms}ms");
            assert_eq!(clock.elapsed(), duration);
        }
    }

    #[test]
    fn clock_ignores_empty_steps() {
        let mut clock = SimulationClock::new(1.0);
        assert!(!clock.advance(Duration::ZERO));
        assert_eq!(clock.elapsed(), 0.0);
        assert!(!clock.is_ended());
    }

    #[test]
    fn validation_helpers_reject_out_of_range_values() {
        assert!(require_positive("duration_sec", 0.0).is_err());
        assert!(require_positive("duration_sec", f32::NAN).is_err());
        assert!(require_non_negative("rise_per_sec", -0.1).is_err());
        assert!(require_non_negative("rise_per_sec", 0.0).is_ok());
        assert_eq!(
            require_unit("clear_threshold", 1.2),
            Err(TuningError::OutsideUnitRange {
                field: "clear_threshold",
                value: 1.2,
            })
        );
    }

    #[test]
    fn events_serialise_with_snake_case_tags() {
        let json = serde_json::to_string(&Event::CalmWindowOpened { channel: 2 })
            .expect("events always serialise");
        assert_eq!(json, r#"{"event":"calm_window_opened","channel":2}"#);

        let json = serde_json::to_string(&Event::Ended).expect("events always serialise");
        assert_eq!(json, r#"{"event":"ended"}"#);
    }
}
