#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Multi-lane containment engine.
//!
//! Each lane carries an amplitude that creeps upward with jitter and a slow
//! per-lane oscillation. The player clicks a lane to calm it for a short
//! window. When every lane sits at or above the critical threshold at once the
//! engine forces a recalibration: all lanes drain toward zero, input is
//! ignored, and a calm window is handed to a fixed lane when it ends.
//!
//! The host drives the engine by calling [`Containment::update`] once per
//! frame. Nothing here sleeps or schedules work apart from handing the
//! completion callback to its scheduler when the run ends.

mod layout;
mod tuning;

use std::{f32::consts::TAU, time::Duration};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use stabilize_core::{
    clamp, CompletionNotice, Countdown, Event, MessageBoard, Point, SimulationClock,
    SurfaceSize, TuningError, COUNTDOWN_EPSILON,
};

pub use layout::{LaneLayout, LaneRect};
pub use tuning::ContainmentTuning;

/// Headline shown whenever no transient message is active.
pub const DEFAULT_MESSAGE: &str = "Slow what's rising.";
/// Message requested while any lane is at or above the warning threshold.
pub const WARN_MESSAGE: &str = "Instability increasing.";
/// Message shown while recalibrating.
pub const RECALIBRATING_MESSAGE: &str = "Recalibrating…";
/// Message shown when recalibration hands control back to the player.
pub const RESUME_MESSAGE: &str = "Contain early.";
/// Message pinned once the run has ended.
pub const COMPLETE_MESSAGE: &str = "Stability, for now.";

const WARN_MESSAGE_SEC: f32 = 0.7;
const RECALIBRATION_ENTRY_MESSAGE_SEC: f32 = 0.8;
const RECALIBRATION_HOLD_MESSAGE_SEC: f32 = 0.3;
const RESUME_MESSAGE_SEC: f32 = 1.0;

/// Instability track owned by the engine.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Channel {
    amplitude: f32,
    phase: f32,
}

impl Channel {
    /// Current instability value, always within `[0, max]`.
    #[must_use]
    pub const fn amplitude(&self) -> f32 {
        self.amplitude
    }

    /// Oscillation phase in radians.
    #[must_use]
    pub const fn phase(&self) -> f32 {
        self.phase
    }
}

/// Calm window granted to at most one channel at a time.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct CalmWindow {
    channel: Option<usize>,
    timer: Countdown,
}

impl CalmWindow {
    fn open(&mut self, channel: usize, seconds: f32) {
        self.channel = Some(channel);
        self.timer.start(seconds);
    }

    fn revoke(&mut self) {
        self.channel = None;
        self.timer.clear();
    }

    fn active_channel(&self) -> Option<usize> {
        if self.timer.is_running() {
            self.channel
        } else {
            None
        }
    }
}

/// Mutually exclusive operating modes.
#[derive(Clone, Copy, Debug, PartialEq)]
enum Mode {
    Normal,
    Recalibrating { elapsed: f32 },
}

/// Multi-lane containment simulation.
///
/// Generic over the jitter source so tests can replay exact trajectories; the
/// default is a seeded [`ChaCha8Rng`].
#[derive(Debug)]
pub struct Containment<R = ChaCha8Rng> {
    tuning: ContainmentTuning,
    clock: SimulationClock,
    channels: Vec<Channel>,
    calm: CalmWindow,
    mode: Mode,
    warning: bool,
    messages: MessageBoard,
    completion: CompletionNotice,
    rng: R,
}

impl Containment<ChaCha8Rng> {
    /// Creates an engine whose jitter is drawn from a ChaCha stream seeded with `seed`.
    pub fn with_seed(
        tuning: ContainmentTuning,
        seed: u64,
        completion: CompletionNotice,
    ) -> Result<Self, TuningError> {
        Self::new(tuning, ChaCha8Rng::seed_from_u64(seed), completion)
    }
}

impl<R: Rng> Containment<R> {
    /// Creates an engine after validating `tuning`.
    ///
    /// Starting amplitudes and phases are drawn from `rng`, lane by lane.
    pub fn new(
        tuning: ContainmentTuning,
        mut rng: R,
        completion: CompletionNotice,
    ) -> Result<Self, TuningError> {
        tuning.validate()?;

        let channels = (0..tuning.lanes)
            .map(|_| {
                let amplitude = tuning.initial_amplitude_min
                    + rng.gen::<f32>() * tuning.initial_amplitude_spread;
                let phase = rng.gen::<f32>() * TAU;
                Channel {
                    amplitude: clamp(amplitude, 0.0, tuning.max),
                    phase,
                }
            })
            .collect();

        Ok(Self {
            clock: SimulationClock::new(tuning.duration_sec),
            channels,
            calm: CalmWindow::default(),
            mode: Mode::Normal,
            warning: false,
            messages: MessageBoard::new(DEFAULT_MESSAGE),
            completion,
            rng,
            tuning,
        })
    }

    /// Handles a pointer press at `point` on a surface of size `surface`.
    ///
    /// A press on a lane opens a fresh calm window there, replacing any
    /// existing one. Presses on padding or gaps, after the run has ended, or
    /// during recalibration are ignored. Returns the calmed lane, if any.
    pub fn pointer_down(
        &mut self,
        point: Point,
        surface: SurfaceSize,
        out: &mut Vec<Event>,
    ) -> Option<usize> {
        if self.clock.is_ended() || self.is_recalibrating() {
            return None;
        }

        let channel = LaneLayout::new(surface, self.tuning.lanes).lane_at(point)?;
        self.calm.open(channel, self.tuning.calm_duration_sec);
        log::debug!("calm window opened on lane {channel}");
        out.push(Event::CalmWindowOpened { channel });
        Some(channel)
    }

    /// Advances the simulation by `dt`.
    ///
    /// Does nothing once the run has ended.
    pub fn update(&mut self, dt: Duration, out: &mut Vec<Event>) {
        if self.clock.is_ended() {
            return;
        }

        if self.clock.advance(dt) {
            self.finish(out);
            return;
        }

        let dt = dt.as_secs_f32();

        if self.messages.tick(dt) {
            self.push_message(out);
        }

        if self.calm.timer.tick(dt) {
            if let Some(channel) = self.calm.channel.take() {
                log::debug!("calm window on lane {channel} expired");
                out.push(Event::CalmWindowExpired { channel });
            }
        }

        match self.mode {
            Mode::Recalibrating { elapsed } => self.step_recalibration(elapsed + dt, dt, out),
            Mode::Normal => self.step_channels(dt, out),
        }
    }

    fn step_channels(&mut self, dt: f32, out: &mut Vec<Event>) {
        let tuning = &self.tuning;
        let calm_channel = self.calm.active_channel();
        let mut any_warn = false;
        let mut all_critical = true;

        for (index, channel) in self.channels.iter_mut().enumerate() {
            let rate = tuning.phase_base_rate + index as f32 * tuning.phase_rate_per_lane;
            channel.phase += dt * rate;
            let oscillation = channel.phase.sin() * tuning.oscillation_amplitude;
            let jitter = (self.rng.gen::<f32>() - 0.5) * tuning.jitter_per_sec;

            let mut rise = tuning.rise_per_sec + jitter + oscillation;
            if calm_channel == Some(index) {
                rise *= 1.0 - tuning.calm_strength;
                channel.amplitude -= tuning.calm_drop_per_sec * dt;
            }

            channel.amplitude += rise * dt;
            channel.amplitude -= tuning.natural_decay_per_sec * dt;
            channel.amplitude = clamp(channel.amplitude, 0.0, tuning.max);

            any_warn |= channel.amplitude >= tuning.warn;
            all_critical &= channel.amplitude >= tuning.critical;
        }

        log::trace!(
            "lanes {:?}",
            self.channels.iter().map(Channel::amplitude).collect::<Vec<_>>()
        );

        if any_warn {
            self.show(WARN_MESSAGE, WARN_MESSAGE_SEC, out);
            if !self.warning {
                out.push(Event::InstabilityWarning);
            }
        }
        self.warning = any_warn;

        if all_critical {
            self.mode = Mode::Recalibrating { elapsed: 0.0 };
            self.calm.revoke();
            self.show(RECALIBRATING_MESSAGE, RECALIBRATION_ENTRY_MESSAGE_SEC, out);
            log::debug!("every lane critical; recalibrating");
            out.push(Event::RecalibrationStarted);
        }
    }

    fn step_recalibration(&mut self, elapsed: f32, dt: f32, out: &mut Vec<Event>) {
        let drop = self.tuning.recalibrate_drop_per_sec * dt;
        for channel in &mut self.channels {
            channel.amplitude = (channel.amplitude - drop).max(0.0);
        }

        self.show(RECALIBRATING_MESSAGE, RECALIBRATION_HOLD_MESSAGE_SEC, out);

        if elapsed + COUNTDOWN_EPSILON < self.tuning.recalibrate_hold_sec {
            self.mode = Mode::Recalibrating { elapsed };
            return;
        }

        self.mode = Mode::Normal;
        self.warning = false;
        let calm_channel = self.tuning.recalibration_calm_channel();
        self.calm.open(calm_channel, self.tuning.recalibrate_calm_sec);
        self.show(RESUME_MESSAGE, RESUME_MESSAGE_SEC, out);
        log::debug!("recalibration finished; calming lane {calm_channel}");
        out.push(Event::RecalibrationFinished { calm_channel });
        out.push(Event::CalmWindowOpened {
            channel: calm_channel,
        });
    }

    fn finish(&mut self, out: &mut Vec<Event>) {
        if self.messages.pin(COMPLETE_MESSAGE) {
            self.push_message(out);
        }
        if self.completion.trigger() {
            log::debug!(
                "run ended; completion scheduled in {:?}",
                self.completion.grace()
            );
        }
        out.push(Event::Ended);
    }

    fn show(&mut self, text: &str, seconds: f32, out: &mut Vec<Event>) {
        if self.messages.set(text, seconds) {
            self.push_message(out);
        }
    }

    fn push_message(&self, out: &mut Vec<Event>) {
        out.push(Event::MessageChanged {
            text: self.messages.text().to_owned(),
        });
    }
}

impl<R> Containment<R> {
    /// Tuning the engine was built with.
    #[must_use]
    pub const fn tuning(&self) -> &ContainmentTuning {
        &self.tuning
    }

    /// All channels in lane order.
    #[must_use]
    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    /// Lane currently holding an active calm window.
    #[must_use]
    pub fn calm_channel(&self) -> Option<usize> {
        self.calm.active_channel()
    }

    /// Seconds left on the active calm window, zero when none is active.
    #[must_use]
    pub const fn calm_remaining(&self) -> f32 {
        self.calm.timer.remaining()
    }

    /// Reports whether the engine is in forced recalibration.
    #[must_use]
    pub const fn is_recalibrating(&self) -> bool {
        matches!(self.mode, Mode::Recalibrating { .. })
    }

    /// Seconds spent in the current recalibration, zero outside one.
    #[must_use]
    pub const fn recalibration_elapsed(&self) -> f32 {
        match self.mode {
            Mode::Recalibrating { elapsed } => elapsed,
            Mode::Normal => 0.0,
        }
    }

    /// Headline text currently displayed.
    #[must_use]
    pub fn message(&self) -> &str {
        self.messages.text()
    }

    /// Seconds of simulated time elapsed.
    #[must_use]
    pub fn elapsed(&self) -> f32 {
        self.clock.elapsed()
    }

    /// Reports whether the run has ended.
    #[must_use]
    pub const fn is_ended(&self) -> bool {
        self.clock.is_ended()
    }

    /// Reports whether the run has ended and the completion callback has
    /// been handed to its scheduler.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.clock.is_ended() && self.completion.is_spent()
    }

    /// Overwrites a lane's amplitude, clamped to `[0, max]`.
    ///
    /// Intended for scripted scenarios; ignored for unknown lanes.
    #[doc(hidden)]
    pub fn force_amplitude(&mut self, channel: usize, amplitude: f32) {
        let max = self.tuning.max;
        if let Some(channel) = self.channels.get_mut(channel) {
            channel.amplitude = clamp(amplitude, 0.0, max);
        }
    }
}
