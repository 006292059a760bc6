#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Focus and noise suppression engine.
//!
//! Holding the control spends focus to push noise down; releasing it lets
//! focus recover while noise creeps back. Noise only falls while some focus
//! remains, so long holds stall once focus runs dry.

mod tuning;

use std::time::Duration;

use stabilize_core::{
    clamp, CompletionNotice, Event, MessageBoard, Point, SimulationClock, SurfaceSize,
    TuningError,
};

pub use tuning::SuppressionTuning;

/// Headline shown whenever no transient message is active.
pub const DEFAULT_MESSAGE: &str = "Slow the noise.";
/// Guidance requested while holding on nearly empty focus.
pub const GUIDANCE_MESSAGE: &str = "Short bursts.";
/// Message pinned once the run has ended.
pub const COMPLETE_MESSAGE: &str = "Clearer — not complete.";

/// Band along the bottom of the surface that accepts hold gestures.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ControlRegion {
    top: f32,
}

impl ControlRegion {
    /// Region covering everything at or below `fraction` of the surface height.
    #[must_use]
    pub fn new(surface: SurfaceSize, fraction: f32) -> Self {
        Self {
            top: surface.height * fraction,
        }
    }

    /// Vertical pixel offset where the region begins.
    #[must_use]
    pub const fn top(&self) -> f32 {
        self.top
    }

    /// Reports whether `point` falls inside the region.
    #[must_use]
    pub fn contains(&self, point: Point) -> bool {
        point.y >= self.top
    }
}

/// Dual-resource suppression simulation.
#[derive(Debug)]
pub struct Suppression {
    tuning: SuppressionTuning,
    clock: SimulationClock,
    focus: f32,
    noise: f32,
    clear_time: f32,
    holding: bool,
    messages: MessageBoard,
    completion: CompletionNotice,
}

impl Suppression {
    /// Creates an engine after validating `tuning`.
    pub fn new(
        tuning: SuppressionTuning,
        completion: CompletionNotice,
    ) -> Result<Self, TuningError> {
        tuning.validate()?;
        Ok(Self {
            clock: SimulationClock::new(tuning.duration_sec),
            focus: tuning.initial_focus,
            noise: tuning.initial_noise,
            clear_time: 0.0,
            holding: false,
            messages: MessageBoard::new(DEFAULT_MESSAGE),
            completion,
            tuning,
        })
    }

    /// Region of `surface` that accepts hold gestures.
    #[must_use]
    pub fn control_region(&self, surface: SurfaceSize) -> ControlRegion {
        ControlRegion::new(surface, self.tuning.control_region_top)
    }

    /// Starts a hold when `point` lies inside the control region.
    ///
    /// Ignored after the run has ended. Returns `true` when the press landed
    /// in the region.
    pub fn pointer_down(
        &mut self,
        point: Point,
        surface: SurfaceSize,
        out: &mut Vec<Event>,
    ) -> bool {
        if self.clock.is_ended() || !self.control_region(surface).contains(point) {
            return false;
        }
        if !self.holding {
            self.holding = true;
            log::debug!("hold started at {point:?}");
            out.push(Event::HoldStarted);
        }
        true
    }

    /// Releases an active hold.
    ///
    /// Only a hold that began inside the control region can be active, so the
    /// release point is not checked.
    pub fn pointer_up(&mut self, _point: Point, out: &mut Vec<Event>) {
        if !self.holding {
            return;
        }
        self.holding = false;
        log::debug!("hold released");
        out.push(Event::HoldReleased);
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

        let tuning = &self.tuning;
        if self.holding {
            let before = self.focus;
            self.focus = (self.focus - tuning.focus_drain_per_sec * dt).max(0.0);
            if self.focus > 0.0 {
                self.noise = (self.noise - tuning.noise_decrease_per_sec * dt).max(0.0);
            } else if before > 0.0 {
                log::debug!("focus depleted while holding");
                out.push(Event::FocusDepleted);
            }
        } else {
            self.focus = (self.focus + tuning.focus_recharge_per_sec * dt).min(1.0);
            self.noise = (self.noise + tuning.noise_increase_per_sec * dt).min(1.0);
        }

        if self.noise < tuning.clear_threshold {
            self.clear_time += dt;
        }

        log::trace!(
            "focus {:.3} noise {:.3} clear {:.2}s",
            self.focus,
            self.noise,
            self.clear_time
        );

        if self.holding && self.focus < self.tuning.low_focus_threshold {
            let seconds = self.tuning.guidance_message_sec;
            if self.messages.set(GUIDANCE_MESSAGE, seconds) {
                self.push_message(out);
            }
        }
    }

    fn finish(&mut self, out: &mut Vec<Event>) {
        if self.messages.pin(COMPLETE_MESSAGE) {
            self.push_message(out);
        }
        if self.completion.trigger() {
            log::debug!(
                "run ended after {:.2}s of clear time; completion scheduled in {:?}",
                self.clear_time,
                self.completion.grace()
            );
        }
        out.push(Event::Ended);
    }

    fn push_message(&self, out: &mut Vec<Event>) {
        out.push(Event::MessageChanged {
            text: self.messages.text().to_owned(),
        });
    }

    /// Tuning the engine was built with.
    #[must_use]
    pub const fn tuning(&self) -> &SuppressionTuning {
        &self.tuning
    }

    /// Remaining focus in `[0, 1]`.
    #[must_use]
    pub const fn focus(&self) -> f32 {
        self.focus
    }

    /// Current noise level in `[0, 1]`.
    #[must_use]
    pub const fn noise_level(&self) -> f32 {
        self.noise
    }

    /// Seconds the noise has spent below the clear threshold.
    #[must_use]
    pub const fn clear_time(&self) -> f32 {
        self.clear_time
    }

    /// Reports whether the control is being held.
    #[must_use]
    pub const fn is_holding(&self) -> bool {
        self.holding
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

    #[doc(hidden)]
    pub fn force_focus(&mut self, focus: f32) {
        self.focus = clamp(focus, 0.0, 1.0);
    }

    #[doc(hidden)]
    pub fn force_noise(&mut self, noise: f32) {
        self.noise = clamp(noise, 0.0, 1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn surface() -> SurfaceSize {
        SurfaceSize::new(800.0, 600.0)
    }

    fn engine() -> Suppression {
        Suppression::new(SuppressionTuning::default(), CompletionNotice::silent())
            .expect("valid tuning")
    }

    fn hold(engine: &mut Suppression, out: &mut Vec<Event>) {
        assert!(engine.pointer_down(Point::new(400.0, 500.0), surface(), out));
    }

    #[test]
    fn control_region_starts_at_configured_fraction() {
        let region = ControlRegion::new(surface(), 0.65);
        assert!((region.top() - 390.0).abs() < 1e-4);
        assert!(region.contains(Point::new(0.0, 391.0)));
        assert!(!region.contains(Point::new(0.0, 389.0)));
    }

    #[test]
    fn presses_outside_region_do_not_hold() {
        let mut engine = engine();
        let mut events = Vec::new();
        assert!(!engine.pointer_down(Point::new(400.0, 100.0), surface(), &mut events));
        assert!(!engine.is_holding());
        assert!(events.is_empty());
    }

    #[test]
    fn hold_and_release_emit_events_once() {
        let mut engine = engine();
        let mut events = Vec::new();
        hold(&mut engine, &mut events);
        hold(&mut engine, &mut events);
        engine.pointer_up(Point::new(0.0, 0.0), &mut events);
        engine.pointer_up(Point::new(0.0, 0.0), &mut events);
        assert_eq!(events, vec![Event::HoldStarted, Event::HoldReleased]);
    }

    #[test]
    fn holding_spends_focus_to_reduce_noise() {
        let mut engine = engine();
        let mut events = Vec::new();
        hold(&mut engine, &mut events);
        engine.update(Duration::from_secs(1), &mut events);
        assert!((engine.focus() - 0.40).abs() < 1e-5);
        assert!((engine.noise_level() - 0.40).abs() < 1e-5);
    }

    #[test]
    fn releasing_recovers_focus_while_noise_returns() {
        let mut engine = engine();
        let mut events = Vec::new();
        engine.update(Duration::from_secs(1), &mut events);
        assert!((engine.focus() - 0.93).abs() < 1e-5);
        assert!((engine.noise_level() - 0.73).abs() < 1e-5);

        engine.update(Duration::from_secs(2), &mut events);
        assert_eq!(engine.focus(), 1.0);
    }

    #[test]
    fn clear_time_accumulates_below_threshold() {
        let mut engine = engine();
        let mut events = Vec::new();
        engine.force_noise(0.1);
        engine.update(Duration::from_millis(500), &mut events);
        assert!((engine.clear_time() - 0.5).abs() < 1e-6);

        engine.force_noise(0.9);
        engine.update(Duration::from_millis(500), &mut events);
        assert!((engine.clear_time() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn low_focus_hold_shows_guidance_and_depletion() {
        let mut engine = engine();
        let mut events = Vec::new();
        engine.force_focus(0.1);
        hold(&mut engine, &mut events);

        engine.update(Duration::from_millis(100), &mut events);
        assert_eq!(engine.message(), GUIDANCE_MESSAGE);

        engine.update(Duration::from_millis(500), &mut events);
        assert_eq!(engine.focus(), 0.0);
        assert!(events.contains(&Event::FocusDepleted));
    }

    #[test]
    fn guidance_reverts_to_default_after_release() {
        let mut engine = engine();
        let mut events = Vec::new();
        engine.force_focus(0.1);
        hold(&mut engine, &mut events);
        engine.update(Duration::from_millis(100), &mut events);
        engine.pointer_up(Point::new(0.0, 0.0), &mut events);

        engine.update(Duration::from_millis(600), &mut events);
        assert_eq!(engine.message(), DEFAULT_MESSAGE);
    }
}
