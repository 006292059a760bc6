//! Countdown timer and the transient headline built on top of it.

/// Remaining time at or below this is treated as expired.
///
/// Frame deltas arrive as floats, so a countdown started at `2.0` and drained
/// in `0.1` steps can land a hair above zero on its final tick.
pub const COUNTDOWN_EPSILON: f32 = 1e-5;

/// Seconds remaining on a timer that counts down to zero and stops there.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Countdown {
    remaining: f32,
}

impl Countdown {
    /// Creates a countdown that is not running.
    #[must_use]
    pub const fn idle() -> Self {
        Self { remaining: 0.0 }
    }

    /// Restarts the countdown at exactly `seconds`, discarding prior time.
    pub fn start(&mut self, seconds: f32) {
        self.remaining = seconds.max(0.0);
    }

    /// Raises the remaining time to `seconds` unless more time is already left.
    pub fn extend_to(&mut self, seconds: f32) {
        self.remaining = self.remaining.max(seconds);
    }

    /// Stops the countdown immediately.
    pub fn clear(&mut self) {
        self.remaining = 0.0;
    }

    /// Seconds left before expiry.
    #[must_use]
    pub const fn remaining(&self) -> f32 {
        self.remaining
    }

    /// Reports whether time is left on the countdown.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.remaining > 0.0
    }

    /// Drains `dt` seconds, flooring at zero.
    ///
    /// Returns `true` only on the tick that brings a running countdown to zero.
    pub fn tick(&mut self, dt: f32) -> bool {
        if !self.is_running() {
            return false;
        }

        let next = self.remaining - dt.max(0.0);
        self.remaining = if next <= COUNTDOWN_EPSILON { 0.0 } else { next };
        !self.is_running()
    }
}

/// Headline text that shows transient messages over a fixed default.
///
/// Requests use max-wins timing: a new request replaces the text immediately
/// but only ever lengthens the remaining display time. When the countdown
/// reaches zero the default text returns.
#[derive(Clone, Debug, PartialEq)]
pub struct MessageBoard {
    default_text: String,
    text: String,
    timer: Countdown,
}

impl MessageBoard {
    /// Creates a board showing `default_text` with no transient message active.
    #[must_use]
    pub fn new(default_text: impl Into<String>) -> Self {
        let default_text = default_text.into();
        Self {
            text: default_text.clone(),
            default_text,
            timer: Countdown::idle(),
        }
    }

    /// Shows `text` for at least `seconds`.
    ///
    /// Returns `true` when the displayed text changed.
    pub fn set(&mut self, text: &str, seconds: f32) -> bool {
        self.timer.extend_to(seconds);
        self.replace_text(text)
    }

    /// Shows `text` until the board is dropped.
    ///
    /// Returns `true` when the displayed text changed.
    pub fn pin(&mut self, text: &str) -> bool {
        self.timer.extend_to(f32::INFINITY);
        self.replace_text(text)
    }

    /// Drains `dt` seconds from the message timer.
    ///
    /// Returns `true` when this tick expired the message and restored the
    /// default text.
    pub fn tick(&mut self, dt: f32) -> bool {
        if !self.timer.tick(dt) {
            return false;
        }
        self.text.clone_from(&self.default_text);
        true
    }

    /// Text currently displayed.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Text shown whenever no transient message is active.
    #[must_use]
    pub fn default_text(&self) -> &str {
        &self.default_text
    }

    /// Seconds until the current message reverts to the default.
    #[must_use]
    pub const fn remaining(&self) -> f32 {
        self.timer.remaining()
    }

    fn replace_text(&mut self, text: &str) -> bool {
        if self.text == text {
            return false;
        }
        text.clone_into(&mut self.text);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn countdown_reports_expiry_once() {
        let mut countdown = Countdown::idle();
        countdown.start(0.5);
        assert!(!countdown.tick(0.25));
        assert!(countdown.tick(0.25));
        assert!(!countdown.tick(0.25));
        assert_eq!(countdown.remaining(), 0.0);
    }

    #[test]
    fn countdown_snaps_float_residue_to_zero() {
        let mut countdown = Countdown::idle();
        countdown.start(2.0);
        let mut ticks = 0;
        while !countdown.tick(0.1) {
            ticks += 1;
            assert!(ticks < 40, "countdown never expired");
        }
        assert_eq!(ticks + 1, 20);
    }

    #[test]
    fn extend_never_shortens() {
        let mut countdown = Countdown::idle();
        countdown.start(2.0);
        countdown.extend_to(0.5);
        assert_eq!(countdown.remaining(), 2.0);
        countdown.extend_to(3.0);
        assert_eq!(countdown.remaining(), 3.0);
    }

    #[test]
    fn shorter_request_replaces_text_but_keeps_longer_expiry() {
        let mut board = MessageBoard::new("idle");
        assert!(board.set("A", 2.0));
        assert!(board.set("B", 0.5));
        assert_eq!(board.text(), "B");
        assert_eq!(board.remaining(), 2.0);

        for step in 1..=19 {
            assert!(!board.tick(0.1), "reverted early at step {step}");
            assert_eq!(board.text(), "B");
        }
        assert!(board.tick(0.1));
        assert_eq!(board.text(), "idle");
    }

    #[test]
    fn repeated_request_with_same_text_reports_no_change() {
        let mut board = MessageBoard::new("idle");
        assert!(board.set("warn", 0.7));
        assert!(!board.set("warn", 0.7));
    }

    #[test]
    fn pinned_message_never_reverts() {
        let mut board = MessageBoard::new("idle");
        assert!(board.pin("done"));
        for _ in 0..1_000 {
            assert!(!board.tick(1.0));
        }
        assert_eq!(board.text(), "done");
    }

    proptest! {
        /// The displayed text reverts exactly when the longest request expires.
        #[test]
        fn message_expiry_matches_longest_request(
            requests in proptest::collection::vec(1u32..40, 1..6),
        ) {
            let mut board = MessageBoard::new("idle");
            for (index, quarter_seconds) in requests.iter().enumerate() {
                let _ = board.set(&format!("m{index}"), *quarter_seconds as f32 * 0.25);
            }
            let longest = *requests.iter().max().unwrap_or(&0);

            for _ in 1..longest {
                prop_assert!(!board.tick(0.25));
                prop_assert_ne!(board.text(), "idle");
            }
            prop_assert!(board.tick(0.25));
            prop_assert_eq!(board.text(), "idle");
        }
    }
}
