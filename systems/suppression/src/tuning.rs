use serde::Deserialize;
use stabilize_core::{require_non_negative, require_positive, require_unit, TuningError};

/// Tuning knobs for the focus and noise suppression engine.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SuppressionTuning {
    /// Length of the run in seconds before it latches `ended`.
    pub duration_sec: f32,
    /// Focus spent per second while the control is held.
    pub focus_drain_per_sec: f32,
    /// Focus regained per second while the control is released.
    pub focus_recharge_per_sec: f32,
    /// Noise removed per second while holding with focus to spare.
    pub noise_decrease_per_sec: f32,
    /// Noise gained per second while the control is released.
    pub noise_increase_per_sec: f32,
    /// Noise below this level counts towards clear time.
    pub clear_threshold: f32,
    /// Holding below this focus level shows the guidance message.
    pub low_focus_threshold: f32,
    /// Focus at the start of the run.
    pub initial_focus: f32,
    /// Noise at the start of the run.
    pub initial_noise: f32,
    /// Fraction of the surface height where the control region begins.
    pub control_region_top: f32,
    /// Seconds the guidance message stays up after each request.
    pub guidance_message_sec: f32,
}

impl Default for SuppressionTuning {
    fn default() -> Self {
        Self {
            duration_sec: 20.0,
            focus_drain_per_sec: 0.35,
            focus_recharge_per_sec: 0.18,
            noise_decrease_per_sec: 0.25,
            noise_increase_per_sec: 0.08,
            clear_threshold: 0.35,
            low_focus_threshold: 0.15,
            initial_focus: 0.75,
            initial_noise: 0.65,
            control_region_top: 0.65,
            guidance_message_sec: 0.6,
        }
    }
}

impl SuppressionTuning {
    /// Checks that the tuning describes a playable configuration.
    pub fn validate(&self) -> Result<(), TuningError> {
        require_positive("duration_sec", self.duration_sec)?;

        for (field, value) in [
            ("focus_drain_per_sec", self.focus_drain_per_sec),
            ("focus_recharge_per_sec", self.focus_recharge_per_sec),
            ("noise_decrease_per_sec", self.noise_decrease_per_sec),
            ("noise_increase_per_sec", self.noise_increase_per_sec),
            ("guidance_message_sec", self.guidance_message_sec),
        ] {
            require_non_negative(field, value)?;
        }

        for (field, value) in [
            ("clear_threshold", self.clear_threshold),
            ("low_focus_threshold", self.low_focus_threshold),
            ("initial_focus", self.initial_focus),
            ("initial_noise", self.initial_noise),
            ("control_region_top", self.control_region_top),
        ] {
            require_unit(field, value)?;
        }

        Ok(())
    }
}
