use serde::Deserialize;
use stabilize_core::{require_non_negative, require_positive, require_unit, TuningError};

/// Tuning knobs for the multi-lane containment engine.
///
/// Every field has a default matching the shipped minigame, so a config file
/// only needs to name the values it changes.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ContainmentTuning {
    /// Length of the run in seconds before it latches `ended`.
    pub duration_sec: f32,
    /// Number of lanes laid out side by side.
    pub lanes: usize,
    /// Baseline amplitude gained per second by every lane.
    pub rise_per_sec: f32,
    /// Width of the symmetric random jitter added to the rise each tick.
    pub jitter_per_sec: f32,
    /// Amplitude lost per second regardless of player input.
    pub natural_decay_per_sec: f32,
    /// Length of a player-granted calm window.
    pub calm_duration_sec: f32,
    /// Fraction of the rise removed while a lane is calm.
    pub calm_strength: f32,
    /// Extra amplitude drained per second while a lane is calm.
    pub calm_drop_per_sec: f32,
    /// Amplitude at which the instability warning is shown.
    pub warn: f32,
    /// Amplitude every lane must reach simultaneously to force recalibration.
    pub critical: f32,
    /// Ceiling for lane amplitudes.
    pub max: f32,
    /// Seconds spent recalibrating before normal dynamics resume.
    pub recalibrate_hold_sec: f32,
    /// Amplitude drained per second from every lane while recalibrating.
    pub recalibrate_drop_per_sec: f32,
    /// Length of the automatic calm window granted when recalibration ends.
    pub recalibrate_calm_sec: f32,
    /// Lane granted the automatic calm window; `None` picks the middle lane.
    pub recalibrate_calm_channel: Option<usize>,
    /// Angular rate of lane zero's oscillation in radians per second.
    pub phase_base_rate: f32,
    /// Angular rate added per lane index.
    pub phase_rate_per_lane: f32,
    /// Peak contribution of the oscillation to the rise.
    pub oscillation_amplitude: f32,
    /// Lowest starting amplitude.
    pub initial_amplitude_min: f32,
    /// Width of the uniform range starting amplitudes are drawn from.
    pub initial_amplitude_spread: f32,
}

impl Default for ContainmentTuning {
    fn default() -> Self {
        Self {
            duration_sec: 20.0,
            lanes: 3,
            rise_per_sec: 0.08,
            jitter_per_sec: 0.06,
            natural_decay_per_sec: 0.03,
            calm_duration_sec: 2.2,
            calm_strength: 0.75,
            calm_drop_per_sec: 0.18,
            warn: 0.70,
            critical: 0.85,
            max: 1.0,
            recalibrate_hold_sec: 1.0,
            recalibrate_drop_per_sec: 0.35,
            recalibrate_calm_sec: 1.2,
            recalibrate_calm_channel: None,
            phase_base_rate: 0.8,
            phase_rate_per_lane: 0.15,
            oscillation_amplitude: 0.015,
            initial_amplitude_min: 0.25,
            initial_amplitude_spread: 0.25,
        }
    }
}

impl ContainmentTuning {
    /// Lane that receives the calm window when recalibration finishes.
    #[must_use]
    pub fn recalibration_calm_channel(&self) -> usize {
        self.recalibrate_calm_channel.unwrap_or(self.lanes / 2)
    }

    /// Checks that the tuning describes a playable configuration.
    pub fn validate(&self) -> Result<(), TuningError> {
        if self.lanes == 0 {
            return Err(TuningError::NoLanes);
        }

        require_positive("duration_sec", self.duration_sec)?;
        require_positive("max", self.max)?;
        require_unit("calm_strength", self.calm_strength)?;

        let non_negative = [
            ("rise_per_sec", self.rise_per_sec),
            ("jitter_per_sec", self.jitter_per_sec),
            ("natural_decay_per_sec", self.natural_decay_per_sec),
            ("calm_duration_sec", self.calm_duration_sec),
            ("calm_drop_per_sec", self.calm_drop_per_sec),
            ("warn", self.warn),
            ("critical", self.critical),
            ("recalibrate_hold_sec", self.recalibrate_hold_sec),
            ("recalibrate_drop_per_sec", self.recalibrate_drop_per_sec),
            ("recalibrate_calm_sec", self.recalibrate_calm_sec),
            ("phase_base_rate", self.phase_base_rate),
            ("phase_rate_per_lane", self.phase_rate_per_lane),
            ("oscillation_amplitude", self.oscillation_amplitude),
            ("initial_amplitude_min", self.initial_amplitude_min),
            ("initial_amplitude_spread", self.initial_amplitude_spread),
        ];
        for (field, value) in non_negative {
            require_non_negative(field, value)?;
        }

        if self.warn > self.critical {
            return Err(TuningError::WarnAboveCritical {
                warn: self.warn,
                critical: self.critical,
            });
        }
        if self.critical > self.max {
            return Err(TuningError::CriticalAboveMax {
                critical: self.critical,
                max: self.max,
            });
        }

        let channel = self.recalibration_calm_channel();
        if channel >= self.lanes {
            return Err(TuningError::CalmChannelOutOfRange {
                channel,
                lanes: self.lanes,
            });
        }

        Ok(())
    }
}
