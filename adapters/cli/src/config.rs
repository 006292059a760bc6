use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::Deserialize;
use stabilize_system_containment::ContainmentTuning;
use stabilize_system_suppression::SuppressionTuning;

/// Tuning overrides loaded from a TOML file.
///
/// Both tables are optional and any field left out keeps its default.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct Config {
    /// Overrides for the multi-lane containment minigame.
    pub(crate) containment: ContainmentTuning,
    /// Overrides for the focus and noise suppression minigame.
    pub(crate) suppression: SuppressionTuning,
}

impl Config {
    /// Reads and parses the config file at `path`.
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("invalid config {}", path.display()))
    }

    fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_keeps_defaults() {
        assert_eq!(Config::parse("").expect("empty config"), Config::default());
    }

    #[test]
    fn partial_tables_override_named_fields_only() {
        let config = Config::parse(
            r#"
            [containment]
            lanes = 5
            duration_sec = 8.0

            [suppression]
            clear_threshold = 0.2
            "#,
        )
        .expect("valid config");

        assert_eq!(config.containment.lanes, 5);
        assert_eq!(config.containment.duration_sec, 8.0);
        assert_eq!(
            config.containment.rise_per_sec,
            ContainmentTuning::default().rise_per_sec
        );
        assert_eq!(config.suppression.clear_threshold, 0.2);
        assert_eq!(
            config.suppression.initial_focus,
            SuppressionTuning::default().initial_focus
        );
    }

    #[test]
    fn unknown_tables_are_rejected() {
        assert!(Config::parse("[pressure]\nlanes = 2\n").is_err());
        assert!(Config::parse("[containment]\nlane = 2\n").is_err());
    }

    #[test]
    fn missing_file_reports_the_path() {
        let error = Config::load(Path::new("/definitely/not/here.toml"))
            .expect_err("missing file");
        assert!(format!("{error:#}").contains("/definitely/not/here.toml"));
    }
}
