use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::key::Key;
use crate::types::ModeSet;

/// Cursor and word motions, plus `x`/`X`, flag after three presses.
const MOTION_KEYS: [char; 12] = ['h', 'j', 'k', 'l', 'b', 'B', 'w', 'W', 'e', 'E', 'x', 'X'];
const MOTION_THRESHOLD: u32 = 2;
/// `dd` is a command on its own, so deletes flag one press later.
const DELETE_THRESHOLD: u32 = 3;
/// Largest accepted repeat threshold.
pub const MAX_REPEAT_THRESHOLD: u32 = 1000;

/// Per-key repeat thresholds for the repeat-run detector.
///
/// A key not in the table is never considered repeatable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RepeatThresholds(BTreeMap<char, u32>);

impl Default for RepeatThresholds {
    fn default() -> Self {
        let mut table: BTreeMap<char, u32> = MOTION_KEYS
            .into_iter()
            .map(|c| (c, MOTION_THRESHOLD))
            .collect();
        table.insert('d', DELETE_THRESHOLD);
        Self(table)
    }
}

impl RepeatThresholds {
    pub fn empty() -> Self {
        Self(BTreeMap::new())
    }

    pub fn get(&self, key: char) -> Option<u32> {
        self.0.get(&key).copied()
    }

    pub fn set(&mut self, key: char, threshold: u32) {
        self.0.insert(key, threshold);
    }

    pub fn remove(&mut self, key: char) {
        self.0.remove(&key);
    }

    pub fn iter(&self) -> impl Iterator<Item = (char, u32)> + '_ {
        self.0.iter().map(|(&c, &t)| (c, t))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (key, threshold) in self.iter() {
            if threshold == 0 {
                return Err(ConfigError::ZeroThreshold(key));
            }
            if threshold > MAX_REPEAT_THRESHOLD {
                return Err(ConfigError::ThresholdTooLarge(key, threshold));
            }
        }
        Ok(())
    }
}

/// Knobs accepted by [`Analyzer`](crate::Analyzer).
///
/// Missing JSON fields take their defaults:
///
/// ```json
/// {
///   "excluded_modes": ["insert", "command"],
///   "min_occurrences": 2,
///   "repeat_thresholds": { "j": 2, "d": 3 },
///   "always_count": "<Esc>"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Modes whose keys are left out of the per-key tally.
    pub excluded_modes: ModeSet,
    /// Antipatterns seen fewer times than this are not reported.
    pub min_occurrences: u64,
    pub repeat_thresholds: RepeatThresholds,
    /// Key tallied even when typed in an excluded mode.
    #[serde(with = "key_notation")]
    pub always_count: Option<Key>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            excluded_modes: ModeSet::INSERT | ModeSet::COMMAND,
            min_occurrences: 2,
            repeat_thresholds: RepeatThresholds::default(),
            always_count: Some(Key::ESC),
        }
    }
}

impl AnalyzerConfig {
    pub fn builder() -> AnalyzerConfigBuilder {
        AnalyzerConfigBuilder::default()
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: AnalyzerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.repeat_thresholds.validate()
    }
}

#[derive(Default)]
pub struct AnalyzerConfigBuilder {
    config: AnalyzerConfig,
}

impl AnalyzerConfigBuilder {
    pub fn excluded_modes(mut self, modes: impl Into<ModeSet>) -> Self {
        self.config.excluded_modes = modes.into();
        self
    }

    pub fn min_occurrences(mut self, min: u64) -> Self {
        self.config.min_occurrences = min;
        self
    }

    pub fn repeat_threshold(mut self, key: char, threshold: u32) -> Self {
        self.config.repeat_thresholds.set(key, threshold);
        self
    }

    pub fn repeat_thresholds(mut self, thresholds: RepeatThresholds) -> Self {
        self.config.repeat_thresholds = thresholds;
        self
    }

    pub fn always_count(mut self, key: Option<Key>) -> Self {
        self.config.always_count = key;
        self
    }

    pub fn build(self) -> Result<AnalyzerConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// `Option<Key>` as editor notation, e.g. `"<Esc>"`, or `null`.
mod key_notation {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use crate::key::Key;

    pub fn serialize<S: Serializer>(key: &Option<Key>, serializer: S) -> Result<S::Ok, S::Error> {
        key.map(|k| k.to_string()).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Key>, D::Error> {
        let Some(text) = Option::<String>::deserialize(deserializer)? else {
            return Ok(None);
        };
        text.parse::<Key>()
            .map(Some)
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Mode;

    #[test]
    fn defaults() {
        let config = AnalyzerConfig::default();
        assert!(config.excluded_modes.has(Mode::Insert));
        assert!(config.excluded_modes.has(Mode::Command));
        assert!(!config.excluded_modes.has(Mode::Normal));
        assert_eq!(config.min_occurrences, 2);
        assert_eq!(config.repeat_thresholds.get('j'), Some(2));
        assert_eq!(config.repeat_thresholds.get('d'), Some(3));
        assert_eq!(config.repeat_thresholds.get('x'), Some(2));
        assert_eq!(config.repeat_thresholds.get('u'), None);
        assert_eq!(config.always_count, Some(Key::ESC));
    }

    #[test]
    fn json_fills_missing_fields() {
        let config = AnalyzerConfig::from_json(r#"{"min_occurrences": 5}"#).unwrap();
        assert_eq!(config.min_occurrences, 5);
        assert_eq!(config.repeat_thresholds, RepeatThresholds::default());
        assert_eq!(config.always_count, Some(Key::ESC));
    }

    #[test]
    fn json_overrides() {
        let config = AnalyzerConfig::from_json(
            r#"{
                "excluded_modes": ["visual"],
                "repeat_thresholds": {"j": 4},
                "always_count": null
            }"#,
        )
        .unwrap();
        assert_eq!(config.excluded_modes, ModeSet::VISUAL);
        assert_eq!(config.repeat_thresholds.get('j'), Some(4));
        assert_eq!(config.repeat_thresholds.get('h'), None);
        assert_eq!(config.always_count, None);
    }

    #[test]
    fn json_always_count_notation() {
        let config = AnalyzerConfig::from_json(r#"{"always_count": "<C-c>"}"#).unwrap();
        assert_eq!(config.always_count, Some(Key::ctrl('c')));
    }

    #[test]
    fn unknown_mode_is_an_error() {
        let err = AnalyzerConfig::from_json(r#"{"excluded_modes": ["replace"]}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
        assert!(err.to_string().contains("replace"));
    }

    #[test]
    fn zero_threshold_is_rejected() {
        let err = AnalyzerConfig::from_json(r#"{"repeat_thresholds": {"w": 0}}"#).unwrap_err();
        assert!(matches!(err, ConfigError::ZeroThreshold('w')));

        let err = AnalyzerConfig::builder()
            .repeat_threshold('j', 0)
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::ZeroThreshold('j')));
    }

    #[test]
    fn oversized_threshold_is_rejected() {
        let err = AnalyzerConfig::from_json(r#"{"repeat_thresholds": {"j": 4000000000}}"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::ThresholdTooLarge('j', 4_000_000_000)));

        let config = AnalyzerConfig::builder()
            .repeat_threshold('j', MAX_REPEAT_THRESHOLD)
            .build()
            .unwrap();
        assert_eq!(config.repeat_thresholds.get('j'), Some(MAX_REPEAT_THRESHOLD));
    }

    #[test]
    fn thresholds_table_edits() {
        let mut thresholds = RepeatThresholds::default();
        thresholds.remove('x');
        thresholds.remove('X');
        assert_eq!(thresholds.get('x'), None);
        assert_eq!(thresholds.iter().count(), 11);

        let config = AnalyzerConfig::builder()
            .repeat_thresholds(RepeatThresholds::empty())
            .build()
            .unwrap();
        assert_eq!(config.repeat_thresholds.iter().count(), 0);
    }

    #[test]
    fn builder_overrides_defaults() {
        let config = AnalyzerConfig::builder()
            .excluded_modes(Mode::Insert)
            .min_occurrences(1)
            .repeat_threshold('u', 2)
            .always_count(None)
            .build()
            .unwrap();
        assert_eq!(config.excluded_modes, ModeSet::INSERT);
        assert_eq!(config.min_occurrences, 1);
        assert_eq!(config.repeat_thresholds.get('u'), Some(2));
        assert_eq!(config.always_count, None);
    }
}
