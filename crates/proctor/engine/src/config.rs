//! Monitoring configuration.
//!
//! Defines sampling cadence, per-condition debounce timing, evidence
//! retention, escalation and predicate tolerances. Durations are stored as
//! integer milliseconds so the structs load cleanly from files and
//! environment variables; use the accessor methods for [`Duration`]s.

use std::time::Duration;

use proctor_types::{ConditionType, ExamProfile};
use serde::{Deserialize, Serialize};

use crate::error::{MonitorError, MonitorResult};

/// Configuration for a monitoring session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Tick cadence and exam length.
    #[serde(default)]
    pub sampling: SamplingConfig,

    /// Debounce timing per condition.
    #[serde(default)]
    pub conditions: ConditionPolicies,

    /// Evidence log settings.
    #[serde(default)]
    pub evidence: EvidenceConfig,

    /// Score escalation settings.
    #[serde(default)]
    pub aggregator: AggregatorConfig,

    /// Tolerances for the condition predicates.
    #[serde(default)]
    pub predicates: PredicateConfig,

    /// Upstream speech smoothing.
    #[serde(default)]
    pub speech: SpeechConfig,
}

impl MonitorConfig {
    /// Create config tuned for a specific exam profile.
    pub fn for_profile(profile: ExamProfile) -> Self {
        let mut config = Self::default();

        match profile {
            ExamProfile::Standard => {}
            ExamProfile::Strict => {
                // Certification: confirm sooner, escalate sooner
                config.conditions.set_visual_confirm_delay_ms(1500);
                config.aggregator.auto_submit_threshold = 5;
            }
            ExamProfile::Lenient => {
                // Practice: only sustained behaviour counts
                config.conditions.set_visual_confirm_delay_ms(4000);
                config.conditions.noise.confirm_delay_ms = 2000;
                config.conditions.set_cooldown_ms(8000);
                config.aggregator.auto_submit_threshold = 15;
                config.speech.min_words = 3;
            }
            ExamProfile::Development => {
                config.sampling.tick_interval_ms = 200;
                config.sampling.exam_duration_ms = None;
                config.conditions.set_visual_confirm_delay_ms(500);
                config.conditions.noise.confirm_delay_ms = 500;
                config.conditions.set_cooldown_ms(1000);
            }
        }

        config.aggregator.auto_submit_enabled = profile.auto_submits();
        config
    }

    /// Reject settings the engine cannot run with.
    pub fn validate(&self) -> MonitorResult<()> {
        if self.sampling.tick_interval_ms == 0 {
            return Err(MonitorError::ConfigurationError(
                "sampling.tick_interval_ms must be positive".to_string(),
            ));
        }

        if self.evidence.max_records == 0 {
            return Err(MonitorError::ConfigurationError(
                "evidence.max_records must be positive".to_string(),
            ));
        }

        if self.aggregator.auto_submit_threshold == 0 {
            return Err(MonitorError::ConfigurationError(
                "aggregator.auto_submit_threshold must be positive".to_string(),
            ));
        }

        let predicates = &self.predicates;
        if !(predicates.gaze_min_ratio > 0.0 && predicates.gaze_min_ratio < predicates.gaze_max_ratio)
        {
            return Err(MonitorError::ConfigurationError(format!(
                "gaze band [{}, {}] is empty",
                predicates.gaze_min_ratio, predicates.gaze_max_ratio
            )));
        }

        if !(0.0..=1.0).contains(&self.evidence.snapshot_quality) {
            return Err(MonitorError::ConfigurationError(
                "evidence.snapshot_quality must be within 0.0-1.0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Sampling loop configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    /// Period between ticks.
    pub tick_interval_ms: u64,

    /// Exam length; the loop stops with `TimeExpired` once it elapses.
    pub exam_duration_ms: Option<u64>,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 600,
            exam_duration_ms: Some(600_000),
        }
    }
}

impl SamplingConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn exam_duration(&self) -> Option<Duration> {
        self.exam_duration_ms.map(Duration::from_millis)
    }
}

/// Timing parameters for one condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebounceParams {
    /// How long the condition must stay bad before it is confirmed.
    pub confirm_delay_ms: u64,

    /// Minimum spacing between two confirmations.
    pub cooldown_ms: u64,
}

impl DebounceParams {
    pub fn new(confirm_delay: Duration, cooldown: Duration) -> Self {
        Self {
            confirm_delay_ms: confirm_delay.as_millis() as u64,
            cooldown_ms: cooldown.as_millis() as u64,
        }
    }

    pub fn confirm_delay(&self) -> Duration {
        Duration::from_millis(self.confirm_delay_ms)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }
}

/// Debounce parameters for every condition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConditionPolicies {
    pub face_missing: DebounceParams,
    pub not_focus: DebounceParams,
    pub multiple_people: DebounceParams,
    pub noise: DebounceParams,
}

impl Default for ConditionPolicies {
    fn default() -> Self {
        let visual = DebounceParams {
            confirm_delay_ms: 2500,
            cooldown_ms: 5000,
        };

        Self {
            face_missing: visual,
            not_focus: visual,
            multiple_people: visual,
            noise: DebounceParams {
                confirm_delay_ms: 1000,
                cooldown_ms: 5000,
            },
        }
    }
}

impl ConditionPolicies {
    /// Parameters for a condition.
    pub fn params(&self, condition: ConditionType) -> DebounceParams {
        match condition {
            ConditionType::FaceMissing => self.face_missing,
            ConditionType::NotFocus => self.not_focus,
            ConditionType::MultiplePeople => self.multiple_people,
            ConditionType::Noise => self.noise,
        }
    }

    fn set_visual_confirm_delay_ms(&mut self, delay_ms: u64) {
        self.face_missing.confirm_delay_ms = delay_ms;
        self.not_focus.confirm_delay_ms = delay_ms;
        self.multiple_people.confirm_delay_ms = delay_ms;
    }

    fn set_cooldown_ms(&mut self, cooldown_ms: u64) {
        self.face_missing.cooldown_ms = cooldown_ms;
        self.not_focus.cooldown_ms = cooldown_ms;
        self.multiple_people.cooldown_ms = cooldown_ms;
        self.noise.cooldown_ms = cooldown_ms;
    }
}

/// Evidence log configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvidenceConfig {
    /// Maximum number of records kept, newest first.
    pub max_records: usize,

    /// Lossy compression quality requested for snapshots (0.0-1.0).
    pub snapshot_quality: f32,
}

impl Default for EvidenceConfig {
    fn default() -> Self {
        Self {
            max_records: 10,
            snapshot_quality: 0.7,
        }
    }
}

/// Score escalation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregatorConfig {
    /// Score at which the exam is submitted automatically.
    pub auto_submit_threshold: u32,

    /// When false the score is still kept but never triggers submission.
    pub auto_submit_enabled: bool,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            auto_submit_threshold: 10,
            auto_submit_enabled: true,
        }
    }
}

/// Tolerances used by the condition predicates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PredicateConfig {
    /// Lower bound of the nose-to-eye distance ratio for a centred gaze.
    pub gaze_min_ratio: f64,

    /// Upper bound of the nose-to-eye distance ratio for a centred gaze.
    pub gaze_max_ratio: f64,
}

impl Default for PredicateConfig {
    fn default() -> Self {
        Self {
            gaze_min_ratio: 0.4,
            gaze_max_ratio: 2.5,
        }
    }
}

/// Speech activity smoothing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    /// Minimum words in an utterance for it to count as speech.
    pub min_words: usize,

    /// How long the channel stays "not quiet" after the last utterance.
    pub quiet_reset_ms: u64,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            min_words: 2,
            quiet_reset_ms: 3000,
        }
    }
}

impl SpeechConfig {
    pub fn quiet_reset(&self) -> Duration {
        Duration::from_millis(self.quiet_reset_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = MonitorConfig::default();
        config.validate().unwrap();

        assert_eq!(config.sampling.tick_interval(), Duration::from_millis(600));
        assert_eq!(config.evidence.max_records, 10);
        assert_eq!(config.aggregator.auto_submit_threshold, 10);
        assert_eq!(
            config.conditions.params(ConditionType::Noise).confirm_delay(),
            Duration::from_millis(1000)
        );
        assert_eq!(
            config.conditions.params(ConditionType::NotFocus).cooldown(),
            Duration::from_millis(5000)
        );
    }

    #[test]
    fn test_profiles_differ() {
        let strict = MonitorConfig::for_profile(ExamProfile::Strict);
        let lenient = MonitorConfig::for_profile(ExamProfile::Lenient);
        let dev = MonitorConfig::for_profile(ExamProfile::Development);

        assert!(
            strict.aggregator.auto_submit_threshold < lenient.aggregator.auto_submit_threshold
        );
        assert!(
            strict.conditions.face_missing.confirm_delay_ms
                < lenient.conditions.face_missing.confirm_delay_ms
        );
        assert!(!dev.aggregator.auto_submit_enabled);
        assert!(dev.sampling.exam_duration().is_none());

        for config in [strict, lenient, dev] {
            config.validate().unwrap();
        }
    }

    #[test]
    fn test_validate_rejects_bad_settings() {
        let mut config = MonitorConfig::default();
        config.sampling.tick_interval_ms = 0;
        assert!(matches!(
            config.validate(),
            Err(MonitorError::ConfigurationError(_))
        ));

        let mut config = MonitorConfig::default();
        config.predicates.gaze_min_ratio = 3.0;
        assert!(config.validate().is_err());

        let mut config = MonitorConfig::default();
        config.evidence.max_records = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: MonitorConfig = serde_json::from_value(serde_json::json!({
            "aggregator": { "auto_submit_threshold": 3 }
        }))
        .unwrap();

        assert_eq!(config.aggregator.auto_submit_threshold, 3);
        assert!(config.aggregator.auto_submit_enabled);
        assert_eq!(config.sampling.tick_interval_ms, 600);

        // A partial section keeps the exam length
        let config: MonitorConfig = serde_json::from_value(serde_json::json!({
            "sampling": { "tick_interval_ms": 500 },
            "conditions": { "noise": { "confirm_delay_ms": 1500, "cooldown_ms": 5000 } },
            "speech": { "min_words": 4 }
        }))
        .unwrap();

        assert_eq!(config.sampling.tick_interval_ms, 500);
        assert_eq!(config.sampling.exam_duration_ms, Some(600_000));
        assert_eq!(config.conditions.noise.confirm_delay_ms, 1500);
        assert_eq!(config.conditions.face_missing.confirm_delay_ms, 2500);
        assert_eq!(config.speech.min_words, 4);
        assert_eq!(config.speech.quiet_reset_ms, 3000);
        assert_eq!(config.evidence.max_records, 10);

        // An explicit null still disables expiry
        let config: MonitorConfig = serde_json::from_value(serde_json::json!({
            "sampling": { "exam_duration_ms": null }
        }))
        .unwrap();
        assert!(config.sampling.exam_duration().is_none());
    }
}
