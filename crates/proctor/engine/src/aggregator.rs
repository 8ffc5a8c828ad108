//! Violation score and auto-submit trigger.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::AggregatorConfig;

/// Passed to the auto-submit callback when the threshold is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoSubmitNotice {
    pub score: u32,
    pub threshold: u32,
}

/// Callback invoked once when the score reaches the threshold.
pub type AutoSubmitCallback = Arc<dyn Fn(AutoSubmitNotice) + Send + Sync>;

/// Result of one confirmed violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregateOutcome {
    pub new_score: u32,
    pub should_auto_submit: bool,
}

/// Accumulates confirmed violations.
pub struct ViolationAggregator {
    score: u32,
    threshold: u32,
    enabled: bool,
    fired: bool,
    callback: Option<AutoSubmitCallback>,
}

impl ViolationAggregator {
    pub fn new(config: &AggregatorConfig, callback: Option<AutoSubmitCallback>) -> Self {
        Self {
            score: 0,
            threshold: config.auto_submit_threshold,
            enabled: config.auto_submit_enabled,
            fired: false,
            callback,
        }
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Whether the auto-submit trigger has fired.
    pub fn has_fired(&self) -> bool {
        self.fired
    }

    /// Count one confirmed violation.
    pub fn on_confirmed_violation(&mut self) -> AggregateOutcome {
        self.score = self.score.saturating_add(1);

        let should_auto_submit = self.enabled && !self.fired && self.score >= self.threshold;

        if should_auto_submit {
            self.fired = true;
            warn!(
                score = self.score,
                threshold = self.threshold,
                "Violation score reached auto-submit threshold"
            );

            if let Some(callback) = &self.callback {
                callback(AutoSubmitNotice {
                    score: self.score,
                    threshold: self.threshold,
                });
            }
        }

        AggregateOutcome {
            new_score: self.score,
            should_auto_submit,
        }
    }
}

impl fmt::Debug for ViolationAggregator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViolationAggregator")
            .field("score", &self.score)
            .field("threshold", &self.threshold)
            .field("enabled", &self.enabled)
            .field("fired", &self.fired)
            .field("has_callback", &self.callback.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn counting_callback() -> (AutoSubmitCallback, Arc<AtomicU32>) {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let callback: AutoSubmitCallback = Arc::new(move |notice: AutoSubmitNotice| {
            assert_eq!(notice.score, notice.threshold);
            counter.fetch_add(1, Ordering::SeqCst);
        });
        (callback, calls)
    }

    #[test]
    fn test_fires_once_at_threshold() {
        let (callback, calls) = counting_callback();
        let mut aggregator = ViolationAggregator::new(&AggregatorConfig::default(), Some(callback));

        for expected in 1..=9 {
            let outcome = aggregator.on_confirmed_violation();
            assert_eq!(outcome.new_score, expected);
            assert!(!outcome.should_auto_submit);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let tenth = aggregator.on_confirmed_violation();
        assert!(tenth.should_auto_submit);
        assert_eq!(tenth.new_score, 10);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let eleventh = aggregator.on_confirmed_violation();
        assert!(!eleventh.should_auto_submit);
        assert_eq!(eleventh.new_score, 11);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(aggregator.has_fired());
    }

    #[test]
    fn test_disabled_trigger_only_counts() {
        let (callback, calls) = counting_callback();
        let config = AggregatorConfig {
            auto_submit_threshold: 2,
            auto_submit_enabled: false,
        };
        let mut aggregator = ViolationAggregator::new(&config, Some(callback));

        for _ in 0..5 {
            assert!(!aggregator.on_confirmed_violation().should_auto_submit);
        }
        assert_eq!(aggregator.score(), 5);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_without_callback_still_signals() {
        let config = AggregatorConfig {
            auto_submit_threshold: 1,
            auto_submit_enabled: true,
        };
        let mut aggregator = ViolationAggregator::new(&config, None);

        assert!(aggregator.on_confirmed_violation().should_auto_submit);
    }
}
