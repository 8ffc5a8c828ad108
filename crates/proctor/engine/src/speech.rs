//! Speech activity smoothing.
//!
//! Recognisers emit final transcripts in bursts with pauses between them.
//! The gate holds the channel "not quiet" for a short grace period after the
//! last accepted utterance so that a pause mid-sentence does not reset the
//! noise debouncer. This smoothing is a property of the signal, kept apart
//! from the violation confirmation policy.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::debug;

use crate::clock::SharedClock;
use crate::config::SpeechConfig;
use crate::error::MonitorResult;
use crate::predicates::word_count;
use crate::sources::{SpeechActivity, SpeechReading};

/// Turns final transcripts into a smoothed quiet flag.
#[derive(Debug, Clone)]
pub struct SpeechActivityGate {
    min_words: usize,
    quiet_reset: Duration,
    last_text: String,
    last_at: Option<DateTime<Utc>>,
}

impl SpeechActivityGate {
    pub fn new(config: &SpeechConfig) -> Self {
        Self {
            min_words: config.min_words,
            quiet_reset: config.quiet_reset(),
            last_text: String::new(),
            last_at: None,
        }
    }

    /// Offer a final transcript. Returns whether it counted as speech.
    pub fn record_utterance(&mut self, text: &str, at: DateTime<Utc>) -> bool {
        let text = text.trim();
        let words = word_count(text);

        if words < self.min_words {
            debug!(words, min_words = self.min_words, "Ignoring short utterance");
            return false;
        }

        self.last_text = text.to_string();
        self.last_at = Some(at);
        true
    }

    /// Smoothed reading at `now`.
    pub fn reading(&self, now: DateTime<Utc>) -> SpeechReading {
        let is_quiet = match self.last_at {
            Some(at) => (now - at).to_std().map_or(false, |since| since >= self.quiet_reset),
            None => true,
        };

        SpeechReading {
            is_quiet,
            last_utterance_text: self.last_text.clone(),
            last_utterance_at: self.last_at,
        }
    }
}

/// Thread-safe gate usable as a session's speech source.
#[derive(Clone)]
pub struct SharedSpeechGate {
    gate: Arc<Mutex<SpeechActivityGate>>,
    clock: SharedClock,
}

impl SharedSpeechGate {
    pub fn new(config: &SpeechConfig, clock: SharedClock) -> Self {
        Self {
            gate: Arc::new(Mutex::new(SpeechActivityGate::new(config))),
            clock,
        }
    }

    /// Offer a final transcript stamped with the gate's clock.
    pub async fn record_utterance(&self, text: &str) -> bool {
        let now = self.clock.now();
        self.gate.lock().await.record_utterance(text, now)
    }
}

#[async_trait]
impl SpeechActivity for SharedSpeechGate {
    async fn speech_state(&self) -> MonitorResult<SpeechReading> {
        let now = self.clock.now();
        Ok(self.gate.lock().await.reading(now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn ms(value: i64) -> chrono::Duration {
        chrono::Duration::milliseconds(value)
    }

    #[test]
    fn test_short_utterances_are_ignored() {
        let mut gate = SpeechActivityGate::new(&SpeechConfig::default());
        let t0 = Utc::now();

        assert!(!gate.record_utterance("hmm", t0));
        assert!(gate.reading(t0).is_quiet);

        assert!(gate.record_utterance("  what is   this ", t0));
        let reading = gate.reading(t0);
        assert!(!reading.is_quiet);
        assert_eq!(reading.last_utterance_text, "what is   this");
        assert_eq!(reading.last_utterance_at, Some(t0));
    }

    #[test]
    fn test_quiet_returns_after_reset_window() {
        let mut gate = SpeechActivityGate::new(&SpeechConfig::default());
        let t0 = Utc::now();
        gate.record_utterance("two words", t0);

        assert!(!gate.reading(t0 + ms(2999)).is_quiet);
        assert!(gate.reading(t0 + ms(3000)).is_quiet);
    }

    #[test]
    fn test_new_utterance_extends_window() {
        let mut gate = SpeechActivityGate::new(&SpeechConfig::default());
        let t0 = Utc::now();
        gate.record_utterance("first sentence", t0);
        gate.record_utterance("second sentence", t0 + ms(2000));

        // 3.5 s after the first, 1.5 s after the second
        let reading = gate.reading(t0 + ms(3500));
        assert!(!reading.is_quiet);
        assert_eq!(reading.last_utterance_text, "second sentence");
    }

    #[tokio::test]
    async fn test_shared_gate_uses_clock() {
        let clock = ManualClock::new(Utc::now());
        let gate = SharedSpeechGate::new(&SpeechConfig::default(), Arc::new(clock.clone()));

        assert!(gate.record_utterance("can you help").await);
        assert!(!gate.speech_state().await.unwrap().is_quiet);

        clock.advance(Duration::from_secs(3));
        assert!(gate.speech_state().await.unwrap().is_quiet);
    }
}
