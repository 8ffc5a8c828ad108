//! Condition debouncing.
//!
//! One [`ConditionDebouncer`] per condition turns a per-tick "is this bad
//! right now?" into at most one confirmed violation per sustained bad
//! period. A bad period must last `confirm_delay` before it confirms, and
//! two confirmations of the same condition are at least `cooldown` apart.
//!
//! When a bad period reaches `confirm_delay` inside the cooldown window the
//! confirmation is suppressed and the period is reset anyway, so the next
//! confirmation needs a fresh full `confirm_delay` of bad readings.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use proctor_types::ConditionType;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{ConditionPolicies, DebounceParams};

/// Result of one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViolationOutcome {
    /// Nothing to report.
    None,
    /// The condition is confirmed as a violation.
    Confirmed,
    /// The bad period matured but fell inside the cooldown window.
    Suppressed,
}

impl ViolationOutcome {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, ViolationOutcome::Confirmed)
    }
}

/// Mutable timing state of one condition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionState {
    /// Start of the current uninterrupted bad period; `None` while good.
    pub violation_started_at: Option<DateTime<Utc>>,

    /// Time of the last confirmation.
    pub last_confirmed_at: Option<DateTime<Utc>>,
}

/// Debouncer for a single condition.
#[derive(Debug, Clone)]
pub struct ConditionDebouncer {
    condition: ConditionType,
    confirm_delay: Duration,
    cooldown: Duration,
    state: ConditionState,
}

impl ConditionDebouncer {
    pub fn new(condition: ConditionType, params: DebounceParams) -> Self {
        Self {
            condition,
            confirm_delay: params.confirm_delay(),
            cooldown: params.cooldown(),
            state: ConditionState::default(),
        }
    }

    pub fn condition(&self) -> ConditionType {
        self.condition
    }

    pub fn state(&self) -> ConditionState {
        self.state
    }

    /// Feed one observation taken at `now`.
    pub fn evaluate(&mut self, is_bad: bool, now: DateTime<Utc>) -> ViolationOutcome {
        if !is_bad {
            self.state.violation_started_at = None;
            return ViolationOutcome::None;
        }

        let Some(started_at) = self.state.violation_started_at else {
            self.state.violation_started_at = Some(now);
            return ViolationOutcome::None;
        };

        if elapsed(started_at, now) < self.confirm_delay {
            return ViolationOutcome::None;
        }

        // Matured: the period resets whether or not it confirms
        self.state.violation_started_at = None;

        if let Some(last) = self.state.last_confirmed_at {
            if elapsed(last, now) < self.cooldown {
                debug!(
                    condition = %self.condition,
                    since_last_ms = elapsed(last, now).as_millis() as u64,
                    "Violation suppressed by cooldown"
                );
                return ViolationOutcome::Suppressed;
            }
        }

        self.state.last_confirmed_at = Some(now);
        ViolationOutcome::Confirmed
    }
}

/// Non-negative duration between two instants.
fn elapsed(from: DateTime<Utc>, to: DateTime<Utc>) -> Duration {
    (to - from).to_std().unwrap_or(Duration::ZERO)
}

/// One debouncer per condition, built from the policy table.
#[derive(Debug, Clone)]
pub struct DebouncerSet {
    debouncers: HashMap<ConditionType, ConditionDebouncer>,
}

impl DebouncerSet {
    pub fn new(policies: &ConditionPolicies) -> Self {
        let debouncers = ConditionType::ALL
            .into_iter()
            .map(|condition| {
                (
                    condition,
                    ConditionDebouncer::new(condition, policies.params(condition)),
                )
            })
            .collect();

        Self { debouncers }
    }

    /// Evaluate `condition` at `now`.
    pub fn evaluate(
        &mut self,
        condition: ConditionType,
        is_bad: bool,
        now: DateTime<Utc>,
    ) -> ViolationOutcome {
        match self.debouncers.get_mut(&condition) {
            Some(debouncer) => debouncer.evaluate(is_bad, now),
            None => ViolationOutcome::None,
        }
    }

    pub fn state(&self, condition: ConditionType) -> Option<ConditionState> {
        self.debouncers.get(&condition).map(|d| d.state())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn params(confirm_ms: u64, cooldown_ms: u64) -> DebounceParams {
        DebounceParams {
            confirm_delay_ms: confirm_ms,
            cooldown_ms,
        }
    }

    fn at(t0: DateTime<Utc>, ms: i64) -> DateTime<Utc> {
        t0 + chrono::Duration::milliseconds(ms)
    }

    /// Feed `is_bad` every `step_ms` over `[from_ms, to_ms)`; return the
    /// confirmation times.
    fn feed(
        debouncer: &mut ConditionDebouncer,
        t0: DateTime<Utc>,
        from_ms: i64,
        to_ms: i64,
        step_ms: i64,
        is_bad: bool,
    ) -> Vec<i64> {
        let mut confirmed = Vec::new();
        let mut t = from_ms;
        while t < to_ms {
            if debouncer.evaluate(is_bad, at(t0, t)).is_confirmed() {
                confirmed.push(t);
            }
            t += step_ms;
        }
        confirmed
    }

    #[test]
    fn test_confirms_exactly_at_confirm_delay() {
        let t0 = Utc::now();
        let mut debouncer = ConditionDebouncer::new(ConditionType::FaceMissing, params(2500, 5000));

        assert_eq!(debouncer.evaluate(true, at(t0, 0)), ViolationOutcome::None);
        assert_eq!(debouncer.evaluate(true, at(t0, 2499)), ViolationOutcome::None);
        assert_eq!(debouncer.evaluate(true, at(t0, 2500)), ViolationOutcome::Confirmed);

        let state = debouncer.state();
        assert_eq!(state.violation_started_at, None);
        assert_eq!(state.last_confirmed_at, Some(at(t0, 2500)));
    }

    #[test]
    fn test_good_reading_resets_timer() {
        let t0 = Utc::now();
        let mut debouncer = ConditionDebouncer::new(ConditionType::NotFocus, params(2500, 5000));

        debouncer.evaluate(true, at(t0, 0));
        debouncer.evaluate(true, at(t0, 2000));
        debouncer.evaluate(false, at(t0, 2100));
        assert_eq!(debouncer.state().violation_started_at, None);

        // A new bad period needs its own full delay
        assert_eq!(debouncer.evaluate(true, at(t0, 2200)), ViolationOutcome::None);
        assert_eq!(debouncer.evaluate(true, at(t0, 4600)), ViolationOutcome::None);
        assert_eq!(debouncer.evaluate(true, at(t0, 4700)), ViolationOutcome::Confirmed);
    }

    #[test]
    fn test_continuous_bad_for_six_seconds_confirms_once() {
        let t0 = Utc::now();
        let mut debouncer = ConditionDebouncer::new(ConditionType::FaceMissing, params(2500, 5000));

        let confirmed = feed(&mut debouncer, t0, 0, 6001, 500, true);
        assert_eq!(confirmed, vec![2500]);
    }

    #[test]
    fn test_cooldown_suppression_resets_period() {
        let t0 = Utc::now();
        let mut debouncer = ConditionDebouncer::new(ConditionType::FaceMissing, params(2500, 5000));

        assert_eq!(feed(&mut debouncer, t0, 0, 2501, 500, true), vec![2500]);

        // Next period starts at 3000 and matures at 5500, inside cooldown
        debouncer.evaluate(true, at(t0, 3000));
        assert_eq!(debouncer.evaluate(true, at(t0, 5500)), ViolationOutcome::Suppressed);
        assert_eq!(debouncer.state().violation_started_at, None);

        // Fresh period 6000..8500 is past the cooldown
        debouncer.evaluate(true, at(t0, 6000));
        assert_eq!(debouncer.evaluate(true, at(t0, 8000)), ViolationOutcome::None);
        assert_eq!(debouncer.evaluate(true, at(t0, 8500)), ViolationOutcome::Confirmed);
    }

    #[test]
    fn test_interrupted_bad_spans_never_confirm() {
        let t0 = Utc::now();
        let mut debouncer = ConditionDebouncer::new(ConditionType::FaceMissing, params(2500, 5000));

        let mut confirmed = feed(&mut debouncer, t0, 0, 1000, 100, true);
        confirmed.extend(feed(&mut debouncer, t0, 1000, 2000, 100, false));
        confirmed.extend(feed(&mut debouncer, t0, 2000, 3000, 100, true));

        assert!(confirmed.is_empty());
    }

    #[test]
    fn test_two_periods_within_cooldown_confirm_once() {
        let t0 = Utc::now();
        let mut debouncer = ConditionDebouncer::new(ConditionType::MultiplePeople, params(1000, 5000));

        let mut confirmed = feed(&mut debouncer, t0, 0, 1500, 100, true);
        confirmed.extend(feed(&mut debouncer, t0, 1500, 2000, 100, false));
        confirmed.extend(feed(&mut debouncer, t0, 2000, 4000, 100, true));

        assert_eq!(confirmed.len(), 1);
    }

    #[test]
    fn test_late_tick_uses_real_elapsed_time() {
        let t0 = Utc::now();
        let mut debouncer = ConditionDebouncer::new(ConditionType::Noise, params(1000, 5000));

        debouncer.evaluate(true, at(t0, 0));
        // A single slow tick lands well past the delay
        assert_eq!(debouncer.evaluate(true, at(t0, 4000)), ViolationOutcome::Confirmed);
    }

    #[test]
    fn test_set_keeps_conditions_independent() {
        let t0 = Utc::now();
        let mut set = DebouncerSet::new(&ConditionPolicies::default());

        set.evaluate(ConditionType::FaceMissing, true, at(t0, 0));
        set.evaluate(ConditionType::Noise, true, at(t0, 0));

        // Noise confirms at its shorter delay; face is still pending
        assert_eq!(
            set.evaluate(ConditionType::Noise, true, at(t0, 1000)),
            ViolationOutcome::Confirmed
        );
        assert_eq!(
            set.evaluate(ConditionType::FaceMissing, true, at(t0, 1000)),
            ViolationOutcome::None
        );
        assert_eq!(
            set.state(ConditionType::FaceMissing)
                .unwrap()
                .violation_started_at,
            Some(at(t0, 0))
        );
    }

    proptest! {
        #[test]
        fn property_confirmations_respect_delay_and_cooldown(
            readings in proptest::collection::vec(any::<bool>(), 0..200),
            step_ms in 100i64..900,
            confirm_ms in 500u64..3000,
            cooldown_ms in 1000u64..6000,
        ) {
            let t0 = Utc::now();
            let mut debouncer =
                ConditionDebouncer::new(ConditionType::FaceMissing, params(confirm_ms, cooldown_ms));

            let mut bad_since: Option<i64> = None;
            let mut last_confirmed: Option<i64> = None;

            for (i, is_bad) in readings.into_iter().enumerate() {
                let t = i as i64 * step_ms;
                let outcome = debouncer.evaluate(is_bad, at(t0, t));

                if is_bad {
                    bad_since.get_or_insert(t);
                } else {
                    bad_since = None;
                    prop_assert_eq!(debouncer.state().violation_started_at, None);
                }

                if outcome.is_confirmed() {
                    let since = bad_since.expect("confirmation without a bad period");
                    prop_assert!(t - since >= confirm_ms as i64);
                    if let Some(last) = last_confirmed {
                        prop_assert!(t - last >= cooldown_ms as i64);
                    }
                    last_confirmed = Some(t);
                }

                if outcome != ViolationOutcome::None {
                    // Matured periods always reset
                    prop_assert_eq!(debouncer.state().violation_started_at, None);
                    bad_since = None;
                }
            }
        }
    }
}
