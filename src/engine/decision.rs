/// Hysteresis decision engine producing OPEN/CLOSE recommendations
use log::info;
use std::sync::Mutex;

use crate::models::{Decision, Recommendation};

// Comfort thresholds
const TEMP_MIN: f64 = 60.0; // °F
const TEMP_MAX: f64 = 78.0; // °F
const HUMIDITY_MAX: f64 = 70.0; // %
const AQ_MIN: i32 = 500; // raw ADC units, lower is worse

// Hysteresis margins applied around each threshold
const TEMP_WINDOW: f64 = 2.0;
const HUMIDITY_WINDOW: f64 = 5.0;
const AQ_WINDOW: i32 = 50;

/// Recommendation last issued by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionState {
    Unknown,
    Open,
    Close,
}

impl From<Recommendation> for DecisionState {
    fn from(recommendation: Recommendation) -> Self {
        match recommendation {
            Recommendation::Open => DecisionState::Open,
            Recommendation::Close => DecisionState::Close,
        }
    }
}

/// Trigger points for the four close conditions, shifted by the current state
#[derive(Debug, Clone, Copy, PartialEq)]
struct Triggers {
    air_quality_below: i32,
    temp_above: f64,
    temp_below: f64,
    humidity_above: f64,
}

impl Triggers {
    // The CLOSE row widens every band, so CLOSE is harder to re-trigger
    // while already closed than from OPEN or UNKNOWN.
    fn for_state(state: DecisionState) -> Self {
        match state {
            DecisionState::Close => Triggers {
                air_quality_below: AQ_MIN - AQ_WINDOW,
                temp_above: TEMP_MAX + TEMP_WINDOW,
                temp_below: TEMP_MIN - TEMP_WINDOW,
                humidity_above: HUMIDITY_MAX + HUMIDITY_WINDOW,
            },
            DecisionState::Open => Triggers {
                air_quality_below: AQ_MIN + AQ_WINDOW,
                temp_above: TEMP_MAX - TEMP_WINDOW,
                temp_below: TEMP_MIN + TEMP_WINDOW,
                humidity_above: HUMIDITY_MAX - HUMIDITY_WINDOW,
            },
            DecisionState::Unknown => Triggers {
                air_quality_below: AQ_MIN,
                temp_above: TEMP_MAX,
                temp_below: TEMP_MIN,
                humidity_above: HUMIDITY_MAX,
            },
        }
    }

    /// Labels of the triggered conditions, in evaluation order
    fn evaluate(&self, temperature: f64, humidity: f64, air_quality: i32) -> Vec<&'static str> {
        let mut reasons = Vec::new();

        if air_quality < self.air_quality_below {
            reasons.push("Poor air quality");
        }
        if temperature > self.temp_above {
            reasons.push("Temperature too high");
        }
        if temperature < self.temp_below {
            reasons.push("Temperature too low");
        }
        if humidity > self.humidity_above {
            reasons.push("Humidity too high");
        }

        reasons
    }
}

/// Stateful recommender; the state starts as `Unknown` and never returns to it
#[derive(Debug)]
pub struct DecisionEngine {
    state: Mutex<DecisionState>,
}

impl Default for DecisionEngine {
    fn default() -> Self {
        DecisionEngine::new()
    }
}

impl DecisionEngine {
    pub fn new() -> Self {
        DecisionEngine::with_state(DecisionState::Unknown)
    }

    pub fn with_state(state: DecisionState) -> Self {
        DecisionEngine {
            state: Mutex::new(state),
        }
    }

    #[cfg(test)]
    pub fn current_state(&self) -> DecisionState {
        *self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Recommend OPEN or CLOSE for a reading and remember the result
    ///
    /// Thresholds depend on the state before this call. The read and the
    /// update happen under a single lock, so concurrent callers are serialized.
    pub fn decide(&self, temperature: f64, humidity: f64, air_quality: i32) -> Decision {
        let mut state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        let reasons = Triggers::for_state(*state).evaluate(temperature, humidity, air_quality);

        let decision = if reasons.is_empty() {
            Decision {
                recommendation: Recommendation::Open,
                reason: "All conditions favorable".to_string(),
            }
        } else {
            Decision {
                recommendation: Recommendation::Close,
                reason: reasons.join(", "),
            }
        };

        let next = DecisionState::from(decision.recommendation);
        if *state != next {
            info!("Recommendation changed {:?} -> {:?}: {}", *state, next, decision.reason);
        }
        *state = next;

        decision
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_initial_state_close_on_bad_conditions() {
        let engine = DecisionEngine::new();
        let decision = engine.decide(85.0, 50.0, 400);

        assert_eq!(decision.recommendation, Recommendation::Close);
        assert_eq!(decision.reason, "Poor air quality, Temperature too high");
        assert_eq!(engine.current_state(), DecisionState::Close);
    }

    #[test]
    fn test_initial_state_open_on_good_conditions() {
        let engine = DecisionEngine::new();
        let decision = engine.decide(70.0, 50.0, 600);

        assert_eq!(decision.recommendation, Recommendation::Open);
        assert_eq!(decision.reason, "All conditions favorable");

        let again = engine.decide(70.0, 50.0, 600);
        assert_eq!(again, decision);
        assert_eq!(engine.current_state(), DecisionState::Open);
    }

    #[test]
    fn test_hysteresis_prevents_flip_flop_when_open() {
        let engine = DecisionEngine::with_state(DecisionState::Open);
        let decision = engine.decide(75.0, 50.0, 600);

        assert_eq!(decision.recommendation, Recommendation::Open);
    }

    #[test]
    fn test_hysteresis_closes_on_clearly_bad_conditions() {
        let engine = DecisionEngine::with_state(DecisionState::Open);
        let decision = engine.decide(85.0, 50.0, 400);

        assert_eq!(decision.recommendation, Recommendation::Close);
        assert!(decision.reason.contains("Temperature too high"));
    }

    #[test]
    fn test_open_state_triggers_inside_window() {
        // 77°F is below TEMP_MAX but above the OPEN trigger of 76°F
        let engine = DecisionEngine::with_state(DecisionState::Open);
        let decision = engine.decide(77.0, 50.0, 600);
        assert_eq!(decision.recommendation, Recommendation::Close);
        assert_eq!(decision.reason, "Temperature too high");

        let engine = DecisionEngine::with_state(DecisionState::Open);
        let decision = engine.decide(70.0, 50.0, 520);
        assert_eq!(decision.reason, "Poor air quality");

        let engine = DecisionEngine::with_state(DecisionState::Open);
        let decision = engine.decide(61.0, 68.0, 600);
        assert_eq!(decision.reason, "Temperature too low, Humidity too high");
    }

    #[test]
    fn test_close_state_uses_widened_bands() {
        // Between TEMP_MAX and TEMP_MAX + TEMP_WINDOW: no trigger while closed
        let engine = DecisionEngine::with_state(DecisionState::Close);
        let decision = engine.decide(79.0, 72.0, 480);
        assert_eq!(decision.recommendation, Recommendation::Open);
        assert_eq!(engine.current_state(), DecisionState::Open);

        let engine = DecisionEngine::with_state(DecisionState::Close);
        let decision = engine.decide(81.0, 76.0, 449);
        assert_eq!(
            decision.reason,
            "Poor air quality, Temperature too high, Humidity too high"
        );
    }

    #[test]
    fn test_unknown_uses_plain_thresholds() {
        let engine = DecisionEngine::new();
        assert_eq!(engine.decide(78.0, 70.0, 500).recommendation, Recommendation::Open);

        let engine = DecisionEngine::new();
        let decision = engine.decide(59.9, 50.0, 600);
        assert_eq!(decision.reason, "Temperature too low");
    }

    #[test]
    fn test_all_four_conditions_order() {
        let triggers = Triggers::for_state(DecisionState::Unknown);
        // temp high and temp low cannot both trigger, check each ordering pair
        assert_eq!(
            triggers.evaluate(90.0, 90.0, 100),
            vec!["Poor air quality", "Temperature too high", "Humidity too high"]
        );
        assert_eq!(
            triggers.evaluate(40.0, 90.0, 100),
            vec!["Poor air quality", "Temperature too low", "Humidity too high"]
        );
    }

    #[test]
    fn test_concurrent_decisions_leave_a_decided_state() {
        let engine = std::sync::Arc::new(DecisionEngine::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let engine = engine.clone();
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        if i % 2 == 0 {
                            engine.decide(70.0, 50.0, 600);
                        } else {
                            engine.decide(90.0, 50.0, 300);
                        }
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_ne!(engine.current_state(), DecisionState::Unknown);
    }

    fn state_strategy() -> impl Strategy<Value = DecisionState> {
        prop_oneof![
            Just(DecisionState::Unknown),
            Just(DecisionState::Open),
            Just(DecisionState::Close),
        ]
    }

    proptest! {
        #[test]
        fn state_follows_last_recommendation(
            start in state_strategy(),
            readings in proptest::collection::vec((30.0f64..110.0, 0.0f64..100.0, 0i32..1200), 1..20),
        ) {
            let engine = DecisionEngine::with_state(start);
            for (temperature, humidity, air_quality) in readings {
                let decision = engine.decide(temperature, humidity, air_quality);
                prop_assert_eq!(engine.current_state(), DecisionState::from(decision.recommendation));
                prop_assert_eq!(
                    decision.recommendation == Recommendation::Open,
                    decision.reason == "All conditions favorable"
                );
            }
        }
    }
}
