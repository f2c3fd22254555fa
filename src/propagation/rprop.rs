//! [Resilient propagation](https://en.wikipedia.org/wiki/Rprop).
//!
//! Every weight keeps its own step size ("update value"). The step grows
//! while the gradient keeps its sign and shrinks when the sign flips; only
//! the sign of the gradient decides the direction of a change. Five
//! variants differ in what they do after a sign flip:
//!
//! | variant  | on sign flip                                                 |
//! |----------|--------------------------------------------------------------|
//! | RPROPp   | undo the previous change                                     |
//! | RPROPm   | step against the new gradient with the shrunk step           |
//! | iRPROPp  | undo the previous change only if the error increased         |
//! | iRPROPm  | skip the weight                                              |
//! | ARPROP   | undo, or take a shrinking partial step if the error increased |

use std::fmt;
use std::str::FromStr;

use crate::error::{check_positive, Error, Result};
use crate::propagation::{TrainingState, WeightUpdateStrategy};
use crate::utils::sign;

/// Growth factor for the step size while the gradient keeps its sign.
pub const POSITIVE_ETA: f64 = 1.2;
/// Shrink factor for the step size after a sign flip.
pub const NEGATIVE_ETA: f64 = 0.5;
/// Smallest step size.
pub const DELTA_MIN: f64 = 1e-6;

pub const DEFAULT_INITIAL_UPDATE: f64 = 0.1;
pub const DEFAULT_MAX_STEP: f64 = 50.0;
pub const DEFAULT_ZERO_TOLERANCE: f64 = 1e-17;

/// Resilient propagation algorithms.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RpropVariant {
    /// Classic RPROP with weight backtracking.
    #[serde(rename = "RPROPp")]
    RpropPlus,
    /// Classic RPROP without backtracking.
    #[serde(rename = "RPROPm")]
    RpropMinus,
    /// Improved RPROP, backtracking only when the error increased.
    #[serde(rename = "iRPROPp")]
    IRpropPlus,
    /// Improved RPROP without backtracking.
    #[serde(rename = "iRPROPm")]
    IRpropMinus,
    /// RPROP with partial backtracking on an increased error.
    #[serde(rename = "ARPROP")]
    Arprop,
}

impl RpropVariant {
    pub const ALL: [RpropVariant; 5] = [RpropVariant::RpropPlus,
                                        RpropVariant::RpropMinus,
                                        RpropVariant::IRpropPlus,
                                        RpropVariant::IRpropMinus,
                                        RpropVariant::Arprop];

    pub fn tag(&self) -> &'static str {
        match *self {
            RpropVariant::RpropPlus => "RPROPp",
            RpropVariant::RpropMinus => "RPROPm",
            RpropVariant::IRpropPlus => "iRPROPp",
            RpropVariant::IRpropMinus => "iRPROPm",
            RpropVariant::Arprop => "ARPROP",
        }
    }
}

impl Default for RpropVariant {
    fn default() -> Self {
        RpropVariant::RpropPlus
    }
}

impl fmt::Display for RpropVariant {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for RpropVariant {
    type Err = Error;

    /// Parses a variant tag, ignoring case.
    fn from_str(tag: &str) -> Result<Self> {
        RpropVariant::ALL
            .iter()
            .find(|v| v.tag().eq_ignore_ascii_case(tag.trim()))
            .cloned()
            .ok_or_else(|| Error::UnknownVariant(tag.to_string()))
    }
}

/// Construction parameters for `ResilientPropagation`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RpropConfig {
    /// Starting step size of every weight.
    pub initial_update: f64,
    /// Largest step size.
    pub max_step: f64,
    /// Magnitudes below this count as zero when taking signs.
    pub zero_tolerance: f64,
    pub variant: RpropVariant,
}

impl Default for RpropConfig {
    fn default() -> Self {
        RpropConfig {
            initial_update: DEFAULT_INITIAL_UPDATE,
            max_step: DEFAULT_MAX_STEP,
            zero_tolerance: DEFAULT_ZERO_TOLERANCE,
            variant: RpropVariant::default(),
        }
    }
}

impl RpropConfig {
    pub fn variant(mut self, variant: RpropVariant) -> Self {
        self.variant = variant;
        self
    }
}

/// A resilient propagation weight update strategy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResilientPropagation {
    config: RpropConfig,
    /// Step size per weight, always within `[DELTA_MIN, max_step]`.
    update_values: Vec<f64>,
    /// ARPROP backtracking divisor; counts consecutive worse iterations that
    /// took a partial backtrack, starting at 1.
    q: u32,
    /// Whether a partial backtrack happened in the current iteration.
    backtracked: bool,
}

impl ResilientPropagation {
    pub fn new(weight_count: usize, config: RpropConfig) -> Result<Self> {
        if weight_count == 0 {
            return Err(Error::EmptyWeights);
        }
        check_positive("max step", config.max_step)?;
        if config.max_step < DELTA_MIN {
            return Err(Error::InvalidParameter(format!(
                "max step must be at least {}, got {}", DELTA_MIN, config.max_step)));
        }
        if !(config.initial_update >= DELTA_MIN && config.initial_update <= config.max_step) {
            return Err(Error::InvalidParameter(format!(
                "initial update must lie in [{}, {}], got {}",
                DELTA_MIN, config.max_step, config.initial_update)));
        }
        if !(config.zero_tolerance >= 0.0) {
            return Err(Error::InvalidParameter(format!(
                "zero tolerance must not be negative, got {}", config.zero_tolerance)));
        }

        Ok(ResilientPropagation {
            update_values: vec![config.initial_update; weight_count],
            config,
            q: 1,
            backtracked: false,
        })
    }

    /// Builds a strategy with default parameters from a variant tag such as
    /// `"iRPROPp"`.
    pub fn from_tag(weight_count: usize, tag: &str) -> Result<Self> {
        let variant = tag.parse()?;
        ResilientPropagation::new(weight_count, RpropConfig::default().variant(variant))
    }

    pub fn config(&self) -> &RpropConfig {
        &self.config
    }

    pub fn variant(&self) -> RpropVariant {
        self.config.variant
    }

    /// Current step size of every weight.
    pub fn update_values(&self) -> &[f64] {
        &self.update_values
    }

    /// The ARPROP backtracking divisor.
    pub fn q(&self) -> u32 {
        self.q
    }

    #[inline]
    fn sign(&self, value: f64) -> f64 {
        sign(value, self.config.zero_tolerance)
    }

    /// Grows the step of weight `index` and returns it.
    #[inline]
    fn grow(&mut self, index: usize) -> f64 {
        let step = (self.update_values[index] * POSITIVE_ETA).min(self.config.max_step);
        self.update_values[index] = step;
        step
    }

    /// Shrinks the step of weight `index` and returns it.
    #[inline]
    fn shrink(&mut self, index: usize) -> f64 {
        let step = (self.update_values[index] * NEGATIVE_ETA).max(DELTA_MIN);
        self.update_values[index] = step;
        step
    }

    fn update_plus(&mut self, state: &mut TrainingState, i: usize) -> f64 {
        let gradient = state.gradients[i];
        let change = self.sign(gradient * state.last_gradients[i]);
        if change > 0.0 {
            let step = self.grow(i);
            state.last_gradients[i] = gradient;
            -self.sign(gradient) * step
        } else if change < 0.0 {
            self.shrink(i);
            state.last_gradients[i] = 0.0;
            -state.last_deltas[i]
        } else {
            state.last_gradients[i] = gradient;
            -self.sign(gradient) * self.update_values[i]
        }
    }

    fn update_minus(&mut self, state: &mut TrainingState, i: usize) -> f64 {
        let gradient = state.gradients[i];
        let change = self.sign(gradient * state.last_gradients[i]);
        let step = if change > 0.0 {
            self.grow(i)
        } else if change < 0.0 {
            self.shrink(i)
        } else {
            self.update_values[i]
        };
        state.last_gradients[i] = gradient;
        -self.sign(gradient) * step
    }

    fn update_improved_plus(&mut self, state: &mut TrainingState, i: usize) -> f64 {
        let gradient = state.gradients[i];
        let change = self.sign(gradient * state.last_gradients[i]);
        if change < 0.0 {
            self.shrink(i);
            state.last_gradients[i] = 0.0;
            if state.error_increased() {
                -state.last_deltas[i]
            } else {
                0.0
            }
        } else {
            let step = if change > 0.0 { self.grow(i) } else { self.update_values[i] };
            state.last_gradients[i] = gradient;
            -self.sign(gradient) * step
        }
    }

    fn update_improved_minus(&mut self, state: &mut TrainingState, i: usize) -> f64 {
        let gradient = state.gradients[i];
        let change = self.sign(gradient * state.last_gradients[i]);
        if change < 0.0 {
            self.shrink(i);
            state.last_gradients[i] = 0.0;
            0.0
        } else {
            let step = if change > 0.0 { self.grow(i) } else { self.update_values[i] };
            state.last_gradients[i] = gradient;
            -self.sign(gradient) * step
        }
    }

    fn update_arprop(&mut self, state: &mut TrainingState, i: usize) -> f64 {
        let gradient = state.gradients[i];
        let change = self.sign(gradient * state.last_gradients[i]);
        if change < 0.0 {
            let step = self.shrink(i);
            state.last_gradients[i] = 0.0;
            let last = state.last_deltas[i];
            if state.error_increased() {
                self.backtracked = true;
                -self.sign(last) * step / (2.0 * f64::from(self.q))
            } else {
                -last
            }
        } else {
            let step = if change > 0.0 { self.grow(i) } else { self.update_values[i] };
            state.last_gradients[i] = gradient;
            -self.sign(gradient) * step
        }
    }
}

impl WeightUpdateStrategy for ResilientPropagation {
    fn weight_count(&self) -> usize {
        self.update_values.len()
    }

    fn update_weight(&mut self,
                     state: &mut TrainingState,
                     index: usize,
                     dropout_rate: f64)
                     -> f64 {
        if dropout_rate > 0.0 {
            return 0.0;
        }
        match self.config.variant {
            RpropVariant::RpropPlus => self.update_plus(state, index),
            RpropVariant::RpropMinus => self.update_minus(state, index),
            RpropVariant::IRpropPlus => self.update_improved_plus(state, index),
            RpropVariant::IRpropMinus => self.update_improved_minus(state, index),
            RpropVariant::Arprop => self.update_arprop(state, index),
        }
    }

    fn end_iteration(&mut self, state: &TrainingState) {
        if self.config.variant == RpropVariant::Arprop {
            if !state.error_increased() {
                self.q = 1;
            } else if self.backtracked {
                self.q += 1;
            }
            self.backtracked = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activator::Activator;
    use crate::dataset::TrainingSet;
    use crate::network::NetworkBuilder;
    use crate::propagation::Propagation;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn strategy(variant: RpropVariant) -> ResilientPropagation {
        ResilientPropagation::new(1, RpropConfig::default().variant(variant)).unwrap()
    }

    /// Runs one single-weight iteration the way `Propagation` does.
    fn step(strategy: &mut ResilientPropagation,
            state: &mut TrainingState,
            gradient: f64,
            error: f64)
            -> f64 {
        state.gradients[0] = gradient;
        state.error = error;
        strategy.begin_iteration(state);
        let change = strategy.update_weight(state, 0, 0.0);
        state.last_deltas[0] = change;
        strategy.end_iteration(state);
        state.last_error = error;
        change
    }

    #[test]
    fn parses_tags() {
        assert_eq!("RPROPp".parse::<RpropVariant>(), Ok(RpropVariant::RpropPlus));
        assert_eq!("irpropm".parse::<RpropVariant>(), Ok(RpropVariant::IRpropMinus));
        assert_eq!("ARPROP".parse::<RpropVariant>(), Ok(RpropVariant::Arprop));
        for variant in &RpropVariant::ALL {
            assert_eq!(variant.to_string().parse::<RpropVariant>(), Ok(*variant));
        }
    }

    #[test]
    fn rejects_unknown_tag() {
        assert_eq!("QuickProp".parse::<RpropVariant>(),
                   Err(Error::UnknownVariant("QuickProp".into())));
        assert!(ResilientPropagation::from_tag(4, "RPROP++").is_err());
        assert_eq!(ResilientPropagation::from_tag(4, "iRPROPp").unwrap().variant(),
                   RpropVariant::IRpropPlus);
    }

    #[test]
    fn rejects_bad_config() {
        assert_eq!(ResilientPropagation::new(0, RpropConfig::default()),
                   Err(Error::EmptyWeights));
        let config = RpropConfig { initial_update: 60.0, ..RpropConfig::default() };
        assert!(ResilientPropagation::new(1, config).is_err());
        let config = RpropConfig { max_step: -1.0, ..RpropConfig::default() };
        assert!(ResilientPropagation::new(1, config).is_err());
        let config = RpropConfig { initial_update: 0.0, ..RpropConfig::default() };
        assert!(ResilientPropagation::new(1, config).is_err());
    }

    #[test]
    fn config_defaults_from_json() {
        let config: RpropConfig = serde_json::from_str(r#"{"variant": "iRPROPm"}"#).unwrap();
        assert_eq!(config, RpropConfig::default().variant(RpropVariant::IRpropMinus));
        let config: RpropConfig = serde_json::from_str("{}").unwrap();
        assert_relative_eq!(config.initial_update, 0.1, epsilon = 1e-12);
        assert_relative_eq!(config.max_step, 50.0, epsilon = 1e-12);
        assert_eq!(config.variant, RpropVariant::RpropPlus);
    }

    #[test]
    fn rprop_plus_single_weight() {
        let mut strategy = strategy(RpropVariant::RpropPlus);
        let mut state = TrainingState::new(1);

        assert_relative_eq!(step(&mut strategy, &mut state, 1.0, 1.0), -0.1, epsilon = 1e-12);
        assert_relative_eq!(strategy.update_values()[0], 0.1, epsilon = 1e-12);

        assert_relative_eq!(step(&mut strategy, &mut state, 1.0, 0.9), -0.12, epsilon = 1e-12);
        assert_relative_eq!(strategy.update_values()[0], 0.12, epsilon = 1e-12);

        // Sign flip: undo the last change and shrink.
        assert_relative_eq!(step(&mut strategy, &mut state, -1.0, 0.8), 0.12, epsilon = 1e-12);
        assert_relative_eq!(strategy.update_values()[0], 0.06, epsilon = 1e-12);
        assert_eq!(state.last_gradients[0], 0.0);

        // The zeroed gradient makes the next comparison neutral.
        assert_relative_eq!(step(&mut strategy, &mut state, -1.0, 0.7), 0.06, epsilon = 1e-12);
        assert_relative_eq!(strategy.update_values()[0], 0.06, epsilon = 1e-12);
    }

    #[test]
    fn rprop_minus_keeps_stepping() {
        let mut strategy = strategy(RpropVariant::RpropMinus);
        let mut state = TrainingState::new(1);
        assert_relative_eq!(step(&mut strategy, &mut state, 2.0, 1.0), -0.1, epsilon = 1e-12);
        assert_relative_eq!(step(&mut strategy, &mut state, 2.0, 0.9), -0.12, epsilon = 1e-12);
        assert_relative_eq!(step(&mut strategy, &mut state, -2.0, 0.8), 0.06, epsilon = 1e-12);
        assert_eq!(state.last_gradients[0], -2.0);
        assert_relative_eq!(step(&mut strategy, &mut state, -2.0, 0.7), 0.072, epsilon = 1e-12);
    }

    #[test]
    fn improved_plus_backtracks_on_worse_error() {
        let mut strategy = strategy(RpropVariant::IRpropPlus);
        let mut state = TrainingState::new(1);
        step(&mut strategy, &mut state, 1.0, 1.0);
        step(&mut strategy, &mut state, 1.0, 0.5);
        // Error went up: undo.
        assert_relative_eq!(step(&mut strategy, &mut state, -1.0, 0.6), 0.12, epsilon = 1e-12);
        assert_eq!(state.last_gradients[0], 0.0);

        let mut strategy = self::strategy(RpropVariant::IRpropPlus);
        let mut state = TrainingState::new(1);
        step(&mut strategy, &mut state, 1.0, 1.0);
        step(&mut strategy, &mut state, 1.0, 0.5);
        // Error went down: keep the weight where it is.
        assert_eq!(step(&mut strategy, &mut state, -1.0, 0.4), 0.0);
        assert_relative_eq!(strategy.update_values()[0], 0.06, epsilon = 1e-12);
    }

    #[test]
    fn improved_minus_skips_on_flip() {
        let mut strategy = strategy(RpropVariant::IRpropMinus);
        let mut state = TrainingState::new(1);
        step(&mut strategy, &mut state, 1.0, 1.0);
        assert_eq!(step(&mut strategy, &mut state, -1.0, 2.0), 0.0);
        assert_eq!(state.last_gradients[0], 0.0);
        assert_relative_eq!(strategy.update_values()[0], 0.05, epsilon = 1e-12);
        assert_relative_eq!(step(&mut strategy, &mut state, -1.0, 1.0), 0.05, epsilon = 1e-12);
    }

    #[test]
    fn arprop_partial_backtrack() {
        let mut strategy = strategy(RpropVariant::Arprop);
        let mut state = TrainingState::new(1);
        step(&mut strategy, &mut state, 1.0, 1.0);
        step(&mut strategy, &mut state, 1.0, 0.5);
        assert_eq!(strategy.q(), 1);

        // Worse error on a flip: half of the shrunk step, against the last change.
        assert_relative_eq!(step(&mut strategy, &mut state, -1.0, 0.7), 0.03, epsilon = 1e-12);
        assert_eq!(strategy.q(), 2);

        // Worse again, but a neutral step leaves the divisor alone.
        assert_relative_eq!(step(&mut strategy, &mut state, -1.0, 0.8), 0.06, epsilon = 1e-12);
        assert_eq!(strategy.q(), 2);
        // The next flip divides by the larger q: 0.03 / 4.
        assert_relative_eq!(step(&mut strategy, &mut state, 1.0, 0.9), -0.0075, epsilon = 1e-12);
        assert_eq!(strategy.q(), 3);

        // Improvement resets the divisor, and a flip is a plain undo again.
        assert_relative_eq!(step(&mut strategy, &mut state, 1.0, 0.1), -0.03, epsilon = 1e-12);
        assert_eq!(strategy.q(), 1);
        assert_relative_eq!(step(&mut strategy, &mut state, -1.0, 0.05), 0.03, epsilon = 1e-12);
        assert_eq!(strategy.q(), 1);
    }

    #[test]
    fn arprop_divisor_ignores_worse_error_without_flip() {
        let mut strategy = strategy(RpropVariant::Arprop);
        let mut state = TrainingState::new(1);
        step(&mut strategy, &mut state, 1.0, 1.0);
        for error in &[1.5, 2.0, 2.5, 3.0] {
            step(&mut strategy, &mut state, 1.0, *error);
            assert_eq!(strategy.q(), 1);
        }
        // The first partial backtrack still divides by 2q = 2: 0.1 * 1.2^4 * 0.5 / 2.
        let change = step(&mut strategy, &mut state, -1.0, 3.5);
        assert_relative_eq!(change, 0.05184, epsilon = 1e-12);
        assert_eq!(strategy.q(), 2);
    }

    #[test]
    fn alternating_gradient_reaches_step_floor() {
        for &variant in &RpropVariant::ALL {
            let mut strategy = strategy(variant);
            let mut state = TrainingState::new(1);
            let mut gradient = 1.0;
            for _ in 0..200 {
                step(&mut strategy, &mut state, gradient, 1.0);
                gradient = -gradient;
                assert!(strategy.update_values()[0] >= DELTA_MIN);
            }
            assert_eq!(strategy.update_values()[0], DELTA_MIN, "{}", variant);
        }
    }

    #[test]
    fn dropout_returns_zero() {
        for &variant in &RpropVariant::ALL {
            let mut strategy = strategy(variant);
            let mut state = TrainingState::new(1);
            state.gradients[0] = 3.0;
            assert_eq!(strategy.update_weight(&mut state, 0, 0.5), 0.0);
            assert_eq!(state.last_gradients[0], 0.0);
            assert_relative_eq!(strategy.update_values()[0], 0.1, epsilon = 1e-12);
        }
    }

    #[test]
    fn steps_stay_clamped_and_signs_hold() {
        let mut rng = StdRng::seed_from_u64(17);
        for &variant in &RpropVariant::ALL {
            let config = RpropConfig { max_step: 2.0, ..RpropConfig::default() }.variant(variant);
            let mut strategy = ResilientPropagation::new(4, config).unwrap();
            let mut state = TrainingState::new(4);
            for _ in 0..500 {
                for g in state.gradients.iter_mut() {
                    // Long runs of one sign push steps against both bounds.
                    let sign = if rng.gen::<f64>() < 0.85 { 1.0 } else { -1.0 };
                    *g = sign * rng.gen::<f64>();
                }
                state.error = rng.gen::<f64>();
                strategy.begin_iteration(&state);
                for i in 0..4 {
                    let flipped = state.gradients[i] * state.last_gradients[i] < 0.0;
                    let last = state.last_deltas[i];
                    let change = strategy.update_weight(&mut state, i, 0.0);
                    if !flipped {
                        assert!(change * state.gradients[i] <= 0.0);
                    } else if change != 0.0 {
                        assert!(change * last < 0.0, "{}: {} after {}", variant, change, last);
                    }
                    state.last_deltas[i] = change;
                }
                strategy.end_iteration(&state);
                state.last_error = state.error;
                for &u in strategy.update_values() {
                    assert!(u >= DELTA_MIN && u <= 2.0);
                }
            }
        }
    }

    #[test]
    fn same_inputs_same_change() {
        let mut strategy = strategy(RpropVariant::IRpropPlus);
        let mut state = TrainingState::new(1);
        step(&mut strategy, &mut state, 0.5, 1.0);
        step(&mut strategy, &mut state, 0.3, 0.9);
        let mut twin = strategy.clone();
        let mut twin_state = state.clone();
        assert_eq!(step(&mut strategy, &mut state, -0.2, 1.1),
                   step(&mut twin, &mut twin_state, -0.2, 1.1));
        assert_eq!(strategy, twin);
        assert_eq!(state, twin_state);
    }

    fn xor_propagation(variant: RpropVariant) -> Propagation<ResilientPropagation> {
        let training = TrainingSet::new(vec![([0.0, 0.0], [0.0]),
                                             ([0.0, 1.0], [1.0]),
                                             ([1.0, 0.0], [1.0]),
                                             ([1.0, 1.0], [0.0])])
            .unwrap();
        let network = NetworkBuilder::new(2)
            .layer(4, Activator::TanH, true)
            .layer(1, Activator::Sigmoid, true)
            .seed(42)
            .build()
            .unwrap();
        let config = RpropConfig::default().variant(variant);
        let strategy = ResilientPropagation::new(network.weight_count(), config).unwrap();
        Propagation::new(network, training, strategy).unwrap()
    }

    #[test]
    fn every_variant_reduces_xor_error() {
        for &variant in &RpropVariant::ALL {
            let mut propagation = xor_propagation(variant);
            let first = propagation.iteration();
            for _ in 0..300 {
                propagation.iteration();
            }
            assert!(propagation.error() < first, "{} did not improve", variant);
        }
    }

    #[test]
    fn split_run_matches_continuous_run() {
        let mut split = xor_propagation(RpropVariant::IRpropPlus);
        let mut continuous = xor_propagation(RpropVariant::IRpropPlus);
        for _ in 0..25 {
            split.iteration();
        }
        for _ in 0..25 {
            split.iteration();
        }
        for _ in 0..50 {
            continuous.iteration();
        }
        assert_eq!(split.network().weights(), continuous.network().weights());
        assert_eq!(split.strategy(), continuous.strategy());
        assert_eq!(split.error(), continuous.error());
    }
}
