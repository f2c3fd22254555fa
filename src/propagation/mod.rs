//! The training iteration protocol.
//!
//! A `Propagation` binds one network to one training set and one
//! `WeightUpdateStrategy`. Each call to `iteration` computes gradients for
//! the current weights, asks the strategy for a change to every weight, and
//! applies the changes in place.

use std::ops::Range;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::dataset::TrainingSet;
use crate::error::{Error, Result};
use crate::network::{FlattenedNetwork, GradientComputation};

pub mod rprop;
pub mod sgd;

/// Per-weight training state shared between a `Propagation` and its
/// strategy. All vectors have the length of the weight vector.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrainingState {
    /// Gradients of the current iteration.
    pub gradients: Vec<f64>,
    /// Gradients remembered from the previous iteration. Strategies decide
    /// what is remembered, and may zero an entry.
    pub last_gradients: Vec<f64>,
    /// The change applied to each weight in the previous iteration.
    pub last_deltas: Vec<f64>,
    /// Error of the weights being updated in the current iteration.
    pub error: f64,
    /// Error of the previous iteration; infinite before the first one.
    pub last_error: f64,
}

impl TrainingState {
    pub fn new(weight_count: usize) -> Self {
        TrainingState {
            gradients: vec![0.0; weight_count],
            last_gradients: vec![0.0; weight_count],
            last_deltas: vec![0.0; weight_count],
            error: f64::INFINITY,
            last_error: f64::INFINITY,
        }
    }

    pub fn weight_count(&self) -> usize {
        self.gradients.len()
    }

    /// Whether the current error is worse than the previous iteration's.
    pub fn error_increased(&self) -> bool {
        self.error > self.last_error
    }
}

/// Decides the size and sign of every weight change.
pub trait WeightUpdateStrategy {
    /// The length of the weight vector this strategy was built for.
    fn weight_count(&self) -> usize;

    /// Number of training pairs drawn per iteration, or `None` to use the
    /// whole training set.
    fn batch_size(&self) -> Option<usize> {
        None
    }

    /// Called after gradients are computed, before any weight is updated.
    fn begin_iteration(&mut self, _state: &TrainingState) {}

    /// Returns the change for weight `index`.
    ///
    /// A positive `dropout_rate` means the weight sits out this iteration
    /// and the change must be zero.
    fn update_weight(&mut self,
                     state: &mut TrainingState,
                     index: usize,
                     dropout_rate: f64)
                     -> f64;

    /// Called after every weight has been updated.
    fn end_iteration(&mut self, _state: &TrainingState) {}
}

/// Drives training iterations for one network, training set and strategy.
#[derive(Debug)]
pub struct Propagation<S> {
    network: FlattenedNetwork,
    training: TrainingSet,
    strategy: S,
    computation: GradientComputation,
    state: TrainingState,
    /// Weight span and dropout rate of every layer with weights.
    layout: Vec<(Range<usize>, f64)>,
    /// Indices of the training pairs evaluated by the current iteration.
    batch: Vec<usize>,
    iteration: usize,
    rng: StdRng,
}

impl<S: WeightUpdateStrategy> Propagation<S> {
    /// Binds `strategy` to `network` and `training`.
    ///
    /// Shape mismatches between the three are reported here, so that
    /// iterating can never fail halfway through an update.
    pub fn new(network: FlattenedNetwork, training: TrainingSet, strategy: S) -> Result<Self> {
        network.validate()?;
        let weight_count = network.weight_count();
        if weight_count == 0 {
            return Err(Error::EmptyWeights);
        }
        if training.input_len() != network.input_len() {
            return Err(Error::mismatch("training input", network.input_len(), training.input_len()));
        }
        if training.ideal_len() != network.output_len() {
            return Err(Error::mismatch("training ideal", network.output_len(), training.ideal_len()));
        }
        if strategy.weight_count() != weight_count {
            return Err(Error::mismatch("strategy state", weight_count, strategy.weight_count()));
        }
        if strategy.batch_size() == Some(0) {
            return Err(Error::InvalidParameter("batch size must be positive".into()));
        }

        let layout = (1..network.layers().len())
            .map(|l| (network.layer_weights(l), network.layers()[l].dropout_rate))
            .collect();
        let batch = match strategy.batch_size() {
            Some(size) => vec![0; size],
            None => (0..training.len()).collect(),
        };

        Ok(Propagation {
            computation: GradientComputation::new(&network),
            state: TrainingState::new(weight_count),
            network,
            training,
            strategy,
            layout,
            batch,
            iteration: 0,
            rng: StdRng::from_entropy(),
        })
    }

    /// Reseeds the generator used for mini-batches and dropout.
    pub fn seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Runs one training iteration and returns its error.
    ///
    /// Sampled mini-batches carry no sequence order, so each one starts from
    /// cleared recurrent context. Full passes keep the context flowing from
    /// one iteration into the next.
    pub fn iteration(&mut self) -> f64 {
        if self.strategy.batch_size().is_some() {
            self.network.clear_context();
            let len = self.training.len();
            for index in self.batch.iter_mut() {
                *index = self.rng.gen_range(0..len);
            }
        }

        let error = self.computation.compute(&mut self.network,
                                             &self.training,
                                             self.batch.iter().cloned(),
                                             &mut self.state.gradients);
        self.state.error = error;
        self.strategy.begin_iteration(&self.state);

        for &(ref range, rate) in &self.layout {
            for index in range.clone() {
                let dropout = if rate > 0.0 && self.rng.gen::<f64>() < rate {
                    rate
                } else {
                    0.0
                };
                let change = self.strategy.update_weight(&mut self.state, index, dropout);
                self.network.weights_mut()[index] += change;
                self.state.last_deltas[index] = change;
            }
        }

        self.strategy.end_iteration(&self.state);
        self.state.last_error = error;
        self.iteration += 1;
        debug!("iteration {}: error {}", self.iteration, error);
        error
    }

    /// Error of the most recent iteration; infinite before the first one.
    pub fn error(&self) -> f64 {
        self.state.last_error
    }

    /// Number of iterations run so far.
    pub fn iterations(&self) -> usize {
        self.iteration
    }

    pub fn is_trained(&self) -> bool {
        self.iteration > 0
    }

    pub fn network(&self) -> &FlattenedNetwork {
        &self.network
    }

    pub fn training(&self) -> &TrainingSet {
        &self.training
    }

    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    pub fn state(&self) -> &TrainingState {
        &self.state
    }

    /// Ends training, handing back the trained network.
    pub fn into_network(self) -> FlattenedNetwork {
        self.network
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activator::Activator;
    use crate::network::NetworkBuilder;
    use crate::propagation::sgd::{SgdConfig, StochasticGradientDescent};

    /// Moves every weight by a fixed amount and counts its calls.
    struct Constant {
        weight_count: usize,
        change: f64,
        calls: Vec<usize>,
        errors_seen: Vec<(f64, f64)>,
    }

    impl Constant {
        fn new(weight_count: usize, change: f64) -> Self {
            Constant {
                weight_count,
                change,
                calls: vec![0; weight_count],
                errors_seen: Vec::new(),
            }
        }
    }

    impl WeightUpdateStrategy for Constant {
        fn weight_count(&self) -> usize {
            self.weight_count
        }

        fn begin_iteration(&mut self, state: &TrainingState) {
            self.errors_seen.push((state.error, state.last_error));
        }

        fn update_weight(&mut self, _: &mut TrainingState, index: usize, dropout_rate: f64) -> f64 {
            self.calls[index] += 1;
            if dropout_rate > 0.0 { 0.0 } else { self.change }
        }
    }

    fn network() -> FlattenedNetwork {
        NetworkBuilder::new(2)
            .layer(2, Activator::Sigmoid, true)
            .layer(1, Activator::Linear, true)
            .weights(vec![0.1; 9])
            .build()
            .unwrap()
    }

    fn training() -> TrainingSet {
        TrainingSet::new(vec![([0.0, 1.0], [1.0]), ([1.0, 0.0], [0.0])]).unwrap()
    }

    #[test]
    fn wrong_input_size() {
        let training = TrainingSet::new(vec![([0.0], [1.0])]).unwrap();
        let result = Propagation::new(network(), training, Constant::new(9, 0.0));
        assert_eq!(result.err(), Some(Error::mismatch("training input", 2, 1)));
    }

    #[test]
    fn wrong_output_size() {
        let training = TrainingSet::new(vec![([0.0, 0.0], [1.0, 1.0])]).unwrap();
        assert!(Propagation::new(network(), training, Constant::new(9, 0.0)).is_err());
    }

    #[test]
    fn wrong_strategy_size() {
        let result = Propagation::new(network(), training(), Constant::new(4, 0.0));
        assert_eq!(result.err(), Some(Error::mismatch("strategy state", 9, 4)));
    }

    #[test]
    fn idle_then_trained() {
        let mut propagation = Propagation::new(network(), training(), Constant::new(9, 0.0))
            .unwrap();
        assert!(!propagation.is_trained());
        assert!(propagation.error().is_infinite());
        let error = propagation.iteration();
        assert!(propagation.is_trained());
        assert_eq!(propagation.iterations(), 1);
        assert_eq!(propagation.error(), error);
        assert!(error >= 0.0);
    }

    #[test]
    fn every_weight_updated_once() {
        let mut propagation = Propagation::new(network(), training(), Constant::new(9, 0.25))
            .unwrap();
        propagation.iteration();
        propagation.iteration();
        assert!(propagation.strategy().calls.iter().all(|&c| c == 2));
        for &w in propagation.network().weights() {
            assert_relative_eq!(w, 0.6);
        }
        assert!(propagation.state().last_deltas.iter().all(|&d| d == 0.25));
    }

    #[test]
    fn strategy_sees_lagging_error() {
        let mut propagation = Propagation::new(network(), training(), Constant::new(9, 0.1))
            .unwrap();
        let first = propagation.iteration();
        let second = propagation.iteration();
        let seen = &propagation.strategy().errors_seen;
        assert_eq!(seen[0].0, first);
        assert!(seen[0].1.is_infinite());
        assert_eq!(seen[1], (second, first));
    }

    #[test]
    fn dropout_skips_weights() {
        let network = NetworkBuilder::new(2)
            .layer(2, Activator::Sigmoid, true)
            .dropout(0.5)
            .layer(1, Activator::Linear, true)
            .weights(vec![0.1; 9])
            .build()
            .unwrap();
        let mut propagation = Propagation::new(network, training(), Constant::new(9, 1.0))
            .unwrap()
            .seed(3);
        for _ in 0..20 {
            propagation.iteration();
        }
        let weights = propagation.network().weights();
        // The output layer never drops, so it moved on every iteration.
        for &w in &weights[6..] {
            assert_relative_eq!(w, 20.1);
        }
        // Hidden weights sat out some iterations, and each change was whole.
        for &w in &weights[..6] {
            assert!(w < 20.1);
            assert_relative_eq!(w.fract(), 0.1, epsilon = 1e-9);
        }
    }

    #[test]
    fn reloaded_network_trains() {
        let json = serde_json::to_string(&network()).unwrap();
        let reloaded: FlattenedNetwork = serde_json::from_str(&json).unwrap();
        let mut propagation = Propagation::new(reloaded, training(), Constant::new(9, 0.0))
            .unwrap();
        assert!(propagation.iteration() >= 0.0);
    }

    #[test]
    fn sampled_batches_start_from_clear_context() {
        let elman = || {
            NetworkBuilder::new(1)
                .layer(2, Activator::TanH, true)
                .layer(1, Activator::Linear, true)
                .context(1, 1)
                .seed(4)
                .build()
                .unwrap()
        };
        let sgd = |weight_count| {
            StochasticGradientDescent::new(weight_count, SgdConfig::default().batch_size(3))
                .unwrap()
        };
        let training = TrainingSet::new(vec![([0.0], [1.0]), ([1.0], [0.0])]).unwrap();

        // Leave context behind from an earlier evaluation.
        let mut warm = elman();
        warm.compute(&[1.0]).unwrap();
        let weight_count = warm.weight_count();

        let mut cold = Propagation::new(elman(), training.clone(), sgd(weight_count))
            .unwrap()
            .seed(9);
        let mut warmed = Propagation::new(warm, training, sgd(weight_count)).unwrap().seed(9);
        for _ in 0..3 {
            assert_eq!(cold.iteration(), warmed.iteration());
        }
        assert_eq!(cold.network().weights(), warmed.network().weights());
    }
}
