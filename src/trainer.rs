//! Utilities for driving training to completion.

use std::time::{Duration, Instant};

use crate::network::FlattenedNetwork;
use crate::propagation::{Propagation, WeightUpdateStrategy};

/// Runs a `Propagation` until its stop condition is met.
///
/// The trainer is initialized with some default values. These defaults are:
///
/// * Stops after 1000 training iterations.
/// * Logs on training completion.
#[derive(Debug)]
pub struct Trainer<S> {
    propagation: Propagation<S>,
    logging: Logging,
    stop_condition: StopCondition,
}

impl<S: WeightUpdateStrategy> Trainer<S> {
    pub fn new(propagation: Propagation<S>) -> Self {
        Trainer {
            propagation,
            logging: Logging::Completion,
            stop_condition: StopCondition::default(),
        }
    }

    /// Stops once the error drops below `threshold`.
    pub fn min_error(mut self, threshold: f64) -> Self {
        self.stop_condition.min_error = Some(threshold);
        self
    }

    /// Never stops on error before `iterations` have run.
    pub fn min_iterations(mut self, iterations: usize) -> Self {
        self.stop_condition.min_iterations = iterations;
        self
    }

    /// Always stops after `iterations`.
    pub fn max_iterations(mut self, iterations: usize) -> Self {
        self.stop_condition.max_iterations = iterations;
        self
    }

    /// Always stops once `duration` has elapsed.
    pub fn max_duration(mut self, duration: Duration) -> Self {
        self.stop_condition.max_duration = Some(duration);
        self
    }

    /// Replaces the whole stop condition.
    pub fn stop_condition(mut self, condition: StopCondition) -> Self {
        self.stop_condition = condition;
        self
    }

    /// Sets the type of logging to be emitted during training.
    pub fn logging(mut self, logging: Logging) -> Self {
        self.logging = logging;
        self
    }

    /// Runs iterations until the stop condition holds. Calling `train` again
    /// continues from the current weights with a fresh iteration count.
    pub fn train(&mut self) -> TrainingReport {
        let start_time = Instant::now();
        let mut iterations = 0;
        let mut error = self.propagation.error();
        while !self.stop_condition.should_stop(iterations, error, start_time) {
            error = self.propagation.iteration();
            iterations += 1;
            self.logging.iteration(iterations, error);
        }
        self.logging.completion(iterations, error, start_time);
        TrainingReport { iterations, error }
    }

    pub fn propagation(&self) -> &Propagation<S> {
        &self.propagation
    }

    pub fn into_propagation(self) -> Propagation<S> {
        self.propagation
    }

    /// Ends training, handing back the trained network.
    pub fn into_network(self) -> FlattenedNetwork {
        self.propagation.into_network()
    }
}

/// The outcome of a call to `Trainer::train`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TrainingReport {
    /// Iterations run by this call.
    pub iterations: usize,
    /// Error of the last iteration; infinite if none ran.
    pub error: f64,
}

/// Logging frequency to use during training
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Logging {
    /// No logs will be emitted
    Silent,
    /// A summary will be emitted at completion
    Completion,
    /// A summary will be emitted after every `n` training iterations
    Iterations(usize),
}

impl Logging {
    /// Performs logging at the current `iteration` of training.
    fn iteration(&self, iteration: usize, error: f64) {
        if let Logging::Iterations(freq) = *self {
            if freq > 0 && iteration % freq == 0 {
                info!("Iteration {}:\tMSE={}", iteration, error);
            }
        }
    }

    /// Performs logging at the end of training.
    fn completion(&self, iterations: usize, error: f64, start_time: Instant) {
        if *self == Logging::Silent {
            return;
        }
        info!("Ran {} iterations in {:.3} seconds.",
              iterations,
              start_time.elapsed().as_secs_f64());
        info!("Final MSE: {}", error);
    }
}

/// When to stop training
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StopCondition {
    /// Stops when the error drops below this threshold, once at least
    /// `min_iterations` have run.
    pub min_error: Option<f64>,
    pub min_iterations: usize,
    /// Hard cap on the number of iterations.
    pub max_iterations: usize,
    /// Hard cap on wall-clock training time.
    pub max_duration: Option<Duration>,
}

impl Default for StopCondition {
    fn default() -> Self {
        StopCondition {
            min_error: None,
            min_iterations: 0,
            max_iterations: 1000,
            max_duration: None,
        }
    }
}

impl StopCondition {
    /// Returns true if training is complete.
    pub fn should_stop(&self, iteration: usize, error: f64, start_time: Instant) -> bool {
        if iteration >= self.max_iterations {
            return true;
        }
        if let Some(duration) = self.max_duration {
            if start_time.elapsed() > duration {
                return true;
            }
        }
        match self.min_error {
            Some(threshold) => iteration >= self.min_iterations && error < threshold,
            None => false,
        }
    }
}
