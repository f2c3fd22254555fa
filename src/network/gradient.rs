//! Forward and backward passes over a batch of training pairs.

use itertools::multizip;

use crate::dataset::TrainingSet;
use crate::network::{Activations, FlattenedNetwork};
use crate::utils::{Back, ZeroOut};

/// Computes per-weight gradients and the batch error for a network.
///
/// Gradients are the derivatives of `½·Σ(actual - ideal)²` with respect to
/// each weight, averaged over the batch. Context inputs count as constants.
#[derive(Clone, Debug)]
pub struct GradientComputation {
    activations: Activations,
    /// Error terms for every neuron of every layer.
    deltas: Vec<Vec<f64>>,
}

impl GradientComputation {
    /// Allocates scratch space shaped after `network`.
    pub fn new(network: &FlattenedNetwork) -> Self {
        GradientComputation {
            activations: network.empty_activations(),
            deltas: network.layers().iter().map(|l| vec![0.0; l.neurons]).collect(),
        }
    }

    /// Evaluates the pairs of `training` named by `batch`, writing the
    /// averaged gradients into `gradients`. Returns the mean squared error
    /// over every output value of the batch.
    ///
    /// The weights are left untouched; recurrent context advances after
    /// every pair.
    pub fn compute<I>(&mut self,
                      network: &mut FlattenedNetwork,
                      training: &TrainingSet,
                      batch: I,
                      gradients: &mut [f64])
                      -> f64
        where I: IntoIterator<Item = usize>
    {
        assert_eq!(gradients.len(), network.weight_count());
        gradients.zero_out();

        let mut squared_error = 0.0;
        let mut count = 0usize;
        for index in batch {
            let (input, ideal) = training.pair(index);
            network.feed_forward(input, &mut self.activations);
            squared_error += self.backward(network, ideal, gradients);
            network.advance_context(&self.activations.outputs);
            count += 1;
        }
        if count == 0 {
            return 0.0;
        }

        let scale = 1.0 / count as f64;
        for g in gradients.iter_mut() {
            *g *= scale;
        }
        squared_error / (count * network.output_len()) as f64
    }

    /// Accumulates the gradients of one evaluated pair and returns its summed
    /// squared error.
    fn backward(&mut self,
                network: &FlattenedNetwork,
                ideal: &[f64],
                gradients: &mut [f64])
                -> f64 {
        let layers = network.layers();
        let weights = network.weights();
        let outputs = &self.activations.outputs;
        let inputs = &self.activations.inputs;

        let mut squared_error = 0.0;
        let activator = layers.back().activator;
        for (d, y, t) in multizip((self.deltas.mut_back().iter_mut(),
                                   outputs.back().iter(),
                                   ideal.iter())) {
            let diff = y - t;
            squared_error += diff * diff;
            *d = diff * activator.fprime(*y);
        }

        for l in (1..layers.len()).rev() {
            let layer = &layers[l];
            let fan_in = inputs[l].len();
            let offset = layer.weight_offset;
            let (earlier, current) = self.deltas.split_at_mut(l);
            let deltas = &current[0];

            for (k, delta) in deltas.iter().enumerate() {
                let row = offset + k * fan_in;
                for (g, x) in gradients[row..row + fan_in].iter_mut().zip(&inputs[l]) {
                    *g += delta * x;
                }
            }

            if l > 1 {
                let previous = &layers[l - 1];
                for (j, d) in earlier.mut_back().iter_mut().enumerate() {
                    let mut sum = 0.0;
                    for (k, delta) in deltas.iter().enumerate() {
                        sum += weights[offset + k * fan_in + j] * delta;
                    }
                    *d = sum * previous.activator.fprime(outputs[l - 1][j]);
                }
            }
        }
        squared_error
    }
}
