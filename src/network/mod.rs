//! A neural network whose trainable parameters form one flat vector.
//!
//! # Example
//!
//! An Elman network, where the hidden layer sees its own previous output:
//!
//! ```
//! # use flatprop::prelude::*;
//! let mut network = NetworkBuilder::new(1)
//!     .layer(3, Activator::TanH, true)
//!     .layer(1, Activator::Linear, true)
//!     .context(1, 1)
//!     .seed(3)
//!     .build()
//!     .unwrap();
//!
//! // 3 hidden neurons read 1 input, 3 context values and a bias.
//! assert_eq!(network.weight_count(), 3 * 5 + 1 * 4);
//!
//! let first = network.compute(&[1.0]).unwrap();
//! let second = network.compute(&[1.0]).unwrap();
//! assert!(first != second);
//! ```

use std::convert::TryFrom;
use std::ops::Range;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::activator::Activator;
use crate::error::{check_range, Error, Result};
use crate::utils::{Back, Front, ZeroOut};

pub use self::gradient::GradientComputation;
pub use self::layer::FlatLayer;

pub mod gradient;
mod layer;

/// A feed-forward or simple recurrent network in flattened form.
///
/// Deserializing runs the same layout checks as `NetworkBuilder::build`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "NetworkParts")]
pub struct FlattenedNetwork {
    layers: Vec<FlatLayer>,
    weights: Vec<f64>,
    /// Context values per layer, delayed by one evaluation.
    context: Vec<Vec<f64>>,
}

/// Unchecked fields of a serialized `FlattenedNetwork`.
#[derive(Deserialize)]
struct NetworkParts {
    layers: Vec<FlatLayer>,
    weights: Vec<f64>,
    context: Vec<Vec<f64>>,
}

impl TryFrom<NetworkParts> for FlattenedNetwork {
    type Error = Error;

    fn try_from(parts: NetworkParts) -> Result<Self> {
        let network = FlattenedNetwork {
            layers: parts.layers,
            weights: parts.weights,
            context: parts.context,
        };
        network.validate()?;
        Ok(network)
    }
}

/// Per-layer scratch space for a single evaluation.
#[derive(Clone, Debug)]
pub(crate) struct Activations {
    /// Assembled inputs for each layer; empty for the input layer.
    pub inputs: Vec<Vec<f64>>,
    /// Activated outputs for each layer.
    pub outputs: Vec<Vec<f64>>,
}

impl FlattenedNetwork {
    /// Returns the size of the input layer to the network.
    pub fn input_len(&self) -> usize {
        self.layers.front().neurons
    }

    /// Returns the size of the output layer from the network.
    pub fn output_len(&self) -> usize {
        self.layers.back().neurons
    }

    pub fn weight_count(&self) -> usize {
        self.weights.len()
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Mutable access to the weights. The vector can be changed but never
    /// resized.
    pub fn weights_mut(&mut self) -> &mut [f64] {
        &mut self.weights
    }

    pub fn layers(&self) -> &[FlatLayer] {
        &self.layers
    }

    /// The span of the flat vector holding the weights that feed `layer`.
    pub fn layer_weights(&self, layer: usize) -> Range<usize> {
        if layer == 0 {
            return 0..0;
        }
        let start = self.layers[layer].weight_offset;
        start..start + self.layers[layer].weight_count(self.layers[layer - 1].neurons)
    }

    /// Checks that the layer metadata, context buffers and weight vector
    /// describe one consistent layout.
    pub fn validate(&self) -> Result<()> {
        if self.layers.len() < 2 {
            return Err(Error::InvalidTopology(
                "a network needs an input and an output layer".into()));
        }
        if self.layers.iter().any(|l| l.neurons == 0) {
            return Err(Error::InvalidTopology("layers must not be empty".into()));
        }
        if self.context.len() != self.layers.len() {
            return Err(Error::mismatch("network context", self.layers.len(), self.context.len()));
        }
        let input = self.layers.front();
        if input.context_source.is_some() || input.context_len != 0 {
            return Err(Error::InvalidTopology("the input layer takes no context".into()));
        }

        let mut offset = 0;
        for (i, layer) in self.layers.iter().enumerate() {
            check_range("dropout rate", layer.dropout_rate, 0.0, 1.0)?;
            if i == 0 {
                continue;
            }
            let context_len = match layer.context_source {
                Some(source) if source < self.layers.len() => self.layers[source].neurons,
                Some(source) => {
                    return Err(Error::InvalidTopology(format!(
                        "context {} -> {} is out of range", source, i)));
                }
                None => 0,
            };
            if layer.context_len != context_len {
                return Err(Error::mismatch("layer context", context_len, layer.context_len));
            }
            if self.context[i].len() != context_len {
                return Err(Error::mismatch("context values", context_len, self.context[i].len()));
            }
            if layer.weight_offset != offset {
                return Err(Error::InvalidTopology(format!(
                    "layer {} starts at weight {}, expected {}", i, layer.weight_offset, offset)));
            }
            offset += layer.weight_count(self.layers[i - 1].neurons);
        }

        if self.weights.len() != offset {
            return Err(Error::mismatch("network weights", offset, self.weights.len()));
        }
        Ok(())
    }

    /// Resets all recurrent context values to zero.
    pub fn clear_context(&mut self) {
        self.context.zero_out();
    }

    /// Feeds `input` through the network and returns the output layer.
    ///
    /// Recurrent networks advance their context, so repeated calls with the
    /// same input may produce different outputs.
    pub fn compute(&mut self, input: &[f64]) -> Result<Vec<f64>> {
        if input.len() != self.input_len() {
            return Err(Error::mismatch("network input", self.input_len(), input.len()));
        }
        let mut activations = self.empty_activations();
        self.feed_forward(input, &mut activations);
        self.advance_context(&activations.outputs);
        Ok(activations.outputs.pop().unwrap_or_default())
    }

    pub(crate) fn empty_activations(&self) -> Activations {
        let mut inputs = Vec::with_capacity(self.layers.len());
        let mut outputs = Vec::with_capacity(self.layers.len());
        for (i, layer) in self.layers.iter().enumerate() {
            let fan_in = if i == 0 {
                0
            } else {
                layer.fan_in(self.layers[i - 1].neurons)
            };
            inputs.push(Vec::with_capacity(fan_in));
            outputs.push(vec![0.0; layer.neurons]);
        }
        Activations { inputs, outputs }
    }

    /// Evaluates every layer in order, recording inputs and outputs.
    pub(crate) fn feed_forward(&self, input: &[f64], activations: &mut Activations) {
        activations.outputs[0].copy_from_slice(input);
        for i in 1..self.layers.len() {
            let layer = &self.layers[i];
            let (before, after) = activations.outputs.split_at_mut(i);
            layer.gather_inputs(before.back(), &self.context[i], &mut activations.inputs[i]);
            layer.forward(&self.weights, &activations.inputs[i], &mut after[0]);
        }
    }

    /// Copies each context source's latest output into its target layer.
    pub(crate) fn advance_context(&mut self, outputs: &[Vec<f64>]) {
        for (layer, context) in self.layers.iter().zip(self.context.iter_mut()) {
            if let Some(source) = layer.context_source {
                context.copy_from_slice(&outputs[source]);
            }
        }
    }
}

/// Builds a `FlattenedNetwork` layer by layer.
#[derive(Clone, Debug)]
pub struct NetworkBuilder {
    layers: Vec<FlatLayer>,
    contexts: Vec<(usize, usize)>,
    weights: Option<Vec<f64>>,
    seed: Option<u64>,
}

impl NetworkBuilder {
    /// Starts a network with an input layer of `input_neurons` values.
    pub fn new(input_neurons: usize) -> Self {
        NetworkBuilder {
            layers: vec![FlatLayer::input(input_neurons)],
            contexts: Vec::new(),
            weights: None,
            seed: None,
        }
    }

    /// Appends a layer fully connected to the previous one.
    pub fn layer(mut self, neurons: usize, activator: Activator, bias: bool) -> Self {
        self.layers.push(FlatLayer::new(neurons, activator, bias));
        self
    }

    /// Sets the dropout rate of the most recently added layer's weights.
    pub fn dropout(mut self, rate: f64) -> Self {
        self.layers.mut_back().dropout_rate = rate;
        self
    }

    /// Feeds the previous output of layer `source` into layer `target`.
    pub fn context(mut self, source: usize, target: usize) -> Self {
        self.contexts.push((source, target));
        self
    }

    /// Uses the provided weights instead of random ones.
    pub fn weights(mut self, weights: Vec<f64>) -> Self {
        self.weights = Some(weights);
        self
    }

    /// Seeds the weight randomizer.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Validates the topology and lays out the flat weight vector.
    pub fn build(self) -> Result<FlattenedNetwork> {
        let NetworkBuilder { mut layers, contexts, weights, seed } = self;

        for &(source, target) in &contexts {
            if source >= layers.len() || target == 0 || target >= layers.len() {
                return Err(Error::InvalidTopology(format!(
                    "context {} -> {} is out of range", source, target)));
            }
            if layers[target].context_source.is_some() {
                return Err(Error::InvalidTopology(format!(
                    "layer {} already has a context source", target)));
            }
            layers[target].context_source = Some(source);
            layers[target].context_len = layers[source].neurons;
        }

        let mut offset = 0;
        for i in 1..layers.len() {
            let previous = layers[i - 1].neurons;
            layers[i].weight_offset = offset;
            offset += layers[i].weight_count(previous);
        }

        let weights = weights.unwrap_or_else(|| {
            let mut rng = match seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };
            (0..offset).map(|_| rng.gen_range(-1.0..1.0)).collect()
        });

        let context = layers.iter().map(|l| vec![0.0; l.context_len]).collect();
        let network = FlattenedNetwork { layers, weights, context };
        network.validate()?;
        debug!("built network with {} layers and {} weights",
               network.layers.len(),
               network.weight_count());
        Ok(network)
    }
}
