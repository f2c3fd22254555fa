use crate::activator::Activator;

/// Metadata for a single layer of a `FlattenedNetwork`.
///
/// A layer owns no weights itself. Layer `l > 0` reads the outputs of layer
/// `l - 1`, then any context values, then a constant bias input, and its
/// weights sit in the network's flat vector starting at `weight_offset`, one
/// row of `fan_in` weights per neuron.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FlatLayer {
    /// The number of neurons in this layer.
    pub neurons: usize,
    /// The activation function applied to every neuron's weighted sum.
    pub activator: Activator,
    /// Whether the neurons receive a bias input.
    pub bias: bool,
    /// Index of the layer whose previous output is fed back into this one.
    ///
    /// This is a plain index into the network's layer sequence, never an
    /// owning reference.
    pub context_source: Option<usize>,
    /// Width of the context block, equal to the source layer's neuron count.
    pub context_len: usize,
    /// Probability that a weight feeding this layer sits out an iteration.
    pub dropout_rate: f64,
    /// Position of this layer's first weight in the flat vector.
    pub weight_offset: usize,
}

impl FlatLayer {
    /// Creates an input layer, which has no weights.
    pub fn input(neurons: usize) -> Self {
        FlatLayer {
            neurons,
            activator: Activator::Linear,
            bias: false,
            context_source: None,
            context_len: 0,
            dropout_rate: 0.0,
            weight_offset: 0,
        }
    }

    pub fn new(neurons: usize, activator: Activator, bias: bool) -> Self {
        FlatLayer {
            activator,
            bias,
            ..FlatLayer::input(neurons)
        }
    }

    /// The number of inputs each neuron of this layer reads, given the width
    /// of the previous layer.
    pub fn fan_in(&self, previous_neurons: usize) -> usize {
        previous_neurons + self.context_len + if self.bias { 1 } else { 0 }
    }

    /// The number of weights feeding this layer.
    pub fn weight_count(&self, previous_neurons: usize) -> usize {
        self.neurons * self.fan_in(previous_neurons)
    }

    /// Assembles this layer's input vector into `buffer`: previous outputs,
    /// then context, then the bias input.
    pub(crate) fn gather_inputs(&self,
                                previous: &[f64],
                                context: &[f64],
                                buffer: &mut Vec<f64>) {
        debug_assert_eq!(context.len(), self.context_len);
        buffer.clear();
        buffer.extend_from_slice(previous);
        buffer.extend_from_slice(context);
        if self.bias {
            buffer.push(1.0);
        }
    }

    /// Feeds `inputs` (as built by `gather_inputs`) through this layer's
    /// weights, writing activated values into `outputs`.
    pub(crate) fn forward(&self,
                          weights: &[f64],
                          inputs: &[f64],
                          outputs: &mut [f64]) {
        let fan_in = inputs.len();
        assert_eq!(outputs.len(), self.neurons);
        let rows = weights[self.weight_offset..]
            .chunks(fan_in)
            .take(self.neurons);
        for (y, row) in outputs.iter_mut().zip(rows) {
            let sum: f64 = row.iter().zip(inputs).map(|(w, x)| w * x).sum();
            *y = self.activator.f(sum);
        }
    }
}
