use crate::optimizer::Optimizer;

/// Gradient descent with Nesterov momentum.
///
/// The gradient is taken at the current weights rather than at the
/// look-ahead position, so the change is corrected using the velocity from
/// before the update: `-momentum * previous + (1 + momentum) * velocity`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Nesterov {
    pub(crate) learning_rate: f64,
    pub(crate) momentum: f64,

    velocity: Vec<f64>,
}

impl Nesterov {
    pub fn new(weight_count: usize, learning_rate: f64, momentum: f64) -> Nesterov {
        Nesterov {
            learning_rate,
            momentum,
            velocity: vec![0.0; weight_count],
        }
    }

    pub fn velocity(&self) -> &[f64] {
        &self.velocity
    }
}

impl Optimizer for Nesterov {
    fn weight_count(&self) -> usize {
        self.velocity.len()
    }

    fn update(&mut self, gradients: &[f64], index: usize) -> f64 {
        let previous = self.velocity[index];
        let velocity = self.momentum * previous - self.learning_rate * gradients[index];
        self.velocity[index] = velocity;
        -self.momentum * previous + (1.0 + self.momentum) * velocity
    }
}
