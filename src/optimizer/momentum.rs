use crate::optimizer::Optimizer;

/// Gradient descent with classical momentum.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Momentum {
    pub(crate) learning_rate: f64,
    pub(crate) momentum: f64,

    velocity: Vec<f64>,
}

impl Momentum {
    pub fn new(weight_count: usize, learning_rate: f64, momentum: f64) -> Momentum {
        Momentum {
            learning_rate,
            momentum,
            velocity: vec![0.0; weight_count],
        }
    }

    pub fn velocity(&self) -> &[f64] {
        &self.velocity
    }
}

impl Optimizer for Momentum {
    fn weight_count(&self) -> usize {
        self.velocity.len()
    }

    fn update(&mut self, gradients: &[f64], index: usize) -> f64 {
        // velocity = momentum * velocity - rate * gradient
        let v = &mut self.velocity[index];
        *v = self.momentum * *v - self.learning_rate * gradients[index];
        *v
    }
}
