use crate::optimizer::Optimizer;

/// Gradient descent scaled by a moving average of squared gradients.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RmsProp {
    pub(crate) learning_rate: f64,
    pub(crate) decay: f64,
    pub(crate) epsilon: f64,

    mean_square: Vec<f64>,
}

impl RmsProp {
    pub fn new(weight_count: usize, learning_rate: f64, decay: f64, epsilon: f64) -> RmsProp {
        RmsProp {
            learning_rate,
            decay,
            epsilon,
            mean_square: vec![0.0; weight_count],
        }
    }

    pub fn mean_square(&self) -> &[f64] {
        &self.mean_square
    }
}

impl Optimizer for RmsProp {
    fn weight_count(&self) -> usize {
        self.mean_square.len()
    }

    fn update(&mut self, gradients: &[f64], index: usize) -> f64 {
        let gradient = gradients[index];
        let mean = &mut self.mean_square[index];
        *mean = self.decay * *mean + (1.0 - self.decay) * gradient * gradient;
        -self.learning_rate * gradient / (mean.sqrt() + self.epsilon)
    }
}
