use crate::optimizer::Optimizer;

/// Adaptive gradient descent.
///
/// Squared gradients accumulate without decay, so each weight's effective
/// rate only ever shrinks.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AdaGrad {
    pub(crate) learning_rate: f64,
    pub(crate) epsilon: f64,

    squared_gradients: Vec<f64>,
}

impl AdaGrad {
    pub fn new(weight_count: usize, learning_rate: f64, epsilon: f64) -> AdaGrad {
        AdaGrad {
            learning_rate,
            epsilon,
            squared_gradients: vec![0.0; weight_count],
        }
    }

    pub fn squared_gradients(&self) -> &[f64] {
        &self.squared_gradients
    }
}

impl Optimizer for AdaGrad {
    fn weight_count(&self) -> usize {
        self.squared_gradients.len()
    }

    fn update(&mut self, gradients: &[f64], index: usize) -> f64 {
        let gradient = gradients[index];
        let accumulated = &mut self.squared_gradients[index];
        *accumulated += gradient * gradient;
        -self.learning_rate * gradient / (accumulated.sqrt() + self.epsilon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_step_is_normalized() {
        let mut optimizer = AdaGrad::new(1, 0.01, 1e-8);
        assert_relative_eq!(optimizer.update(&[4.0], 0), -0.01, epsilon = 1e-9);
        assert_relative_eq!(optimizer.squared_gradients()[0], 16.0);
    }

    #[test]
    fn step_magnitude_never_grows() {
        let mut optimizer = AdaGrad::new(1, 0.1, 1e-8);
        let mut previous = std::f64::INFINITY;
        for i in 0..200 {
            // Constant sign, varying magnitude.
            let gradient = 0.5 + (i % 7) as f64 * 0.1;
            let step = optimizer.update(&[gradient], 0);
            assert!(step < 0.0);
            let rate = step.abs() / gradient;
            assert!(rate <= previous);
            previous = rate;
        }
    }

    #[test]
    fn zero_gradient_no_change() {
        let mut optimizer = AdaGrad::new(1, 0.1, 1e-8);
        assert_eq!(optimizer.update(&[0.0], 0), 0.0);
    }
}
