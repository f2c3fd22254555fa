use crate::optimizer::Optimizer;

/// Adaptive moment estimation.
///
/// Keeps moving averages of each weight's gradient and squared gradient and
/// corrects both for their zero initialization using a shared time step,
/// which advances once per iteration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Adam {
    pub(crate) learning_rate: f64,
    pub(crate) beta1: f64,
    pub(crate) beta2: f64,
    pub(crate) epsilon: f64,

    first_moment: Vec<f64>,
    second_moment: Vec<f64>,
    timestep: i32,
}

impl Adam {
    pub fn new(weight_count: usize,
               learning_rate: f64,
               beta1: f64,
               beta2: f64,
               epsilon: f64)
               -> Adam {
        Adam {
            learning_rate,
            beta1,
            beta2,
            epsilon,
            first_moment: vec![0.0; weight_count],
            second_moment: vec![0.0; weight_count],
            timestep: 0,
        }
    }

    /// Number of iterations begun so far.
    pub fn timestep(&self) -> i32 {
        self.timestep
    }
}

impl Optimizer for Adam {
    fn weight_count(&self) -> usize {
        self.first_moment.len()
    }

    fn begin_iteration(&mut self) {
        self.timestep = self.timestep.saturating_add(1);
    }

    fn update(&mut self, gradients: &[f64], index: usize) -> f64 {
        let gradient = gradients[index];
        let t = self.timestep.max(1);

        let m = &mut self.first_moment[index];
        *m = self.beta1 * *m + (1.0 - self.beta1) * gradient;
        let v = &mut self.second_moment[index];
        *v = self.beta2 * *v + (1.0 - self.beta2) * gradient * gradient;

        let m_hat = self.first_moment[index] / (1.0 - self.beta1.powi(t));
        let v_hat = self.second_moment[index] / (1.0 - self.beta2.powi(t));
        -self.learning_rate * m_hat / (v_hat.sqrt() + self.epsilon)
    }
}
