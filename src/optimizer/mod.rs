//! Per-weight optimizers for mini-batch gradient descent.
//!
//! Each optimizer turns the gradient of one weight into a signed change,
//! keeping whatever per-weight history it needs in buffers sized to the
//! weight vector when it is created.

use std::fmt;

pub use self::adagrad::AdaGrad;
pub use self::adam::Adam;
pub use self::momentum::Momentum;
pub use self::nesterov::Nesterov;
pub use self::rmsprop::RmsProp;

pub trait Optimizer: fmt::Debug {
    /// The length of the weight vector this optimizer was built for.
    fn weight_count(&self) -> usize;

    /// Called once per iteration, before any weight is updated.
    fn begin_iteration(&mut self) {}

    /// Returns the change for weight `index`.
    fn update(&mut self, gradients: &[f64], index: usize) -> f64;
}

mod adagrad;
mod adam;
mod momentum;
mod nesterov;
mod rmsprop;
