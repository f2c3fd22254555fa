//! Training engine for flattened feed-forward and simple recurrent networks.
//!
//! A network's trainable parameters live in one contiguous weight vector
//! (`network::FlattenedNetwork`). A `propagation::Propagation` computes
//! gradients for that vector and hands each weight to a pluggable
//! `propagation::WeightUpdateStrategy`: one of the resilient propagation
//! variants, or mini-batch gradient descent driven by an `optimizer`.
//!
//! # Example
//!
//! ```
//! # use flatprop::prelude::*;
//! let examples = vec![(vec![0.0, 0.0], vec![0.0]),
//!                     (vec![0.0, 1.0], vec![1.0]),
//!                     (vec![1.0, 0.0], vec![1.0]),
//!                     (vec![1.0, 1.0], vec![0.0])];
//! let training = TrainingSet::new(examples).unwrap();
//!
//! let network = NetworkBuilder::new(2)
//!     .layer(4, Activator::Sigmoid, true)
//!     .layer(1, Activator::Sigmoid, true)
//!     .seed(7)
//!     .build()
//!     .unwrap();
//!
//! let strategy = ResilientPropagation::new(network.weight_count(),
//!                                          RpropConfig::default())
//!     .unwrap();
//! let propagation = Propagation::new(network, training, strategy).unwrap();
//!
//! let report = Trainer::new(propagation)
//!     .max_iterations(500)
//!     .logging(Logging::Silent)
//!     .train();
//! assert!(report.iterations <= 500);
//! ```

extern crate itertools;
#[macro_use]
extern crate log;
extern crate rand;
extern crate serde;
#[macro_use]
extern crate serde_derive;
extern crate thiserror;

#[cfg(test)]
#[macro_use]
extern crate approx;

pub mod activator;
pub mod dataset;
pub mod error;
pub mod network;
pub mod optimizer;
pub mod propagation;
pub mod trainer;

mod utils;

pub use crate::error::{Error, Result};

pub mod prelude {
    pub use crate::activator::Activator;
    pub use crate::dataset::TrainingSet;
    pub use crate::error::{Error, Result};
    pub use crate::network::{FlattenedNetwork, NetworkBuilder};
    pub use crate::propagation::rprop::{ResilientPropagation, RpropConfig,
                                        RpropVariant};
    pub use crate::propagation::sgd::{OptimizerConfig, SgdConfig,
                                      StochasticGradientDescent};
    pub use crate::propagation::{Propagation, TrainingState,
                                 WeightUpdateStrategy};
    pub use crate::trainer::{Logging, StopCondition, Trainer,
                             TrainingReport};
}
