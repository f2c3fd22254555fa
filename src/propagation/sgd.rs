//! Mini-batch stochastic gradient descent.
//!
//! Every iteration evaluates `batch_size` training pairs drawn at random
//! (with replacement) and moves each weight by whatever its `Optimizer`
//! decides.
//!
//! Sampled pairs carry no sequence order, so recurrent networks start every
//! batch from cleared context.

use std::fmt;
use std::str::FromStr;

use crate::error::{check_positive, check_range, Error, Result};
use crate::optimizer::{AdaGrad, Adam, Momentum, Nesterov, Optimizer, RmsProp};
use crate::propagation::{TrainingState, WeightUpdateStrategy};

fn default_momentum() -> f64 {
    0.9
}

fn default_decay() -> f64 {
    0.9
}

fn default_beta1() -> f64 {
    0.9
}

fn default_beta2() -> f64 {
    0.999
}

fn default_epsilon() -> f64 {
    1e-8
}

/// Selects an optimizer and its coefficients.
///
/// Serialized with a `type` tag; missing coefficients take their defaults:
///
/// ```
/// # use flatprop::prelude::*;
/// let config: OptimizerConfig = "rmsprop".parse().unwrap();
/// assert_eq!(config, OptimizerConfig::RmsProp { decay: 0.9, epsilon: 1e-8 });
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OptimizerConfig {
    Momentum {
        #[serde(default = "default_momentum")]
        momentum: f64,
    },
    Nesterov {
        #[serde(default = "default_momentum")]
        momentum: f64,
    },
    AdaGrad {
        #[serde(default = "default_epsilon")]
        epsilon: f64,
    },
    RmsProp {
        #[serde(default = "default_decay")]
        decay: f64,
        #[serde(default = "default_epsilon")]
        epsilon: f64,
    },
    Adam {
        #[serde(default = "default_beta1")]
        beta1: f64,
        #[serde(default = "default_beta2")]
        beta2: f64,
        #[serde(default = "default_epsilon")]
        epsilon: f64,
    },
}

impl OptimizerConfig {
    pub const TAGS: [&'static str; 5] = ["momentum", "nesterov", "adagrad", "rmsprop", "adam"];

    pub fn tag(&self) -> &'static str {
        match *self {
            OptimizerConfig::Momentum { .. } => "momentum",
            OptimizerConfig::Nesterov { .. } => "nesterov",
            OptimizerConfig::AdaGrad { .. } => "adagrad",
            OptimizerConfig::RmsProp { .. } => "rmsprop",
            OptimizerConfig::Adam { .. } => "adam",
        }
    }

    /// Creates the optimizer with zeroed per-weight state.
    pub fn build(&self, weight_count: usize, learning_rate: f64) -> Result<Box<dyn Optimizer>> {
        check_positive("learning rate", learning_rate)?;
        let optimizer: Box<dyn Optimizer> = match *self {
            OptimizerConfig::Momentum { momentum } => {
                check_range("momentum", momentum, 0.0, 1.0)?;
                Box::new(Momentum::new(weight_count, learning_rate, momentum))
            }
            OptimizerConfig::Nesterov { momentum } => {
                check_range("momentum", momentum, 0.0, 1.0)?;
                Box::new(Nesterov::new(weight_count, learning_rate, momentum))
            }
            OptimizerConfig::AdaGrad { epsilon } => {
                check_positive("epsilon", epsilon)?;
                Box::new(AdaGrad::new(weight_count, learning_rate, epsilon))
            }
            OptimizerConfig::RmsProp { decay, epsilon } => {
                check_range("decay", decay, 0.0, 1.0)?;
                check_positive("epsilon", epsilon)?;
                Box::new(RmsProp::new(weight_count, learning_rate, decay, epsilon))
            }
            OptimizerConfig::Adam { beta1, beta2, epsilon } => {
                check_range("beta1", beta1, 0.0, 1.0)?;
                check_range("beta2", beta2, 0.0, 1.0)?;
                check_positive("epsilon", epsilon)?;
                Box::new(Adam::new(weight_count, learning_rate, beta1, beta2, epsilon))
            }
        };
        Ok(optimizer)
    }
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        OptimizerConfig::Adam {
            beta1: default_beta1(),
            beta2: default_beta2(),
            epsilon: default_epsilon(),
        }
    }
}

impl fmt::Display for OptimizerConfig {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for OptimizerConfig {
    type Err = Error;

    /// Parses an optimizer tag, ignoring case, with default coefficients.
    fn from_str(tag: &str) -> Result<Self> {
        let config = match tag.trim().to_ascii_lowercase().as_str() {
            "momentum" => OptimizerConfig::Momentum { momentum: default_momentum() },
            "nesterov" => OptimizerConfig::Nesterov { momentum: default_momentum() },
            "adagrad" => OptimizerConfig::AdaGrad { epsilon: default_epsilon() },
            "rmsprop" => {
                OptimizerConfig::RmsProp {
                    decay: default_decay(),
                    epsilon: default_epsilon(),
                }
            }
            "adam" => OptimizerConfig::default(),
            _ => return Err(Error::UnknownVariant(tag.to_string())),
        };
        Ok(config)
    }
}

/// Construction parameters for `StochasticGradientDescent`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SgdConfig {
    pub learning_rate: f64,
    /// Training pairs drawn per iteration.
    pub batch_size: usize,
    pub optimizer: OptimizerConfig,
}

impl Default for SgdConfig {
    fn default() -> Self {
        SgdConfig {
            learning_rate: 0.01,
            batch_size: 32,
            optimizer: OptimizerConfig::default(),
        }
    }
}

impl SgdConfig {
    pub fn learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn optimizer(mut self, optimizer: OptimizerConfig) -> Self {
        self.optimizer = optimizer;
        self
    }
}

/// A mini-batch gradient descent weight update strategy.
#[derive(Debug)]
pub struct StochasticGradientDescent {
    config: SgdConfig,
    optimizer: Box<dyn Optimizer>,
}

impl StochasticGradientDescent {
    pub fn new(weight_count: usize, config: SgdConfig) -> Result<Self> {
        if weight_count == 0 {
            return Err(Error::EmptyWeights);
        }
        if config.batch_size == 0 {
            return Err(Error::InvalidParameter("batch size must be positive".into()));
        }
        let optimizer = config.optimizer.build(weight_count, config.learning_rate)?;
        Ok(StochasticGradientDescent { config, optimizer })
    }

    pub fn config(&self) -> &SgdConfig {
        &self.config
    }

    pub fn optimizer(&self) -> &dyn Optimizer {
        &*self.optimizer
    }
}

impl WeightUpdateStrategy for StochasticGradientDescent {
    fn weight_count(&self) -> usize {
        self.optimizer.weight_count()
    }

    fn batch_size(&self) -> Option<usize> {
        Some(self.config.batch_size)
    }

    fn begin_iteration(&mut self, _state: &TrainingState) {
        self.optimizer.begin_iteration();
    }

    fn update_weight(&mut self,
                     state: &mut TrainingState,
                     index: usize,
                     dropout_rate: f64)
                     -> f64 {
        if dropout_rate > 0.0 {
            return 0.0;
        }
        state.last_gradients[index] = state.gradients[index];
        self.optimizer.update(&state.gradients, index)
    }
}
