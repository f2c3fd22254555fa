//! Configuration errors.
//!
//! Every error is raised while a network, training set or strategy is being
//! put together. Once a `Propagation` exists, iterating it cannot fail.

use thiserror::Error;

/// Result type alias for this crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// A strategy was requested by a tag that names no known variant.
    #[error("unknown variant tag: {0:?}")]
    UnknownVariant(String),

    /// Two components disagree on the length of a shared vector.
    #[error("{what}: expected length {expected}, found {actual}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// The network has no trainable weights.
    #[error("network has no trainable weights")]
    EmptyWeights,

    /// The training set holds no pairs.
    #[error("training set is empty")]
    EmptyTrainingSet,

    #[error("invalid topology: {0}")]
    InvalidTopology(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

impl Error {
    pub(crate) fn mismatch(what: &'static str,
                           expected: usize,
                           actual: usize)
                           -> Self {
        Error::DimensionMismatch {
            what,
            expected,
            actual,
        }
    }
}

/// Fails with `InvalidParameter` unless `value` lies in `[low, high)`.
pub(crate) fn check_range(name: &str,
                          value: f64,
                          low: f64,
                          high: f64)
                          -> Result<()> {
    if value >= low && value < high {
        Ok(())
    } else {
        Err(Error::InvalidParameter(format!("{} must lie in [{}, {}), got {}",
                                            name,
                                            low,
                                            high,
                                            value)))
    }
}

/// Fails with `InvalidParameter` unless `value` is strictly positive.
pub(crate) fn check_positive(name: &str, value: f64) -> Result<()> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(Error::InvalidParameter(format!("{} must be positive, got {}",
                                            name,
                                            value)))
    }
}
