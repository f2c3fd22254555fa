//! Labelled training data.

use crate::error::{Error, Result};
use crate::utils::Front;

/// An ordered set of `(input, ideal output)` pairs with uniform widths.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrainingSet {
    pairs: Vec<(Vec<f64>, Vec<f64>)>,
}

impl TrainingSet {
    /// Builds a training set, rejecting empty data and ragged rows.
    ///
    /// Every input must have the width of the first input, and likewise for
    /// the ideal outputs.
    pub fn new<I, O>(pairs: Vec<(I, O)>) -> Result<Self>
        where I: Into<Vec<f64>>,
              O: Into<Vec<f64>>
    {
        let pairs: Vec<(Vec<f64>, Vec<f64>)> = pairs.into_iter()
            .map(|(input, ideal)| (input.into(), ideal.into()))
            .collect();
        if pairs.is_empty() {
            return Err(Error::EmptyTrainingSet);
        }

        let (input_len, ideal_len) = {
            let first = pairs.front();
            (first.0.len(), first.1.len())
        };
        if input_len == 0 || ideal_len == 0 {
            return Err(Error::InvalidTopology(
                "training pairs need non-empty input and ideal vectors".into()));
        }
        for &(ref input, ref ideal) in &pairs {
            if input.len() != input_len {
                return Err(Error::mismatch("training input", input_len, input.len()));
            }
            if ideal.len() != ideal_len {
                return Err(Error::mismatch("training ideal", ideal_len, ideal.len()));
            }
        }
        Ok(TrainingSet { pairs })
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Width of every input vector.
    pub fn input_len(&self) -> usize {
        self.pairs.front().0.len()
    }

    /// Width of every ideal output vector.
    pub fn ideal_len(&self) -> usize {
        self.pairs.front().1.len()
    }

    pub fn pair(&self, index: usize) -> (&[f64], &[f64]) {
        let (ref input, ref ideal) = self.pairs[index];
        (input, ideal)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&[f64], &[f64])> {
        self.pairs.iter().map(|&(ref input, ref ideal)| (&input[..], &ideal[..]))
    }
}
