use rand::Rng;
use rand_distr::{Distribution, Uniform};

use crate::Result;

/// Describes how the parameters of a layer are initialized.
#[derive(Debug, Clone, Copy)]
pub enum ParamGen {
    /// Every parameter takes the same value.
    Const { value: f32 },
    /// Parameters are sampled from `U(-1 / sqrt(fan_in), 1 / sqrt(fan_in))`, the usual
    /// default for fully connected layers.
    FanInUniform,
}

impl ParamGen {
    /// Samples `n` parameters.
    ///
    /// # Arguments
    /// * `rng` - The random number generator to sample from.
    /// * `n` - The amount of parameters to generate.
    /// * `fan_in` - The amount of inputs of the layer being initialized.
    ///
    /// # Returns
    /// The sampled parameters or an error if the distribution can't be built.
    pub fn sample<R: Rng>(&self, rng: &mut R, n: usize, fan_in: usize) -> Result<Vec<f32>> {
        match *self {
            ParamGen::Const { value } => Ok(vec![value; n]),
            ParamGen::FanInUniform => {
                let bound = 1. / (fan_in.max(1) as f32).sqrt();
                let distribution = Uniform::new(-bound, bound)?;
                Ok(distribution.sample_iter(rng).take(n).collect())
            }
        }
    }
}
