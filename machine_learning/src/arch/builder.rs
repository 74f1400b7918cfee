use rand::Rng;

use super::{Sequential, activations::ActFn, layers::Layer};
use crate::{Result, dataset::N_FEATURES};

/// The width of the hidden layer.
pub const HIDDEN_SIZE: usize = 32;

/// Builds the fixed binary classifier, `N_FEATURES -> HIDDEN_SIZE (relu) -> 1 (sigmoid)`.
///
/// The topology doesn't depend on any configuration value.
///
/// # Arguments
/// * `rng` - The stream used to initialize the parameters.
///
/// # Returns
/// A freshly initialized model whose output lies in `(0, 1)`.
pub fn build_model<R: Rng>(rng: &mut R) -> Result<Sequential> {
    let mut model = Sequential::new([
        Layer::dense((N_FEATURES, HIDDEN_SIZE), Some(ActFn::relu())),
        Layer::dense((HIDDEN_SIZE, 1), Some(ActFn::sigmoid())),
    ]);

    model.init_params(rng)?;
    Ok(model)
}
