use ndarray::{Array2, ArrayView2};

use crate::Result;

/// A differentiable model that owns its parameters and their gradient.
pub trait Model {
    /// Returns the amount of parameters in the model.
    fn size(&self) -> usize;

    /// Computes the model's output for a batch of inputs.
    ///
    /// # Arguments
    /// * `x` - The input batch, one row per sample.
    ///
    /// # Returns
    /// The prediction for the given input or an error if a shape doesn't match.
    fn forward(&mut self, x: ArrayView2<f32>) -> Result<Array2<f32>>;

    /// Backpropagates `d`, the derivative of the loss with respect to the output of the
    /// last `forward` call, **adding** the result to the model's gradient.
    fn backward(&mut self, d: Array2<f32>) -> Result<()>;

    /// Resets the accumulated gradient to zero.
    fn zero_grad(&mut self);

    /// Gives simultaneous access to the parameters, for writing, and the gradient.
    fn params_and_grad(&mut self) -> (&mut [f32], &[f32]);
}
