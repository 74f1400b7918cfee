use log::debug;
use ndarray::ArrayView2;

use crate::{
    MlErr, Result,
    arch::{
        Model,
        loss::{BinaryCrossEntropy, LossFn},
    },
    optimization::{Adam, Optimizer},
};

/// A full-batch model `Trainer`. Holds the model being trained together with the optimizer
/// and loss function used to train it.
pub struct Trainer<'m, M, O, L>
where
    M: Model,
    O: Optimizer,
    L: LossFn,
{
    model: &'m mut M,
    optimizer: O,
    loss_fn: L,
}

impl<'m, M, O, L> Trainer<'m, M, O, L>
where
    M: Model,
    O: Optimizer,
    L: LossFn,
{
    /// Returns a new `Trainer`.
    ///
    /// # Arguments
    /// * `model` - The model that will be trained, its parameters are updated in place.
    /// * `optimizer` - The optimizer that dictates how to update the parameters on each step.
    /// * `loss_fn` - The loss function used to measure the difference between a model's output and the expected one.
    pub fn new(model: &'m mut M, optimizer: O, loss_fn: L) -> Self {
        Self {
            model,
            optimizer,
            loss_fn,
        }
    }

    /// Performs `epochs` gradient steps, each one over the entire dataset.
    ///
    /// # Arguments
    /// * `x` - The features, one row per sample.
    /// * `y` - The expected outputs, one row per sample.
    /// * `epochs` - The amount of steps to take.
    ///
    /// # Returns
    /// The loss measured on the last step, `0.0` if no step was taken.
    pub fn train(&mut self, x: ArrayView2<f32>, y: ArrayView2<f32>, epochs: usize) -> Result<f32> {
        let mut loss = 0.;

        for epoch in 0..epochs {
            self.model.zero_grad();

            let y_pred = self.model.forward(x)?;
            check_labels(y_pred.view(), y)?;

            loss = self.loss_fn.loss(y_pred.view(), y);
            let d = self.loss_fn.loss_prime(y_pred.view(), y);
            self.model.backward(d)?;

            let (params, grad) = self.model.params_and_grad();
            self.optimizer.update_params(grad, params)?;

            debug!("epoch {epoch}: loss {loss:.6}");
        }

        Ok(loss)
    }
}

/// Trains `model` with `Adam` and binary cross-entropy, full batch.
///
/// # Arguments
/// * `model` - The model to train.
/// * `x` - The features, one row per sample.
/// * `y` - The labels as a column, one row per sample.
/// * `learning_rate` - Adam's learning rate.
/// * `epochs` - The amount of gradient steps.
///
/// # Returns
/// The loss after the last step.
pub fn train_model<M: Model>(
    model: &mut M,
    x: ArrayView2<f32>,
    y: ArrayView2<f32>,
    learning_rate: f32,
    epochs: usize,
) -> Result<f32> {
    let optimizer = Adam::with_defaults(model.size(), learning_rate);
    let mut trainer = Trainer::new(model, optimizer, BinaryCrossEntropy::new());
    trainer.train(x, y, epochs)
}

fn check_labels(y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> Result<()> {
    if y.nrows() != y_pred.nrows() {
        return Err(MlErr::SizeMismatch {
            what: "labels",
            got: y.nrows(),
            expected: y_pred.nrows(),
        });
    }
    if y.ncols() != y_pred.ncols() {
        return Err(MlErr::SizeMismatch {
            what: "labels",
            got: y.ncols(),
            expected: y_pred.ncols(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::{Sequential, activations::ActFn, layers::Layer};
    use ndarray::{Array2, array};

    #[test]
    fn zero_epochs_leave_the_model_untouched() {
        let mut model = Sequential::new([Layer::dense((1, 1), Some(ActFn::sigmoid()))]);
        let x = array![[1.], [-1.]];
        let y = array![[1.], [0.]];

        let loss = train_model(&mut model, x.view(), y.view(), 0.1, 0).unwrap();

        assert_eq!(loss, 0.);
        assert_eq!(model.params(), [0., 0.]);
    }

    #[test]
    fn learns_a_threshold() {
        let mut model = Sequential::new([Layer::dense((1, 1), Some(ActFn::sigmoid()))]);
        let x = array![[2.], [1.], [-1.], [-2.]];
        let y = array![[1.], [1.], [0.], [0.]];

        let first = train_model(&mut model, x.view(), y.view(), 0.1, 1).unwrap();
        let last = train_model(&mut model, x.view(), y.view(), 0.1, 200).unwrap();

        assert!((first - std::f32::consts::LN_2).abs() < 1e-6);
        assert!(last < 0.1, "got {last}");
        assert!(model.params()[0] > 0.);
    }

    #[test]
    fn shape_errors_propagate() {
        let mut model = Sequential::new([Layer::dense((2, 1), None)]);
        let x = array![[1.], [2.]];
        let y = array![[1.], [0.]];

        assert!(train_model(&mut model, x.view(), y.view(), 0.1, 1).is_err());
    }

    #[test]
    fn mismatched_labels_are_an_error() {
        let mut model = Sequential::new([Layer::dense((10, 1), Some(ActFn::sigmoid()))]);
        let x = Array2::<f32>::zeros((100, 10));
        let y = Array2::<f32>::zeros((50, 1));

        assert!(matches!(
            train_model(&mut model, x.view(), y.view(), 0.1, 1),
            Err(MlErr::SizeMismatch { what: "labels", got: 50, expected: 100 })
        ));
        assert_eq!(model.params(), [0.; 11]);
    }

    #[test]
    fn extra_label_columns_are_an_error() {
        let mut model = Sequential::new([Layer::dense((1, 1), Some(ActFn::sigmoid()))]);
        let x = array![[1.], [-1.]];
        let y = array![[1., 0.], [0., 1.]];

        assert!(matches!(
            train_model(&mut model, x.view(), y.view(), 0.1, 1),
            Err(MlErr::SizeMismatch { what: "labels", got: 2, expected: 1 })
        ));
    }
}
