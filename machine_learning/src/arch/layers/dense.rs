use ndarray::{Array2, ArrayView1, ArrayView2, ArrayViewMut1, ArrayViewMut2, Axis};

use crate::{
    MlErr, Result,
    arch::{ParamGen, activations::ActFn},
};

/// A fully connected layer, `a = act_fn(x · w + b)`.
///
/// The layer doesn't own its parameters, it reads them from (and writes its gradient
/// into) the slices handed by the model on each pass. The weights are laid out first,
/// row-major with shape `(dim.0, dim.1)`, followed by the `dim.1` biases.
#[derive(Debug, Clone)]
pub struct Dense {
    dim: (usize, usize),
    act_fn: Option<ActFn>,
    init: ParamGen,
    size: usize,

    // Forward metadata
    x: Array2<f32>,
    z: Array2<f32>,
}

impl Dense {
    /// Creates a new `Dense` layer initialized with `ParamGen::FanInUniform`.
    ///
    /// # Arguments
    /// * `dim` - The amount of inputs and outputs of the layer.
    /// * `act_fn` - The activation applied to the output, if any.
    pub fn new(dim: (usize, usize), act_fn: Option<ActFn>) -> Self {
        let zeros = Array2::zeros((0, 0));

        Self {
            dim,
            act_fn,
            init: ParamGen::FanInUniform,
            size: (dim.0 + 1) * dim.1,
            x: zeros.clone(),
            z: zeros,
        }
    }

    /// Replaces the way this layer's parameters are initialized.
    pub fn with_init(mut self, init: ParamGen) -> Self {
        self.init = init;
        self
    }

    /// Returns the amount of parameters this layer has.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn dim(&self) -> (usize, usize) {
        self.dim
    }

    pub fn init(&self) -> ParamGen {
        self.init
    }

    /// Makes a forward pass, caching what the backward pass needs.
    ///
    /// # Arguments
    /// * `params` - This layer's parameters.
    /// * `x` - The input batch, one row per sample.
    ///
    /// # Returns
    /// The activations of this layer or an error if a shape doesn't match.
    pub fn forward(&mut self, params: &[f32], x: ArrayView2<f32>) -> Result<Array2<f32>> {
        if x.ncols() != self.dim.0 {
            return Err(MlErr::SizeMismatch {
                what: "dense input",
                got: x.ncols(),
                expected: self.dim.0,
            });
        }

        let (w, b) = self.view_params(params)?;
        self.z = x.dot(&w) + &b;
        self.x = x.to_owned();

        let Some(ref act_fn) = self.act_fn else {
            return Ok(self.z.clone());
        };

        Ok(self.z.mapv(|z| act_fn.f(z)))
    }

    /// Makes a backward pass, **adding** this layer's gradient into `grad`.
    ///
    /// # Arguments
    /// * `params` - This layer's parameters.
    /// * `grad` - This layer's slice of the gradient buffer.
    /// * `d` - The derivative of the loss with respect to this layer's output.
    ///
    /// # Returns
    /// The derivative of the loss with respect to this layer's input.
    pub fn backward(
        &mut self,
        params: &[f32],
        grad: &mut [f32],
        mut d: Array2<f32>,
    ) -> Result<Array2<f32>> {
        if d.nrows() != self.z.nrows() {
            return Err(MlErr::SizeMismatch {
                what: "dense delta rows",
                got: d.nrows(),
                expected: self.z.nrows(),
            });
        }
        if d.ncols() != self.z.ncols() {
            return Err(MlErr::SizeMismatch {
                what: "dense delta columns",
                got: d.ncols(),
                expected: self.z.ncols(),
            });
        }

        if let Some(act_fn) = &self.act_fn {
            d.zip_mut_with(&self.z, |d, &z| *d *= act_fn.df(z));
        }

        let (mut dw, mut db) = self.view_grad(grad)?;
        dw += &self.x.t().dot(&d);
        db += &d.sum_axis(Axis(0));

        let (w, _) = self.view_params(params)?;
        Ok(d.dot(&w.t()))
    }

    /// Gives a view of the raw gradient slice as the delta weights and delta biases of this layer.
    fn view_grad<'a>(
        &self,
        grad: &'a mut [f32],
    ) -> Result<(ArrayViewMut2<'a, f32>, ArrayViewMut1<'a, f32>)> {
        self.check_len("dense gradient", grad.len())?;

        let w_size = self.size - self.dim.1;
        let (dw_raw, db_raw) = grad.split_at_mut(w_size);
        let dw = ArrayViewMut2::from_shape(self.dim, dw_raw)?;
        let db = ArrayViewMut1::from_shape(self.dim.1, db_raw)?;
        Ok((dw, db))
    }

    /// Gives a view of the raw parameter slice as the weights and biases of this layer.
    fn view_params<'a>(
        &self,
        params: &'a [f32],
    ) -> Result<(ArrayView2<'a, f32>, ArrayView1<'a, f32>)> {
        self.check_len("dense parameters", params.len())?;

        let w_size = self.size - self.dim.1;
        let weights = ArrayView2::from_shape(self.dim, &params[..w_size])?;
        let biases = ArrayView1::from_shape(self.dim.1, &params[w_size..])?;
        Ok((weights, biases))
    }

    fn check_len(&self, what: &'static str, got: usize) -> Result<()> {
        if got != self.size {
            return Err(MlErr::SizeMismatch {
                what,
                got,
                expected: self.size,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn forward_without_activation() {
        let mut layer = Dense::new((2, 1), None);
        // w = [[1], [2]], b = [0.5]
        let params = [1., 2., 0.5];
        let x = array![[1., 1.], [2., 0.]];

        let out = layer.forward(&params, x.view()).unwrap();
        assert_eq!(out, array![[3.5], [2.5]]);
    }

    #[test]
    fn backward_accumulates_gradient() {
        let mut layer = Dense::new((2, 1), None);
        let params = [1., 2., 0.5];
        let x = array![[1., 3.]];
        let mut grad = [0.; 3];

        layer.forward(&params, x.view()).unwrap();
        let d_in = layer.backward(&params, &mut grad, array![[1.]]).unwrap();
        assert_eq!(grad, [1., 3., 1.]);
        assert_eq!(d_in, array![[1., 2.]]);

        layer.forward(&params, x.view()).unwrap();
        layer.backward(&params, &mut grad, array![[1.]]).unwrap();
        assert_eq!(grad, [2., 6., 2.]);
    }

    #[test]
    fn backward_reports_the_mismatched_axis() {
        let mut layer = Dense::new((2, 1), None);
        let params = [1., 2., 0.5];
        let x = array![[1., 3.], [2., 0.]];
        let mut grad = [0.; 3];

        layer.forward(&params, x.view()).unwrap();

        assert!(matches!(
            layer.backward(&params, &mut grad, array![[1.]]),
            Err(MlErr::SizeMismatch { what: "dense delta rows", got: 1, expected: 2 })
        ));
        assert!(matches!(
            layer.backward(&params, &mut grad, array![[1., 1.], [1., 1.]]),
            Err(MlErr::SizeMismatch { what: "dense delta columns", got: 2, expected: 1 })
        ));
        assert_eq!(grad, [0.; 3]);
    }

    #[test]
    fn wrong_input_width_fails() {
        let mut layer = Dense::new((3, 1), None);
        let params = [0.; 4];
        let x = array![[1., 1.]];

        assert!(matches!(
            layer.forward(&params, x.view()),
            Err(MlErr::SizeMismatch { got: 2, expected: 3, .. })
        ));
    }

    #[test]
    fn wrong_params_len_fails() {
        let mut layer = Dense::new((2, 2), Some(ActFn::relu()));
        let params = [0.; 3];
        let x = array![[1., 1.]];

        assert!(layer.forward(&params, x.view()).is_err());
    }
}
