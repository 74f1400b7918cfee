use ndarray::{Array2, ArrayView2};
use rand::Rng;

use super::{Model, layers::Layer};
use crate::{MlErr, Result};

/// A sequential model: information flows forward when computing an output and backward when
/// computing the *deltas* of its layers.
///
/// The parameters of every layer live in a single flat buffer owned by the model, laid out in
/// layer order. The gradient buffer mirrors that layout.
#[derive(Debug, Clone)]
pub struct Sequential {
    layers: Vec<Layer>,
    params: Vec<f32>,
    grad: Vec<f32>,
}

impl Sequential {
    /// Creates a new `Sequential` with every parameter set to zero.
    ///
    /// # Arguments
    /// * `layers` - The layers the sequential is composed of.
    ///
    /// # Returns
    /// A new `Sequential` instance.
    pub fn new<I>(layers: I) -> Self
    where
        I: IntoIterator<Item = Layer>,
    {
        let layers: Vec<_> = layers.into_iter().collect();
        let size = layers.iter().map(Layer::size).sum();

        Self {
            layers,
            params: vec![0.; size],
            grad: vec![0.; size],
        }
    }

    /// Initializes every layer's parameters following the layer's `ParamGen`.
    ///
    /// # Arguments
    /// * `rng` - The random number generator to sample from.
    ///
    /// # Returns
    /// An error if some layer's distribution is invalid.
    pub fn init_params<R: Rng>(&mut self, rng: &mut R) -> Result<()> {
        let mut offset = 0;

        for layer in &self.layers {
            let size = layer.size();
            let (param_gen, fan_in) = layer.init();
            let sample = param_gen.sample(rng, size, fan_in)?;
            self.params[offset..offset + size].copy_from_slice(&sample);
            offset += size;
        }

        Ok(())
    }

    /// Replaces the model's parameters.
    ///
    /// # Returns
    /// An error if `params` doesn't have exactly `size()` elements.
    pub fn set_params(&mut self, params: &[f32]) -> Result<()> {
        if params.len() != self.params.len() {
            return Err(MlErr::SizeMismatch {
                what: "parameters",
                got: params.len(),
                expected: self.params.len(),
            });
        }

        self.params.copy_from_slice(params);
        Ok(())
    }

    pub fn params(&self) -> &[f32] {
        &self.params
    }

    pub fn grad(&self) -> &[f32] {
        &self.grad
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }
}

impl Model for Sequential {
    fn size(&self) -> usize {
        self.params.len()
    }

    fn forward(&mut self, x: ArrayView2<f32>) -> Result<Array2<f32>> {
        let Self { layers, params, .. } = self;
        let mut out = x.to_owned();
        let mut offset = 0;

        for layer in layers.iter_mut() {
            let size = layer.size();
            out = layer.forward(&params[offset..offset + size], out.view())?;
            offset += size;
        }

        Ok(out)
    }

    fn backward(&mut self, mut d: Array2<f32>) -> Result<()> {
        let Self {
            layers,
            params,
            grad,
        } = self;
        let mut end = params.len();

        for layer in layers.iter_mut().rev() {
            let start = end - layer.size();
            d = layer.backward(&params[start..end], &mut grad[start..end], d)?;
            end = start;
        }

        Ok(())
    }

    fn zero_grad(&mut self) {
        self.grad.fill(0.);
    }

    fn params_and_grad(&mut self) -> (&mut [f32], &[f32]) {
        (&mut self.params, &self.grad)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::{ParamGen, activations::ActFn, layers::Dense};
    use ndarray::array;
    use rand::{SeedableRng, rngs::StdRng};

    fn model() -> Sequential {
        Sequential::new([
            Layer::dense((2, 3), Some(ActFn::relu())),
            Layer::dense((3, 1), Some(ActFn::sigmoid())),
        ])
    }

    #[test]
    fn size_is_the_sum_of_the_layers() {
        let model = model();

        assert_eq!(model.size(), (2 + 1) * 3 + (3 + 1));
        assert_eq!(model.params().len(), model.size());
        assert_eq!(model.grad().len(), model.size());
        assert_eq!(model.layers().len(), 2);
    }

    #[test]
    fn zero_params_give_half() {
        let mut model = model();
        let out = model.forward(array![[1., -1.], [3., 2.]].view()).unwrap();

        assert_eq!(out, array![[0.5], [0.5]]);
    }

    #[test]
    fn init_follows_each_layer_param_gen() {
        let mut model = Sequential::new([
            Layer::Dense(Dense::new((1, 1), None).with_init(ParamGen::Const { value: 2. })),
            Layer::Dense(Dense::new((1, 1), None).with_init(ParamGen::Const { value: -1. })),
        ]);
        let mut rng = StdRng::seed_from_u64(0);

        model.init_params(&mut rng).unwrap();
        assert_eq!(model.params(), [2., 2., -1., -1.]);
    }

    #[test]
    fn set_params_checks_the_length() {
        let mut model = model();

        assert!(model.set_params(&[0.; 3]).is_err());
        assert!(model.set_params(&vec![1.; model.size()]).is_ok());
        assert!(model.params().iter().all(|&p| p == 1.));
    }

    #[test]
    fn backward_before_forward_fails() {
        let mut model = model();

        assert!(model.backward(array![[1.]]).is_err());
    }

    #[test]
    fn zero_grad_clears_the_gradient() {
        let mut model = model();
        model.set_params(&vec![0.1; model.size()]).unwrap();

        model.forward(array![[1., 2.]].view()).unwrap();
        model.backward(array![[1.]]).unwrap();
        assert!(model.grad().iter().any(|&g| g != 0.));

        model.zero_grad();
        assert!(model.grad().iter().all(|&g| g == 0.));
    }
}
