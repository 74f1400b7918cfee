use log::debug;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use ndarray_rand::{RandomExt, rand_distr::StandardNormal};
use rand::Rng;

/// The amount of rows of the synthetic dataset.
pub const N_SAMPLES: usize = 100;

/// The amount of features per row of the synthetic dataset.
pub const N_FEATURES: usize = 10;

/// An in-memory supervised dataset: a feature matrix and one binary label per row.
#[derive(Debug, Clone)]
pub struct Dataset {
    x: Array2<f32>,
    y: Array1<f32>,
}

impl Dataset {
    /// Creates a new `Dataset`.
    ///
    /// # Panics
    /// If the amount of rows in `x` doesn't match the length of `y`.
    pub fn new(x: Array2<f32>, y: Array1<f32>) -> Self {
        assert_eq!(x.nrows(), y.len(), "x and y must have the same amount of rows");
        Self { x, y }
    }

    pub fn len(&self) -> usize {
        self.y.len()
    }

    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }

    pub fn n_features(&self) -> usize {
        self.x.ncols()
    }

    pub fn x(&self) -> ArrayView2<'_, f32> {
        self.x.view()
    }

    pub fn y(&self) -> ArrayView1<'_, f32> {
        self.y.view()
    }

    /// Returns the labels as a `(len, 1)` column, the shape the model outputs.
    pub fn y_column(&self) -> ArrayView2<'_, f32> {
        self.y.view().insert_axis(Axis(1))
    }
}

/// Generates the synthetic dataset.
///
/// Features are drawn from a standard normal distribution and the label of each row is
/// `1.0` when its first feature is positive, `0.0` otherwise.
///
/// # Arguments
/// * `data_path` - Where a real dataset would be read from, currently unused.
/// * `rng` - The stream to draw the features from.
///
/// # Returns
/// A `(N_SAMPLES, N_FEATURES)` dataset.
pub fn load_data<R: Rng>(data_path: &str, rng: &mut R) -> Dataset {
    debug!("generating synthetic data, ignoring data path {data_path:?}");

    let x: Array2<f32> = Array2::random_using((N_SAMPLES, N_FEATURES), StandardNormal, rng);
    let y = x
        .column(0)
        .mapv(|first| if first > 0. { 1. } else { 0. });

    Dataset::new(x, y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed::Seeds;

    #[test]
    fn shapes() {
        let data = load_data("data/raw", Seeds::new(42).array());

        assert_eq!(data.x().dim(), (N_SAMPLES, N_FEATURES));
        assert_eq!(data.y().dim(), N_SAMPLES);
        assert_eq!(data.y_column().dim(), (N_SAMPLES, 1));
        assert_eq!(data.n_features(), N_FEATURES);
        assert!(!data.is_empty());
    }

    #[test]
    fn features_are_finite_and_labels_binary() {
        let data = load_data("", Seeds::new(3).array());

        assert!(data.x().iter().all(|v| v.is_finite()));
        for (row, &label) in data.x().rows().into_iter().zip(data.y()) {
            let expected = if row[0] > 0. { 1. } else { 0. };
            assert_eq!(label, expected);
        }
    }

    #[test]
    fn deterministic_given_seed() {
        let a = load_data("", Seeds::new(42).array());
        let b = load_data("", Seeds::new(42).array());

        assert_eq!(a.x(), b.x());
        assert_eq!(a.y(), b.y());
    }

    #[test]
    #[should_panic]
    fn mismatched_rows_panic() {
        Dataset::new(Array2::zeros((3, 2)), Array1::zeros(2));
    }
}
