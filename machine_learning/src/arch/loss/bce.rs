use ndarray::{Array2, ArrayView2, Zip};

use super::LossFn;

// Same bounds a standard BCE implementation uses to keep log(0) and 1 / 0 finite.
const LOG_FLOOR: f32 = -100.;
const EPS: f32 = 1e-12;

/// Binary cross-entropy loss, averaged over every element of the batch.
///
/// Expects predictions in `[0, 1]`, typically the output of a sigmoid.
#[derive(Default, Clone, Copy)]
pub struct BinaryCrossEntropy;

impl BinaryCrossEntropy {
    /// Returns a new `BinaryCrossEntropy`.
    pub fn new() -> Self {
        Self
    }
}

impl LossFn for BinaryCrossEntropy {
    fn loss(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> f32 {
        let n = y_pred.len().max(1) as f32;
        let mut total = 0.;

        Zip::from(&y_pred).and(&y).for_each(|&p, &t| {
            let log_p = p.ln().max(LOG_FLOOR);
            let log_q = (1. - p).ln().max(LOG_FLOOR);
            total -= t * log_p + (1. - t) * log_q;
        });

        total / n
    }

    fn loss_prime(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> Array2<f32> {
        let n = y_pred.len().max(1) as f32;

        Zip::from(&y_pred)
            .and(&y)
            .map_collect(|&p, &t| (p - t) / (p * (1. - p)).max(EPS) / n)
    }
}
