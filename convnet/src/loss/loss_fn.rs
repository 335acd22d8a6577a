use ndarray::{Array2, ArrayView2};

use crate::Result;

/// A loss over a batch of predictions.
pub trait LossFn {
    /// The loss of `y_pred` given the expected `y`.
    fn loss(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> Result<f32>;

    /// The gradient of `loss` with respect to `y_pred`.
    fn loss_prime(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> Result<Array2<f32>>;
}
