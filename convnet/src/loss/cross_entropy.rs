use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

use super::LossFn;
use crate::{MlErr, Result};

/// The index of the first maximum of every row, once its scores are truncated to integers.
///
/// A row of fractional scores such as `[0.3, 0.7]` truncates to all zeros and so maps to
/// class 0.
pub fn argmax_rows(scores: ArrayView2<f32>) -> Vec<usize> {
    scores
        .outer_iter()
        .map(|row| {
            row.iter()
                .map(|v| v.trunc())
                .enumerate()
                .fold((0, f32::NEG_INFINITY), |(best, max), (i, v)| {
                    if v > max { (i, v) } else { (best, max) }
                })
                .0
        })
        .collect()
}

fn log_sum_exp(row: ArrayView1<f32>) -> f32 {
    let max = row.fold(f32::NEG_INFINITY, |m, &v| m.max(v));
    if !max.is_finite() {
        return max;
    }

    max + row.fold(0., |acc, &v| acc + (v - max).exp()).ln()
}

/// Softmax cross-entropy against integer class labels, averaged over the batch.
///
/// The labels are given as one row per example (usually one-hot). Each row is truncated to
/// integers and the class of the example is the index of its first maximum.
#[derive(Debug, Default, Clone, Copy)]
pub struct SparseSoftmaxCrossEntropy;

impl SparseSoftmaxCrossEntropy {
    /// Returns a new `SparseSoftmaxCrossEntropy`.
    pub fn new() -> Self {
        Self
    }

    fn check(&self, logits: ArrayView2<f32>, labels: ArrayView2<f32>) -> Result<()> {
        if logits.dim() != labels.dim() {
            return Err(MlErr::ShapeMismatch {
                what: "labels".into(),
                got: labels.shape().to_vec(),
                expected: logits.shape().to_vec(),
            });
        }

        if logits.is_empty() {
            return Err(MlErr::SizeMismatch {
                what: "cross entropy batch size",
                got: 0,
                expected: 1,
            });
        }

        Ok(())
    }

    /// The loss of every example of the batch.
    pub fn per_example(&self, logits: ArrayView2<f32>, labels: ArrayView2<f32>) -> Result<Array1<f32>> {
        self.check(logits, labels)?;
        let classes = argmax_rows(labels);

        let losses = logits
            .outer_iter()
            .zip(classes)
            .map(|(row, class)| log_sum_exp(row) - row[class])
            .collect();

        Ok(losses)
    }
}

impl LossFn for SparseSoftmaxCrossEntropy {
    fn loss(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> Result<f32> {
        let losses = self.per_example(y_pred, y)?;
        Ok(losses.sum() / losses.len() as f32)
    }

    fn loss_prime(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> Result<Array2<f32>> {
        self.check(y_pred, y)?;
        let classes = argmax_rows(y);
        let batch = y_pred.nrows() as f32;

        let mut d = y_pred.to_owned();
        for (mut row, class) in d.outer_iter_mut().zip(classes) {
            let lse = log_sum_exp(row.view());
            row.mapv_inplace(|z| (z - lse).exp() / batch);
            row[class] -= 1. / batch;
        }

        Ok(d)
    }
}
