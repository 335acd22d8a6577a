use ndarray::ArrayView2;

use crate::{MlErr, Result};

/// Whether the target class of every example is among its `k` largest predictions.
///
/// Classes tied with the `k`-th largest prediction all count as being in the top `k`, and an
/// example whose target prediction is not finite is never correct.
///
/// # Arguments
/// * `predictions` - The scores, `[batch, classes]`.
/// * `targets` - The class of every example.
/// * `k` - The amount of top predictions to look at.
pub fn in_top_k(predictions: ArrayView2<f32>, targets: &[usize], k: usize) -> Result<Vec<bool>> {
    if predictions.nrows() != targets.len() {
        return Err(MlErr::SizeMismatch {
            what: "top k targets",
            got: targets.len(),
            expected: predictions.nrows(),
        });
    }

    let classes = predictions.ncols();
    if let Some(&target) = targets.iter().find(|&&t| t >= classes) {
        return Err(MlErr::SizeMismatch {
            what: "top k target class",
            got: target,
            expected: classes,
        });
    }

    let hits = predictions
        .outer_iter()
        .zip(targets)
        .map(|(row, &target)| {
            let score = row[target];
            score.is_finite() && row.iter().filter(|&&v| v > score).count() < k
        })
        .collect();

    Ok(hits)
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn top_one_and_two() {
        let predictions = array![[0.1, 0.7, 0.2], [0.5, 0.3, 0.2]];

        assert_eq!(in_top_k(predictions.view(), &[1, 1], 1).unwrap(), [true, false]);
        assert_eq!(in_top_k(predictions.view(), &[1, 1], 2).unwrap(), [true, true]);
    }

    #[test]
    fn ties_count_as_hits() {
        let predictions = array![[0.5, 0.5, 0.]];
        assert_eq!(in_top_k(predictions.view(), &[1], 1).unwrap(), [true]);
    }

    #[test]
    fn non_finite_targets_miss() {
        let predictions = array![[f32::NAN, 0.]];
        assert_eq!(in_top_k(predictions.view(), &[0], 2).unwrap(), [false]);
    }

    #[test]
    fn out_of_range_target_is_an_error() {
        let predictions = array![[0., 1.]];
        assert!(in_top_k(predictions.view(), &[2], 1).is_err());
    }
}
