use ndarray::{ArrayBase, Data, Dimension};

/// Rectified linear unit.
#[inline]
pub fn relu(x: f32) -> f32 {
    x.max(0.)
}

/// Derivative of `relu`, which reads the same on its input and on its output.
#[inline]
pub fn relu_prime(a: f32) -> f32 {
    if a > 0. { 1. } else { 0. }
}

/// The fraction of zeros in `x`, a measure of the sparsity of an activation.
pub fn zero_fraction<S, D>(x: &ArrayBase<S, D>) -> f32
where
    S: Data<Elem = f32>,
    D: Dimension,
{
    if x.is_empty() {
        return 0.;
    }

    let zeros = x.iter().filter(|&&v| v == 0.).count();
    zeros as f32 / x.len() as f32
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn relu_clamps_negatives() {
        assert_eq!(relu(-2.), 0.);
        assert_eq!(relu(0.5), 0.5);
        assert_eq!(relu_prime(relu(-2.)), 0.);
        assert_eq!(relu_prime(relu(0.5)), 1.);
    }

    #[test]
    fn sparsity() {
        let a = array![[0., 1.], [0., 0.]];
        assert_eq!(zero_fraction(&a), 0.75);
    }
}
