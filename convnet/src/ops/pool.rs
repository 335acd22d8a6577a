use ndarray::{Array4, ArrayView4, s};

use super::conv::valid_size;
use crate::{MlErr, Result};

fn output_dims(h: usize, w: usize, size: usize, stride: usize) -> Result<(usize, usize)> {
    match (valid_size(h, size, stride), valid_size(w, size, stride)) {
        (Some(oh), Some(ow)) => Ok((oh, ow)),
        _ => Err(MlErr::InvalidConfig(format!(
            "a {size}x{size} pooling window with stride {stride} does not fit a {h}x{w} input"
        ))),
    }
}

/// Average pooling over VALID `size x size` windows of NHWC inputs.
///
/// # Returns
/// The pooled input, `[n, oh, ow, c]`.
pub fn avg_pool(x: ArrayView4<f32>, size: usize, stride: usize) -> Result<Array4<f32>> {
    let (n, h, w, c) = x.dim();
    let (oh, ow) = output_dims(h, w, size, stride)?;

    let mut out = Array4::zeros((n, oh, ow, c));

    for ky in 0..size {
        for kx in 0..size {
            out += &x.slice(s![
                ..,
                ky..ky + (oh - 1) * stride + 1;stride,
                kx..kx + (ow - 1) * stride + 1;stride,
                ..
            ]);
        }
    }

    let scale = 1. / (size * size) as f32;
    out.mapv_inplace(|v| v * scale);
    Ok(out)
}

/// Backward pass of `avg_pool`: every input element of a window receives an equal share of the
/// window's gradient.
///
/// # Arguments
/// * `d` - The gradient with respect to the pooled output.
/// * `input_dim` - The shape of the forward pass input.
/// * `size`, `stride` - The window used in the forward pass.
pub fn avg_pool_backward(
    d: ArrayView4<f32>,
    input_dim: (usize, usize, usize, usize),
    size: usize,
    stride: usize,
) -> Result<Array4<f32>> {
    let (n, h, w, c) = input_dim;
    let (oh, ow) = output_dims(h, w, size, stride)?;

    if d.dim() != (n, oh, ow, c) {
        return Err(MlErr::ShapeMismatch {
            what: "average pooling gradient".into(),
            got: d.shape().to_vec(),
            expected: vec![n, oh, ow, c],
        });
    }

    let share = &d * (1. / (size * size) as f32);
    let mut dx = Array4::zeros(input_dim);

    for ky in 0..size {
        for kx in 0..size {
            let mut window = dx.slice_mut(s![
                ..,
                ky..ky + (oh - 1) * stride + 1;stride,
                kx..kx + (ow - 1) * stride + 1;stride,
                ..
            ]);

            window += &share;
        }
    }

    Ok(dx)
}

#[cfg(test)]
mod tests {
    use ndarray::Array;

    use super::*;

    #[test]
    fn averages_non_overlapping_windows() {
        // A single 4x4 channel holding 0..16 row by row.
        let x = Array::from_iter((0..16).map(|v| v as f32))
            .into_shape_with_order((1, 4, 4, 1))
            .unwrap();

        let out = avg_pool(x.view(), 2, 2).unwrap();

        assert_eq!(out.dim(), (1, 2, 2, 1));
        assert_eq!(out.iter().copied().collect::<Vec<_>>(), [2.5, 4.5, 10.5, 12.5]);
    }

    #[test]
    fn odd_sizes_drop_the_last_row_and_column() {
        let x = Array4::<f32>::ones((2, 5, 5, 3));
        let out = avg_pool(x.view(), 2, 2).unwrap();

        assert_eq!(out.dim(), (2, 2, 2, 3));
        assert!(out.iter().all(|&v| (v - 1.).abs() < 1e-6));
    }

    #[test]
    fn window_larger_than_input_is_an_error() {
        let x = Array4::<f32>::ones((1, 1, 1, 1));
        assert!(avg_pool(x.view(), 2, 2).is_err());
    }

    #[test]
    fn backward_spreads_the_gradient_evenly() {
        let d = Array4::from_elem((1, 2, 2, 1), 4.);
        let dx = avg_pool_backward(d.view(), (1, 5, 5, 1), 2, 2).unwrap();

        // The last row and column were never pooled.
        for ((_, i, j, _), &g) in dx.indexed_iter() {
            let expected = if i < 4 && j < 4 { 1. } else { 0. };
            assert_eq!(g, expected);
        }
    }

    #[test]
    fn overlapping_windows_accumulate() {
        let d = Array4::from_elem((1, 2, 2, 1), 1.);
        let dx = avg_pool_backward(d.view(), (1, 3, 3, 1), 2, 1).unwrap();

        assert_eq!(dx[[0, 1, 1, 0]], 1.);
        assert_eq!(dx[[0, 0, 0, 0]], 0.25);
    }
}
