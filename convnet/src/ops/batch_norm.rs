use ndarray::{Array1, Array4, ArrayView1, ArrayView4, Axis};

use crate::{MlErr, Result};

/// Batch normalization without learned scale nor offset.
///
/// The moments are taken per channel over the batch and both spatial axes, the variance is the
/// population (biased) one.
///
/// # Arguments
/// * `z` - The input, `[n, h, w, c]`.
/// * `eps` - Added to the variance before taking its square root.
///
/// # Returns
/// The normalized input and the per channel `1 / sqrt(var + eps)`.
pub fn batch_norm(z: ArrayView4<f32>, eps: f32) -> Result<(Array4<f32>, Array1<f32>)> {
    let dim = z.dim();
    let c = dim.3;
    let m = dim.0 * dim.1 * dim.2;

    if m == 0 {
        return Err(MlErr::SizeMismatch {
            what: "batch normalization elements per channel",
            got: 0,
            expected: 1,
        });
    }

    let z = z.to_shape((m, c))?;
    let mean = z.sum_axis(Axis(0)) / m as f32;
    let var = z.var_axis(Axis(0), 0.);
    let inv_std = var.mapv(|v| 1. / (v + eps).sqrt());

    let xhat = ((&z - &mean) * &inv_std).into_shape_with_order(dim)?;
    Ok((xhat, inv_std))
}

/// Backward pass of `batch_norm`, differentiating through the batch moments.
///
/// # Arguments
/// * `d` - The gradient with respect to the normalized output.
/// * `xhat` - The normalized output of the forward pass.
/// * `inv_std` - The per channel `1 / sqrt(var + eps)` of the forward pass.
///
/// # Returns
/// The gradient with respect to the input.
pub fn batch_norm_backward(
    d: ArrayView4<f32>,
    xhat: ArrayView4<f32>,
    inv_std: ArrayView1<f32>,
) -> Result<Array4<f32>> {
    if d.dim() != xhat.dim() {
        return Err(MlErr::ShapeMismatch {
            what: "batch normalization gradient".into(),
            got: d.shape().to_vec(),
            expected: xhat.shape().to_vec(),
        });
    }

    let dim = d.dim();
    let c = dim.3;
    let m = dim.0 * dim.1 * dim.2;

    let d = d.to_shape((m, c))?;
    let xhat = xhat.to_shape((m, c))?;

    let sum_d = d.sum_axis(Axis(0));
    let sum_d_xhat = (&d * &xhat).sum_axis(Axis(0));
    let scale = &inv_std / m as f32;

    let dz = (&d * m as f32 - &sum_d - &xhat * &sum_d_xhat) * &scale;
    Ok(dz.into_shape_with_order(dim)?)
}
