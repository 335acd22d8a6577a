use ndarray::{Array2, Array4, ArrayView2, ArrayView4, ArrayViewMut4, linalg, s};

use crate::{MlErr, Result};

/// Output spatial size of a VALID window sweep.
///
/// # Returns
/// `None` if the window does not fit in the input or the stride is zero.
pub fn valid_size(input: usize, window: usize, stride: usize) -> Option<usize> {
    if stride == 0 || window == 0 || window > input {
        return None;
    }

    Some((input - window) / stride + 1)
}

fn output_dims(
    (h, w): (usize, usize),
    (kh, kw): (usize, usize),
    stride: usize,
) -> Result<(usize, usize)> {
    let fit = |what, input, window| {
        valid_size(input, window, stride).ok_or_else(|| {
            MlErr::InvalidConfig(format!(
                "a kernel {what} of {window} with stride {stride} does not fit an input {what} of {input}"
            ))
        })
    };

    Ok((fit("height", h, kh)?, fit("width", w, kw)?))
}

/// 2D convolution with VALID padding over NHWC inputs.
///
/// The patches are unrolled into a `[n * oh * ow, kh * kw * c]` matrix so the convolution is a
/// single matrix product with the `[kh * kw * c, filters]` view of the kernel.
///
/// # Arguments
/// * `x` - The input, `[n, h, w, c]`.
/// * `kernel` - The kernel, `[kh, kw, c, filters]`.
/// * `stride` - The step between two windows along both spatial axes.
///
/// # Returns
/// The output `[n, oh, ow, filters]` and the unrolled patches, needed by the backward pass.
pub fn conv2d(
    x: ArrayView4<f32>,
    kernel: ArrayView4<f32>,
    stride: usize,
) -> Result<(Array4<f32>, Array2<f32>)> {
    let (n, h, w, c) = x.dim();
    let (kh, kw, kc, filters) = kernel.dim();

    if c != kc {
        return Err(MlErr::SizeMismatch {
            what: "convolution input channels",
            got: c,
            expected: kc,
        });
    }

    let (oh, ow) = output_dims((h, w), (kh, kw), stride)?;
    let k = kh * kw * c;

    let mut cols = Array4::zeros((n, oh, ow, k));

    for ky in 0..kh {
        for kx in 0..kw {
            let off = (ky * kw + kx) * c;
            let patch = x.slice(s![
                ..,
                ky..ky + (oh - 1) * stride + 1;stride,
                kx..kx + (ow - 1) * stride + 1;stride,
                ..
            ]);

            cols.slice_mut(s![.., .., .., off..off + c]).assign(&patch);
        }
    }

    let cols = cols.into_shape_with_order((n * oh * ow, k))?;
    let kernel = kernel.to_shape((k, filters))?;
    let out = cols.dot(&kernel).into_shape_with_order((n, oh, ow, filters))?;

    Ok((out, cols))
}

/// Backward pass of `conv2d`.
///
/// # Arguments
/// * `d` - The gradient with respect to the output, `[n, oh, ow, filters]`.
/// * `cols` - The unrolled patches returned by the forward pass.
/// * `kernel` - The kernel used in the forward pass.
/// * `input_dim` - The shape of the forward pass input.
/// * `stride` - The stride used in the forward pass.
/// * `dkernel` - Where the kernel gradient gets **accumulated**.
///
/// # Returns
/// The gradient with respect to the input.
pub fn conv2d_backward(
    d: ArrayView4<f32>,
    cols: ArrayView2<f32>,
    kernel: ArrayView4<f32>,
    input_dim: (usize, usize, usize, usize),
    stride: usize,
    dkernel: ArrayViewMut4<f32>,
) -> Result<Array4<f32>> {
    let (n, h, w, c) = input_dim;
    let (kh, kw, _, filters) = kernel.dim();
    let (_, oh, ow, _) = d.dim();
    let k = kh * kw * c;

    if cols.dim() != (n * oh * ow, k) {
        return Err(MlErr::ShapeMismatch {
            what: "convolution patches".into(),
            got: cols.shape().to_vec(),
            expected: vec![n * oh * ow, k],
        });
    }

    let d = d.to_shape((n * oh * ow, filters))?;
    let kernel = kernel.to_shape((k, filters))?;

    let mut dkernel = dkernel.into_shape_with_order((k, filters))?;
    linalg::general_mat_mul(1.0, &cols.t(), &d, 1.0, &mut dkernel);

    let dcols = d
        .dot(&kernel.t())
        .into_shape_with_order((n, oh, ow, k))?;
    let mut dx = Array4::zeros((n, h, w, c));

    for ky in 0..kh {
        for kx in 0..kw {
            let off = (ky * kw + kx) * c;
            let mut window = dx.slice_mut(s![
                ..,
                ky..ky + (oh - 1) * stride + 1;stride,
                kx..kx + (ow - 1) * stride + 1;stride,
                ..
            ]);

            window += &dcols.slice(s![.., .., .., off..off + c]);
        }
    }

    Ok(dx)
}

#[cfg(test)]
mod tests {
    use ndarray::{Array, Zip};
    use ndarray_rand::RandomExt;
    use rand::{SeedableRng, rngs::StdRng};
    use rand_distr::StandardNormal;

    use super::*;

    fn naive_conv2d(x: ArrayView4<f32>, kernel: ArrayView4<f32>, stride: usize) -> Array4<f32> {
        let (n, h, w, c) = x.dim();
        let (kh, kw, _, filters) = kernel.dim();
        let (oh, ow) = ((h - kh) / stride + 1, (w - kw) / stride + 1);

        Array4::from_shape_fn((n, oh, ow, filters), |(b, i, j, f)| {
            let mut acc = 0.;
            for ky in 0..kh {
                for kx in 0..kw {
                    for ci in 0..c {
                        acc += x[[b, i * stride + ky, j * stride + kx, ci]]
                            * kernel[[ky, kx, ci, f]];
                    }
                }
            }
            acc
        })
    }

    fn assert_close(a: &Array4<f32>, b: &Array4<f32>, tol: f32) {
        assert_eq!(a.dim(), b.dim());
        Zip::from(a).and(b).for_each(|&a, &b| {
            assert!((a - b).abs() <= tol, "{a} != {b}");
        });
    }

    #[test]
    fn matches_naive_convolution() {
        let mut rng = StdRng::seed_from_u64(3);

        for stride in [1, 2] {
            let x = Array::random_using((2, 7, 6, 3), StandardNormal, &mut rng);
            let kernel = Array::random_using((3, 2, 3, 4), StandardNormal, &mut rng);

            let (out, cols) = conv2d(x.view(), kernel.view(), stride).unwrap();
            let expected = naive_conv2d(x.view(), kernel.view(), stride);

            assert_close(&out, &expected, 1e-4);
            assert_eq!(cols.nrows(), out.len() / 4);
        }
    }

    #[test]
    fn channel_mismatch_is_an_error() {
        let x = Array4::<f32>::zeros((1, 5, 5, 2));
        let kernel = Array4::<f32>::zeros((3, 3, 1, 4));

        assert!(matches!(
            conv2d(x.view(), kernel.view(), 1),
            Err(MlErr::SizeMismatch { got: 2, expected: 1, .. })
        ));
    }

    #[test]
    fn kernel_larger_than_input_is_an_error() {
        let x = Array4::<f32>::zeros((1, 2, 2, 1));
        let kernel = Array4::<f32>::zeros((3, 3, 1, 1));

        assert!(matches!(
            conv2d(x.view(), kernel.view(), 1),
            Err(MlErr::InvalidConfig(_))
        ));
    }

    // The convolution is bilinear, so central differences recover the gradients up to rounding.
    #[test]
    fn gradients_match_finite_differences() {
        const EPS: f32 = 1e-2;
        const STRIDE: usize = 2;

        let mut rng = StdRng::seed_from_u64(11);
        let x = Array::random_using((2, 5, 5, 2), StandardNormal, &mut rng);
        let kernel = Array::random_using((2, 2, 2, 3), StandardNormal, &mut rng);
        let (out, cols) = conv2d(x.view(), kernel.view(), STRIDE).unwrap();
        let r = Array::random_using(out.dim(), StandardNormal, &mut rng);

        let objective = |x: &Array4<f32>, kernel: &Array4<f32>| {
            let (out, _) = conv2d(x.view(), kernel.view(), STRIDE).unwrap();
            (&out * &r).sum()
        };

        let mut dkernel = Array4::zeros(kernel.dim());
        let dx = conv2d_backward(
            r.view(),
            cols.view(),
            kernel.view(),
            x.dim(),
            STRIDE,
            dkernel.view_mut(),
        )
        .unwrap();

        for (idx, &g) in dx.indexed_iter() {
            let (mut plus, mut minus) = (x.clone(), x.clone());
            plus[idx] += EPS;
            minus[idx] -= EPS;

            let numeric = (objective(&plus, &kernel) - objective(&minus, &kernel)) / (2. * EPS);
            assert!((numeric - g).abs() < 1e-2, "dx{idx:?}: {numeric} != {g}");
        }

        for (idx, &g) in dkernel.indexed_iter() {
            let (mut plus, mut minus) = (kernel.clone(), kernel.clone());
            plus[idx] += EPS;
            minus[idx] -= EPS;

            let numeric = (objective(&x, &plus) - objective(&x, &minus)) / (2. * EPS);
            assert!((numeric - g).abs() < 1e-2, "dkernel{idx:?}: {numeric} != {g}");
        }
    }

    #[test]
    fn kernel_gradient_accumulates() {
        let mut rng = StdRng::seed_from_u64(5);
        let x = Array::random_using((1, 4, 4, 1), StandardNormal, &mut rng);
        let kernel = Array::random_using((2, 2, 1, 1), StandardNormal, &mut rng);
        let (out, cols) = conv2d(x.view(), kernel.view(), 1).unwrap();
        let d = Array4::ones(out.dim());

        let mut once = Array4::zeros(kernel.dim());
        conv2d_backward(d.view(), cols.view(), kernel.view(), x.dim(), 1, once.view_mut()).unwrap();

        let mut twice = once.clone();
        conv2d_backward(d.view(), cols.view(), kernel.view(), x.dim(), 1, twice.view_mut()).unwrap();

        assert_close(&twice, &(&once * 2.), 1e-5);
    }
}
