use log::trace;
use ndarray::prelude::*;

use crate::{
    MlErr, Result,
    arch::activations::ActFn,
    ops,
    params::{ParamStore, VarId},
};

struct Cache {
    input_dim: (usize, usize, usize, usize),
    cols: Array2<f32>,
    xhat: Array4<f32>,
    inv_std: Array1<f32>,
    z: Array4<f32>,
}

/// Convolution, batch normalization, bias and ReLU.
///
/// The convolution has no bias of its own, batch normalization would cancel it out.
pub struct ConvBlock {
    name: String,
    weights: VarId,
    biases: VarId,
    stride: usize,
    eps: f32,
    act_fn: ActFn,

    cache: Option<Cache>,
}

impl ConvBlock {
    /// Creates a new `ConvBlock`.
    ///
    /// # Arguments
    /// * `name` - The scope of the block.
    /// * `weights` - The kernel, `[kh, kw, in, filters]`.
    /// * `biases` - The bias, one per filter.
    /// * `stride` - The stride of the convolution.
    /// * `eps` - The batch normalization epsilon.
    pub fn new(name: String, weights: VarId, biases: VarId, stride: usize, eps: f32) -> Self {
        Self {
            name,
            weights,
            biases,
            stride,
            eps,
            act_fn: ActFn::relu(),
            cache: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn forward(&mut self, store: &ParamStore, x: ArrayD<f32>) -> Result<ArrayD<f32>> {
        let x = x.into_dimensionality::<Ix4>()?;
        let kernel = store.value::<Ix4>(self.weights)?;
        let b = store.value::<Ix1>(self.biases)?;

        let (conv, cols) = ops::conv2d(x.view(), kernel, self.stride)?;
        let (xhat, inv_std) = ops::batch_norm(conv.view(), self.eps)?;

        let z = &xhat + &b;
        let act_fn = self.act_fn;
        let a = z.mapv(|z| act_fn.f(z));

        trace!("{}: activation sparsity {:.3}", self.name, ops::zero_fraction(&a));

        self.cache = Some(Cache {
            input_dim: x.dim(),
            cols,
            xhat,
            inv_std,
            z,
        });

        Ok(a.into_dyn())
    }

    pub fn backward(&mut self, store: &mut ParamStore, d: ArrayD<f32>) -> Result<ArrayD<f32>> {
        let Cache {
            input_dim,
            cols,
            xhat,
            inv_std,
            z,
        } = self.cache.take().ok_or(MlErr::MissingForward("conv block"))?;

        let mut d = d.into_dimensionality::<Ix4>()?;
        if d.dim() != z.dim() {
            return Err(MlErr::ShapeMismatch {
                what: format!("{} output gradient", self.name),
                got: d.shape().to_vec(),
                expected: z.shape().to_vec(),
            });
        }

        let act_fn = self.act_fn;
        d.zip_mut_with(&z, |d, &z| *d *= act_fn.df(z));

        let (n, h, w, c) = d.dim();
        let db = d.to_shape((n * h * w, c))?.sum_axis(Axis(0));
        let mut dbiases = store.grad_mut::<Ix1>(self.biases)?;
        dbiases += &db;

        let dconv = ops::batch_norm_backward(d.view(), xhat.view(), inv_std.view())?;

        let (kernel, dkernel) = store.value_and_grad_mut::<Ix4>(self.weights)?;
        let dx = ops::conv2d_backward(
            dconv.view(),
            cols.view(),
            kernel,
            input_dim,
            self.stride,
            dkernel,
        )?;

        Ok(dx.into_dyn())
    }
}
