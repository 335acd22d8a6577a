use log::trace;
use ndarray::{linalg, prelude::*};

use crate::{
    MlErr, Result,
    arch::activations::ActFn,
    ops,
    params::{ParamStore, VarId},
};

struct Cache {
    input_shape: Vec<usize>,
    x: Array2<f32>,
    z: Array2<f32>,
}

/// A fully connected layer, `x * w + b` followed by an optional activation.
///
/// Inputs of any rank are flattened to `[batch, features]`, the gradient flowing out of
/// `backward` takes the original shape back.
pub struct Dense {
    name: String,
    weights: VarId,
    biases: VarId,
    act_fn: Option<ActFn>,

    cache: Option<Cache>,
}

impl Dense {
    /// Creates a new `Dense`.
    ///
    /// # Arguments
    /// * `name` - The scope of the layer.
    /// * `weights` - The weight matrix, `[fan_in, units]`.
    /// * `biases` - The bias, one per unit.
    /// * `act_fn` - The activation applied to the output, if any.
    pub fn new(name: String, weights: VarId, biases: VarId, act_fn: Option<ActFn>) -> Self {
        Self {
            name,
            weights,
            biases,
            act_fn,
            cache: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn forward(&mut self, store: &ParamStore, x: ArrayD<f32>) -> Result<ArrayD<f32>> {
        let w = store.value::<Ix2>(self.weights)?;
        let b = store.value::<Ix1>(self.biases)?;

        let input_shape = x.shape().to_vec();
        let batch = input_shape.first().copied().unwrap_or(0);
        let features = x.len().checked_div(batch).unwrap_or(0);

        if features != w.nrows() {
            return Err(MlErr::SizeMismatch {
                what: "dense layer input features",
                got: features,
                expected: w.nrows(),
            });
        }

        let x = x.to_shape((batch, features))?.into_owned();
        let z = x.dot(&w) + &b;

        let out = match self.act_fn {
            Some(act_fn) => {
                let a = z.mapv(|z| act_fn.f(z));
                trace!("{}: activation sparsity {:.3}", self.name, ops::zero_fraction(&a));
                a
            }
            None => z.clone(),
        };

        self.cache = Some(Cache { input_shape, x, z });
        Ok(out.into_dyn())
    }

    pub fn backward(&mut self, store: &mut ParamStore, d: ArrayD<f32>) -> Result<ArrayD<f32>> {
        let Cache { input_shape, x, z } = self
            .cache
            .take()
            .ok_or(MlErr::MissingForward("dense layer"))?;

        let mut d = d.into_dimensionality::<Ix2>()?;
        if d.dim() != z.dim() {
            return Err(MlErr::ShapeMismatch {
                what: format!("{} output gradient", self.name),
                got: d.shape().to_vec(),
                expected: z.shape().to_vec(),
            });
        }

        if let Some(act_fn) = self.act_fn {
            d.zip_mut_with(&z, |d, &z| *d *= act_fn.df(z));
        }

        let mut db = store.grad_mut::<Ix1>(self.biases)?;
        db += &d.sum_axis(Axis(0));

        let (w, mut dw) = store.value_and_grad_mut::<Ix2>(self.weights)?;
        linalg::general_mat_mul(1.0, &x.t(), &d, 1.0, &mut dw);

        let dx = d.dot(&w.t());
        Ok(dx.into_shape_with_order(IxDyn(&input_shape))?)
    }
}
