use ndarray::prelude::*;

use crate::{MlErr, Result, ops};

/// Average pooling over VALID windows, holds no variables.
pub struct AvgPool {
    name: String,
    size: usize,
    stride: usize,

    input_dim: Option<(usize, usize, usize, usize)>,
}

impl AvgPool {
    /// Creates a new `AvgPool`.
    ///
    /// # Arguments
    /// * `name` - The scope of the layer.
    /// * `size` - The side of the square window.
    /// * `stride` - The step between two windows.
    pub fn new(name: String, size: usize, stride: usize) -> Self {
        Self {
            name,
            size,
            stride,
            input_dim: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn forward(&mut self, x: ArrayD<f32>) -> Result<ArrayD<f32>> {
        let x = x.into_dimensionality::<Ix4>()?;
        let out = ops::avg_pool(x.view(), self.size, self.stride)?;

        self.input_dim = Some(x.dim());
        Ok(out.into_dyn())
    }

    pub fn backward(&mut self, d: ArrayD<f32>) -> Result<ArrayD<f32>> {
        let input_dim = self
            .input_dim
            .take()
            .ok_or(MlErr::MissingForward("average pooling"))?;

        let d = d.into_dimensionality::<Ix4>()?;
        let dx = ops::avg_pool_backward(d.view(), input_dim, self.size, self.stride)?;

        Ok(dx.into_dyn())
    }
}
