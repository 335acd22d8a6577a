use ndarray::ArrayD;

use super::{AvgPool, ConvBlock, Dense};
use crate::{Result, params::ParamStore};

/// A layer of the inference graph.
pub enum Layer {
    ConvBlock(ConvBlock),
    AvgPool(AvgPool),
    Dense(Dense),
}
use Layer::*;

impl Layer {
    pub fn name(&self) -> &str {
        match self {
            ConvBlock(l) => l.name(),
            AvgPool(l) => l.name(),
            Dense(l) => l.name(),
        }
    }

    /// Makes a forward pass, caching what the backward pass needs.
    pub fn forward(&mut self, store: &ParamStore, x: ArrayD<f32>) -> Result<ArrayD<f32>> {
        match self {
            ConvBlock(l) => l.forward(store, x),
            AvgPool(l) => l.forward(x),
            Dense(l) => l.forward(store, x),
        }
    }

    /// Accumulates the gradients of the layer's variables into `store`.
    ///
    /// # Returns
    /// The gradient with respect to the input of the last forward pass.
    pub fn backward(&mut self, store: &mut ParamStore, d: ArrayD<f32>) -> Result<ArrayD<f32>> {
        match self {
            ConvBlock(l) => l.backward(store, d),
            AvgPool(l) => l.backward(d),
            Dense(l) => l.backward(store, d),
        }
    }
}
