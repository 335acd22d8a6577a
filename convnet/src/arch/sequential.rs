use ndarray::{Array2, ArrayD, Ix2};

use super::layers::Layer;
use crate::{MlErr, Result, params::ParamStore};

/// A sequential model: information flows forward when computing an output and backward when
/// computing the gradients of its variables.
///
/// The variables live in a `ParamStore`, so the same model may be run against its live or its
/// averaged parameters.
pub struct Sequential {
    layers: Vec<Layer>,
}

impl Sequential {
    /// Creates a new `Sequential`.
    ///
    /// # Arguments
    /// * `layers` - The layers the sequential is composed of.
    ///
    /// # Returns
    /// A new `Sequential` instance.
    pub fn new<I>(layers: I) -> Self
    where
        I: IntoIterator<Item = Layer>,
    {
        Self {
            layers: layers.into_iter().collect(),
        }
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Makes a forward pass through the network.
    ///
    /// # Arguments
    /// * `store` - The variables of the network.
    /// * `x` - The input images, `[batch, height, width, channels]`.
    ///
    /// # Returns
    /// The unscaled logits, `[batch, classes]`, or an error if occurred.
    pub fn forward(&mut self, store: &ParamStore, mut x: ArrayD<f32>) -> Result<Array2<f32>> {
        for layer in self.layers.iter_mut() {
            x = layer.forward(store, x)?;
        }

        let ndim = x.ndim();
        x.into_dimensionality::<Ix2>().map_err(|_| MlErr::SizeMismatch {
            what: "logits rank",
            got: ndim,
            expected: 2,
        })
    }

    /// Makes a backward pass through the network, accumulating every variable's gradient into
    /// `store`.
    ///
    /// # Arguments
    /// * `store` - The variables of the network.
    /// * `d` - The gradient of the loss with respect to the logits of the last forward pass.
    pub fn backward(&mut self, store: &mut ParamStore, d: Array2<f32>) -> Result<()> {
        let mut d = d.into_dyn();

        for layer in self.layers.iter_mut().rev() {
            d = layer.backward(store, d)?;
        }

        Ok(())
    }
}
