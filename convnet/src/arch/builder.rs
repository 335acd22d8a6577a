use std::{cell::RefCell, fmt, rc::Rc};

use log::debug;
use rand::Rng;

use super::{
    Sequential,
    activations::ActFn,
    layers::{AvgPool, ConvBlock, Dense, Layer},
};
use crate::{
    MlErr, Result, initialization, ops,
    params::{ParamStore, Reuse, VarId},
    specs::{ActFnSpec, InitSpec, LayerSpec, ModelSpec},
};

/// The shape of a single example flowing between two layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    Spatial(usize, usize, usize),
    Flat(usize),
}

impl Shape {
    fn features(self) -> usize {
        match self {
            Shape::Spatial(h, w, c) => h * w * c,
            Shape::Flat(n) => n,
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Spatial(h, w, c) => write!(f, "[?, {h}, {w}, {c}]"),
            Shape::Flat(n) => write!(f, "[?, {n}]"),
        }
    }
}

/// Builds `Sequential` networks given a spec, registering their variables in a `ParamStore`.
pub struct NetworkBuilder<R: Rng> {
    rng: Rc<RefCell<R>>,
}

impl<R: Rng + 'static> NetworkBuilder<R> {
    /// Creates a new `NetworkBuilder`.
    ///
    /// # Arguments
    /// * `rng` - The random number generator every initializer draws from.
    pub fn new(rng: Rc<RefCell<R>>) -> Self {
        Self { rng }
    }

    /// Builds a new network following a spec.
    ///
    /// The shapes of every variable are inferred from the input shape, which is why a spec
    /// never states the fan-in of its layers. An empty layer list stands for the reference
    /// topology.
    ///
    /// # Arguments
    /// * `spec` - The specification of the network.
    /// * `store` - Where the variables of the network get registered.
    /// * `reuse` - Whether to create the variables or share those of a network built before.
    ///
    /// # Returns
    /// The network, or an error if the spec is inconsistent or violates the reuse policy.
    pub fn build(&self, spec: &ModelSpec, store: &mut ParamStore, reuse: Reuse) -> Result<Sequential> {
        let spec = spec.clone().or_standard_layers();
        let (h, w, c) = spec.input;

        if h == 0 || w == 0 || c == 0 || spec.num_classes == 0 {
            return Err(MlErr::InvalidConfig(format!(
                "input {:?} with {} classes has an empty dimension",
                spec.input, spec.num_classes
            )));
        }

        let mut shape = Shape::Spatial(h, w, c);
        debug!("input: shape {shape}");

        let mut layers = Vec::with_capacity(spec.layers.len());
        for layer_spec in &spec.layers {
            let layer = self.resolve_layer(&spec, layer_spec, &mut shape, store, reuse)?;
            debug!("{}: output shape {shape}", layer.name());
            layers.push(layer);
        }

        if shape != Shape::Flat(spec.num_classes) {
            return Err(MlErr::InvalidConfig(format!(
                "the network outputs {shape} but there are {} classes",
                spec.num_classes
            )));
        }

        Ok(Sequential::new(layers))
    }

    fn resolve_layer(
        &self,
        model: &ModelSpec,
        spec: &LayerSpec,
        shape: &mut Shape,
        store: &mut ParamStore,
        reuse: Reuse,
    ) -> Result<Layer> {
        match spec {
            LayerSpec::ConvBlock {
                name,
                kernel: (kh, kw),
                filters,
                stride,
                init,
                bias,
                weight_decay,
            } => {
                let (h, w, c) = spatial(name, *shape)?;
                let oh = fit(name, "height", h, *kh, *stride)?;
                let ow = fit(name, "width", w, *kw, *stride)?;
                positive(name, "filters", *filters)?;

                let (weights, biases) = self.variables(
                    store,
                    name,
                    &[*kh, *kw, c, *filters],
                    reuse,
                    *init,
                    *bias,
                    *weight_decay,
                )?;

                *shape = Shape::Spatial(oh, ow, *filters);

                let block = ConvBlock::new(
                    name.clone(),
                    weights,
                    biases,
                    *stride,
                    model.batch_norm_epsilon,
                );
                Ok(Layer::ConvBlock(block))
            }
            LayerSpec::AvgPool { name, size, stride } => {
                let (h, w, c) = spatial(name, *shape)?;
                let oh = fit(name, "height", h, *size, *stride)?;
                let ow = fit(name, "width", w, *size, *stride)?;

                *shape = Shape::Spatial(oh, ow, c);
                Ok(Layer::AvgPool(AvgPool::new(name.clone(), *size, *stride)))
            }
            LayerSpec::Dense {
                name,
                units,
                init,
                bias,
                weight_decay,
                act_fn,
            } => {
                let units = units.unwrap_or(model.num_classes);
                positive(name, "units", units)?;

                let (weights, biases) = self.variables(
                    store,
                    name,
                    &[shape.features(), units],
                    reuse,
                    *init,
                    *bias,
                    *weight_decay,
                )?;

                *shape = Shape::Flat(units);

                let act_fn = act_fn.map(|spec| match spec {
                    ActFnSpec::Relu => ActFn::relu(),
                });
                Ok(Layer::Dense(Dense::new(name.clone(), weights, biases, act_fn)))
            }
        }
    }

    /// Gets or creates the `weights` and `biases` of a scope, only the weights are decayed.
    #[allow(clippy::too_many_arguments)]
    fn variables(
        &self,
        store: &mut ParamStore,
        scope: &str,
        shape: &[usize],
        reuse: Reuse,
        init: InitSpec,
        bias: f32,
        weight_decay: Option<f32>,
    ) -> Result<(VarId, VarId)> {
        let weights = store.get_variable(
            &format!("{scope}/weights"),
            shape,
            reuse,
            weight_decay,
            |n| Ok(initialization::resolve(init, &self.rng, n)?),
        )?;

        let units = shape.last().copied().unwrap_or(0);
        let biases = store.get_variable(
            &format!("{scope}/biases"),
            &[units],
            reuse,
            None,
            |n| Ok(initialization::ConstParamGen::new(bias, n)),
        )?;

        Ok((weights, biases))
    }
}

fn spatial(name: &str, shape: Shape) -> Result<(usize, usize, usize)> {
    match shape {
        Shape::Spatial(h, w, c) => Ok((h, w, c)),
        Shape::Flat(_) => Err(MlErr::InvalidConfig(format!(
            "{name} needs a spatial input but follows a dense layer"
        ))),
    }
}

fn fit(name: &str, what: &str, input: usize, window: usize, stride: usize) -> Result<usize> {
    ops::valid_size(input, window, stride).ok_or_else(|| {
        MlErr::InvalidConfig(format!(
            "{name}: a window {what} of {window} with stride {stride} does not fit an input {what} of {input}"
        ))
    })
}

fn positive(name: &str, what: &str, value: usize) -> Result<()> {
    if value == 0 {
        return Err(MlErr::InvalidConfig(format!("{name} has no {what}")));
    }

    Ok(())
}
