use std::collections::HashMap;

use log::debug;
use ndarray::{ArrayView, ArrayViewMut, Dimension, IxDyn};
use rayon::prelude::*;

use super::{Reuse, VarId, Variable};
use crate::{MlErr, Result, initialization::ParamGen, optimization::Optimizer};

/// The owner of every trainable variable of one or more networks.
///
/// Values and gradients live in two flat buffers, each variable being a contiguous range of both.
/// Layers hold `VarId`s and look their parameters up on every pass, so any amount of networks
/// built against the same store share the variables they name alike.
#[derive(Debug, Default)]
pub struct ParamStore {
    values: Vec<f32>,
    grad: Vec<f32>,
    vars: Vec<Variable>,
    by_name: HashMap<String, usize>,
}

impl ParamStore {
    /// Creates a new, empty `ParamStore`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets or creates a variable.
    ///
    /// # Arguments
    /// * `name` - The fully scoped name of the variable, e.g. `"conv1/weights"`.
    /// * `shape` - The shape of the variable.
    /// * `reuse` - Whether an existing variable may (or must) be returned.
    /// * `weight_decay` - The L2 coefficient of the variable, only recorded on creation.
    /// * `init` - Builds the generator of the initial values, given their amount. Only called
    ///   when the variable gets created.
    ///
    /// # Returns
    /// The handle of the variable or an error if the reuse policy was violated or the
    /// initializer failed.
    pub fn get_variable<F, G>(
        &mut self,
        name: &str,
        shape: &[usize],
        reuse: Reuse,
        weight_decay: Option<f32>,
        init: F,
    ) -> Result<VarId>
    where
        F: FnOnce(usize) -> Result<G>,
        G: ParamGen,
    {
        match (self.by_name.get(name).copied(), reuse) {
            (Some(_), Reuse::No) => Err(MlErr::VariableRedefined(name.to_string())),
            (None, Reuse::Yes) => Err(MlErr::UnknownVariable(name.to_string())),
            (Some(i), Reuse::Yes | Reuse::Auto) => {
                let var = &self.vars[i];

                if var.shape != shape {
                    return Err(MlErr::ShapeMismatch {
                        what: format!("reused variable {name}"),
                        got: shape.to_vec(),
                        expected: var.shape.clone(),
                    });
                }

                Ok(VarId(i))
            }
            (None, Reuse::No | Reuse::Auto) => self.create(name, shape, weight_decay, init),
        }
    }

    fn create<F, G>(
        &mut self,
        name: &str,
        shape: &[usize],
        weight_decay: Option<f32>,
        init: F,
    ) -> Result<VarId>
    where
        F: FnOnce(usize) -> Result<G>,
        G: ParamGen,
    {
        let len = shape.iter().product();
        let mut param_gen = init(len)?;

        let start = self.values.len();
        self.values.reserve(len);

        while self.values.len() - start < len {
            let missing = len - (self.values.len() - start);
            let Some(sample) = param_gen.sample(missing) else {
                let got = self.values.len() - start;
                self.values.truncate(start);

                return Err(MlErr::ParamGenExhausted {
                    name: name.to_string(),
                    got,
                    expected: len,
                });
            };

            self.values.extend(sample);
        }

        self.grad.resize(self.values.len(), 0.);

        let id = self.vars.len();
        self.vars.push(Variable {
            name: name.to_string(),
            shape: shape.to_vec(),
            range: start..start + len,
            weight_decay,
        });
        self.by_name.insert(name.to_string(), id);

        debug!("created variable {name} with shape {shape:?}");
        Ok(VarId(id))
    }

    /// Looks a variable up by name.
    pub fn lookup(&self, name: &str) -> Option<VarId> {
        self.by_name.get(name).copied().map(VarId)
    }

    /// The metadata of a variable.
    pub fn variable(&self, id: VarId) -> &Variable {
        &self.vars[id.0]
    }

    /// Every variable, in creation order.
    pub fn variables(&self) -> impl Iterator<Item = (VarId, &Variable)> {
        self.vars.iter().enumerate().map(|(i, var)| (VarId(i), var))
    }

    /// The amount of scalars held by the store.
    pub fn size(&self) -> usize {
        self.values.len()
    }

    /// Gives a view of the current value of a variable.
    ///
    /// # Returns
    /// An error if the variable does not have dimensionality `D`.
    pub fn value<D: Dimension>(&self, id: VarId) -> Result<ArrayView<'_, f32, D>> {
        let var = &self.vars[id.0];
        let view = ArrayView::from_shape(IxDyn(&var.shape), &self.values[var.range.clone()])?;
        Ok(view.into_dimensionality()?)
    }

    /// Gives a mutable view of the accumulated gradient of a variable.
    pub fn grad_mut<D: Dimension>(&mut self, id: VarId) -> Result<ArrayViewMut<'_, f32, D>> {
        let var = &self.vars[id.0];
        let view = ArrayViewMut::from_shape(IxDyn(&var.shape), &mut self.grad[var.range.clone()])?;
        Ok(view.into_dimensionality()?)
    }

    /// Gives a view of the accumulated gradient of a variable.
    pub fn grad<D: Dimension>(&self, id: VarId) -> Result<ArrayView<'_, f32, D>> {
        let var = &self.vars[id.0];
        let view = ArrayView::from_shape(IxDyn(&var.shape), &self.grad[var.range.clone()])?;
        Ok(view.into_dimensionality()?)
    }

    /// Gives a view of the value of a variable together with a mutable view of its gradient,
    /// what every backward pass needs.
    pub fn value_and_grad_mut<D: Dimension>(
        &mut self,
        id: VarId,
    ) -> Result<(ArrayView<'_, f32, D>, ArrayViewMut<'_, f32, D>)> {
        let var = &self.vars[id.0];
        let shape = IxDyn(&var.shape);

        let value = ArrayView::from_shape(shape.clone(), &self.values[var.range.clone()])?;
        let grad = ArrayViewMut::from_shape(shape, &mut self.grad[var.range.clone()])?;

        Ok((value.into_dimensionality()?, grad.into_dimensionality()?))
    }

    /// The flat buffer of values.
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// The flat buffer of values, mutably.
    pub fn values_mut(&mut self) -> &mut [f32] {
        &mut self.values
    }

    /// The flat buffer of accumulated gradients.
    pub fn grads(&self) -> &[f32] {
        &self.grad
    }

    /// Zeroes out the gradient of every variable.
    pub fn zero_grad(&mut self) {
        self.grad.par_iter_mut().for_each(|g| *g = 0.0);
    }

    /// Applies the accumulated gradients onto the values.
    ///
    /// # Arguments
    /// * `optimizer` - Dictates how a gradient turns into a step.
    pub fn apply<O: Optimizer>(&mut self, optimizer: &mut O) {
        optimizer.update_params(&mut self.values, &self.grad);
    }
}

#[cfg(test)]
mod tests {
    use ndarray::{Array2, Ix1, Ix2, array};

    use super::*;
    use crate::{initialization::ConstParamGen, optimization::GradientDescent};

    fn constant(value: f32) -> impl FnOnce(usize) -> Result<ConstParamGen> {
        move |n| Ok(ConstParamGen::new(value, n))
    }

    #[test]
    fn variables_are_laid_out_contiguously() {
        let mut store = ParamStore::new();

        let w = store
            .get_variable("fc/weights", &[2, 3], Reuse::No, Some(0.1), constant(1.))
            .unwrap();
        let b = store
            .get_variable("fc/biases", &[3], Reuse::No, None, constant(0.5))
            .unwrap();

        assert_eq!(store.size(), 9);
        assert_eq!(store.value::<Ix2>(w).unwrap(), Array2::from_elem((2, 3), 1.));
        assert_eq!(store.value::<Ix1>(b).unwrap(), array![0.5, 0.5, 0.5]);
        assert_eq!(store.variable(w).scope(), "fc");
        assert_eq!(store.variable(w).weight_decay(), Some(0.1));
        assert_eq!(store.lookup("fc/biases"), Some(b));
    }

    #[test]
    fn redefinition_is_rejected() {
        let mut store = ParamStore::new();
        store
            .get_variable("conv1/weights", &[1], Reuse::No, None, constant(0.))
            .unwrap();

        let err = store
            .get_variable("conv1/weights", &[1], Reuse::No, None, constant(0.))
            .unwrap_err();

        assert!(matches!(err, MlErr::VariableRedefined(name) if name == "conv1/weights"));
    }

    #[test]
    fn reuse_requires_an_existing_variable_of_the_same_shape() {
        let mut store = ParamStore::new();

        assert!(matches!(
            store.get_variable("x", &[2], Reuse::Yes, None, constant(0.)),
            Err(MlErr::UnknownVariable(_))
        ));

        let id = store
            .get_variable("x", &[2], Reuse::No, None, constant(0.))
            .unwrap();

        assert!(matches!(
            store.get_variable("x", &[3], Reuse::Yes, None, constant(0.)),
            Err(MlErr::ShapeMismatch { .. })
        ));
        assert_eq!(
            store
                .get_variable("x", &[2], Reuse::Yes, None, constant(0.))
                .unwrap(),
            id
        );
    }

    #[test]
    fn initializer_only_runs_on_creation() {
        let mut store = ParamStore::new();
        let a = store
            .get_variable("x", &[2], Reuse::Auto, None, constant(1.))
            .unwrap();

        let b = store
            .get_variable("x", &[2], Reuse::Auto, None, |_| -> Result<ConstParamGen> {
                panic!("reused variables must not be initialized again")
            })
            .unwrap();

        assert_eq!(a, b);
        assert_eq!(store.values(), [1., 1.]);
    }

    #[test]
    fn short_initializer_is_an_error() {
        let mut store = ParamStore::new();

        let err = store
            .get_variable("x", &[4], Reuse::No, None, |_| Ok(ConstParamGen::new(0., 3)))
            .unwrap_err();

        assert!(matches!(err, MlErr::ParamGenExhausted { got: 3, expected: 4, .. }));
        assert_eq!(store.size(), 0);
        assert!(store.lookup("x").is_none());
    }

    #[test]
    fn wrong_dimensionality_is_an_error() {
        let mut store = ParamStore::new();
        let id = store
            .get_variable("x", &[2, 2], Reuse::No, None, constant(0.))
            .unwrap();

        assert!(store.value::<Ix1>(id).is_err());
    }

    #[test]
    fn apply_and_zero_grad() {
        let mut store = ParamStore::new();
        let id = store
            .get_variable("x", &[2], Reuse::No, None, constant(1.))
            .unwrap();

        store.grad_mut::<Ix1>(id).unwrap().assign(&array![1., -2.]);
        store.apply(&mut GradientDescent::new(0.5));

        assert_eq!(store.values(), [0.5, 2.]);

        store.zero_grad();
        assert!(store.grads().iter().all(|&g| g == 0.));
    }
}
