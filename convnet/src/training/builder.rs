use std::{cell::RefCell, rc::Rc};

use log::info;
use rand::{Rng, SeedableRng, rngs::StdRng};

use super::Trainer;
use crate::{
    Result,
    arch::{NetworkBuilder, Sequential},
    optimization::{
        ExponentialDecay, ExponentialMovingAverage, GradientDescent, LossAverages,
        ShadowVariables,
    },
    params::{ParamStore, Reuse},
    specs::{Config, ModelSpec, TrainingConfig},
};

/// Builds `Trainer`s given a specification.
#[derive(Default)]
pub struct TrainerBuilder;

impl TrainerBuilder {
    /// Creates a new `TrainerBuilder`.
    pub fn new() -> Self {
        Self
    }

    /// Builds a new `Trainer` following a spec.
    ///
    /// # Arguments
    /// * `config` - The specification for the model and its training.
    ///
    /// # Returns
    /// The trainer or an error if the config is inconsistent.
    pub fn build(&self, config: &Config) -> Result<Trainer<GradientDescent>> {
        let rng = self.generate_rng(config.training.seed);
        self.build_with_rng(config, rng)
    }

    /// Builds a new `Trainer` initializing its variables from the given generator.
    pub fn build_with_rng<R>(&self, config: &Config, rng: R) -> Result<Trainer<GradientDescent>>
    where
        R: Rng + 'static,
    {
        let spec = config.model.clone().or_standard_layers();
        let mut store = ParamStore::new();
        let (model, eval_model) = self.resolve_models(&spec, &mut store, rng)?;

        info!(
            "built a network of {} layers and {} variables",
            model.layers().len(),
            store.size()
        );

        self.terminate_build(spec, model, eval_model, store, &config.training)
    }

    fn resolve_models<R>(
        &self,
        spec: &ModelSpec,
        store: &mut ParamStore,
        rng: R,
    ) -> Result<(Sequential, Sequential)>
    where
        R: Rng + 'static,
    {
        let builder = NetworkBuilder::new(Rc::new(RefCell::new(rng)));

        let model = builder.build(spec, store, Reuse::No)?;
        let eval_model = builder.build(spec, store, Reuse::Yes)?;

        Ok((model, eval_model))
    }

    fn terminate_build(
        &self,
        spec: ModelSpec,
        model: Sequential,
        eval_model: Sequential,
        store: ParamStore,
        training: &TrainingConfig,
    ) -> Result<Trainer<GradientDescent>> {
        let schedule = ExponentialDecay::from_config(training)?;
        let optimizer = GradientDescent::new(training.initial_learning_rate);

        let loss_averages = LossAverages::new(ExponentialMovingAverage::new(
            training.loss_average_decay,
        )?);
        let shadow = ShadowVariables::new(
            ExponentialMovingAverage::new(training.moving_average_decay)?,
            &store,
        );

        Ok(Trainer::new(
            spec,
            model,
            eval_model,
            store,
            optimizer,
            schedule,
            loss_averages,
            shadow,
            training.max_steps,
            training.log_every,
        ))
    }

    fn generate_rng(&self, seed: Option<u64>) -> StdRng {
        match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        }
    }
}
