use std::time::Instant;

use log::{debug, info};
use ndarray::Array2;

use super::{Batch, EvalStats, StepStats};
use crate::{
    MlErr, Result,
    arch::Sequential,
    loss::{
        LossFn, Losses, SparseSoftmaxCrossEntropy, TOTAL_LOSS, accumulate_weight_decay_grads,
        argmax_rows, in_top_k, weight_decay_losses,
    },
    optimization::{ExponentialDecay, LossAverages, Optimizer, ShadowVariables},
    params::ParamStore,
    specs::ModelSpec,
};

/// A model `Trainer`. Contains the relevant components needed for training a model, including
/// the model itself and the moving averages of its losses and variables.
pub struct Trainer<O: Optimizer> {
    spec: ModelSpec,
    model: Sequential,
    eval_model: Sequential,
    store: ParamStore,
    loss_fn: SparseSoftmaxCrossEntropy,
    optimizer: O,
    schedule: ExponentialDecay,
    loss_averages: LossAverages,
    shadow: ShadowVariables,
    global_step: u64,

    max_steps: u64,
    log_every: u64,
}

impl<O: Optimizer> Trainer<O> {
    /// Returns a new `Trainer`.
    ///
    /// # Arguments
    /// * `spec` - The spec both models were built from.
    /// * `model` - The model that will be trained.
    /// * `eval_model` - A model sharing every variable of `model`, run on the averaged values.
    /// * `store` - The variables of both models.
    /// * `optimizer` - Turns the gradients into updates.
    /// * `schedule` - The learning rate at every step.
    /// * `loss_averages` - The moving averages of the loss terms.
    /// * `shadow` - The moving averages of the variables.
    /// * `max_steps` - Where `train` stops.
    /// * `log_every` - How many steps between two progress logs of `train`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        spec: ModelSpec,
        model: Sequential,
        eval_model: Sequential,
        store: ParamStore,
        optimizer: O,
        schedule: ExponentialDecay,
        loss_averages: LossAverages,
        shadow: ShadowVariables,
        max_steps: u64,
        log_every: u64,
    ) -> Self {
        Self {
            spec,
            model,
            eval_model,
            store,
            loss_fn: SparseSoftmaxCrossEntropy::new(),
            optimizer,
            schedule,
            loss_averages,
            shadow,
            global_step: 0,
            max_steps,
            log_every,
        }
    }

    /// Computes every loss term of a batch with the live variables, without training on it.
    pub fn losses(&mut self, batch: &Batch) -> Result<Losses> {
        batch.validate(&self.spec)?;

        let logits = self
            .model
            .forward(&self.store, batch.images.clone().into_dyn())?;
        let cross_entropy = self.loss_fn.loss(logits.view(), batch.labels.view())?;

        Ok(Losses::new(weight_decay_losses(&self.store), cross_entropy))
    }

    /// Makes a single step of gradient descent on a batch.
    ///
    /// The loss averages are updated before the gradients are applied, the variable averages
    /// after it, using the incremented global step. A non finite loss aborts the step before
    /// any variable, average or counter changes.
    ///
    /// # Arguments
    /// * `batch` - The examples to train on.
    ///
    /// # Returns
    /// The stats of the step or an error if occurred.
    pub fn train_step(&mut self, batch: &Batch) -> Result<StepStats> {
        batch.validate(&self.spec)?;
        self.store.zero_grad();

        let logits = self
            .model
            .forward(&self.store, batch.images.clone().into_dyn())?;
        let cross_entropy = self.loss_fn.loss(logits.view(), batch.labels.view())?;
        let losses = Losses::new(weight_decay_losses(&self.store), cross_entropy);

        let total_loss = losses.total_loss();
        if !total_loss.is_finite() {
            return Err(MlErr::NonFiniteLoss {
                step: self.global_step,
                value: total_loss,
            });
        }

        self.loss_averages.update(losses.iter());

        let d = self.loss_fn.loss_prime(logits.view(), batch.labels.view())?;
        self.model.backward(&mut self.store, d)?;
        accumulate_weight_decay_grads(&mut self.store)?;

        let learning_rate = self.schedule.learning_rate(self.global_step);
        self.optimizer.set_learning_rate(learning_rate);
        self.store.apply(&mut self.optimizer);
        self.global_step += 1;

        self.shadow.update(&self.store, self.global_step)?;

        let average_total_loss = self.loss_averages.get(TOTAL_LOSS).unwrap_or(total_loss);
        Ok(StepStats {
            step: self.global_step,
            learning_rate,
            losses,
            average_total_loss,
        })
    }

    /// Trains on the given batches until they run out or `max_steps` is reached, logging the
    /// progress every `log_every` steps.
    ///
    /// # Returns
    /// The stats of the last step made, if any.
    pub fn train<I>(&mut self, batches: I) -> Result<Option<StepStats>>
    where
        I: IntoIterator<Item = Batch>,
    {
        let mut last = None;
        let mut since = Instant::now();
        let mut examples = 0;

        for batch in batches {
            if self.global_step >= self.max_steps {
                break;
            }

            let stats = self.train_step(&batch)?;
            examples += batch.len();

            if self.log_every > 0 && stats.step % self.log_every == 0 {
                let secs = since.elapsed().as_secs_f32();
                let per_sec = if secs > 0. { examples as f32 / secs } else { 0. };

                info!("{stats} ({per_sec:.1} examples/sec)");
                for (name, avg) in self.loss_averages.iter() {
                    debug!("{name} (avg) = {avg:.4}");
                }

                since = Instant::now();
                examples = 0;
            }

            last = Some(stats);
        }

        Ok(last)
    }

    /// Runs the evaluation model on the averaged variables, leaving the live ones in place
    /// afterwards.
    pub fn averaged_logits(&mut self, batch: &Batch) -> Result<Array2<f32>> {
        batch.validate(&self.spec)?;

        self.shadow.swap(&mut self.store)?;
        let logits = self
            .eval_model
            .forward(&self.store, batch.images.clone().into_dyn());
        self.shadow.swap(&mut self.store)?;

        logits
    }

    /// Counts the examples of a batch whose label is among the top `k` predictions, running the
    /// evaluation model on the averaged variables.
    pub fn evaluate(&mut self, batch: &Batch, k: usize) -> Result<EvalStats> {
        let logits = self.averaged_logits(batch)?;

        let targets = argmax_rows(batch.labels.view());
        let hits = in_top_k(logits.view(), &targets, k)?;

        Ok(EvalStats {
            k,
            correct: hits.iter().filter(|&&hit| hit).count(),
            total: hits.len(),
        })
    }

    pub fn global_step(&self) -> u64 {
        self.global_step
    }

    pub fn learning_rate(&self) -> f32 {
        self.schedule.learning_rate(self.global_step)
    }

    pub fn store(&self) -> &ParamStore {
        &self.store
    }

    pub fn loss_averages(&self) -> &LossAverages {
        &self.loss_averages
    }

    pub fn shadow(&self) -> &ShadowVariables {
        &self.shadow
    }

    pub fn spec(&self) -> &ModelSpec {
        &self.spec
    }
}
