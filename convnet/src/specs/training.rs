use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};

use crate::{MlErr, Result};

/// Hyperparameters of the training procedure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub batch_size: NonZeroUsize,
    pub num_examples_per_epoch: usize,
    #[serde(default = "default_initial_learning_rate")]
    pub initial_learning_rate: f32,
    #[serde(default = "default_learning_rate_decay_factor")]
    pub learning_rate_decay_factor: f32,
    #[serde(default = "default_num_epochs_per_decay")]
    pub num_epochs_per_decay: usize,
    /// Decay of the moving average kept for every trainable variable.
    #[serde(default = "default_moving_average_decay")]
    pub moving_average_decay: f32,
    /// Decay of the moving average kept for every loss term.
    #[serde(default = "default_loss_average_decay")]
    pub loss_average_decay: f32,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default = "default_max_steps")]
    pub max_steps: u64,
    #[serde(default = "default_log_every")]
    pub log_every: u64,
}

impl TrainingConfig {
    /// Creates a new `TrainingConfig` with the reference hyperparameters.
    ///
    /// # Arguments
    /// * `batch_size` - The amount of examples per training step.
    /// * `num_examples_per_epoch` - The size of the training set.
    pub fn new(batch_size: NonZeroUsize, num_examples_per_epoch: usize) -> Self {
        Self {
            batch_size,
            num_examples_per_epoch,
            initial_learning_rate: default_initial_learning_rate(),
            learning_rate_decay_factor: default_learning_rate_decay_factor(),
            num_epochs_per_decay: default_num_epochs_per_decay(),
            moving_average_decay: default_moving_average_decay(),
            loss_average_decay: default_loss_average_decay(),
            seed: None,
            max_steps: default_max_steps(),
            log_every: default_log_every(),
        }
    }

    /// The amount of steps between two learning rate decays.
    ///
    /// The amount of batches per epoch is truncated before scaling it by the epochs per decay.
    ///
    /// # Returns
    /// An error if the training set is smaller than a batch, no epochs per decay were given or
    /// the amount of steps does not fit in a `u64`.
    pub fn decay_steps(&self) -> Result<u64> {
        let batches_per_epoch = self.num_examples_per_epoch / self.batch_size.get();
        let decay_steps = batches_per_epoch
            .checked_mul(self.num_epochs_per_decay)
            .and_then(|steps| u64::try_from(steps).ok())
            .ok_or_else(|| {
                MlErr::InvalidConfig(format!(
                    "learning rate decay steps overflow ({batches_per_epoch} batches per epoch, {} epochs per decay)",
                    self.num_epochs_per_decay
                ))
            })?;

        if decay_steps == 0 {
            return Err(MlErr::InvalidConfig(format!(
                "learning rate decay every 0 steps ({} examples per epoch, batches of {}, {} epochs per decay)",
                self.num_examples_per_epoch, self.batch_size, self.num_epochs_per_decay
            )));
        }

        Ok(decay_steps)
    }
}

fn default_initial_learning_rate() -> f32 {
    3.
}

fn default_learning_rate_decay_factor() -> f32 {
    0.1
}

fn default_num_epochs_per_decay() -> usize {
    100
}

fn default_moving_average_decay() -> f32 {
    0.9999
}

fn default_loss_average_decay() -> f32 {
    0.9
}

fn default_max_steps() -> u64 {
    1000
}

fn default_log_every() -> u64 {
    10
}
