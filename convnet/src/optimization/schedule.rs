use crate::{MlErr, Result, specs::TrainingConfig};

/// An exponentially decaying learning rate, `initial * rate ^ (step / decay_steps)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExponentialDecay {
    initial: f32,
    decay_steps: u64,
    decay_rate: f32,
    staircase: bool,
}

impl ExponentialDecay {
    /// Creates a new `ExponentialDecay`.
    ///
    /// # Arguments
    /// * `initial` - The learning rate at step 0.
    /// * `decay_steps` - The amount of steps it takes to scale the learning rate by `decay_rate`.
    /// * `decay_rate` - The decay factor.
    /// * `staircase` - Decay at discrete intervals, using an integer exponent.
    ///
    /// # Returns
    /// An error if `decay_steps` is zero.
    pub fn new(initial: f32, decay_steps: u64, decay_rate: f32, staircase: bool) -> Result<Self> {
        if decay_steps == 0 {
            return Err(MlErr::InvalidConfig(
                "learning rate decay steps must be positive".into(),
            ));
        }

        Ok(Self {
            initial,
            decay_steps,
            decay_rate,
            staircase,
        })
    }

    /// The staircase schedule of a training procedure.
    pub fn from_config(config: &TrainingConfig) -> Result<Self> {
        Self::new(
            config.initial_learning_rate,
            config.decay_steps()?,
            config.learning_rate_decay_factor,
            true,
        )
    }

    /// The learning rate at `step`.
    pub fn learning_rate(&self, step: u64) -> f32 {
        let exponent = if self.staircase {
            (step / self.decay_steps) as f64
        } else {
            step as f64 / self.decay_steps as f64
        };

        (self.initial as f64 * (self.decay_rate as f64).powf(exponent)) as f32
    }
}
