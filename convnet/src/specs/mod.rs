mod model;
mod training;

use serde::{Deserialize, Serialize};

pub use model::{ActFnSpec, InitSpec, LayerSpec, ModelSpec};
pub use training::TrainingConfig;

/// The whole configuration of a training run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub model: ModelSpec,
    pub training: TrainingConfig,
}
