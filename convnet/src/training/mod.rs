mod batch;
mod builder;
mod stats;
mod trainer;

pub use batch::Batch;
pub use builder::TrainerBuilder;
pub use stats::{EvalStats, StepStats};
pub use trainer::Trainer;
