mod cross_entropy;
mod loss_fn;
mod losses;
mod metrics;
mod weight_decay;

pub use cross_entropy::{SparseSoftmaxCrossEntropy, argmax_rows};
pub use loss_fn::LossFn;
pub use losses::{CROSS_ENTROPY, Losses, TOTAL_LOSS};
pub use metrics::in_top_k;
pub use weight_decay::{accumulate_weight_decay_grads, weight_decay_losses};
