//! Tensor operations of the inference graph, each with its hand derived backward pass.
//!
//! Every tensor uses the NHWC layout and every kernel the `[kh, kw, in, out]` layout.

mod activation;
mod batch_norm;
mod conv;
mod pool;

pub use activation::{relu, relu_prime, zero_fraction};
pub use batch_norm::{batch_norm, batch_norm_backward};
pub use conv::{conv2d, conv2d_backward, valid_size};
pub use pool::{avg_pool, avg_pool_backward};
