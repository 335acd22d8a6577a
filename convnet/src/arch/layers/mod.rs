mod avg_pool;
mod conv_block;
mod dense;
mod layer;

pub use avg_pool::AvgPool;
pub use conv_block::ConvBlock;
pub use dense::Dense;
pub use layer::Layer;
