mod ema;
mod gradient_descent;
mod optimizer;
mod schedule;

pub use ema::{ExponentialMovingAverage, LossAverages, ShadowVariables};
pub use gradient_descent::GradientDescent;
pub use optimizer::Optimizer;
pub use schedule::ExponentialDecay;
