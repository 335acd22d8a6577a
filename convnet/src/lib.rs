pub mod arch;
pub mod error;
pub mod initialization;
pub mod loss;
pub mod ops;
pub mod optimization;
pub mod params;
pub mod specs;
mod test;
pub mod training;

pub use error::{MlErr, Result};
