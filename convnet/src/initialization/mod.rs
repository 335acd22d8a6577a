mod constant;
mod error;
mod param_gen;
mod random;

use std::{cell::RefCell, rc::Rc};

use rand::Rng;

pub use constant::ConstParamGen;
pub use error::{RandErr, Result};
pub use param_gen::ParamGen;
pub use random::{RandParamGen, TruncatedNormal};

use crate::specs::InitSpec;

/// Resolves an `InitSpec` into a boxed generator of exactly `limit` values.
///
/// # Arguments
/// * `spec` - The initializer specification.
/// * `rng` - The random number generator shared by every initializer of a network.
/// * `limit` - The amount of values the generator should produce.
///
/// # Returns
/// The generator, or an error if the distribution parameters are invalid.
pub fn resolve<R: Rng + 'static>(
    spec: InitSpec,
    rng: &Rc<RefCell<R>>,
    limit: usize,
) -> Result<Box<dyn ParamGen>> {
    let rng = Rc::clone(rng);

    let param_gen: Box<dyn ParamGen> = match spec {
        InitSpec::Const { value } => Box::new(ConstParamGen::new(value, limit)),
        InitSpec::Uniform { low, high } => {
            Box::new(RandParamGen::uniform(rng, limit, low, high)?)
        }
        InitSpec::Normal { mean, std_dev } => {
            Box::new(RandParamGen::normal(rng, limit, mean, std_dev)?)
        }
        InitSpec::TruncatedNormal { mean, std_dev } => {
            Box::new(RandParamGen::truncated_normal(rng, limit, mean, std_dev)?)
        }
    };

    Ok(param_gen)
}
