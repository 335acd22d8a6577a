mod store;
mod variable;

pub use store::ParamStore;
pub use variable::{Reuse, VarId, Variable};
