pub mod activations;
mod builder;
pub mod layers;
mod sequential;

pub use builder::NetworkBuilder;
pub use sequential::Sequential;
