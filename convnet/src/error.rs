use std::{
    error::Error,
    fmt::{self, Display},
};

use ndarray::ShapeError;

use crate::initialization::RandErr;

/// The result type used in the entire convnet crate.
pub type Result<T> = std::result::Result<T, MlErr>;

/// The convnet crate's error type.
#[derive(Debug)]
pub enum MlErr {
    SizeMismatch {
        what: &'static str,
        got: usize,
        expected: usize,
    },
    ShapeMismatch {
        what: String,
        got: Vec<usize>,
        expected: Vec<usize>,
    },
    Shape(ShapeError),
    InvalidConfig(String),
    UnknownVariable(String),
    VariableRedefined(String),
    ParamGenExhausted {
        name: String,
        got: usize,
        expected: usize,
    },
    MissingForward(&'static str),
    NonFiniteLoss {
        step: u64,
        value: f32,
    },
    Rand(RandErr),
}

impl Display for MlErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MlErr::SizeMismatch {
                what,
                got,
                expected,
            } => write!(f, "size mismatch for {what}: got {got}, expected {expected}"),
            MlErr::ShapeMismatch {
                what,
                got,
                expected,
            } => write!(
                f,
                "shape mismatch for {what}: got {got:?}, expected {expected:?}"
            ),
            MlErr::Shape(e) => write!(f, "invalid array shape: {e}"),
            MlErr::InvalidConfig(msg) => write!(f, "invalid config: {msg}"),
            MlErr::UnknownVariable(name) => {
                write!(f, "variable {name} does not exist and reuse was requested")
            }
            MlErr::VariableRedefined(name) => {
                write!(f, "variable {name} already exists and reuse was not allowed")
            }
            MlErr::ParamGenExhausted {
                name,
                got,
                expected,
            } => write!(
                f,
                "the initializer for {name} produced {got} values of the expected {expected}"
            ),
            MlErr::MissingForward(layer) => {
                write!(f, "backward pass on {layer} without a previous forward pass")
            }
            MlErr::NonFiniteLoss { step, value } => {
                write!(f, "model diverged at step {step}: total loss is {value}")
            }
            MlErr::Rand(e) => write!(f, "invalid initializer: {e}"),
        }
    }
}

impl Error for MlErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            MlErr::Shape(e) => Some(e),
            MlErr::Rand(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ShapeError> for MlErr {
    fn from(value: ShapeError) -> Self {
        Self::Shape(value)
    }
}

impl From<RandErr> for MlErr {
    fn from(value: RandErr) -> Self {
        Self::Rand(value)
    }
}
