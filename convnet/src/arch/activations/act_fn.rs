use crate::ops;

/// An elementwise activation function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActFn {
    Relu,
}
use ActFn::*;

impl ActFn {
    pub fn relu() -> Self {
        Relu
    }

    pub fn f(&self, z: f32) -> f32 {
        match self {
            Relu => ops::relu(z),
        }
    }

    pub fn df(&self, z: f32) -> f32 {
        match self {
            Relu => ops::relu_prime(z),
        }
    }
}
