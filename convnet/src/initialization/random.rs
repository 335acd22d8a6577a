use std::{cell::RefCell, rc::Rc};

use rand::Rng;
use rand_distr::{Distribution, Normal, NormalError, Uniform};

use super::{ParamGen, Result};

/// A normal distribution whose samples further than two standard deviations from the mean are
/// discarded and drawn again.
#[derive(Debug, Clone, Copy)]
pub struct TruncatedNormal {
    normal: Normal<f32>,
    mean: f32,
    bound: f32,
}

impl TruncatedNormal {
    /// Creates a new `TruncatedNormal` distribution.
    ///
    /// # Arguments
    /// * `mean` - The mean of the distribution.
    /// * `std_dev` - The standard deviation of the underlying normal distribution.
    ///
    /// # Returns
    /// An error if `std_dev` is negative or not finite.
    pub fn new(mean: f32, std_dev: f32) -> std::result::Result<Self, NormalError> {
        Ok(Self {
            normal: Normal::new(mean, std_dev)?,
            mean,
            bound: 2. * std_dev,
        })
    }
}

impl Distribution<f32> for TruncatedNormal {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f32 {
        loop {
            let x = self.normal.sample(rng);

            if (x - self.mean).abs() <= self.bound {
                return x;
            }
        }
    }
}

/// A parameter generator that follows a certain probabilistic distribution.
pub struct RandParamGen<R: Rng, D: Distribution<f32>> {
    rng: Rc<RefCell<R>>,
    distribution: D,
    remaining: usize,
}

impl<R: Rng, D: Distribution<f32>> RandParamGen<R, D> {
    /// Creates a new `RandParamGen`.
    ///
    /// # Arguments
    /// * `rng` - A random number generator, shared between the initializers of a network.
    /// * `distribution` - The distribution to sample the values from.
    /// * `limit` - The maximum amount of values to generate.
    pub fn new(rng: Rc<RefCell<R>>, distribution: D, limit: usize) -> Self {
        Self {
            rng,
            distribution,
            remaining: limit,
        }
    }
}

impl<R: Rng> RandParamGen<R, Uniform<f32>> {
    /// Creates a new `RandParamGen` with a uniform distribution over `[low, high)`.
    ///
    /// # Returns
    /// An error if the range is invalid (low >= high).
    pub fn uniform(rng: Rc<RefCell<R>>, limit: usize, low: f32, high: f32) -> Result<Self> {
        Ok(Self::new(rng, Uniform::new(low, high)?, limit))
    }
}

impl<R: Rng> RandParamGen<R, Normal<f32>> {
    /// Creates a new `RandParamGen` with a normal distribution.
    ///
    /// # Returns
    /// An error if `std_dev` is negative or not finite.
    pub fn normal(rng: Rc<RefCell<R>>, limit: usize, mean: f32, std_dev: f32) -> Result<Self> {
        Ok(Self::new(rng, Normal::new(mean, std_dev)?, limit))
    }
}

impl<R: Rng> RandParamGen<R, TruncatedNormal> {
    /// Creates a new `RandParamGen` with a truncated normal distribution, the initializer of
    /// every kernel and weight matrix of the network.
    ///
    /// # Returns
    /// An error if `std_dev` is negative or not finite.
    pub fn truncated_normal(
        rng: Rc<RefCell<R>>,
        limit: usize,
        mean: f32,
        std_dev: f32,
    ) -> Result<Self> {
        Ok(Self::new(rng, TruncatedNormal::new(mean, std_dev)?, limit))
    }
}

impl<R: Rng, D: Distribution<f32>> ParamGen for RandParamGen<R, D> {
    fn sample(&mut self, n: usize) -> Option<Vec<f32>> {
        if self.remaining == 0 {
            return None;
        }

        let n = n.min(self.remaining);
        self.remaining -= n;

        let mut rng = self.rng.borrow_mut();
        let sample = (0..n)
            .map(|_| self.distribution.sample(&mut *rng))
            .collect();

        Some(sample)
    }
}
