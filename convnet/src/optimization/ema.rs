use log::warn;
use rayon::prelude::*;

use crate::{MlErr, Result, params::{ParamStore, VarId}};

/// Exponential moving average: `shadow -= (1 - decay) * (shadow - value)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExponentialMovingAverage {
    decay: f32,
}

impl ExponentialMovingAverage {
    /// Creates a new `ExponentialMovingAverage`.
    ///
    /// # Arguments
    /// * `decay` - How much of the shadow survives each update, in `[0, 1]`.
    ///
    /// # Returns
    /// An error if `decay` lies outside of `[0, 1]`.
    pub fn new(decay: f32) -> Result<Self> {
        if !(0.0..=1.0).contains(&decay) {
            return Err(MlErr::InvalidConfig(format!(
                "moving average decay must lie in [0, 1], got {decay}"
            )));
        }

        Ok(Self { decay })
    }

    /// The decay applied by an update.
    ///
    /// # Arguments
    /// * `num_updates` - When given, the decay is capped at `(1 + n) / (10 + n)` so the early
    ///   averages move faster.
    pub fn decay(&self, num_updates: Option<u64>) -> f32 {
        match num_updates {
            Some(n) => {
                let n = n as f64;
                self.decay.min(((1. + n) / (10. + n)) as f32)
            }
            None => self.decay,
        }
    }

    /// Moves `shadow` towards `value`.
    pub fn update(&self, shadow: &mut f32, value: f32, num_updates: Option<u64>) {
        *shadow -= (1. - self.decay(num_updates)) * (*shadow - value);
    }

    /// Moves every element of `shadow` towards the matching element of `values`.
    pub fn update_all(&self, shadow: &mut [f32], values: &[f32], num_updates: Option<u64>) {
        let rate = 1. - self.decay(num_updates);

        shadow
            .par_iter_mut()
            .zip(values.par_iter())
            .for_each(|(s, &v)| *s -= rate * (*s - v));
    }
}

/// Moving averages of the named loss terms, each starting at zero.
#[derive(Debug, Clone)]
pub struct LossAverages {
    ema: ExponentialMovingAverage,
    averages: Vec<(String, f32)>,
}

impl LossAverages {
    /// Creates a new `LossAverages`.
    pub fn new(ema: ExponentialMovingAverage) -> Self {
        Self {
            ema,
            averages: Vec::new(),
        }
    }

    /// Feeds the current value of every loss term into its average.
    ///
    /// # Arguments
    /// * `terms` - Name and value of each loss term, a term seen for the first time starts
    ///   averaging from zero.
    pub fn update<'a, I>(&mut self, terms: I)
    where
        I: IntoIterator<Item = (&'a str, f32)>,
    {
        for (name, value) in terms {
            let idx = match self.averages.iter().position(|(n, _)| n == name) {
                Some(idx) => idx,
                None => {
                    self.averages.push((name.to_string(), 0.));
                    self.averages.len() - 1
                }
            };

            self.ema.update(&mut self.averages[idx].1, value, None);
        }
    }

    /// The current average of a loss term.
    pub fn get(&self, name: &str) -> Option<f32> {
        self.averages
            .iter()
            .find_map(|(n, avg)| (n == name).then_some(*avg))
    }

    /// Every average, in the order the terms were first seen.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f32)> {
        self.averages.iter().map(|(n, avg)| (n.as_str(), *avg))
    }
}

/// Moving averages of every variable of a `ParamStore`, starting at their initial values.
#[derive(Debug, Clone)]
pub struct ShadowVariables {
    ema: ExponentialMovingAverage,
    shadow: Vec<f32>,
}

impl ShadowVariables {
    /// Creates a new `ShadowVariables`, snapshotting the current values of `store`.
    pub fn new(ema: ExponentialMovingAverage, store: &ParamStore) -> Self {
        Self {
            ema,
            shadow: store.values().to_vec(),
        }
    }

    /// Moves the shadows towards the current values.
    ///
    /// # Arguments
    /// * `store` - The live variables.
    /// * `global_step` - The amount of updates applied so far, caps the decay.
    pub fn update(&mut self, store: &ParamStore, global_step: u64) -> Result<()> {
        self.check_size(store)?;
        self.ema
            .update_all(&mut self.shadow, store.values(), Some(global_step));

        Ok(())
    }

    /// Exchanges the shadow and the live values; calling it twice restores the store.
    pub fn swap(&mut self, store: &mut ParamStore) -> Result<()> {
        self.check_size(store)?;
        self.shadow.swap_with_slice(store.values_mut());

        Ok(())
    }

    /// The averaged value of a variable, flattened.
    pub fn average(&self, store: &ParamStore, id: VarId) -> &[f32] {
        &self.shadow[store.variable(id).range()]
    }

    pub fn values(&self) -> &[f32] {
        &self.shadow
    }

    fn check_size(&self, store: &ParamStore) -> Result<()> {
        if self.shadow.len() != store.size() {
            warn!(
                "store holds {} values but {} are being averaged, variables created after the averages are not tracked",
                store.size(),
                self.shadow.len()
            );

            return Err(MlErr::SizeMismatch {
                what: "averaged variables",
                got: store.size(),
                expected: self.shadow.len(),
            });
        }

        Ok(())
    }
}
