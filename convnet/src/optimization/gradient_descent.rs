use rayon::prelude::*;

use super::Optimizer;

/// Gradient descent optimization algorithm.
#[derive(Debug, Clone, Copy)]
pub struct GradientDescent {
    learning_rate: f32,
}

impl GradientDescent {
    /// Returns a new `GradientDescent`.
    ///
    /// # Arguments
    /// * `learning_rate` - The *length* of the steps taken on `update_params`.
    pub fn new(learning_rate: f32) -> Self {
        Self { learning_rate }
    }

    pub fn learning_rate(&self) -> f32 {
        self.learning_rate
    }
}

impl Optimizer for GradientDescent {
    /// Updates the parameters according to the algorithm's learning rule, that is, making a step in
    /// the opposite direction of the gradient, with a length of `learning_rate`.
    ///
    /// # Arguments
    /// * `params` - The parameters that are going to be modified.
    /// * `grad` - The gradient used for taking the step.
    fn update_params(&mut self, params: &mut [f32], grad: &[f32]) {
        let lr = self.learning_rate;

        params
            .par_iter_mut()
            .zip(grad.par_iter())
            .for_each(|(w, g)| *w -= lr * g);
    }

    fn set_learning_rate(&mut self, learning_rate: f32) {
        self.learning_rate = learning_rate;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steps_against_the_gradient() {
        let mut params = [1., 2., 3.];
        let mut optimizer = GradientDescent::new(0.1);

        optimizer.update_params(&mut params, &[10., 0., -10.]);
        assert_eq!(params, [0., 2., 4.]);

        optimizer.set_learning_rate(1.);
        optimizer.update_params(&mut params, &[1., 1., 1.]);
        assert_eq!(params, [-1., 1., 3.]);
    }
}
