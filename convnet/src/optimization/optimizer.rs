/// An optimization algorithm, turning gradients into parameter updates.
pub trait Optimizer {
    /// Updates `params` in place given their gradient.
    fn update_params(&mut self, params: &mut [f32], grad: &[f32]);

    /// Sets the step size of the following updates.
    fn set_learning_rate(&mut self, learning_rate: f32);
}
