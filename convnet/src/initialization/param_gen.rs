/// A `ParamGen` produces the initial values of a variable.
///
/// Generators are bounded: once they handed out `limit` values they are exhausted, which lets the
/// parameter store verify that an initializer covered exactly the variable it was built for.
pub trait ParamGen {
    /// Samples at most `n` values.
    ///
    /// # Arguments
    /// * `n` - The upper limit of values to generate.
    ///
    /// # Returns
    /// `None` if the generator is exhausted.
    fn sample(&mut self, n: usize) -> Option<Vec<f32>>;
}

impl<G: ParamGen + ?Sized> ParamGen for Box<G> {
    fn sample(&mut self, n: usize) -> Option<Vec<f32>> {
        (**self).sample(n)
    }
}
