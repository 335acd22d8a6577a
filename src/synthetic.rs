use convnet::{specs::ModelSpec, training::Batch};
use ndarray::{Array, Array2, Array3, Array4, Axis};
use ndarray_rand::RandomExt;
use rand::{Rng, rngs::StdRng};
use rand_distr::{StandardNormal, Uniform};

/// Generates labelled images: every class owns a fixed template, each image being its class'
/// template plus gaussian noise.
pub struct SyntheticImages {
    templates: Vec<Array3<f32>>,
    noise: f32,
    rng: StdRng,
}

impl SyntheticImages {
    /// Creates a new `SyntheticImages`.
    ///
    /// # Arguments
    /// * `spec` - The model the images are meant for.
    /// * `noise` - The standard deviation of the noise added to the templates.
    /// * `rng` - The generator of both the templates and the noise.
    pub fn new(spec: &ModelSpec, noise: f32, mut rng: StdRng) -> anyhow::Result<Self> {
        let uniform = Uniform::new(-1f32, 1f32)?;
        let templates = (0..spec.num_classes)
            .map(|_| Array::random_using(spec.input, uniform, &mut rng))
            .collect();

        Ok(Self {
            templates,
            noise,
            rng,
        })
    }

    /// Draws a batch of `n` examples with uniformly distributed classes and one-hot labels.
    pub fn batch(&mut self, n: usize) -> convnet::Result<Batch> {
        let classes = self.templates.len();
        let (h, w, c) = self.templates[0].dim();

        let noise: Array4<f32> =
            Array::random_using((n, h, w, c), StandardNormal, &mut self.rng) * self.noise;
        let mut images = noise;
        let mut labels = Array2::zeros((n, classes));

        for (i, mut image) in images.axis_iter_mut(Axis(0)).enumerate() {
            let class = self.rng.random_range(0..classes);
            image += &self.templates[class];
            labels[[i, class]] = 1.;
        }

        Batch::new(images, labels)
    }
}
