use ndarray::{Array2, Array4};

use crate::{MlErr, Result, specs::ModelSpec};

/// A batch of examples: images in NHWC layout and one row of label scores per image.
#[derive(Debug, Clone)]
pub struct Batch {
    pub images: Array4<f32>,
    pub labels: Array2<f32>,
}

impl Batch {
    /// Creates a new `Batch`.
    ///
    /// # Arguments
    /// * `images` - The images, `[batch, height, width, channels]`.
    /// * `labels` - The labels, `[batch, classes]`, usually one-hot.
    ///
    /// # Returns
    /// An error if the batch is empty or both arrays disagree on its size.
    pub fn new(images: Array4<f32>, labels: Array2<f32>) -> Result<Self> {
        let batch = images.dim().0;

        if labels.nrows() != batch {
            return Err(MlErr::SizeMismatch {
                what: "label rows",
                got: labels.nrows(),
                expected: batch,
            });
        }

        if batch == 0 {
            return Err(MlErr::SizeMismatch {
                what: "batch size",
                got: 0,
                expected: 1,
            });
        }

        Ok(Self { images, labels })
    }

    /// The amount of examples in the batch.
    pub fn len(&self) -> usize {
        self.images.dim().0
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Checks the batch fits a model.
    pub fn validate(&self, spec: &ModelSpec) -> Result<()> {
        let (n, h, w, c) = self.images.dim();
        let (rows, classes) = self.labels.dim();

        if (h, w, c) != spec.input {
            return Err(MlErr::ShapeMismatch {
                what: "images".into(),
                got: vec![h, w, c],
                expected: vec![spec.input.0, spec.input.1, spec.input.2],
            });
        }

        if rows != n || classes != spec.num_classes {
            return Err(MlErr::ShapeMismatch {
                what: "labels".into(),
                got: vec![rows, classes],
                expected: vec![n, spec.num_classes],
            });
        }

        if n == 0 {
            return Err(MlErr::SizeMismatch {
                what: "batch size",
                got: 0,
                expected: 1,
            });
        }

        Ok(())
    }
}
