#![cfg(test)]

use std::num::NonZeroUsize;

use ndarray::{Array2, Array4};
use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::{
    specs::{Config, InitSpec, LayerSpec, ModelSpec, TrainingConfig},
    training::{Batch, TrainerBuilder},
};

const SIDE: usize = 6;

/// Bright images on the left half are class 0, bright images on the right half are class 1.
fn halves_batch(rng: &mut StdRng, n: usize) -> Batch {
    let mut images = Array4::zeros((n, SIDE, SIDE, 1));
    let mut labels = Array2::zeros((n, 2));

    for i in 0..n {
        let class = i % 2;
        let columns = if class == 0 { 0..SIDE / 2 } else { SIDE / 2..SIDE };

        for y in 0..SIDE {
            for x in 0..SIDE {
                let base = if columns.contains(&x) { 1. } else { 0. };
                images[[i, y, x, 0]] = base + rng.random_range(-0.1..0.1);
            }
        }

        labels[[i, class]] = 1.;
    }

    Batch::new(images, labels).unwrap()
}

fn config() -> Config {
    let mut training = TrainingConfig::new(NonZeroUsize::new(16).unwrap(), 1600);
    training.initial_learning_rate = 0.1;
    training.seed = Some(7);

    let model = ModelSpec {
        input: (SIDE, SIDE, 1),
        num_classes: 2,
        batch_norm_epsilon: 1e-4,
        layers: vec![
            LayerSpec::ConvBlock {
                name: "conv1".into(),
                kernel: (3, 3),
                filters: 8,
                stride: 1,
                init: InitSpec::TruncatedNormal {
                    mean: 0.,
                    std_dev: 0.1,
                },
                bias: 0.1,
                weight_decay: Some(0.),
            },
            LayerSpec::AvgPool {
                name: "pool_global".into(),
                size: 2,
                stride: 2,
            },
            LayerSpec::Dense {
                name: "softmax_linear".into(),
                units: None,
                init: InitSpec::TruncatedNormal {
                    mean: 0.,
                    std_dev: 0.04,
                },
                bias: 0.,
                weight_decay: Some(0.),
                act_fn: None,
            },
        ],
    };

    Config { model, training }
}

#[test]
fn test_halves_convergence() {
    let mut rng = StdRng::seed_from_u64(3);
    let mut trainer = TrainerBuilder::new().build(&config()).unwrap();

    let first = trainer.train_step(&halves_batch(&mut rng, 16)).unwrap();
    for _ in 0..150 {
        trainer.train_step(&halves_batch(&mut rng, 16)).unwrap();
    }

    let last = trainer.losses(&halves_batch(&mut rng, 16)).unwrap();
    assert!(
        last.cross_entropy() < 0.35,
        "cross entropy went from {} to {}",
        first.losses.cross_entropy(),
        last.cross_entropy()
    );
    assert!(last.cross_entropy() < first.losses.cross_entropy());
}
