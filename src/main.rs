mod synthetic;

use std::{env, fs, iter, num::NonZeroUsize};

use anyhow::Context;
use convnet::{
    specs::{Config, ModelSpec, TrainingConfig},
    training::TrainerBuilder,
};
use log::{info, warn};
use rand::{SeedableRng, rngs::StdRng};

use synthetic::SyntheticImages;

const CONFIG_VAR: &str = "CONVNET_CONFIG";
const NOISE: f32 = 0.5;
const EVAL_BATCHES: usize = 4;
const BATCH_SIZE: NonZeroUsize = NonZeroUsize::new(32).unwrap();

fn default_config() -> Config {
    let mut training = TrainingConfig::new(BATCH_SIZE, 50_000);
    training.max_steps = 100;
    training.seed = Some(0);

    Config {
        model: ModelSpec::standard((24, 24, 3), 10),
        training,
    }
}

fn load_config() -> anyhow::Result<Config> {
    let Ok(path) = env::var(CONFIG_VAR) else {
        warn!("{CONFIG_VAR} is not set, using the default config");
        return Ok(default_config());
    };

    let raw = fs::read_to_string(&path).with_context(|| format!("reading config at {path}"))?;
    let config = serde_json::from_str(&raw).with_context(|| format!("parsing config at {path}"))?;

    info!("loaded config from {path}");
    Ok(config)
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config = load_config()?;
    let mut trainer = TrainerBuilder::new().build(&config)?;

    let data_rng = match config.training.seed {
        Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(1)),
        None => StdRng::from_os_rng(),
    };
    let mut images = SyntheticImages::new(trainer.spec(), NOISE, data_rng)?;
    let batch_size = config.training.batch_size.get();

    info!(
        "training for {} steps in batches of {batch_size}",
        config.training.max_steps
    );

    let batches = iter::from_fn(|| match images.batch(batch_size) {
        Ok(batch) => Some(batch),
        Err(e) => {
            warn!("could not generate a batch: {e}");
            None
        }
    });

    match trainer.train(batches)? {
        Some(stats) => info!("finished training: {stats}"),
        None => warn!("no training step was made"),
    }

    for (name, avg) in trainer.loss_averages().iter() {
        info!("{name} (avg) = {avg:.4}");
    }

    let mut correct = 0;
    let mut total = 0;
    for _ in 0..EVAL_BATCHES {
        let stats = trainer.evaluate(&images.batch(batch_size)?, 1)?;
        correct += stats.correct;
        total += stats.total;
    }

    info!(
        "precision @ 1 with averaged variables = {:.3} ({correct}/{total})",
        correct as f32 / total.max(1) as f32
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_config_builds() {
        let config: Config = serde_json::from_str(include_str!("../configs/tiny.json")).unwrap();
        assert_eq!(config.training.decay_steps().unwrap(), 500);

        let trainer = TrainerBuilder::new().build(&config).unwrap();
        assert_eq!(trainer.spec().layers.len(), 5);
    }

    #[test]
    fn default_config_builds() {
        let config = default_config();
        assert!(TrainerBuilder::new().build(&config).is_ok());
    }

    #[test]
    fn synthetic_batches_are_one_hot() {
        let config = default_config();
        let mut images =
            SyntheticImages::new(&config.model, NOISE, StdRng::seed_from_u64(0)).unwrap();

        let batch = images.batch(8).unwrap();
        assert_eq!(batch.images.dim(), (8, 24, 24, 3));
        assert!(batch.validate(&config.model).is_ok());
        assert!(batch.labels.rows().into_iter().all(|row| row.sum() == 1.));
    }
}
