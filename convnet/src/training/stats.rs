use std::fmt::{self, Display};

use crate::loss::Losses;

/// What a training step reports.
#[derive(Debug, Clone, PartialEq)]
pub struct StepStats {
    /// The global step after the update.
    pub step: u64,
    /// The learning rate the update was made with.
    pub learning_rate: f32,
    pub losses: Losses,
    /// The moving average of the total loss, including this step.
    pub average_total_loss: f32,
}

impl Display for StepStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "step {}, lr = {:e}, loss = {:.4} (avg {:.4}), cross entropy = {:.4}",
            self.step,
            self.learning_rate,
            self.losses.total_loss(),
            self.average_total_loss,
            self.losses.cross_entropy()
        )
    }
}

/// The precision of the model on an evaluation batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvalStats {
    /// How many of the top predictions may hold the target for it to count as correct.
    pub k: usize,
    pub correct: usize,
    pub total: usize,
}

impl EvalStats {
    /// The fraction of correct predictions, zero on an empty evaluation.
    pub fn precision(&self) -> f32 {
        if self.total == 0 {
            return 0.;
        }

        self.correct as f32 / self.total as f32
    }
}

impl Display for EvalStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "precision @ {} = {:.3} ({}/{})",
            self.k,
            self.precision(),
            self.correct,
            self.total
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precision() {
        let stats = EvalStats {
            k: 1,
            correct: 3,
            total: 4,
        };

        assert_eq!(stats.precision(), 0.75);
        assert_eq!(stats.to_string(), "precision @ 1 = 0.750 (3/4)");
    }

    #[test]
    fn empty_evaluation() {
        let stats = EvalStats {
            k: 1,
            correct: 0,
            total: 0,
        };

        assert_eq!(stats.precision(), 0.);
    }
}
