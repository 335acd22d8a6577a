use std::fmt::{self, Display};

pub const CROSS_ENTROPY: &str = "cross_entropy";
pub const TOTAL_LOSS: &str = "total_loss";

/// Every loss term of a step: the weight decay terms in registration order followed by the
/// cross-entropy, plus their sum.
#[derive(Debug, Clone, PartialEq)]
pub struct Losses {
    terms: Vec<(String, f32)>,
    total: f32,
}

impl Losses {
    /// Creates a new `Losses`.
    ///
    /// # Arguments
    /// * `weight_losses` - The named weight decay terms.
    /// * `cross_entropy` - The batch mean cross-entropy.
    pub fn new(weight_losses: Vec<(String, f32)>, cross_entropy: f32) -> Self {
        let mut terms = weight_losses;
        terms.push((CROSS_ENTROPY.to_string(), cross_entropy));

        let total = terms.iter().map(|(_, v)| v).sum();
        Self { terms, total }
    }

    pub fn cross_entropy(&self) -> f32 {
        self.terms.last().map_or(0., |(_, v)| *v)
    }

    pub fn total_loss(&self) -> f32 {
        self.total
    }

    /// The named terms, without the total.
    pub fn terms(&self) -> impl Iterator<Item = (&str, f32)> {
        self.terms.iter().map(|(n, v)| (n.as_str(), *v))
    }

    /// The named terms followed by the total.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f32)> {
        self.terms().chain([(TOTAL_LOSS, self.total)])
    }
}

impl Display for Losses {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, value)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }

            write!(f, "{name} = {value:.4}")?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cross_entropy_comes_last() {
        let losses = Losses::new(
            vec![("conv1/weight_loss".into(), 0.), ("fc/weight_loss".into(), 0.5)],
            2.,
        );

        let names: Vec<_> = losses.iter().map(|(n, _)| n).collect();
        assert_eq!(
            names,
            ["conv1/weight_loss", "fc/weight_loss", "cross_entropy", "total_loss"]
        );
        assert_eq!(losses.cross_entropy(), 2.);
        assert_eq!(losses.total_loss(), 2.5);
    }

    #[test]
    fn display() {
        let losses = Losses::new(vec![], 1.);
        assert_eq!(losses.to_string(), "cross_entropy = 1.0000, total_loss = 1.0000");
    }
}
