use crate::error::{LdaError, Result};
use serde::{Deserialize, Serialize};

/// Options for LDA training.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LdaConfig {
    /// Number of latent topics K. Default: 10
    pub num_topics: usize,
    /// Initial Dirichlet prior on user-topic proportions. Default: 50/K
    pub init_alpha: Option<f64>,
    /// Initial Dirichlet prior on topic-item distributions. Default: 0.01
    pub init_beta: f64,
    /// Number of rounds discarded before accumulating statistics. Default: 100
    pub burn_in: usize,
    /// Total number of EM rounds. Default: 1000
    pub num_rounds: usize,
    /// Read out statistics every `thin` rounds after burn-in. Default: 1
    pub thin: usize,
    /// Random seed. Default: 42
    pub seed: u64,
    /// Approximate user-parallel E-step instead of the exact sequential sweep
    pub parallel_sweep: bool,
    /// Show a progress bar over rounds
    pub show_progress: bool,
}

impl Default for LdaConfig {
    fn default() -> Self {
        LdaConfig {
            num_topics: 10,
            init_alpha: None,
            init_beta: 0.01,
            burn_in: 100,
            num_rounds: 1000,
            thin: 1,
            seed: 42,
            parallel_sweep: false,
            show_progress: true,
        }
    }
}

impl LdaConfig {
    /// Resolved initial alpha, `50/K` unless given
    pub fn alpha0(&self) -> f64 {
        self.init_alpha
            .unwrap_or(50.0 / self.num_topics.max(1) as f64)
    }

    pub fn beta0(&self) -> f64 {
        self.init_beta
    }

    /// Check the topic count and the hyperparameters only; these are
    /// needed before any sampling state is built.
    pub fn validate_model(&self) -> Result<()> {
        if self.num_topics == 0 {
            return Err(LdaError::InvalidTopicCount(self.num_topics));
        }
        check_positive("alpha", self.alpha0())?;
        check_positive("beta", self.beta0())?;
        Ok(())
    }

    /// Full check before a training run, including the round schedule
    pub fn validate(&self) -> Result<()> {
        self.validate_model()?;
        if self.thin == 0 {
            return Err(LdaError::InvalidThinning);
        }
        if self.burn_in >= self.num_rounds {
            return Err(LdaError::BurnInTooLong {
                burn_in: self.burn_in,
                num_rounds: self.num_rounds,
            });
        }
        Ok(())
    }

    /// Whether round `round` (0-based) contributes to the posterior average
    pub fn is_readout_round(&self, round: usize) -> bool {
        round >= self.burn_in && (round - self.burn_in) % self.thin.max(1) == 0
    }
}

fn check_positive(name: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(LdaError::InvalidHyperParameter { name, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_alpha_follows_topic_count() {
        let config = LdaConfig {
            num_topics: 25,
            ..Default::default()
        };
        assert!((config.alpha0() - 2.0).abs() < 1e-12);
        assert!((config.beta0() - 0.01).abs() < 1e-12);
    }

    #[test]
    fn schedule_errors() {
        let zero_topics = LdaConfig {
            num_topics: 0,
            ..Default::default()
        };
        assert_eq!(zero_topics.validate(), Err(LdaError::InvalidTopicCount(0)));

        let no_readout = LdaConfig {
            burn_in: 10,
            num_rounds: 10,
            ..Default::default()
        };
        assert_eq!(
            no_readout.validate(),
            Err(LdaError::BurnInTooLong {
                burn_in: 10,
                num_rounds: 10
            })
        );

        let no_lag = LdaConfig {
            thin: 0,
            ..Default::default()
        };
        assert_eq!(no_lag.validate(), Err(LdaError::InvalidThinning));

        let bad_beta = LdaConfig {
            init_beta: -1.0,
            ..Default::default()
        };
        assert!(matches!(
            bad_beta.validate(),
            Err(LdaError::InvalidHyperParameter { name: "beta", .. })
        ));
    }

    #[test]
    fn readout_rounds_with_lag() {
        let config = LdaConfig {
            burn_in: 2,
            num_rounds: 9,
            thin: 3,
            ..Default::default()
        };
        let rounds = (0..9)
            .filter(|&r| config.is_readout_round(r))
            .collect::<Vec<_>>();
        assert_eq!(rounds, vec![2, 5, 8]);
    }
}
