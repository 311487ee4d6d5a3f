//! LDA recommender: users are documents, items are words.
//!
//! Lifecycle: `Uninitialized → Sampling → Finalized`. The sampling phase
//! owns the labels, counts, priors and accumulated estimates; finalizing
//! turns the accumulated estimates into an [`LdaPosterior`] exactly once.

use crate::config::LdaConfig;
use crate::em::{em_round, run_em, EmSchedule, EmSteps, Readout, RoundStats, TrainSummary};
use crate::error::{LdaError, Result};
use crate::gibbs::GibbsSampler;
use crate::hyperparam::DirichletPriors;
use crate::interactions::InteractionMatrix;
use crate::posterior::LdaPosterior;
use crate::readout::{log_likelihood, point_estimates, PosteriorAccumulator};
use crate::sufficient_stats::TopicCounts;
use log::{debug, info};

struct SamplingState {
    stats: TopicCounts,
    priors: DirichletPriors,
    accumulator: PosteriorAccumulator,
    rounds: usize,
}

enum Phase {
    Uninitialized,
    Sampling(Box<SamplingState>),
    Finalized(Box<LdaPosterior>),
}

pub struct LdaRecommender {
    data: InteractionMatrix,
    config: LdaConfig,
    sampler: GibbsSampler,
    phase: Phase,
}

impl LdaRecommender {
    pub fn new(data: InteractionMatrix, config: LdaConfig) -> Self {
        let sampler = GibbsSampler::from_seed(config.seed);
        LdaRecommender {
            data,
            config,
            sampler,
            phase: Phase::Uninitialized,
        }
    }

    pub fn config(&self) -> &LdaConfig {
        &self.config
    }

    pub fn data(&self) -> &InteractionMatrix {
        &self.data
    }

    /// Validate the configuration, run every round and finalize.
    pub fn train(&mut self) -> Result<TrainSummary> {
        self.config.validate()?;

        info!(
            "LDA: {} users, {} items, {} tokens, {} topics",
            self.data.nrows(),
            self.data.ncols(),
            self.data.total_mass(),
            self.config.num_topics
        );

        let schedule = EmSchedule::from(&self.config);
        let summary = run_em(self, &schedule)?;
        self.finalize()?;

        if let Some(last) = summary.last() {
            info!(
                "done: {} rounds, {} read out, final log-likelihood {:.4}",
                summary.trace.len(),
                summary.num_accumulated(),
                last.log_likelihood
            );
        }
        Ok(summary)
    }

    /// Build the initial state without running any round. The random
    /// stream restarts from `config.seed`, so `setup` is repeatable.
    pub fn setup(&mut self) -> Result<()> {
        self.initialize()
    }

    /// Run the next round by hand, following the configured schedule
    pub fn run_round(&mut self) -> Result<RoundStats> {
        let round = self.sampling()?.rounds;
        let schedule = EmSchedule::from(&self.config);
        em_round(self, round, &schedule)
    }

    /// Number of rounds whose estimates went into the posterior average
    pub fn num_accumulated(&self) -> usize {
        match &self.phase {
            Phase::Sampling(state) => state.accumulator.num_rounds(),
            _ => 0,
        }
    }

    /// Current labels and counts, while sampling
    pub fn topic_counts(&self) -> Option<&TopicCounts> {
        match &self.phase {
            Phase::Sampling(state) => Some(&state.stats),
            _ => None,
        }
    }

    /// Current hyperparameters, while sampling
    pub fn priors(&self) -> Option<&DirichletPriors> {
        match &self.phase {
            Phase::Sampling(state) => Some(&state.priors),
            _ => None,
        }
    }

    /// Average the accumulated estimates into the posterior
    pub fn finalize(&mut self) -> Result<&LdaPosterior> {
        let state = match &self.phase {
            Phase::Uninitialized => return Err(LdaError::NotInitialized),
            Phase::Finalized(_) => return Err(LdaError::AlreadyFinalized),
            Phase::Sampling(state) => state,
        };

        let (theta, phi) = state.accumulator.estimate()?;
        let posterior = LdaPosterior::new(
            theta,
            phi,
            state.priors.alpha.clone(),
            state.priors.beta.clone(),
            self.data.clone(),
        )?;

        self.phase = Phase::Finalized(Box::new(posterior));
        self.posterior()
    }

    pub fn is_finalized(&self) -> bool {
        matches!(self.phase, Phase::Finalized(_))
    }

    pub fn posterior(&self) -> Result<&LdaPosterior> {
        match &self.phase {
            Phase::Finalized(posterior) => Ok(posterior.as_ref()),
            _ => Err(LdaError::NotFinalized),
        }
    }

    /// Hand over the trained model
    pub fn into_posterior(self) -> Result<LdaPosterior> {
        match self.phase {
            Phase::Finalized(posterior) => Ok(*posterior),
            _ => Err(LdaError::NotFinalized),
        }
    }

    pub fn predict(&self, user: usize, item: usize) -> Result<f64> {
        self.posterior()?.predict(user, item)
    }

    fn sampling(&self) -> Result<&SamplingState> {
        match &self.phase {
            Phase::Sampling(state) => Ok(state.as_ref()),
            Phase::Uninitialized => Err(LdaError::NotInitialized),
            Phase::Finalized(_) => Err(LdaError::AlreadyFinalized),
        }
    }

    fn sampling_mut(&mut self) -> Result<&mut SamplingState> {
        match &mut self.phase {
            Phase::Sampling(state) => Ok(state.as_mut()),
            Phase::Uninitialized => Err(LdaError::NotInitialized),
            Phase::Finalized(_) => Err(LdaError::AlreadyFinalized),
        }
    }
}

impl EmSteps for LdaRecommender {
    fn initialize(&mut self) -> Result<()> {
        if self.is_finalized() {
            return Err(LdaError::AlreadyFinalized);
        }
        self.config.validate_model()?;

        // every run starts from the configured seed
        self.sampler = GibbsSampler::from_seed(self.config.seed);

        let k = self.config.num_topics;
        let stats = self.sampler.initialize(&self.data, k)?;
        let priors = DirichletPriors::symmetric(
            k,
            self.data.ncols(),
            self.config.alpha0(),
            self.config.beta0(),
        );
        let accumulator = PosteriorAccumulator::new(self.data.nrows(), k, self.data.ncols());

        debug!(
            "initialized {} tokens, alpha0 = {}, beta0 = {}",
            stats.num_tokens(),
            self.config.alpha0(),
            self.config.beta0()
        );

        self.phase = Phase::Sampling(Box::new(SamplingState {
            stats,
            priors,
            accumulator,
            rounds: 0,
        }));
        Ok(())
    }

    fn e_step(&mut self) -> Result<usize> {
        let parallel = self.config.parallel_sweep;
        let (data, sampler) = (&self.data, &mut self.sampler);
        let state = match &mut self.phase {
            Phase::Sampling(state) => state,
            Phase::Uninitialized => return Err(LdaError::NotInitialized),
            Phase::Finalized(_) => return Err(LdaError::AlreadyFinalized),
        };

        let changed = if parallel {
            sampler.sweep_parallel(data, &mut state.stats, &state.priors)
        } else {
            sampler.sweep(data, &mut state.stats, &state.priors)
        };
        debug_assert!(state.stats.is_consistent());
        Ok(changed)
    }

    fn m_step(&mut self) -> Result<()> {
        let state = self.sampling_mut()?;
        state.priors.update(&state.stats);
        Ok(())
    }

    fn readout(&mut self, accumulate: bool) -> Result<Readout> {
        let mass = self.data.total_mass() as f64;
        let data = &self.data;
        let state = match &mut self.phase {
            Phase::Sampling(state) => state,
            Phase::Uninitialized => return Err(LdaError::NotInitialized),
            Phase::Finalized(_) => return Err(LdaError::AlreadyFinalized),
        };

        let (theta, phi) = point_estimates(&state.stats, &state.priors);
        let llik = log_likelihood(data, &theta, &phi);

        if accumulate {
            state.accumulator.add(&theta, &phi);
        }
        state.rounds += 1;

        Ok(Readout {
            log_likelihood: llik,
            perplexity: (-llik / mass).exp(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario_matrix() -> InteractionMatrix {
        InteractionMatrix::from_triplets(2, 2, &[(0, 0, 1.0), (1, 1, 1.0)]).expect("2 x 2")
    }

    fn quiet(num_rounds: usize, burn_in: usize) -> LdaConfig {
        LdaConfig {
            num_topics: 2,
            num_rounds,
            burn_in,
            show_progress: false,
            ..Default::default()
        }
    }

    #[test]
    fn steps_need_initialization() {
        let mut model = LdaRecommender::new(scenario_matrix(), quiet(1, 0));
        assert_eq!(model.e_step().err(), Some(LdaError::NotInitialized));
        assert_eq!(model.run_round().err(), Some(LdaError::NotInitialized));
        assert_eq!(model.finalize().err(), Some(LdaError::NotInitialized));
    }

    #[test]
    fn no_second_finalize() -> anyhow::Result<()> {
        let mut model = LdaRecommender::new(scenario_matrix(), quiet(3, 1));
        model.train()?;
        assert!(model.is_finalized());
        assert_eq!(model.finalize().err(), Some(LdaError::AlreadyFinalized));
        assert_eq!(model.run_round().err(), Some(LdaError::AlreadyFinalized));
        Ok(())
    }

    #[test]
    fn train_rejects_schedule_without_readout() {
        let mut model = LdaRecommender::new(scenario_matrix(), quiet(4, 4));
        assert_eq!(
            model.train().err(),
            Some(LdaError::BurnInTooLong {
                burn_in: 4,
                num_rounds: 4
            })
        );
    }

    #[test]
    fn manual_rounds_follow_the_schedule() -> anyhow::Result<()> {
        let mut model = LdaRecommender::new(scenario_matrix(), quiet(5, 2));
        model.setup()?;
        let accumulated = (0..5)
            .map(|_| model.run_round().map(|r| r.accumulated))
            .collect::<Result<Vec<_>>>()?;
        assert_eq!(accumulated, vec![false, false, true, true, true]);
        assert_eq!(model.num_accumulated(), 3);
        Ok(())
    }

    #[test]
    fn setup_before_train_gives_the_same_model() -> anyhow::Result<()> {
        let config = LdaConfig {
            num_topics: 2,
            num_rounds: 6,
            burn_in: 2,
            show_progress: false,
            ..Default::default()
        };
        let data = InteractionMatrix::from_triplets(
            3,
            4,
            &[(0, 0, 2.0), (0, 1, 1.0), (1, 2, 3.0), (2, 3, 1.0), (2, 0, 1.0)],
        )?;

        let mut direct = LdaRecommender::new(data.clone(), config.clone());
        direct.train()?;

        let mut staged = LdaRecommender::new(data, config);
        staged.setup()?;
        staged.run_round()?;
        staged.train()?;

        assert_eq!(direct.posterior()?.theta, staged.posterior()?.theta);
        assert_eq!(direct.posterior()?.phi, staged.posterior()?.phi);
        Ok(())
    }
}
