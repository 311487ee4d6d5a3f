//! Generic EM control loop.
//!
//! A model plugs in through [`EmSteps`]; the loop owns the round
//! schedule (burn-in, sample lag), the progress bar and the trace, and
//! knows nothing about the model's math.

use crate::config::LdaConfig;
use crate::error::Result;
use indicatif::{ProgressBar, ProgressDrawTarget};
use log::info;
use matrix_util::common_io::write_lines;

/// What a model reports when it is read out at the end of a round
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Readout {
    pub log_likelihood: f64,
    pub perplexity: f64,
}

/// The four operations an EM model variant provides
pub trait EmSteps {
    /// Build the initial latent state
    fn initialize(&mut self) -> Result<()>;

    /// Resample latent variables; returns how many changed
    fn e_step(&mut self) -> Result<usize>;

    /// Re-estimate hyperparameters from the current latent state
    fn m_step(&mut self) -> Result<()>;

    /// Compute the current estimates; fold them into the posterior
    /// average if `accumulate`
    fn readout(&mut self, accumulate: bool) -> Result<Readout>;
}

/// Round schedule and display options of a training run
#[derive(Debug, Clone)]
pub struct EmSchedule {
    pub num_rounds: usize,
    pub burn_in: usize,
    pub thin: usize,
    pub show_progress: bool,
    pub verbose: bool,
}

impl EmSchedule {
    pub fn is_readout_round(&self, round: usize) -> bool {
        round >= self.burn_in && (round - self.burn_in) % self.thin.max(1) == 0
    }
}

impl From<&LdaConfig> for EmSchedule {
    fn from(config: &LdaConfig) -> Self {
        EmSchedule {
            num_rounds: config.num_rounds,
            burn_in: config.burn_in,
            thin: config.thin,
            show_progress: config.show_progress,
            verbose: log::log_enabled!(log::Level::Info),
        }
    }
}

/// Diagnostics of one completed round
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoundStats {
    pub round: usize,
    pub log_likelihood: f64,
    pub perplexity: f64,
    pub changed_tokens: usize,
    pub accumulated: bool,
}

/// Round-by-round trace of a training run
#[derive(Debug, Clone, Default)]
pub struct TrainSummary {
    pub trace: Vec<RoundStats>,
}

impl TrainSummary {
    pub fn num_accumulated(&self) -> usize {
        self.trace.iter().filter(|r| r.accumulated).count()
    }

    pub fn last(&self) -> Option<&RoundStats> {
        self.trace.last()
    }

    /// Write the trace as a tab-separated table with a header
    pub fn to_tsv(&self, file: &str) -> anyhow::Result<()> {
        let mut lines: Vec<Box<str>> = Vec::with_capacity(self.trace.len() + 1);
        lines.push("round\tlog_likelihood\tperplexity\tchanged_tokens\taccumulated".into());
        lines.extend(self.trace.iter().map(|r| {
            format!(
                "{}\t{}\t{}\t{}\t{}",
                r.round, r.log_likelihood, r.perplexity, r.changed_tokens, r.accumulated as u8
            )
            .into_boxed_str()
        }));
        write_lines(&lines, file)
    }
}

/// One E-step, one M-step and a read-out
pub fn em_round<M: EmSteps>(model: &mut M, round: usize, schedule: &EmSchedule) -> Result<RoundStats> {
    let changed_tokens = model.e_step()?;
    model.m_step()?;

    let accumulated = schedule.is_readout_round(round);
    let readout = model.readout(accumulated)?;

    Ok(RoundStats {
        round,
        log_likelihood: readout.log_likelihood,
        perplexity: readout.perplexity,
        changed_tokens,
        accumulated,
    })
}

/// Initialize the model and run `schedule.num_rounds` EM rounds.
///
/// The loop never stops early; the returned trace is for monitoring.
///
/// * `model` - any model variant providing the four EM operations
/// * `schedule` - burn-in, sample lag and display options
pub fn run_em<M: EmSteps>(model: &mut M, schedule: &EmSchedule) -> Result<TrainSummary> {
    model.initialize()?;

    let pb = ProgressBar::new(schedule.num_rounds as u64);
    if !schedule.show_progress || schedule.verbose {
        pb.set_draw_target(ProgressDrawTarget::hidden());
    }

    let mut trace = Vec::with_capacity(schedule.num_rounds);

    for round in 0..schedule.num_rounds {
        let stats = em_round(model, round, schedule)?;

        if schedule.verbose {
            info!(
                "[{}] log-likelihood: {:.4}, perplexity: {:.4}, changed: {}{}",
                round + 1,
                stats.log_likelihood,
                stats.perplexity,
                stats.changed_tokens,
                if stats.accumulated { " *" } else { "" }
            );
        }

        trace.push(stats);
        pb.inc(1);
    }
    pb.finish_and_clear();

    Ok(TrainSummary { trace })
}
