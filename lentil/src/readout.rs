//! Posterior read-out: per-round point estimates, their running sums
//! after burn-in, and the final average.

use crate::error::{LdaError, Result};
use crate::hyperparam::DirichletPriors;
use crate::interactions::InteractionMatrix;
use crate::sufficient_stats::TopicCounts;
use nalgebra::DMatrix;
use rayon::prelude::*;

/// Point estimates of the current round
///
/// ```text
/// θ[u,k] = (n_uk + α_k) / (n_u + Σ α)
/// φ[k,i] = (n_ki + β_i) / (n_k + Σ β)
/// ```
pub fn point_estimates(
    stats: &TopicCounts,
    priors: &DirichletPriors,
) -> (DMatrix<f64>, DMatrix<f64>) {
    let alpha_sum = priors.alpha_sum();
    let beta_sum = priors.beta_sum();

    let theta = DMatrix::from_fn(stats.num_users(), stats.k, |u, k| {
        (stats.user_topic[(u, k)] + priors.alpha[k]) / (stats.user_total[u] + alpha_sum)
    });

    let phi = DMatrix::from_fn(stats.k, stats.num_items(), |k, i| {
        (stats.topic_item[(k, i)] + priors.beta[i]) / (stats.topic_total[k] + beta_sum)
    });

    (theta, phi)
}

/// `Σ_(u,i) n_ui ln Σ_k θ[u,k] φ[k,i]`
pub fn log_likelihood(data: &InteractionMatrix, theta: &DMatrix<f64>, phi: &DMatrix<f64>) -> f64 {
    (0..data.nrows())
        .into_par_iter()
        .map(|u| {
            data.row_entries(u)
                .map(|(i, n_ui)| {
                    let p_ui: f64 = (0..theta.ncols()).map(|k| theta[(u, k)] * phi[(k, i)]).sum();
                    n_ui as f64 * p_ui.ln()
                })
                .sum::<f64>()
        })
        .sum()
}

/// Running sums of θ and φ over read-out rounds
#[derive(Debug, Clone)]
pub struct PosteriorAccumulator {
    theta_sum: DMatrix<f64>,
    phi_sum: DMatrix<f64>,
    num_rounds: usize,
}

impl PosteriorAccumulator {
    pub fn new(num_users: usize, num_topics: usize, num_items: usize) -> Self {
        PosteriorAccumulator {
            theta_sum: DMatrix::zeros(num_users, num_topics),
            phi_sum: DMatrix::zeros(num_topics, num_items),
            num_rounds: 0,
        }
    }

    pub fn add(&mut self, theta: &DMatrix<f64>, phi: &DMatrix<f64>) {
        self.theta_sum += theta;
        self.phi_sum += phi;
        self.num_rounds += 1;
    }

    pub fn num_rounds(&self) -> usize {
        self.num_rounds
    }

    /// Average of the accumulated estimates `(θ, φ)`
    pub fn estimate(&self) -> Result<(DMatrix<f64>, DMatrix<f64>)> {
        if self.num_rounds == 0 {
            return Err(LdaError::NoAccumulatedStatistics);
        }
        let denom = self.num_rounds as f64;
        Ok((&self.theta_sum / denom, &self.phi_sum / denom))
    }
}
