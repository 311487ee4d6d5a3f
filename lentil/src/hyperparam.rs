//! Dirichlet hyperparameters and their M-step.
//!
//! Minka's fixed-point iteration for the Dirichlet-multinomial:
//!
//! ```text
//!              Σ_u ψ(n_uk + α_k) - ψ(α_k)
//! α_k ← α_k  ----------------------------
//!              Σ_u ψ(n_u + α0) - ψ(α0)
//! ```
//!
//! and the same for β over items with topics playing the role of users.

use crate::sufficient_stats::TopicCounts;
use log::debug;
use nalgebra::DVector;
use special::Gamma;

/// Per-topic `alpha` and per-item `beta` concentration vectors
#[derive(Debug, Clone, PartialEq)]
pub struct DirichletPriors {
    pub alpha: DVector<f64>,
    pub beta: DVector<f64>,
}

/// What happened in one M-step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HyperUpdate {
    pub alpha_updated: usize,
    pub beta_updated: usize,
    /// an all-zero denominator left the whole vector as it was
    pub alpha_skipped: bool,
    pub beta_skipped: bool,
}

impl DirichletPriors {
    pub fn symmetric(num_topics: usize, num_items: usize, alpha0: f64, beta0: f64) -> Self {
        DirichletPriors {
            alpha: DVector::from_element(num_topics, alpha0),
            beta: DVector::from_element(num_items, beta0),
        }
    }

    pub fn alpha_sum(&self) -> f64 {
        self.alpha.sum()
    }

    pub fn beta_sum(&self) -> f64 {
        self.beta.sum()
    }

    /// Run one fixed-point step on both vectors
    pub fn update(&mut self, stats: &TopicCounts) -> HyperUpdate {
        let (alpha_updated, alpha_skipped) = self.update_alpha(stats);
        let (beta_updated, beta_skipped) = self.update_beta(stats);

        if alpha_skipped || beta_skipped {
            debug!(
                "M-step skipped (alpha: {}, beta: {}); no tokens to learn from",
                alpha_skipped, beta_skipped
            );
        }

        HyperUpdate {
            alpha_updated,
            beta_updated,
            alpha_skipped,
            beta_skipped,
        }
    }

    /// Returns (number of updated topics, skipped)
    pub fn update_alpha(&mut self, stats: &TopicCounts) -> (usize, bool) {
        let alpha_sum = self.alpha_sum();
        let psi_sum = alpha_sum.digamma();

        let denominator: f64 = stats
            .user_total
            .iter()
            .map(|&n_u| (n_u + alpha_sum).digamma() - psi_sum)
            .sum();

        if denominator == 0.0 || !denominator.is_finite() {
            return (0, true);
        }

        let mut updated = 0;
        for (k, alpha_k) in self.alpha.iter_mut().enumerate() {
            let psi_k = alpha_k.digamma();
            let numerator: f64 = stats
                .user_topic
                .column(k)
                .iter()
                .map(|&n_uk| (n_uk + *alpha_k).digamma() - psi_k)
                .sum();

            if numerator != 0.0 {
                *alpha_k *= numerator / denominator;
                updated += 1;
            }
        }
        (updated, false)
    }

    /// Returns (number of updated items, skipped)
    pub fn update_beta(&mut self, stats: &TopicCounts) -> (usize, bool) {
        let beta_sum = self.beta_sum();
        let psi_sum = beta_sum.digamma();

        let denominator: f64 = stats
            .topic_total
            .iter()
            .map(|&n_k| (n_k + beta_sum).digamma() - psi_sum)
            .sum();

        if denominator == 0.0 || !denominator.is_finite() {
            return (0, true);
        }

        let mut updated = 0;
        for (i, beta_i) in self.beta.iter_mut().enumerate() {
            let psi_i = beta_i.digamma();
            let numerator: f64 = stats
                .topic_item
                .column(i)
                .iter()
                .map(|&n_ki| (n_ki + *beta_i).digamma() - psi_i)
                .sum();

            if numerator != 0.0 {
                *beta_i *= numerator / denominator;
                updated += 1;
            }
        }
        (updated, false)
    }
}
