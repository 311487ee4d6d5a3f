//! Collapsed Gibbs sampler for LDA (E-step).
//!
//! Every token occurrence is taken out of the counts, its topic is
//! redrawn from
//!
//! ```text
//!          n_uk + α_k       n_ki + β_i
//! p(k) ∝ -------------- × --------------
//!          n_u + Σ α        n_k + Σ β
//! ```
//!
//! and it is put back under the new label. The sequential sweep is exact
//! collapsed Gibbs; the parallel sweep processes users concurrently
//! against a frozen topic-item snapshot.

use crate::hyperparam::DirichletPriors;
use crate::interactions::InteractionMatrix;
use crate::sufficient_stats::TopicCounts;
use fnv::FnvHashMap as HashMap;
use nalgebra::DVector;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

/// Collapsed Gibbs sampler for token-topic assignments.
pub struct GibbsSampler {
    rng: SmallRng,
    /// Scratch space for cumulative topic weights
    cum_weights: Vec<f64>,
}

impl GibbsSampler {
    pub fn new(rng: SmallRng) -> Self {
        GibbsSampler {
            rng,
            cum_weights: Vec::new(),
        }
    }

    pub fn from_seed(seed: u64) -> Self {
        Self::new(SmallRng::seed_from_u64(seed))
    }

    /// Uniform random labels for all tokens, drawn from this sampler's
    /// random stream
    pub fn initialize(
        &mut self,
        data: &InteractionMatrix,
        num_topics: usize,
    ) -> crate::error::Result<TopicCounts> {
        TopicCounts::initialize(data, num_topics, &mut self.rng)
    }

    /// One sequential sweep over all tokens in traversal order.
    ///
    /// Each token sees the state left by every token resampled before
    /// it in the same sweep.
    ///
    /// Returns the number of tokens whose label changed.
    ///
    /// * `data` - interaction counts defining the traversal order
    /// * `stats` - labels and counts (modified in place)
    /// * `priors` - current hyperparameters
    pub fn sweep(
        &mut self,
        data: &InteractionMatrix,
        stats: &mut TopicCounts,
        priors: &DirichletPriors,
    ) -> usize {
        let k = stats.k;
        let alpha_sum = priors.alpha_sum();
        let beta_sum = priors.beta_sum();
        self.cum_weights.resize(k, 0.0);

        let mut changed = 0;
        let mut pos = 0;

        for user in 0..data.nrows() {
            for (item, count) in data.row_entries(user) {
                for _ in 0..count {
                    let old_k = stats.assignments[pos];
                    stats.remove_token(user, item, old_k);

                    let user_denom = stats.user_total[user] + alpha_sum;
                    let beta_i = priors.beta[item];
                    let mut cum = 0.0;
                    for t in 0..k {
                        cum += topic_weight(
                            stats.user_topic[(user, t)],
                            priors.alpha[t],
                            user_denom,
                            stats.topic_item[(t, item)],
                            beta_i,
                            stats.topic_total[t] + beta_sum,
                        );
                        self.cum_weights[t] = cum;
                    }

                    let new_k = sample_cumulative(&self.cum_weights, &mut self.rng);
                    stats.add_token(user, item, new_k);
                    stats.assignments[pos] = new_k;

                    if new_k != old_k {
                        changed += 1;
                    }
                    pos += 1;
                }
            }
        }

        debug_assert_eq!(pos, stats.num_tokens());
        changed
    }

    /// One approximate sweep with users processed in parallel.
    ///
    /// Phase 1 resamples each user's token slice against the user's own
    /// live row and a frozen copy of the topic-item counts that only
    /// tracks that user's own moves. Phase 2 applies every label change
    /// to the shared counts sequentially.
    ///
    /// Returns the number of tokens whose label changed.
    pub fn sweep_parallel(
        &mut self,
        data: &InteractionMatrix,
        stats: &mut TopicCounts,
        priors: &DirichletPriors,
    ) -> usize {
        let sweep_seed = self.rng.random::<u64>();
        let alpha_sum = priors.alpha_sum();
        let beta_sum = priors.beta_sum();
        let frozen: &TopicCounts = stats;

        // Phase 1: proposals (read-only on stats)
        let proposals: Vec<Vec<usize>> = (0..data.nrows())
            .into_par_iter()
            .map(|user| {
                // Deterministic per-user RNG
                let user_seed = sweep_seed ^ (user as u64).wrapping_mul(2654435761);
                let mut rng = SmallRng::seed_from_u64(user_seed);
                resample_user(user, data, frozen, priors, alpha_sum, beta_sum, &mut rng)
            })
            .collect();

        // Phase 2: sequential apply (mutates stats)
        let mut changed = 0;
        for (user, labels) in proposals.into_iter().enumerate() {
            let range = data.user_tokens(user);
            let mut pos = range.start;
            for (item, count) in data.row_entries(user) {
                for _ in 0..count {
                    let old_k = stats.assignments[pos];
                    let new_k = labels[pos - range.start];
                    if new_k != old_k {
                        stats.remove_token(user, item, old_k);
                        stats.add_token(user, item, new_k);
                        stats.assignments[pos] = new_k;
                        changed += 1;
                    }
                    pos += 1;
                }
            }
        }
        changed
    }
}

/// Resample one user's tokens against a local view of the counts.
fn resample_user(
    user: usize,
    data: &InteractionMatrix,
    stats: &TopicCounts,
    priors: &DirichletPriors,
    alpha_sum: f64,
    beta_sum: f64,
    rng: &mut SmallRng,
) -> Vec<usize> {
    let k = stats.k;
    let range = data.user_tokens(user);
    let mut labels = stats.assignments[range].to_vec();

    let mut user_row: DVector<f64> = stats.user_topic.row(user).transpose();
    let mut topic_total = stats.topic_total.clone();
    let mut item_delta: HashMap<(usize, usize), f64> = HashMap::default();
    let mut cum_weights = vec![0.0; k];

    // the user's own total is unchanged by its own moves
    let user_denom = stats.user_total[user] - 1.0 + alpha_sum;

    let mut pos = 0;
    for (item, count) in data.row_entries(user) {
        let beta_i = priors.beta[item];
        for _ in 0..count {
            let old_k = labels[pos];
            user_row[old_k] -= 1.0;
            topic_total[old_k] -= 1.0;
            *item_delta.entry((old_k, item)).or_default() -= 1.0;

            let mut cum = 0.0;
            for t in 0..k {
                let n_ki = stats.topic_item[(t, item)]
                    + item_delta.get(&(t, item)).copied().unwrap_or(0.0);
                cum += topic_weight(
                    user_row[t],
                    priors.alpha[t],
                    user_denom,
                    n_ki,
                    beta_i,
                    topic_total[t] + beta_sum,
                );
                cum_weights[t] = cum;
            }

            let new_k = sample_cumulative(&cum_weights, rng);
            user_row[new_k] += 1.0;
            topic_total[new_k] += 1.0;
            *item_delta.entry((new_k, item)).or_default() += 1.0;
            labels[pos] = new_k;
            pos += 1;
        }
    }
    labels
}

/// Unnormalized conditional weight of one topic
#[inline]
fn topic_weight(
    n_uk: f64,
    alpha_k: f64,
    user_denom: f64,
    n_ki: f64,
    beta_i: f64,
    topic_denom: f64,
) -> f64 {
    (n_uk + alpha_k) / user_denom * (n_ki + beta_i) / topic_denom
}

/// Sample an index given cumulative weights.
///
/// Scales a uniform draw in [0, 1) by the last cumulative weight and
/// returns the smallest index whose cumulative weight exceeds it. When
/// rounding leaves no such index, the last index is returned.
pub fn sample_cumulative<R: Rng>(cum_weights: &[f64], rng: &mut R) -> usize {
    debug_assert!(!cum_weights.is_empty());
    let last = cum_weights.len() - 1;
    let u = rng.random::<f64>() * cum_weights[last];
    cum_weights.iter().position(|&c| c > u).unwrap_or(last)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toy() -> InteractionMatrix {
        InteractionMatrix::from_triplets(
            4,
            5,
            &[
                (0, 0, 3.0),
                (0, 1, 2.0),
                (1, 1, 1.0),
                (1, 4, 4.0),
                (2, 2, 2.0),
                (3, 0, 1.0),
                (3, 3, 5.0),
            ],
        )
        .expect("toy")
    }

    #[test]
    fn sweep_preserves_counts() -> anyhow::Result<()> {
        let data = toy();
        let mut sampler = GibbsSampler::from_seed(17);
        let mut stats = sampler.initialize(&data, 3)?;
        let priors = DirichletPriors::symmetric(3, data.ncols(), 50.0 / 3.0, 0.01);

        for _ in 0..10 {
            sampler.sweep(&data, &mut stats, &priors);
            assert!(stats.is_consistent());
            assert_eq!(stats.num_tokens(), data.total_mass());
            for u in 0..data.nrows() {
                assert_eq!(stats.user_total[u], data.user_mass(u) as f64);
            }
        }

        // the cache still agrees with the labels
        let fresh = stats.recount(&data);
        assert_eq!(fresh.user_topic, stats.user_topic);
        assert_eq!(fresh.topic_item, stats.topic_item);
        Ok(())
    }

    #[test]
    fn same_seed_same_labels() -> anyhow::Result<()> {
        let data = toy();
        let priors = DirichletPriors::symmetric(4, data.ncols(), 12.5, 0.01);

        let run = |seed: u64| -> anyhow::Result<Vec<usize>> {
            let mut sampler = GibbsSampler::from_seed(seed);
            let mut stats = sampler.initialize(&data, 4)?;
            sampler.sweep(&data, &mut stats, &priors);
            Ok(stats.assignments)
        };

        assert_eq!(run(99)?, run(99)?);
        Ok(())
    }

    #[test]
    fn parallel_sweep_preserves_counts_and_is_reproducible() -> anyhow::Result<()> {
        let data = toy();
        let priors = DirichletPriors::symmetric(3, data.ncols(), 1.0, 0.1);

        let run = |seed: u64| -> anyhow::Result<TopicCounts> {
            let mut sampler = GibbsSampler::from_seed(seed);
            let mut stats = sampler.initialize(&data, 3)?;
            for _ in 0..5 {
                sampler.sweep_parallel(&data, &mut stats, &priors);
                assert!(stats.is_consistent());
            }
            Ok(stats)
        };

        let first = run(5)?;
        let second = run(5)?;
        assert_eq!(first.assignments, second.assignments);
        assert_eq!(first.num_tokens(), data.total_mass());
        Ok(())
    }

    #[test]
    fn cumulative_sampling_picks_first_exceeding_index() {
        let mut rng = SmallRng::seed_from_u64(0);
        // all mass on topic 1
        for _ in 0..100 {
            assert_eq!(sample_cumulative(&[0.0, 2.0, 2.0], &mut rng), 1);
        }
        // zero total mass falls back to the last topic
        assert_eq!(sample_cumulative(&[0.0, 0.0, 0.0], &mut rng), 2);
    }
}
