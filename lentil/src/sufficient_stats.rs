//! Sufficient statistics for collapsed Gibbs LDA.
//!
//! One topic label per token occurrence plus the four count tables it
//! determines. The tables are a cache of the labels: every update goes
//! through `add_token`/`remove_token` so that
//! `sum_k user_topic[u,k] == user_total[u]` and
//! `sum_i topic_item[k,i] == topic_total[k]` hold after each call.

use crate::error::{LdaError, Result};
use crate::interactions::InteractionMatrix;
use nalgebra::{DMatrix, DVector};
use rand::Rng;

#[derive(Debug, Clone)]
pub struct TopicCounts {
    /// Number of topics
    pub k: usize,
    /// users x topics
    pub user_topic: DMatrix<f64>,
    /// topics x items
    pub topic_item: DMatrix<f64>,
    /// tokens per user
    pub user_total: DVector<f64>,
    /// tokens per topic
    pub topic_total: DVector<f64>,
    /// topic label of each token in traversal order
    pub assignments: Vec<usize>,
}

impl TopicCounts {
    /// Draw every token's topic uniformly from `0..k` in traversal
    /// order and tally the counts.
    ///
    /// * `data` - interaction counts
    /// * `k` - number of topics
    /// * `rng` - random state of this run
    pub fn initialize<R: Rng>(data: &InteractionMatrix, k: usize, rng: &mut R) -> Result<Self> {
        if k == 0 {
            return Err(LdaError::InvalidTopicCount(k));
        }
        if data.total_mass() == 0 {
            return Err(LdaError::EmptyInteractions);
        }

        let mut stats = Self::zeros(data.nrows(), data.ncols(), k);
        stats.assignments.reserve_exact(data.total_mass());

        for (user, item, count) in data.iter_nonzero() {
            for _ in 0..count {
                let topic = rng.random_range(0..k);
                stats.assignments.push(topic);
                stats.add_token(user, item, topic);
            }
        }

        debug_assert_eq!(stats.assignments.len(), data.total_mass());
        Ok(stats)
    }

    fn zeros(n_users: usize, n_items: usize, k: usize) -> Self {
        TopicCounts {
            k,
            user_topic: DMatrix::zeros(n_users, k),
            topic_item: DMatrix::zeros(k, n_items),
            user_total: DVector::zeros(n_users),
            topic_total: DVector::zeros(k),
            assignments: vec![],
        }
    }

    pub fn num_users(&self) -> usize {
        self.user_topic.nrows()
    }

    pub fn num_items(&self) -> usize {
        self.topic_item.ncols()
    }

    pub fn num_tokens(&self) -> usize {
        self.assignments.len()
    }

    #[inline]
    pub fn add_token(&mut self, user: usize, item: usize, topic: usize) {
        self.user_topic[(user, topic)] += 1.0;
        self.user_total[user] += 1.0;
        self.topic_item[(topic, item)] += 1.0;
        self.topic_total[topic] += 1.0;
    }

    #[inline]
    pub fn remove_token(&mut self, user: usize, item: usize, topic: usize) {
        self.user_topic[(user, topic)] -= 1.0;
        self.user_total[user] -= 1.0;
        self.topic_item[(topic, item)] -= 1.0;
        self.topic_total[topic] -= 1.0;
    }

    /// Count tables tallied afresh from the labels
    #[cfg(test)]
    pub(crate) fn recount(&self, data: &InteractionMatrix) -> Self {
        let mut fresh = Self::zeros(self.num_users(), self.num_items(), self.k);
        fresh.assignments = self.assignments.clone();

        let mut pos = 0;
        for (user, item, count) in data.iter_nonzero() {
            for _ in 0..count {
                fresh.add_token(user, item, self.assignments[pos]);
                pos += 1;
            }
        }
        fresh
    }

    /// Row and column sums agree with the totals, and both tables hold
    /// every token exactly once
    pub fn is_consistent(&self) -> bool {
        let rows_ok = self
            .user_topic
            .row_iter()
            .zip(self.user_total.iter())
            .all(|(row, &tot)| row.sum() == tot);

        let cols_ok = self
            .topic_item
            .row_iter()
            .zip(self.topic_total.iter())
            .all(|(row, &tot)| row.sum() == tot);

        let n = self.num_tokens() as f64;
        rows_ok && cols_ok && self.user_topic.sum() == n && self.topic_item.sum() == n
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn toy() -> InteractionMatrix {
        InteractionMatrix::from_triplets(
            3,
            4,
            &[(0, 0, 2.0), (0, 3, 1.0), (1, 1, 4.0), (2, 2, 1.0), (2, 0, 2.0)],
        )
        .expect("toy")
    }

    #[test]
    fn initialization_counts_every_token() -> anyhow::Result<()> {
        let data = toy();
        let mut rng = SmallRng::seed_from_u64(7);
        let stats = TopicCounts::initialize(&data, 3, &mut rng)?;

        assert_eq!(stats.num_tokens(), data.total_mass());
        assert!(stats.is_consistent());
        for u in 0..data.nrows() {
            assert_eq!(stats.user_total[u], data.user_mass(u) as f64);
        }
        Ok(())
    }

    #[test]
    fn recount_matches_incremental_updates() -> anyhow::Result<()> {
        let data = toy();
        let mut rng = SmallRng::seed_from_u64(11);
        let stats = TopicCounts::initialize(&data, 2, &mut rng)?;

        let fresh = stats.recount(&data);
        assert_eq!(stats.user_topic, fresh.user_topic);
        assert_eq!(stats.topic_item, fresh.topic_item);
        Ok(())
    }

    #[test]
    fn degenerate_inputs_fail() {
        let mut rng = SmallRng::seed_from_u64(1);
        let data = toy();
        assert_eq!(
            TopicCounts::initialize(&data, 0, &mut rng).err(),
            Some(LdaError::InvalidTopicCount(0))
        );

        let empty = InteractionMatrix::from_triplets(2, 2, &[]).expect("empty");
        assert_eq!(
            TopicCounts::initialize(&empty, 2, &mut rng).err(),
            Some(LdaError::EmptyInteractions)
        );
    }
}
