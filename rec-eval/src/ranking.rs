//! Top-N ranking metrics.
//!
//! Every metric reads the first `top_n` entries of each predicted list
//! in stored order and averages over contexts with at least one
//! ground-truth item. Scores in the ground truth are ignored.

use crate::recommended_list::RecommendedList;
use crate::traits::Evaluator;
use fnv::FnvHashSet as HashSet;

/// Average `per_user(ground truth set, top-N items)` over users with
/// ground truth
fn mean_over_users<F>(
    ground_truth: &RecommendedList,
    predictions: &RecommendedList,
    top_n: usize,
    per_user: F,
) -> f64
where
    F: Fn(&HashSet<usize>, &[usize]) -> f64,
{
    let mut tot = 0.0;
    let mut num_users = 0_usize;

    for (user, truth) in ground_truth.iter() {
        if truth.is_empty() {
            continue;
        }
        let truth: HashSet<usize> = truth.iter().map(|&(i, _)| i).collect();
        let top: Vec<usize> = predictions
            .context(user)
            .iter()
            .take(top_n)
            .map(|&(i, _)| i)
            .collect();
        tot += per_user(&truth, &top);
        num_users += 1;
    }

    if num_users > 0 {
        tot / num_users as f64
    } else {
        0.0
    }
}

fn num_hits(truth: &HashSet<usize>, top: &[usize]) -> usize {
    top.iter().filter(|&i| truth.contains(i)).count()
}

/// `1 / log2(rank + 1)` with 1-based rank
pub(crate) fn rank_discount(rank: usize) -> f64 {
    1.0 / ((rank + 1) as f64).log2()
}

/// Discounted cumulative gain of binary relevance
pub(crate) fn dcg(truth: &HashSet<usize>, top: &[usize]) -> f64 {
    top.iter()
        .enumerate()
        .filter(|&(_, i)| truth.contains(i))
        .map(|(pos, _)| rank_discount(pos + 1))
        .sum()
}

/// hits / N
pub struct Precision {
    pub top_n: usize,
}

impl Evaluator for Precision {
    fn evaluate(&self, ground_truth: &RecommendedList, predictions: &RecommendedList) -> f64 {
        if self.top_n == 0 {
            return 0.0;
        }
        mean_over_users(ground_truth, predictions, self.top_n, |truth, top| {
            num_hits(truth, top) as f64 / self.top_n as f64
        })
    }
}

/// hits / |ground truth|
pub struct Recall {
    pub top_n: usize,
}

impl Evaluator for Recall {
    fn evaluate(&self, ground_truth: &RecommendedList, predictions: &RecommendedList) -> f64 {
        mean_over_users(ground_truth, predictions, self.top_n, |truth, top| {
            num_hits(truth, top) as f64 / truth.len() as f64
        })
    }
}

/// DCG over the ideal DCG of `min(|ground truth|, N)` hits
pub struct NormalizedDcg {
    pub top_n: usize,
}

impl Evaluator for NormalizedDcg {
    fn evaluate(&self, ground_truth: &RecommendedList, predictions: &RecommendedList) -> f64 {
        mean_over_users(ground_truth, predictions, self.top_n, |truth, top| {
            let ideal: f64 = (1..=truth.len().min(self.top_n)).map(rank_discount).sum();
            if ideal > 0.0 {
                dcg(truth, top) / ideal
            } else {
                0.0
            }
        })
    }
}

/// Mean of precision@rank over hit ranks, divided by `min(|ground truth|, N)`
pub struct AveragePrecision {
    pub top_n: usize,
}

impl Evaluator for AveragePrecision {
    fn evaluate(&self, ground_truth: &RecommendedList, predictions: &RecommendedList) -> f64 {
        mean_over_users(ground_truth, predictions, self.top_n, |truth, top| {
            let denom = truth.len().min(self.top_n);
            if denom == 0 {
                return 0.0;
            }
            let mut hits = 0;
            let mut sum_prec = 0.0;
            for (pos, i) in top.iter().enumerate() {
                if truth.contains(i) {
                    hits += 1;
                    sum_prec += hits as f64 / (pos + 1) as f64;
                }
            }
            sum_prec / denom as f64
        })
    }
}

/// 1 / rank of the first hit
pub struct ReciprocalRank {
    pub top_n: usize,
}

impl Evaluator for ReciprocalRank {
    fn evaluate(&self, ground_truth: &RecommendedList, predictions: &RecommendedList) -> f64 {
        mean_over_users(ground_truth, predictions, self.top_n, |truth, top| {
            top.iter()
                .position(|i| truth.contains(i))
                .map(|pos| 1.0 / (pos + 1) as f64)
                .unwrap_or(0.0)
        })
    }
}

/// Fraction of users with at least one hit
pub struct HitRatio {
    pub top_n: usize,
}

impl Evaluator for HitRatio {
    fn evaluate(&self, ground_truth: &RecommendedList, predictions: &RecommendedList) -> f64 {
        mean_over_users(ground_truth, predictions, self.top_n, |truth, top| {
            if num_hits(truth, top) > 0 {
                1.0
            } else {
                0.0
            }
        })
    }
}

/// Area under the ROC curve of the top-N list against a catalogue of
/// `num_items`. Listed items rank in list order above every unlisted
/// item; unlisted positives and negatives are ties worth one half.
pub struct Auc {
    pub top_n: usize,
    pub num_items: usize,
}

impl Evaluator for Auc {
    fn evaluate(&self, ground_truth: &RecommendedList, predictions: &RecommendedList) -> f64 {
        mean_over_users(ground_truth, predictions, self.top_n, |truth, top| {
            let num_pos = truth.len();
            let num_neg = self.num_items.saturating_sub(num_pos);
            if num_neg == 0 {
                return 0.0;
            }

            let mut correct = 0.0;
            let mut listed_neg = 0;
            let mut listed_pos = 0;
            for i in top {
                if truth.contains(i) {
                    correct += (num_neg - listed_neg) as f64;
                    listed_pos += 1;
                } else {
                    listed_neg += 1;
                }
            }
            let unlisted_pos = num_pos - listed_pos;
            let unlisted_neg = num_neg.saturating_sub(listed_neg);
            correct += 0.5 * (unlisted_pos * unlisted_neg) as f64;

            correct / (num_pos * num_neg) as f64
        })
    }
}

/// Fraction of the `num_items` catalogue appearing in any top-N list
pub struct ItemCoverage {
    pub top_n: usize,
    pub num_items: usize,
}

impl Evaluator for ItemCoverage {
    fn evaluate(&self, _ground_truth: &RecommendedList, predictions: &RecommendedList) -> f64 {
        if self.num_items == 0 {
            return 0.0;
        }
        let covered: HashSet<usize> = predictions
            .iter()
            .flat_map(|(_, list)| list.iter().take(self.top_n).map(|&(i, _)| i))
            .collect();
        covered.len() as f64 / self.num_items as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    /// user 0 holds items {1, 4}; user 1 holds {0}; user 2 has nothing
    fn fixture() -> (RecommendedList, RecommendedList) {
        let truth = RecommendedList::from_triplets(3, vec![(0, 1, 1.0), (0, 4, 1.0), (1, 0, 1.0)]);
        let pred = RecommendedList::from_lists(vec![
            vec![(1, 0.9), (2, 0.8), (4, 0.7)],
            vec![(3, 0.9), (2, 0.8), (5, 0.7)],
            vec![(0, 0.9), (1, 0.8), (2, 0.7)],
        ]);
        (truth, pred)
    }

    #[test]
    fn ranking_metrics_on_a_small_case() {
        let (truth, pred) = fixture();

        assert_abs_diff_eq!(Precision { top_n: 3 }.evaluate(&truth, &pred), (2.0 / 3.0) / 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(Recall { top_n: 3 }.evaluate(&truth, &pred), 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(HitRatio { top_n: 3 }.evaluate(&truth, &pred), 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(ReciprocalRank { top_n: 3 }.evaluate(&truth, &pred), 0.5, epsilon = 1e-12);

        // user 0 hits at ranks 1 and 3
        let ap0 = (1.0 + 2.0 / 3.0) / 2.0;
        assert_abs_diff_eq!(AveragePrecision { top_n: 3 }.evaluate(&truth, &pred), ap0 / 2.0, epsilon = 1e-12);

        let ndcg0 = (1.0 + 1.0 / 4_f64.log2()) / (1.0 + 1.0 / 3_f64.log2());
        assert_abs_diff_eq!(NormalizedDcg { top_n: 3 }.evaluate(&truth, &pred), ndcg0 / 2.0, epsilon = 1e-12);
    }

    #[test]
    fn perfect_ranking_scores_one() {
        let truth = RecommendedList::from_triplets(1, vec![(0, 2, 1.0), (0, 7, 1.0)]);
        let pred = RecommendedList::from_lists(vec![vec![(7, 1.0), (2, 0.5), (3, 0.1)]]);
        assert_abs_diff_eq!(NormalizedDcg { top_n: 2 }.evaluate(&truth, &pred), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(AveragePrecision { top_n: 2 }.evaluate(&truth, &pred), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn auc_and_coverage() {
        let truth = RecommendedList::from_triplets(1, vec![(0, 2, 1.0), (0, 7, 1.0)]);

        // both positives on top of a 10-item catalogue
        let perfect = RecommendedList::from_lists(vec![vec![(7, 1.0), (2, 0.5), (3, 0.1)]]);
        let auc = Auc {
            top_n: 3,
            num_items: 10,
        };
        assert_abs_diff_eq!(auc.evaluate(&truth, &perfect), 1.0, epsilon = 1e-12);

        // one negative above the only listed positive, one positive unlisted
        let mixed = RecommendedList::from_lists(vec![vec![(3, 1.0), (2, 0.5)]]);
        let expected = (7.0 + 0.5 * 7.0) / 16.0;
        assert_abs_diff_eq!(auc.evaluate(&truth, &mixed), expected, epsilon = 1e-12);

        let coverage = ItemCoverage {
            top_n: 2,
            num_items: 10,
        };
        assert_abs_diff_eq!(coverage.evaluate(&truth, &perfect), 0.2, epsilon = 1e-12);
    }
}
