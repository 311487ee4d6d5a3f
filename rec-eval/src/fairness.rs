//! Consumer-side fairness metrics.
//!
//! Users are split into a protected group and everyone else. With no
//! protected user configured every metric here returns 0.

use crate::ranking::{dcg, rank_discount};
use crate::rating::matched_pairs;
use crate::recommended_list::RecommendedList;
use crate::traits::Evaluator;
use fnv::{FnvHashMap as HashMap, FnvHashSet as HashSet};

/// Discounted proportional consumer fairness (Kelly et al. 1998)
///
/// ```text
/// log2(U_p / (U_p + U_u)) + log2(U_u / (U_p + U_u))
/// ```
///
/// where `U_p` and `U_u` sum the top-N DCG of protected and unprotected
/// users. A group with zero utility is given `1 / log2(N + 1)`. The best
/// value is `-2` (equal utility).
pub struct DiscountedProportionalFairness {
    pub top_n: usize,
    pub protected: HashSet<usize>,
}

impl Evaluator for DiscountedProportionalFairness {
    fn evaluate(&self, ground_truth: &RecommendedList, predictions: &RecommendedList) -> f64 {
        if self.protected.is_empty() {
            return 0.0;
        }

        let min_utility = rank_discount(self.top_n);
        let (mut pro_dcg, mut unpro_dcg) = (0.0, 0.0);

        for (user, truth) in ground_truth.iter() {
            if truth.is_empty() {
                continue;
            }
            let truth: HashSet<usize> = truth.iter().map(|&(i, _)| i).collect();
            let top: Vec<usize> = predictions
                .context(user)
                .iter()
                .take(self.top_n)
                .map(|&(i, _)| i)
                .collect();

            if self.protected.contains(&user) {
                pro_dcg += dcg(&truth, &top);
            } else {
                unpro_dcg += dcg(&truth, &top);
            }
        }

        if pro_dcg == 0.0 {
            pro_dcg = min_utility;
        }
        if unpro_dcg == 0.0 {
            unpro_dcg = min_utility;
        }
        let tot = pro_dcg + unpro_dcg;
        (pro_dcg / tot).log2() + (unpro_dcg / tot).log2()
    }
}

/// Per item: mean prediction minus mean truth, for the protected group
/// and for the rest. Items missing from either group are dropped.
fn group_errors(
    ground_truth: &RecommendedList,
    predictions: &RecommendedList,
    protected: &HashSet<usize>,
) -> Vec<(f64, f64)> {
    // item -> [protected (sum diff, n), unprotected (sum diff, n)]
    let mut stat: HashMap<usize, [(f64, usize); 2]> = HashMap::default();

    for (user, item, y, yhat) in matched_pairs(ground_truth, predictions) {
        let g = if protected.contains(&user) { 0 } else { 1 };
        let entry = stat.entry(item).or_insert([(0.0, 0); 2]);
        entry[g].0 += yhat - y;
        entry[g].1 += 1;
    }

    let mut items: Vec<usize> = stat.keys().copied().collect();
    items.sort_unstable();

    items
        .into_iter()
        .filter_map(|item| {
            let [(pro, n_pro), (unpro, n_unpro)] = stat[&item];
            if n_pro > 0 && n_unpro > 0 {
                Some((pro / n_pro as f64, unpro / n_unpro as f64))
            } else {
                None
            }
        })
        .collect()
}

fn mean(xx: impl ExactSizeIterator<Item = f64>) -> f64 {
    let n = xx.len();
    if n == 0 {
        0.0
    } else {
        xx.sum::<f64>() / n as f64
    }
}

/// Value unfairness (Yao & Huang 2017): mean over items of
/// `|(E_p[ŷ] - E_p[r]) - (E_u[ŷ] - E_u[r])|`
pub struct ValueUnfairness {
    pub protected: HashSet<usize>,
}

impl Evaluator for ValueUnfairness {
    fn evaluate(&self, ground_truth: &RecommendedList, predictions: &RecommendedList) -> f64 {
        if self.protected.is_empty() {
            return 0.0;
        }
        let errors = group_errors(ground_truth, predictions, &self.protected);
        mean(errors.iter().map(|&(p, u)| (p - u).abs()))
    }
}

/// Absolute unfairness (Yao & Huang 2017): mean over items of
/// `||E_p[ŷ] - E_p[r]| - |E_u[ŷ] - E_u[r]||`
pub struct AbsoluteUnfairness {
    pub protected: HashSet<usize>,
}

impl Evaluator for AbsoluteUnfairness {
    fn evaluate(&self, ground_truth: &RecommendedList, predictions: &RecommendedList) -> f64 {
        if self.protected.is_empty() {
            return 0.0;
        }
        let errors = group_errors(ground_truth, predictions, &self.protected);
        mean(errors.iter().map(|&(p, u)| (p.abs() - u.abs()).abs()))
    }
}
