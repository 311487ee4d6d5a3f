//! Rating error metrics.
//!
//! Each ground-truth `(item, value)` of a context is matched with the
//! predicted score of the same item in the same context; pairs without a
//! prediction are skipped.

use crate::recommended_list::RecommendedList;
use crate::traits::Evaluator;
use fnv::FnvHashMap as HashMap;

/// Matched `(context, item, truth, prediction)` across all contexts
pub(crate) fn matched_pairs(
    ground_truth: &RecommendedList,
    predictions: &RecommendedList,
) -> Vec<(usize, usize, f64, f64)> {
    let mut ret = vec![];
    for (user, truth) in ground_truth.iter() {
        let pred: HashMap<usize, f64> = predictions.context(user).iter().copied().collect();
        for &(item, value) in truth {
            if let Some(&score) = pred.get(&item) {
                ret.push((user, item, value, score));
            }
        }
    }
    ret
}

fn mean_of<F>(ground_truth: &RecommendedList, predictions: &RecommendedList, f: F) -> f64
where
    F: Fn(f64) -> f64,
{
    let pairs = matched_pairs(ground_truth, predictions);
    if pairs.is_empty() {
        return 0.0;
    }
    pairs.iter().map(|&(_, _, y, yhat)| f(yhat - y)).sum::<f64>() / pairs.len() as f64
}

/// Mean squared error
pub struct Mse;

impl Evaluator for Mse {
    fn evaluate(&self, ground_truth: &RecommendedList, predictions: &RecommendedList) -> f64 {
        mean_of(ground_truth, predictions, |d| d * d)
    }
}

/// Root mean squared error
pub struct Rmse;

impl Evaluator for Rmse {
    fn evaluate(&self, ground_truth: &RecommendedList, predictions: &RecommendedList) -> f64 {
        Mse.evaluate(ground_truth, predictions).sqrt()
    }
}

/// Mean absolute error
pub struct Mae;

impl Evaluator for Mae {
    fn evaluate(&self, ground_truth: &RecommendedList, predictions: &RecommendedList) -> f64 {
        mean_of(ground_truth, predictions, f64::abs)
    }
}
