use crate::recommended_list::RecommendedList;

/// A metric comparing ground truth with predictions
pub trait Evaluator: Send + Sync {
    fn evaluate(&self, ground_truth: &RecommendedList, predictions: &RecommendedList) -> f64;
}

impl<F> Evaluator for F
where
    F: Fn(&RecommendedList, &RecommendedList) -> f64 + Send + Sync,
{
    fn evaluate(&self, ground_truth: &RecommendedList, predictions: &RecommendedList) -> f64 {
        self(ground_truth, predictions)
    }
}
