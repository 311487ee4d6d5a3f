use crate::fairness::*;
use crate::ranking::*;
use crate::rating::*;
use crate::recommended_list::RecommendedList;
use crate::traits::Evaluator;
use fnv::{FnvHashMap as HashMap, FnvHashSet as HashSet};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EvalError {
    #[error("unknown metric: {0}")]
    UnknownMetric(String),
}

/// Metric name to evaluator.
///
/// ```ignore
/// let mut registry = MetricRegistry::ranking(10, num_items);
/// registry.register("my_metric", Box::new(|gt: &RecommendedList, pred: &RecommendedList| 0.0));
/// let values = registry.evaluate_all(&["ndcg", "my_metric"], &gt, &pred)?;
/// ```
#[derive(Default)]
pub struct MetricRegistry {
    evaluators: HashMap<String, Box<dyn Evaluator>>,
}

impl MetricRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// `precision`, `recall`, `auc`, `ndcg`, `ap`, `rr`, `hit` and
    /// `icov` at `top_n` over a catalogue of `num_items`
    pub fn ranking(top_n: usize, num_items: usize) -> Self {
        let mut ret = Self::new();
        ret.register("precision", Box::new(Precision { top_n }));
        ret.register("recall", Box::new(Recall { top_n }));
        ret.register("auc", Box::new(Auc { top_n, num_items }));
        ret.register("ndcg", Box::new(NormalizedDcg { top_n }));
        ret.register("ap", Box::new(AveragePrecision { top_n }));
        ret.register("rr", Box::new(ReciprocalRank { top_n }));
        ret.register("hit", Box::new(HitRatio { top_n }));
        ret.register("icov", Box::new(ItemCoverage { top_n, num_items }));
        ret
    }

    /// `rmse`, `mse` and `mae`
    pub fn rating() -> Self {
        let mut ret = Self::new();
        ret.register("rmse", Box::new(Rmse));
        ret.register("mse", Box::new(Mse));
        ret.register("mae", Box::new(Mae));
        ret
    }

    /// Add `dpcf` at `top_n`, `value_unfairness` and `absolute_unfairness`
    pub fn with_fairness(mut self, protected: HashSet<usize>, top_n: usize) -> Self {
        self.register(
            "dpcf",
            Box::new(DiscountedProportionalFairness {
                top_n,
                protected: protected.clone(),
            }),
        );
        self.register(
            "value_unfairness",
            Box::new(ValueUnfairness {
                protected: protected.clone(),
            }),
        );
        self.register(
            "absolute_unfairness",
            Box::new(AbsoluteUnfairness { protected }),
        );
        self
    }

    /// Add or replace a metric
    pub fn register(&mut self, name: &str, evaluator: Box<dyn Evaluator>) {
        self.evaluators.insert(name.to_string(), evaluator);
    }

    pub fn get(&self, name: &str) -> Result<&dyn Evaluator, EvalError> {
        self.evaluators
            .get(name)
            .map(|x| x.as_ref())
            .ok_or_else(|| EvalError::UnknownMetric(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.evaluators.contains_key(name)
    }

    /// Registered names in sorted order
    pub fn names(&self) -> Vec<String> {
        let mut ret: Vec<String> = self.evaluators.keys().cloned().collect();
        ret.sort();
        ret
    }

    /// Evaluate the named metrics in the given order; fails on the
    /// first unknown name before computing anything
    pub fn evaluate_all<S: AsRef<str>>(
        &self,
        names: &[S],
        ground_truth: &RecommendedList,
        predictions: &RecommendedList,
    ) -> Result<Vec<(String, f64)>, EvalError> {
        let evaluators = names
            .iter()
            .map(|name| Ok((name.as_ref().to_string(), self.get(name.as_ref())?)))
            .collect::<Result<Vec<_>, EvalError>>()?;

        Ok(evaluators
            .into_iter()
            .map(|(name, eval)| {
                let value = eval.evaluate(ground_truth, predictions);
                log::debug!("{}: {}", name, value);
                (name, value)
            })
            .collect())
    }
}
