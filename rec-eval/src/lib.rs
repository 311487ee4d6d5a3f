//! Evaluation metrics for recommenders.
//!
//! Metrics are looked up by name in a [`registry::MetricRegistry`];
//! each one implements [`traits::Evaluator`] and compares a ground-truth
//! [`recommended_list::RecommendedList`] with a predicted one.

pub mod fairness;
pub mod ranking;
pub mod rating;
pub mod recommended_list;
pub mod registry;
pub mod traits;

pub use recommended_list::RecommendedList;
pub use registry::{EvalError, MetricRegistry};
pub use traits::Evaluator;
