//! Latent Dirichlet Allocation for implicit-feedback recommendation.
//!
//! Users play the role of documents and items the role of words. The
//! model is fit by collapsed Gibbs EM: each round resamples every
//! token's topic (E-step), re-estimates the Dirichlet hyperparameters by
//! Minka's fixed point (M-step), and after burn-in folds the current
//! estimates into a posterior average.
//!
//! # References
//!
//! Griffiths & Steyvers (2004). "Finding scientific topics." PNAS.
//!
//! Minka (2000). "Estimating a Dirichlet distribution."

/// Training options
pub mod config;

/// Configuration and lifecycle errors
pub mod error;

/// Sparse user x item counts and the token traversal order
pub mod interactions;

/// Topic labels and the count tables they determine
pub mod sufficient_stats;

/// Collapsed Gibbs sampler (E-step)
pub mod gibbs;

/// Dirichlet hyperparameters and their fixed-point update (M-step)
pub mod hyperparam;

/// Point estimates, accumulation and averaging
pub mod readout;

/// Generic EM loop over a model's four steps
pub mod em;

/// The LDA recommender and its lifecycle
pub mod lda;

/// Trained model: prediction, recommendation and persistence
pub mod posterior;

/// Synthetic data from the generative model
pub mod simulate;

pub use config::LdaConfig;
pub use error::{ErrorKind, LdaError};
pub use interactions::InteractionMatrix;
pub use lda::LdaRecommender;
pub use posterior::LdaPosterior;
