//! Trained LDA model: posterior mean θ (users x topics) and φ (topics x
//! items), the final hyperparameters, and the training interactions.

use crate::error::{LdaError, Result};
use crate::interactions::InteractionMatrix;
use log::info;
use matrix_util::common_io::mkdir;
use matrix_util::traits::DimIoOps;
use nalgebra::{DMatrix, DVector};

#[derive(Debug, Clone)]
pub struct LdaPosterior {
    /// users x topics
    pub theta: DMatrix<f64>,
    /// topics x items
    pub phi: DMatrix<f64>,
    pub alpha: DVector<f64>,
    pub beta: DVector<f64>,
    /// interactions the model was trained on
    pub train: InteractionMatrix,
}

impl LdaPosterior {
    pub fn new(
        theta: DMatrix<f64>,
        phi: DMatrix<f64>,
        alpha: DVector<f64>,
        beta: DVector<f64>,
        train: InteractionMatrix,
    ) -> Result<Self> {
        if theta.ncols() != phi.nrows() {
            return Err(LdaError::DimensionMismatch {
                expected: (theta.nrows(), phi.nrows()),
                actual: theta.shape(),
            });
        }
        if train.nrows() != theta.nrows() || train.ncols() != phi.ncols() {
            return Err(LdaError::DimensionMismatch {
                expected: (theta.nrows(), phi.ncols()),
                actual: (train.nrows(), train.ncols()),
            });
        }
        if alpha.len() != theta.ncols() || beta.len() != phi.ncols() {
            return Err(LdaError::DimensionMismatch {
                expected: (theta.ncols(), phi.ncols()),
                actual: (alpha.len(), beta.len()),
            });
        }
        Ok(LdaPosterior {
            theta,
            phi,
            alpha,
            beta,
            train,
        })
    }

    pub fn num_users(&self) -> usize {
        self.theta.nrows()
    }

    pub fn num_items(&self) -> usize {
        self.phi.ncols()
    }

    pub fn num_topics(&self) -> usize {
        self.theta.ncols()
    }

    /// `Σ_k θ[u,k] φ[k,i]`
    pub fn predict(&self, user: usize, item: usize) -> Result<f64> {
        if user >= self.num_users() || item >= self.num_items() {
            return Err(LdaError::IndexOutOfRange { user, item });
        }
        Ok(self.theta.row(user).transpose().dot(&self.phi.column(item)))
    }

    /// Scores of every item for one user
    pub fn predict_user(&self, user: usize) -> Result<Vec<f64>> {
        if user >= self.num_users() {
            return Err(LdaError::IndexOutOfRange { user, item: 0 });
        }
        let scores = self.theta.row(user) * &self.phi;
        Ok(scores.iter().copied().collect())
    }

    /// Top `top_n` items by decreasing score, ties broken by item index.
    ///
    /// * `exclude` - skip items this user already has here (e.g. training data)
    pub fn recommend(
        &self,
        user: usize,
        top_n: usize,
        exclude: Option<&InteractionMatrix>,
    ) -> Result<Vec<(usize, f64)>> {
        let scores = self.predict_user(user)?;

        let mut ranked: Vec<(usize, f64)> = scores
            .into_iter()
            .enumerate()
            .filter(|&(item, _)| exclude.is_none_or(|x| x.get(user, item) == 0))
            .collect();

        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked.truncate(top_n);
        Ok(ranked)
    }

    /// Write `{prefix}.{theta,phi,alpha,beta}.tsv.gz` and `{prefix}.train.mtx.gz`
    pub fn to_files(&self, prefix: &str) -> anyhow::Result<()> {
        mkdir(prefix)?;

        self.theta.write_with_dims(&(prefix.to_string() + ".theta.tsv.gz"))?;
        self.phi.write_with_dims(&(prefix.to_string() + ".phi.tsv.gz"))?;

        let alpha = DMatrix::from_row_slice(1, self.alpha.len(), self.alpha.as_slice());
        alpha.write_with_dims(&(prefix.to_string() + ".alpha.tsv.gz"))?;
        let beta = DMatrix::from_row_slice(1, self.beta.len(), self.beta.as_slice());
        beta.write_with_dims(&(prefix.to_string() + ".beta.tsv.gz"))?;

        self.train.to_mtx_file(&(prefix.to_string() + ".train.mtx.gz"))?;

        info!("wrote the model to {}.*", prefix);
        Ok(())
    }

    /// Read back what [`LdaPosterior::to_files`] wrote
    pub fn from_files(prefix: &str) -> anyhow::Result<Self> {
        let theta = DMatrix::<f64>::read_with_dims(&(prefix.to_string() + ".theta.tsv.gz"))?;
        let phi = DMatrix::<f64>::read_with_dims(&(prefix.to_string() + ".phi.tsv.gz"))?;

        if theta.ncols() != phi.nrows() {
            return Err(LdaError::DimensionMismatch {
                expected: (theta.nrows(), phi.nrows()),
                actual: theta.shape(),
            }
            .into());
        }

        let alpha = DMatrix::<f64>::read_with_dims(&(prefix.to_string() + ".alpha.tsv.gz"))?;
        let beta = DMatrix::<f64>::read_with_dims(&(prefix.to_string() + ".beta.tsv.gz"))?;
        let alpha = DVector::from_iterator(alpha.len(), alpha.transpose().iter().copied());
        let beta = DVector::from_iterator(beta.len(), beta.transpose().iter().copied());

        let train = InteractionMatrix::from_mtx_file(
            &(prefix.to_string() + ".train.mtx.gz"),
            Some((theta.nrows(), phi.ncols())),
        )?;

        Ok(Self::new(theta, phi, alpha, beta, train)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn toy() -> LdaPosterior {
        let theta = DMatrix::from_row_slice(2, 2, &[0.9, 0.1, 0.2, 0.8]);
        let phi = DMatrix::from_row_slice(2, 3, &[0.7, 0.2, 0.1, 0.1, 0.1, 0.8]);
        let train = InteractionMatrix::from_triplets(2, 3, &[(0, 0, 1.0), (1, 2, 2.0)])
            .expect("train");
        LdaPosterior::new(
            theta,
            phi,
            DVector::from_element(2, 0.5),
            DVector::from_element(3, 0.01),
            train,
        )
        .expect("posterior")
    }

    #[test]
    fn prediction_is_a_dot_product() -> anyhow::Result<()> {
        let model = toy();
        assert_abs_diff_eq!(model.predict(0, 0)?, 0.9 * 0.7 + 0.1 * 0.1, epsilon = 1e-12);
        assert_abs_diff_eq!(model.predict(1, 2)?, 0.2 * 0.1 + 0.8 * 0.8, epsilon = 1e-12);

        let row = model.predict_user(1)?;
        for (i, &s) in row.iter().enumerate() {
            assert_abs_diff_eq!(s, model.predict(1, i)?, epsilon = 1e-12);
        }

        assert_eq!(
            model.predict(2, 0).err(),
            Some(LdaError::IndexOutOfRange { user: 2, item: 0 })
        );
        Ok(())
    }

    #[test]
    fn recommend_skips_seen_items() -> anyhow::Result<()> {
        let model = toy();
        let all = model.recommend(0, 3, None)?;
        assert_eq!(all.iter().map(|x| x.0).collect::<Vec<_>>(), vec![0, 1, 2]);

        let unseen = model.recommend(0, 3, Some(&model.train))?;
        assert_eq!(unseen.iter().map(|x| x.0).collect::<Vec<_>>(), vec![1, 2]);

        let top1 = model.recommend(1, 1, None)?;
        assert_eq!(top1[0].0, 2);
        Ok(())
    }
}
