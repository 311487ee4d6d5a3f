//! User x item interaction counts.
//!
//! Each unit of count at a cell is one token occurrence. Tokens are
//! enumerated row-major: by user, then by increasing item index, then
//! by repetition within the cell. A user's tokens are therefore one
//! contiguous range of the assignment store.

use crate::error::{LdaError, Result};
use fnv::FnvHashMap as HashMap;
use matrix_util::mtx_io::{read_mtx_triplets, write_mtx_triplets};
use matrix_util::traits::MatTriplets;
use nalgebra_sparse::CsrMatrix;

#[derive(Debug, Clone)]
pub struct InteractionMatrix {
    counts: CsrMatrix<u32>,
    /// `token_offsets[u]..token_offsets[u+1]` are user u's tokens
    token_offsets: Vec<usize>,
}

impl InteractionMatrix {
    /// Build from (user, item, value) triplets.
    ///
    /// * `n_users` - declared number of users (rows)
    /// * `n_items` - declared number of items (columns)
    /// * `triplets` - duplicates are summed; fractional values are
    ///   truncated toward zero; a cell total must fit in `u32`
    pub fn from_triplets(
        n_users: usize,
        n_items: usize,
        triplets: &[(usize, usize, f64)],
    ) -> Result<Self> {
        let mut cells: HashMap<(usize, usize), u64> = HashMap::default();

        for &(row, col, value) in triplets {
            if row >= n_users || col >= n_items {
                return Err(LdaError::DimensionMismatch {
                    expected: (n_users, n_items),
                    actual: (row + 1, col + 1),
                });
            }
            if !value.is_finite() || value < 0.0 || value > u32::MAX as f64 {
                return Err(LdaError::InvalidCount { row, col, value });
            }
            *cells.entry((row, col)).or_default() += value.trunc() as u64;
        }

        let mut counts = Vec::with_capacity(cells.len());
        for ((row, col), count) in cells {
            let count = u32::try_from(count).map_err(|_| LdaError::InvalidCount {
                row,
                col,
                value: count as f64,
            })?;
            if count > 0 {
                counts.push((row, col, count));
            }
        }

        // indices were checked above
        let counts = CsrMatrix::<u32>::from_nonzero_triplets(n_users, n_items, counts).map_err(
            |_| LdaError::DimensionMismatch {
                expected: (n_users, n_items),
                actual: (n_users, n_items),
            },
        )?;

        Ok(Self::from_csr(counts))
    }

    /// Wrap an existing sparse count matrix
    pub fn from_csr(counts: CsrMatrix<u32>) -> Self {
        let mut token_offsets = Vec::with_capacity(counts.nrows() + 1);
        let mut acc = 0_usize;
        token_offsets.push(acc);
        for row in counts.row_iter() {
            acc += row.values().iter().map(|&c| c as usize).sum::<usize>();
            token_offsets.push(acc);
        }
        InteractionMatrix {
            counts,
            token_offsets,
        }
    }

    /// Read a MatrixMarket file.
    ///
    /// * `mtx_file` - `.mtx` or `.mtx.gz`
    /// * `dims` - declared (users, items); must cover the file's shape
    pub fn from_mtx_file(mtx_file: &str, dims: Option<(usize, usize)>) -> anyhow::Result<Self> {
        let (triplets, shape) = read_mtx_triplets(mtx_file)?;

        let (n_users, n_items) = match dims {
            Some((n_users, n_items)) => {
                if n_users < shape.nrow || n_items < shape.ncol {
                    return Err(LdaError::DimensionMismatch {
                        expected: (n_users, n_items),
                        actual: (shape.nrow, shape.ncol),
                    }
                    .into());
                }
                (n_users, n_items)
            }
            None => (shape.nrow, shape.ncol),
        };

        Ok(Self::from_triplets(n_users, n_items, &triplets)?)
    }

    /// Write down in MatrixMarket format with 1-based indices
    pub fn to_mtx_file(&self, mtx_file: &str) -> anyhow::Result<()> {
        write_mtx_triplets(&self.to_triplets(), self.nrows(), self.ncols(), mtx_file)
    }

    /// Non-zero entries in traversal order
    pub fn to_triplets(&self) -> Vec<(usize, usize, u32)> {
        self.counts.to_nonzero_triplets().2
    }

    pub fn nrows(&self) -> usize {
        self.counts.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.counts.ncols()
    }

    pub fn nnz(&self) -> usize {
        self.counts.nnz()
    }

    pub fn get(&self, user: usize, item: usize) -> u32 {
        if user >= self.nrows() || item >= self.ncols() {
            return 0;
        }
        self.counts
            .get_entry(user, item)
            .map(|x| x.into_value())
            .unwrap_or(0)
    }

    /// Total number of token occurrences
    pub fn total_mass(&self) -> usize {
        self.token_offsets[self.nrows()]
    }

    /// Number of tokens of one user
    pub fn user_mass(&self, user: usize) -> usize {
        self.token_offsets[user + 1] - self.token_offsets[user]
    }

    /// Range of assignment-store positions owned by `user`
    pub fn user_tokens(&self, user: usize) -> std::ops::Range<usize> {
        self.token_offsets[user]..self.token_offsets[user + 1]
    }

    /// (item, count) pairs of a user in increasing item order
    pub fn row_entries(&self, user: usize) -> impl Iterator<Item = (usize, u32)> + '_ {
        let offsets = self.counts.row_offsets();
        let (lb, ub) = (offsets[user], offsets[user + 1]);
        self.counts.col_indices()[lb..ub]
            .iter()
            .copied()
            .zip(self.counts.values()[lb..ub].iter().copied())
    }

    /// (user, item, count) in traversal order
    pub fn iter_nonzero(&self) -> impl Iterator<Item = (usize, usize, u32)> + '_ {
        self.counts.triplet_iter().map(|(u, i, &c)| (u, i, c))
    }
}
