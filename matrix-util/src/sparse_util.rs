use crate::traits::MatTriplets;
use nalgebra::{ClosedAddAssign, Scalar};
use nalgebra_sparse::{coo::CooMatrix, csr::CsrMatrix};
use num_traits::Zero;

impl<T> MatTriplets for CsrMatrix<T>
where
    T: Scalar + Zero + ClosedAddAssign + Copy,
{
    type Mat = Self;
    type Scalar = T;

    /// Duplicated (row, col) pairs are summed
    fn from_nonzero_triplets<I>(
        nrow: usize,
        ncol: usize,
        triplets: Vec<(I, I, T)>,
    ) -> anyhow::Result<Self::Mat>
    where
        I: TryInto<usize> + Copy,
        <I as TryInto<usize>>::Error: std::fmt::Debug,
    {
        let mut coo = CooMatrix::<T>::new(nrow, ncol);
        for (ii, jj, x_ij) in triplets {
            let ii: usize = ii
                .try_into()
                .map_err(|e| anyhow::anyhow!("bad row index: {:?}", e))?;
            let jj: usize = jj
                .try_into()
                .map_err(|e| anyhow::anyhow!("bad column index: {:?}", e))?;
            if ii >= nrow || jj >= ncol {
                return Err(anyhow::anyhow!(
                    "({}, {}) is outside {} x {}",
                    ii,
                    jj,
                    nrow,
                    ncol
                ));
            }
            coo.push(ii, jj, x_ij);
        }
        Ok(CsrMatrix::from(&coo))
    }

    /// Row-major order: by row, then by increasing column
    fn to_nonzero_triplets(&self) -> (usize, usize, Vec<(usize, usize, T)>) {
        let triplets = self
            .triplet_iter()
            .map(|(i, j, &x)| (i, j, x))
            .collect::<Vec<_>>();
        (self.nrows(), self.ncols(), triplets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicates_are_summed_in_row_major_order() -> anyhow::Result<()> {
        let csr = CsrMatrix::<u32>::from_nonzero_triplets(
            2,
            3,
            vec![(1_usize, 2_usize, 1_u32), (0, 1, 2), (1, 2, 3), (0, 0, 1)],
        )?;

        let (nrow, ncol, triplets) = csr.to_nonzero_triplets();
        assert_eq!((nrow, ncol), (2, 3));
        assert_eq!(triplets, vec![(0, 0, 1), (0, 1, 2), (1, 2, 4)]);
        Ok(())
    }

    #[test]
    fn out_of_range_index_fails() {
        let out = CsrMatrix::<u32>::from_nonzero_triplets(2, 2, vec![(2_usize, 0_usize, 1_u32)]);
        assert!(out.is_err());
    }
}
