use crate::common_io::*;
use log::warn;
use std::io::Write;

/// Write the triplets into a MatrixMarket file with 1-based indices
/// * `triplets` - the triplets to write (0-based)
/// * `nrow` - number of rows
/// * `ncol` - number of columns
/// * `mtx_file` - the output file (e.g., "matrix.mtx.gz")
pub fn write_mtx_triplets<V>(
    triplets: &[(usize, usize, V)],
    nrow: usize,
    ncol: usize,
    mtx_file: &str,
) -> anyhow::Result<()>
where
    V: std::fmt::Display,
{
    let mut buf = open_buf_writer(mtx_file)?;

    writeln!(buf, "%%MatrixMarket matrix coordinate real general")?;
    writeln!(buf, "{}\t{}\t{}", nrow, ncol, triplets.len())?;

    for (row, col, val) in triplets {
        writeln!(buf, "{}\t{}\t{}", row + 1, col + 1, val)?;
    }

    buf.flush()?;
    Ok(())
}

/// Shape recorded in a MatrixMarket size line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MtxShape {
    pub nrow: usize,
    pub ncol: usize,
    pub nnz: usize,
}

/// Read a matrix market file and return 0-based triplets sorted by
/// (row, col) together with the declared shape. Values are `f64` so
/// that integer counts above 2^24 stay exact.
/// * `mtx_file` - Path to the matrix market file
pub fn read_mtx_triplets(mtx_file: &str) -> anyhow::Result<(Vec<(usize, usize, f64)>, MtxShape)> {
    let out = read_lines_of_words(mtx_file, 0)?;

    if out.header.len() != 3 {
        return Err(anyhow::anyhow!("Failed to parse mtx header in {}", mtx_file));
    }

    let shape = MtxShape {
        nrow: out.header[0].parse::<usize>()?,
        ncol: out.header[1].parse::<usize>()?,
        nnz: out.header[2].parse::<usize>()?,
    };

    let mut triplets = Vec::with_capacity(out.lines.len());

    for words in out.lines.iter() {
        if words.len() != 3 {
            return Err(anyhow::anyhow!("expected `row col value`, got {:?}", words));
        }
        let row = words[0].parse::<usize>()?;
        let col = words[1].parse::<usize>()?;
        let val = words[2].parse::<f64>()?;

        if row == 0 || col == 0 || row > shape.nrow || col > shape.ncol {
            return Err(anyhow::anyhow!(
                "entry ({}, {}) outside the declared {} x {} shape",
                row,
                col,
                shape.nrow,
                shape.ncol
            ));
        }
        triplets.push((row - 1, col - 1, val));
    }

    if triplets.len() != shape.nnz {
        warn!(
            "{}: declared {} non-zero elements, but found {}",
            mtx_file,
            shape.nnz,
            triplets.len()
        );
    }

    triplets.sort_by_key(|&(row, col, _)| (row, col));
    Ok((triplets, shape))
}
