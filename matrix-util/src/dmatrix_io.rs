use crate::common_io::{read_lines_of_types, write_lines};
use crate::traits::*;
pub use nalgebra::{DMatrix, DVector};

use std::fmt::{Debug, Display};
use std::str::FromStr;

fn format_rows<T>(mat: &DMatrix<T>) -> Vec<Box<str>>
where
    T: nalgebra::Scalar + Display,
{
    // keep this sequential; the row order is the file order
    mat.row_iter()
        .map(|row| {
            row.iter()
                .map(|x| format!("{}", x))
                .collect::<Vec<_>>()
                .join("\t")
                .into_boxed_str()
        })
        .collect()
}

impl<T> DimIoOps for DMatrix<T>
where
    T: nalgebra::Scalar + Send + FromStr + Display + Copy,
    <T as FromStr>::Err: Debug,
{
    type Mat = Self;

    fn write_with_dims(&self, file: &str) -> anyhow::Result<()> {
        let mut lines: Vec<Box<str>> = Vec::with_capacity(self.nrows() + 1);
        lines.push(format!("{}\t{}", self.nrows(), self.ncols()).into_boxed_str());
        lines.extend(format_rows(self));
        write_lines(&lines, file)
    }

    fn read_with_dims(file: &str) -> anyhow::Result<Self::Mat> {
        let out = read_lines_of_types::<T>(file, "\t", 0)?;

        if out.header.len() != 2 {
            return Err(anyhow::anyhow!("expected `nrow ncol` header in {}", file));
        }

        let nrows = out.header[0].parse::<usize>()?;
        let ncols = out.header[1].parse::<usize>()?;

        if out.lines.len() != nrows || out.lines.iter().any(|x| x.len() != ncols) {
            return Err(anyhow::anyhow!(
                "{}: header says {} x {}, but found {} rows",
                file,
                nrows,
                ncols,
                out.lines.len()
            ));
        }

        let data = out.lines.into_iter().flatten().collect::<Vec<_>>();
        Ok(DMatrix::<T>::from_row_iterator(nrows, ncols, data))
    }
}
