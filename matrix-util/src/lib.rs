pub mod common_io; // gz-aware line readers and writers
pub mod dmatrix_io; // dense matrix files
pub mod mtx_io; // MatrixMarket triplets
pub mod sparse_util; // sparse matrix triplets utils
pub mod traits;
