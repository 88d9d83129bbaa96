//! Input matrix types accepted by the encoder.
//!
//! `Array2` is a dense row-major matrix (rows are instances, columns are
//! features). `CsrMatrix` stores only the explicit entries of each row in
//! compressed sparse row form.
pub mod matrix;
pub mod sparse;

pub use matrix::{Array2, ShapeError};
pub use sparse::CsrMatrix;
