use crate::error::{Error, Result};
use crate::math::Array2;

/// Compressed sparse row matrix. Rows are instances.
///
/// Only explicitly stored entries are handed to the solver. Column indices
/// are strictly increasing within a row, 0-based here, and become 1-based
/// feature indices when encoded.
#[derive(Clone, Debug, PartialEq)]
pub struct CsrMatrix {
    ncols: usize,
    indptr: Vec<usize>,
    indices: Vec<usize>,
    values: Vec<f64>,
}

impl CsrMatrix {
    /// Assemble a matrix from raw CSR buffers.
    ///
    /// `indptr` must start at zero, be non-decreasing and end at the number
    /// of stored entries. Every column index must be below `ncols`, and the
    /// indices of a row must be strictly increasing.
    pub fn new(
        ncols: usize,
        indptr: Vec<usize>,
        indices: Vec<usize>,
        values: Vec<f64>,
    ) -> Result<Self> {
        if indices.len() != values.len() {
            return Err(Error::DimensionMismatch {
                what: "CSR values vs. column indices",
                expected: indices.len(),
                found: values.len(),
            });
        }
        match (indptr.first(), indptr.last()) {
            (Some(&0), Some(&last)) if last == indices.len() => {}
            _ => {
                return Err(Error::Configuration(format!(
                    "CSR row pointers must run from 0 to {} stored entries",
                    indices.len()
                )))
            }
        }
        if indptr.windows(2).any(|w| w[0] > w[1]) {
            return Err(Error::Configuration(
                "CSR row pointers must be non-decreasing".to_string(),
            ));
        }
        if let Some(&col) = indices.iter().find(|&&c| c >= ncols) {
            return Err(Error::Configuration(format!(
                "column index {} out of bounds for {} columns",
                col, ncols
            )));
        }
        for (row, bounds) in indptr.windows(2).enumerate() {
            let cols = &indices[bounds[0]..bounds[1]];
            if let Some(pair) = cols.windows(2).find(|pair| pair[0] >= pair[1]) {
                return Err(Error::Configuration(format!(
                    "column indices of row {} must be strictly increasing, found {} after {}",
                    row, pair[1], pair[0]
                )));
            }
        }
        Ok(Self {
            ncols,
            indptr,
            indices,
            values,
        })
    }

    /// An all-empty matrix with `nrows` rows.
    pub fn empty(nrows: usize, ncols: usize) -> Self {
        Self {
            ncols,
            indptr: vec![0; nrows + 1],
            indices: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Keep the non-zero entries of a dense matrix.
    pub fn from_dense(dense: &Array2<f64>) -> Self {
        let mut indptr = Vec::with_capacity(dense.nrows() + 1);
        let mut indices = Vec::new();
        let mut values = Vec::new();
        indptr.push(0);
        for r in 0..dense.nrows() {
            for (c, &v) in dense.row_slice(r).iter().enumerate() {
                if v != 0.0 {
                    indices.push(c);
                    values.push(v);
                }
            }
            indptr.push(indices.len());
        }
        Self {
            ncols: dense.ncols(),
            indptr,
            indices,
            values,
        }
    }

    pub fn nrows(&self) -> usize {
        self.indptr.len() - 1
    }

    pub fn ncols(&self) -> usize {
        self.ncols
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.nrows(), self.ncols)
    }

    /// Number of explicitly stored entries.
    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    /// Column indices and values stored for `row`.
    pub fn row(&self, row: usize) -> (&[usize], &[f64]) {
        let (start, end) = (self.indptr[row], self.indptr[row + 1]);
        (&self.indices[start..end], &self.values[start..end])
    }
}
