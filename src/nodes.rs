//! Conversion of instance matrices into the solver's sparse row format.
//!
//! All rows of one matrix share a single node buffer. The buffer is sized up
//! front, filled once and frozen before any row pointer is taken, so the
//! pointer table handed to the solver stays valid for as long as the
//! [`FeatureRows`] value lives, wherever that value is moved.
use log::{debug, warn};
use ndarray::{ArrayBase, Data, Ix2};

use crate::error::{Error, Result};
use crate::math::{Array2, CsrMatrix};
use crate::solver::ffi::FeatureNode;

/// A matrix whose rows are instances and columns features.
pub trait FeatureMatrix {
    fn n_instances(&self) -> usize;

    fn n_features(&self) -> usize;

    /// Total number of entries [`FeatureMatrix::for_each_entry`] visits
    /// across all rows.
    fn stored_entries(&self) -> usize;

    /// Visit the entries of `row` as `(column, value)`, columns 0-based and
    /// strictly increasing.
    fn for_each_entry<F: FnMut(usize, f64)>(&self, row: usize, f: F);
}

/// Dense rows emit every column, zeros included.
impl FeatureMatrix for Array2<f64> {
    fn n_instances(&self) -> usize {
        self.nrows()
    }

    fn n_features(&self) -> usize {
        self.ncols()
    }

    fn stored_entries(&self) -> usize {
        self.nrows() * self.ncols()
    }

    fn for_each_entry<F: FnMut(usize, f64)>(&self, row: usize, mut f: F) {
        for (col, &value) in self.row_slice(row).iter().enumerate() {
            f(col, value);
        }
    }
}

impl<S> FeatureMatrix for ArrayBase<S, Ix2>
where
    S: Data<Elem = f64>,
{
    fn n_instances(&self) -> usize {
        self.nrows()
    }

    fn n_features(&self) -> usize {
        self.ncols()
    }

    fn stored_entries(&self) -> usize {
        self.len()
    }

    fn for_each_entry<F: FnMut(usize, f64)>(&self, row: usize, mut f: F) {
        for (col, &value) in self.row(row).iter().enumerate() {
            f(col, value);
        }
    }
}

/// Sparse rows emit only stored entries, in stored order.
impl FeatureMatrix for CsrMatrix {
    fn n_instances(&self) -> usize {
        self.nrows()
    }

    fn n_features(&self) -> usize {
        self.ncols()
    }

    fn stored_entries(&self) -> usize {
        self.nnz()
    }

    fn for_each_entry<F: FnMut(usize, f64)>(&self, row: usize, mut f: F) {
        let (cols, values) = self.row(row);
        for (&col, &value) in cols.iter().zip(values) {
            f(col, value);
        }
    }
}

/// Encoded rows plus the pointer table the solver reads them through.
#[derive(Debug)]
pub struct FeatureRows {
    nodes: Box<[FeatureNode]>,
    starts: Box<[usize]>,
    pointers: Box<[*const FeatureNode]>,
    n_features: usize,
}

// SAFETY: every pointer targets `nodes`, a heap buffer owned by the same
// value and never mutated after construction.
unsafe impl Send for FeatureRows {}
unsafe impl Sync for FeatureRows {}

impl FeatureRows {
    /// Number of rows.
    pub fn len(&self) -> usize {
        self.pointers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pointers.is_empty()
    }

    /// Feature count as the solver sees it, bias column included.
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Nodes of row `i`, sentinel included.
    pub fn row(&self, i: usize) -> &[FeatureNode] {
        &self.nodes[self.starts[i]..self.starts[i + 1]]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[FeatureNode]> + '_ {
        (0..self.len()).map(move |i| self.row(i))
    }

    /// Size of the shared node buffer.
    pub fn total_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn row_ptr(&self, i: usize) -> *const FeatureNode {
        self.pointers[i]
    }

    pub(crate) fn as_ptr(&self) -> *const *const FeatureNode {
        self.pointers.as_ptr()
    }
}

/// Encode every row of `matrix`.
///
/// When `bias >= 0` each row gets a trailing `(n_features + 1, bias)` node.
/// Values, NaN included, are copied as they are.
pub fn encode_rows<M>(matrix: &M, bias: f64) -> Result<FeatureRows>
where
    M: FeatureMatrix,
{
    let n_rows = matrix.n_instances();
    let n_cols = matrix.n_features();
    let with_bias = bias >= 0.0;
    let n_features = n_cols + usize::from(with_bias);
    if i32::try_from(n_features).is_err() {
        return Err(Error::Configuration(format!(
            "{} features exceed the solver's index range",
            n_features
        )));
    }

    let per_row = 1 + usize::from(with_bias);
    let total = matrix.stored_entries() + n_rows * per_row;
    debug!(
        "encoding {} rows x {} features into {} nodes (bias: {})",
        n_rows, n_cols, total, with_bias
    );

    let mut nodes = Vec::with_capacity(total);
    let mut starts = Vec::with_capacity(n_rows + 1);
    let mut non_finite = 0usize;
    for row in 0..n_rows {
        starts.push(nodes.len());
        matrix.for_each_entry(row, |col, value| {
            non_finite += usize::from(!value.is_finite());
            nodes.push(FeatureNode::new(col as i32 + 1, value));
        });
        if with_bias {
            nodes.push(FeatureNode::new(n_cols as i32 + 1, bias));
        }
        nodes.push(FeatureNode::sentinel());
    }
    starts.push(nodes.len());
    if non_finite > 0 {
        warn!("{} non-finite feature values passed to the solver as-is", non_finite);
    }
    debug_assert_eq!(nodes.len(), total, "stored_entries disagrees with for_each_entry");

    // Freeze before deriving pointers.
    let nodes = nodes.into_boxed_slice();
    let pointers = starts[..n_rows]
        .iter()
        .map(|&start| &nodes[start] as *const FeatureNode)
        .collect();

    Ok(FeatureRows {
        nodes,
        starts: starts.into_boxed_slice(),
        pointers,
        n_features,
    })
}
