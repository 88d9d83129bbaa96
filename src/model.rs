//! Ownership of a trained foreign model.
//!
//! The solver may keep pointers into the parameter block (class weights,
//! warm start) and, depending on the implementation, into the problem. A
//! [`Model`] therefore owns every buffer it handed over and releases the
//! foreign handle before any of them.
use std::hash::Hash;
use std::ptr::NonNull;

use log::{debug, info};

use crate::config::{SolverType, TrainOptions};
use crate::error::{Error, Result};
use crate::labels::LabelIndex;
use crate::nodes::FeatureMatrix;
use crate::problem::{build_problem, BuiltProblem, SolverParameters, TrainingProblem};
use crate::solver::ffi;
use crate::solver::SolverBinding;

/// A trained model. Not `Clone`: the foreign handle is released exactly
/// once, when the value is dropped.
///
/// A released model cannot be used again:
///
/// ```compile_fail,E0382
/// use redeem_linear::math::Array2;
/// use redeem_linear::testing::reference_binding;
/// use redeem_linear::{predict, train_with, PredictOptions, TrainOptions};
///
/// let x = Array2::from_shape_vec((2, 1), vec![0.0, 10.0]).unwrap();
/// let model = train_with(reference_binding(), &[1, 2], &x, &TrainOptions::default()).unwrap();
/// drop(model);
/// predict(&model, &x, &PredictOptions::default()).unwrap();
/// ```
pub struct Model<L> {
    raw: NonNull<ffi::RawModel>,
    binding: &'static SolverBinding,
    // Boxed so the addresses passed to `train` never move.
    #[allow(dead_code)]
    raw_parameter: Box<ffi::Parameter>,
    #[allow(dead_code)]
    raw_problem: Box<ffi::Problem>,
    problem: TrainingProblem,
    parameters: SolverParameters,
    labels: LabelIndex<L>,
    n_features: usize,
    bias: f64,
}

// SAFETY: the handle and the raw blocks are only read after training, and
// every foreign call on them goes through the binding's call lock.
unsafe impl<L: Send> Send for Model<L> {}
unsafe impl<L: Sync> Sync for Model<L> {}

impl<L> Model<L> {
    /// Input feature count the model was trained on, bias column excluded.
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn bias(&self) -> f64 {
        self.bias
    }

    pub fn solver_type(&self) -> SolverType {
        self.parameters.solver_type()
    }

    /// Known labels, ordered by class code.
    pub fn labels(&self) -> &LabelIndex<L> {
        &self.labels
    }

    pub fn problem(&self) -> &TrainingProblem {
        &self.problem
    }

    pub fn parameters(&self) -> &SolverParameters {
        &self.parameters
    }

    pub fn binding(&self) -> &'static SolverBinding {
        self.binding
    }

    pub(crate) fn raw(&self) -> *const ffi::RawModel {
        self.raw.as_ptr()
    }
}

impl<L> Drop for Model<L> {
    fn drop(&mut self) {
        debug!(
            "releasing model (solver '{}', {} classes)",
            self.binding.name(),
            self.labels.len()
        );
        let raw = self.raw.as_ptr();
        // SAFETY: `raw` came from this binding's `train` and is released
        // only here. The boxed blocks and buffers are dropped afterwards.
        self.binding
            .call(false, |calls| unsafe { (calls.free_model_content())(raw) });
    }
}

impl<L> std::fmt::Debug for Model<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Model")
            .field("solver", &self.binding.name())
            .field("solver_type", &self.parameters.solver_type())
            .field("n_classes", &self.labels.len())
            .field("n_features", &self.n_features)
            .field("bias", &self.bias)
            .finish_non_exhaustive()
    }
}

/// Train a model with the given solver.
pub fn train_with<L, M>(
    binding: &'static SolverBinding,
    labels: &[L],
    matrix: &M,
    options: &TrainOptions<L>,
) -> Result<Model<L>>
where
    L: Clone + Eq + Hash + Ord,
    M: FeatureMatrix,
{
    let BuiltProblem {
        problem,
        parameters,
        labels: label_index,
    } = build_problem(labels, matrix, options)?;

    let raw_problem = Box::new(problem.to_ffi());
    let raw_parameter = Box::new(parameters.to_ffi());

    info!(
        "Training {} on {} instances x {} features ({} classes)",
        parameters.solver_type(),
        problem.n_instances(),
        matrix.n_features(),
        label_index.len()
    );
    let prob_ptr: *const ffi::Problem = &*raw_problem;
    let param_ptr: *const ffi::Parameter = &*raw_parameter;
    // SAFETY: both blocks and everything they point to are owned by the
    // model built below, which outlives the returned handle.
    let raw = binding.call(options.verbose, |calls| unsafe {
        (calls.train())(prob_ptr, param_ptr)
    });
    let raw = NonNull::new(raw).ok_or_else(|| {
        Error::Training(format!("solver '{}' returned no model", binding.name()))
    })?;

    Ok(Model {
        raw,
        binding,
        raw_parameter,
        raw_problem,
        problem,
        parameters,
        labels: label_index,
        n_features: matrix.n_features(),
        bias: options.bias,
    })
}

/// Train a model with the LIBLINEAR library linked into the process.
#[cfg(feature = "liblinear")]
pub fn train<L, M>(labels: &[L], matrix: &M, options: &TrainOptions<L>) -> Result<Model<L>>
where
    L: Clone + Eq + Hash + Ord,
    M: FeatureMatrix,
{
    train_with(SolverBinding::linked(), labels, matrix, options)
}
