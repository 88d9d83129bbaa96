//! Assembly of the training problem and the solver parameter block.
use std::hash::Hash;
use std::ptr;

use log::{debug, warn};

use crate::config::{SolverType, TrainOptions};
use crate::error::{Error, Result};
use crate::labels::LabelIndex;
use crate::nodes::{encode_rows, FeatureMatrix, FeatureRows};
use crate::solver::ffi;

/// Training instances in solver form: encoded rows and one class code per
/// row.
#[derive(Debug)]
pub struct TrainingProblem {
    targets: Vec<f64>,
    rows: FeatureRows,
    bias: f64,
}

impl TrainingProblem {
    pub fn n_instances(&self) -> usize {
        self.rows.len()
    }

    /// Feature count handed to the solver, bias column included.
    pub fn n_features(&self) -> usize {
        self.rows.n_features()
    }

    /// Class codes as the solver reads them.
    pub fn targets(&self) -> &[f64] {
        &self.targets
    }

    pub fn rows(&self) -> &FeatureRows {
        &self.rows
    }

    pub fn bias(&self) -> f64 {
        self.bias
    }

    /// C view of this problem. Its pointers are valid while `self` lives.
    pub(crate) fn to_ffi(&self) -> ffi::Problem {
        ffi::Problem {
            l: self.n_instances() as i32,
            n: self.n_features() as i32,
            y: self.targets.as_ptr(),
            x: self.rows.as_ptr(),
            bias: self.bias,
        }
    }
}

/// Solver settings with class weights already translated to codes.
#[derive(Debug, Clone, PartialEq)]
pub struct SolverParameters {
    solver_type: SolverType,
    eps: f64,
    c: f64,
    p: f64,
    weight_labels: Vec<i32>,
    weights: Vec<f64>,
    init_sol: Option<Vec<f64>>,
}

impl SolverParameters {
    pub fn solver_type(&self) -> SolverType {
        self.solver_type
    }

    pub fn eps(&self) -> f64 {
        self.eps
    }

    pub fn c(&self) -> f64 {
        self.c
    }

    pub fn p(&self) -> f64 {
        self.p
    }

    /// Class codes the weights apply to, parallel to [`Self::weights`].
    pub fn weight_labels(&self) -> &[i32] {
        &self.weight_labels
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn init_sol(&self) -> Option<&[f64]> {
        self.init_sol.as_deref()
    }

    /// C view of these parameters. Empty weight arrays become null pointers
    /// with a zero count. Pointers are valid while `self` lives.
    pub(crate) fn to_ffi(&self) -> ffi::Parameter {
        let (weight_label, weight) = if self.weights.is_empty() {
            (ptr::null(), ptr::null())
        } else {
            (self.weight_labels.as_ptr(), self.weights.as_ptr())
        };
        ffi::Parameter {
            solver_type: self.solver_type.code(),
            eps: self.eps,
            C: self.c,
            nr_weight: self.weights.len() as i32,
            weight_label,
            weight,
            p: self.p,
            init_sol: self.init_sol.as_ref().map_or(ptr::null(), |w| w.as_ptr()),
        }
    }
}

/// Everything the foreign `train` call needs, still owned on this side.
#[derive(Debug)]
pub struct BuiltProblem<L> {
    pub problem: TrainingProblem,
    pub parameters: SolverParameters,
    pub labels: LabelIndex<L>,
}

/// Validate the inputs and build the problem, parameter block and label
/// index for one training run.
pub fn build_problem<L, M>(
    labels: &[L],
    matrix: &M,
    options: &TrainOptions<L>,
) -> Result<BuiltProblem<L>>
where
    L: Clone + Eq + Hash + Ord,
    M: FeatureMatrix,
{
    if matrix.n_instances() != labels.len() {
        return Err(Error::DimensionMismatch {
            what: "number of labels vs. number of instances",
            expected: labels.len(),
            found: matrix.n_instances(),
        });
    }
    if labels.is_empty() {
        return Err(Error::Configuration("no training instances".to_string()));
    }
    if i32::try_from(labels.len()).is_err() {
        return Err(Error::Configuration(format!(
            "{} instances exceed the solver's index range",
            labels.len()
        )));
    }
    validate_options(options)?;

    let (codes, mut label_index) = LabelIndex::encode(labels);
    let weight_labels = label_index.encode_extra(options.weights.keys());
    let weights: Vec<f64> = options.weights.values().copied().collect();
    let n_seen = codes.iter().copied().max().unwrap_or(0) as usize;
    if label_index.len() > n_seen {
        warn!(
            "{} weighted label(s) do not occur in the training data",
            label_index.len() - n_seen
        );
    }

    let rows = encode_rows(matrix, options.bias)?;
    if let Some(init) = &options.init_sol {
        if init.len() != rows.n_features() {
            return Err(Error::Configuration(format!(
                "init_sol has {} values but the problem has {} features",
                init.len(),
                rows.n_features()
            )));
        }
    }

    let problem = TrainingProblem {
        targets: codes.into_iter().map(f64::from).collect(),
        rows,
        bias: options.bias,
    };
    let parameters = SolverParameters {
        solver_type: options.solver_type,
        eps: options.effective_eps(),
        c: options.c,
        p: options.p,
        weight_labels,
        weights,
        init_sol: options.init_sol.clone(),
    };
    debug!(
        "built problem: l={}, n={}, classes={}, solver={}, eps={}, C={}",
        problem.n_instances(),
        problem.n_features(),
        label_index.len(),
        parameters.solver_type,
        parameters.eps,
        parameters.c
    );

    Ok(BuiltProblem {
        problem,
        parameters,
        labels: label_index,
    })
}

fn validate_options<L>(options: &TrainOptions<L>) -> Result<()> {
    if !(options.c > 0.0) {
        return Err(Error::Configuration(format!(
            "C must be positive, got {}",
            options.c
        )));
    }
    if let Some(eps) = options.eps {
        if !(eps > 0.0) {
            return Err(Error::Configuration(format!(
                "eps must be positive, got {}",
                eps
            )));
        }
    }
    if !(options.p >= 0.0) {
        return Err(Error::Configuration(format!(
            "p must be non-negative, got {}",
            options.p
        )));
    }
    if options.weights.values().any(|w| !w.is_finite()) {
        return Err(Error::Configuration(
            "class weights must be finite".to_string(),
        ));
    }
    if options.init_sol.is_some() && !options.solver_type.supports_warm_start() {
        return Err(Error::Configuration(format!(
            "solver {} does not accept an initial solution",
            options.solver_type
        )));
    }
    Ok(())
}
