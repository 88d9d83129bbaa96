//! In-process reference solver behind the LIBLINEAR C ABI.
//!
//! The reference solver is a nearest-centroid classifier. It reads problems
//! only through the raw `problem`/`parameter`/`feature_node` pointers, so
//! using it exercises exactly the marshalling a real LIBLINEAR sees, without
//! the native library being installed.
//!
//! Like LIBLINEAR, it answers a probability request on a model that is not
//! logistic regression with class 0 and leaves the output buffer untouched.
//!
//! Each thread keeps its own record of the last train call and of the number
//! of predict and release calls, which keeps parallel tests independent.
//!
//! ```
//! use redeem_linear::math::Array2;
//! use redeem_linear::testing::reference_binding;
//! use redeem_linear::{predict, train_with, PredictOptions, TrainOptions};
//!
//! let x = Array2::from_shape_vec((4, 1), vec![0.0, 0.0, 10.0, 10.0]).unwrap();
//! let model = train_with(reference_binding(), &[1, 1, 2, 2], &x, &TrainOptions::default()).unwrap();
//! let query = Array2::from_shape_vec((2, 1), vec![0.0, 10.0]).unwrap();
//! let labels: Vec<i32> = predict(&model, &query, &PredictOptions::default())
//!     .unwrap()
//!     .into_iter()
//!     .map(|p| p.label)
//!     .collect();
//! assert_eq!(labels, vec![1, 2]);
//! ```
use std::cell::{Cell, RefCell};
use std::ffi::CString;
use std::slice;
use std::sync::Mutex;

use once_cell::sync::Lazy;

use crate::config::SolverType;
use crate::solver::ffi::{FeatureNode, Parameter, PrintStringFn, Problem, RawModel};
use crate::solver::SolverBinding;

/// What crossed the boundary in a train call, copied out of the raw blocks.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainCall {
    pub l: i32,
    pub n: i32,
    pub bias: f64,
    pub targets: Vec<f64>,
    pub rows: Vec<Vec<(i32, f64)>>,
    pub solver_type: i32,
    pub eps: f64,
    pub c: f64,
    pub p: f64,
    pub weight_labels: Vec<i32>,
    pub weights: Vec<f64>,
    pub init_sol: Option<Vec<f64>>,
}

thread_local! {
    static LAST_TRAIN: RefCell<Option<TrainCall>> = const { RefCell::new(None) };
    static PREDICT_CALLS: Cell<usize> = const { Cell::new(0) };
    static RELEASED: Cell<usize> = const { Cell::new(0) };
}

static PRINT_HOOK: Mutex<Option<PrintStringFn>> = Mutex::new(None);

/// The last train call made on this thread.
pub fn last_train_call() -> Option<TrainCall> {
    LAST_TRAIN.with(|c| c.borrow().clone())
}

/// Predict calls (values or probability) made on this thread so far.
pub fn predict_calls() -> usize {
    PREDICT_CALLS.with(Cell::get)
}

/// Models released on this thread so far.
pub fn released_models() -> usize {
    RELEASED.with(Cell::get)
}

struct CentroidModel {
    solver_type: i32,
    n: usize,
    classes: Vec<i32>,
    centroids: Vec<Vec<f64>>,
}

impl CentroidModel {
    /// Negative squared distance to each centroid, in class order.
    fn scores(&self, x: &[(i32, f64)]) -> Vec<f64> {
        let mut point = vec![0.0; self.n];
        for &(index, value) in x {
            // features beyond the trained width are ignored, as in LIBLINEAR
            if index >= 1 && (index as usize) <= self.n {
                point[index as usize - 1] = value;
            }
        }
        self.centroids
            .iter()
            .map(|c| {
                -c.iter()
                    .zip(&point)
                    .map(|(a, b)| (a - b) * (a - b))
                    .sum::<f64>()
            })
            .collect()
    }

    fn best(&self, scores: &[f64]) -> f64 {
        let mut best = 0;
        for (k, s) in scores.iter().enumerate() {
            if *s > scores[best] {
                best = k;
            }
        }
        self.classes.get(best).map_or(0.0, |&c| f64::from(c))
    }
}

fn emit(message: &str) {
    let hook = *PRINT_HOOK.lock().unwrap_or_else(|e| e.into_inner());
    if let (Some(hook), Ok(text)) = (hook, CString::new(message)) {
        hook(text.as_ptr());
    }
}

/// Read one sentinel-terminated row.
///
/// # Safety
///
/// `x` must point at a row ending in a sentinel node.
unsafe fn read_row(mut x: *const FeatureNode) -> Vec<(i32, f64)> {
    let mut row = Vec::new();
    while !(*x).is_sentinel() {
        row.push(((*x).index, (*x).value));
        x = x.add(1);
    }
    row
}

unsafe fn slice_or_empty<'a, T>(ptr: *const T, len: i32) -> &'a [T] {
    if ptr.is_null() || len <= 0 {
        &[]
    } else {
        slice::from_raw_parts(ptr, len as usize)
    }
}

unsafe extern "C" fn reference_train(prob: *const Problem, param: *const Parameter) -> *mut RawModel {
    let (prob, param) = (&*prob, &*param);
    let targets = slice_or_empty(prob.y, prob.l).to_vec();
    let rows: Vec<Vec<(i32, f64)>> = slice_or_empty(prob.x, prob.l)
        .iter()
        .map(|&row| read_row(row))
        .collect();
    let call = TrainCall {
        l: prob.l,
        n: prob.n,
        bias: prob.bias,
        targets,
        rows,
        solver_type: param.solver_type,
        eps: param.eps,
        c: param.C,
        p: param.p,
        weight_labels: slice_or_empty(param.weight_label, param.nr_weight).to_vec(),
        weights: slice_or_empty(param.weight, param.nr_weight).to_vec(),
        init_sol: (!param.init_sol.is_null())
            .then(|| slice_or_empty(param.init_sol, prob.n).to_vec()),
    };

    let n = prob.n.max(0) as usize;
    let mut classes: Vec<i32> = Vec::new();
    let mut sums: Vec<Vec<f64>> = Vec::new();
    let mut counts: Vec<f64> = Vec::new();
    for (&y, row) in call.targets.iter().zip(&call.rows) {
        let class = y as i32;
        let k = match classes.iter().position(|&c| c == class) {
            Some(k) => k,
            None => {
                classes.push(class);
                sums.push(vec![0.0; n]);
                counts.push(0.0);
                classes.len() - 1
            }
        };
        for &(index, value) in row {
            if index >= 1 && (index as usize) <= n {
                sums[k][index as usize - 1] += value;
            }
        }
        counts[k] += 1.0;
    }
    let centroids = sums
        .into_iter()
        .zip(&counts)
        .map(|(sum, &count)| sum.into_iter().map(|v| v / count).collect())
        .collect();

    emit(&format!(
        "reference solver: l = {}, n = {}, classes = {}\n",
        call.l,
        call.n,
        classes.len()
    ));
    let give_up = !call.c.is_finite();
    let solver_type = call.solver_type;
    LAST_TRAIN.with(|c| *c.borrow_mut() = Some(call));
    if give_up {
        return std::ptr::null_mut();
    }

    let model = Box::new(CentroidModel {
        solver_type,
        n,
        classes,
        centroids,
    });
    Box::into_raw(model).cast::<RawModel>()
}

unsafe extern "C" fn reference_predict_values(
    model: *const RawModel,
    x: *const FeatureNode,
    dec_values: *mut f64,
) -> f64 {
    PREDICT_CALLS.with(|c| c.set(c.get() + 1));
    let model = &*model.cast::<CentroidModel>();
    let scores = model.scores(&read_row(x));
    slice::from_raw_parts_mut(dec_values, scores.len()).copy_from_slice(&scores);
    model.best(&scores)
}

unsafe extern "C" fn reference_predict_probability(
    model: *const RawModel,
    x: *const FeatureNode,
    prob_estimates: *mut f64,
) -> f64 {
    PREDICT_CALLS.with(|c| c.set(c.get() + 1));
    let model = &*model.cast::<CentroidModel>();
    // only logistic regression models have probabilities
    let has_probabilities = SolverType::try_from(model.solver_type)
        .map_or(false, SolverType::supports_probability);
    if !has_probabilities {
        return 0.0;
    }
    let scores = model.scores(&read_row(x));
    let top = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exp: Vec<f64> = scores.iter().map(|s| (s - top).exp()).collect();
    let total: f64 = exp.iter().sum();
    let probs: Vec<f64> = exp.iter().map(|e| e / total).collect();
    slice::from_raw_parts_mut(prob_estimates, probs.len()).copy_from_slice(&probs);
    model.best(&scores)
}

unsafe extern "C" fn reference_free_model_content(model: *mut RawModel) {
    RELEASED.with(|c| c.set(c.get() + 1));
    drop(Box::from_raw(model.cast::<CentroidModel>()));
}

unsafe extern "C" fn reference_set_print_string_function(hook: Option<PrintStringFn>) {
    *PRINT_HOOK.lock().unwrap_or_else(|e| e.into_inner()) = hook;
}

static REFERENCE: Lazy<SolverBinding> = Lazy::new(|| {
    // SAFETY: the reference functions follow the LIBLINEAR contracts.
    unsafe {
        SolverBinding::new(
            "reference",
            reference_train,
            reference_predict_values,
            reference_predict_probability,
            reference_free_model_content,
            reference_set_print_string_function,
        )
    }
});

/// The nearest-centroid reference solver.
pub fn reference_binding() -> &'static SolverBinding {
    &REFERENCE
}
