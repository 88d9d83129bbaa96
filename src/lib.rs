//! redeem-linear: safe train/predict API over the LIBLINEAR C solver.
//!
//! This crate does not implement any optimizer. It hands data to one and
//! takes results back: labels of any hashable type are mapped to dense class
//! codes, dense or sparse matrices are encoded into LIBLINEAR's sparse row
//! format, the C `problem`/`parameter` blocks are built with the exact ABI
//! layout, and the returned model handle is owned by a [`Model`] that keeps
//! every buffer the solver may point into alive until the handle is released.
//!
//! The native library is only linked with the `liblinear` feature, which
//! enables [`train`] and [`SolverBinding::linked`]. Without it, [`train_with`]
//! can be used against any [`SolverBinding`], such as the reference solver in
//! [`testing`].
pub mod config;
pub mod error;
pub mod io;
pub mod labels;
pub mod math;
pub mod model;
pub mod nodes;
pub mod predict;
pub mod problem;
pub mod solver;
pub mod testing;

pub use config::{PredictOptions, SolverType, TrainOptions};
pub use error::{Error, Result};
pub use labels::LabelIndex;
#[cfg(feature = "liblinear")]
pub use model::train;
pub use model::{train_with, Model};
pub use nodes::{encode_rows, FeatureMatrix, FeatureRows};
pub use predict::{predict, Prediction};
pub use problem::{build_problem, SolverParameters, TrainingProblem};
pub use solver::SolverBinding;
