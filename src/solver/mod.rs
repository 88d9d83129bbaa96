//! Boundary to the foreign solver.
//!
//! `ffi` mirrors the LIBLINEAR C structs and entry points. `SolverBinding`
//! wraps one set of entry points together with the print hook and the
//! process-wide call lock that every foreign call goes through.
pub mod binding;
pub mod ffi;

pub use binding::SolverBinding;
