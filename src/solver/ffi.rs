//! C ABI of the LIBLINEAR solver.
//!
//! Struct layouts must match `linear.h` field for field; the size checks at
//! the bottom pin them for 64-bit targets.

use std::marker::{PhantomData, PhantomPinned};
use std::os::raw::c_char;

/// One `(index, value)` pair of a sparse row. `index` is 1-based; a row ends
/// with a node whose index is [`FeatureNode::SENTINEL_INDEX`].
#[derive(Copy, Clone, Debug, PartialEq)]
#[repr(C)]
pub struct FeatureNode {
    pub index: i32,
    pub value: f64,
}

impl FeatureNode {
    pub const SENTINEL_INDEX: i32 = -1;

    pub const fn new(index: i32, value: f64) -> Self {
        Self { index, value }
    }

    pub const fn sentinel() -> Self {
        Self {
            index: Self::SENTINEL_INDEX,
            value: 0.0,
        }
    }

    pub fn is_sentinel(&self) -> bool {
        self.index == Self::SENTINEL_INDEX
    }
}

/// `struct problem`.
#[derive(Debug)]
#[repr(C)]
pub struct Problem {
    pub l: i32,
    pub n: i32,
    pub y: *const f64,
    pub x: *const *const FeatureNode,
    pub bias: f64,
}

/// `struct parameter`.
#[allow(non_snake_case)]
#[derive(Debug)]
#[repr(C)]
pub struct Parameter {
    pub solver_type: i32,
    pub eps: f64,
    pub C: f64,
    pub nr_weight: i32,
    pub weight_label: *const i32,
    pub weight: *const f64,
    pub p: f64,
    pub init_sol: *const f64,
}

/// `struct model`, never dereferenced on this side.
#[repr(C)]
pub struct RawModel {
    _data: [u8; 0],
    _marker: PhantomData<(*mut u8, PhantomPinned)>,
}

pub type PrintStringFn = extern "C" fn(*const c_char);

pub type TrainFn = unsafe extern "C" fn(*const Problem, *const Parameter) -> *mut RawModel;
pub type PredictValuesFn =
    unsafe extern "C" fn(*const RawModel, *const FeatureNode, *mut f64) -> f64;
pub type PredictProbabilityFn =
    unsafe extern "C" fn(*const RawModel, *const FeatureNode, *mut f64) -> f64;
pub type FreeModelContentFn = unsafe extern "C" fn(*mut RawModel);
pub type SetPrintStringFunctionFn = unsafe extern "C" fn(Option<PrintStringFn>);

#[cfg(feature = "liblinear")]
pub(crate) mod linked {
    use super::*;

    #[link(name = "linear")]
    extern "C" {
        pub(crate) fn train(prob: *const Problem, param: *const Parameter) -> *mut RawModel;
        pub(crate) fn predict_values(
            model_: *const RawModel,
            x: *const FeatureNode,
            dec_values: *mut f64,
        ) -> f64;
        pub(crate) fn predict_probability(
            model_: *const RawModel,
            x: *const FeatureNode,
            prob_estimates: *mut f64,
        ) -> f64;
        pub(crate) fn free_model_content(model_ptr: *mut RawModel);
        pub(crate) fn set_print_string_function(print_func: Option<PrintStringFn>);
    }
}

#[cfg(target_pointer_width = "64")]
mod layout {
    use super::*;
    use static_assertions::{assert_eq_align, assert_eq_size, const_assert_eq};
    use std::mem::offset_of;

    assert_eq_size!(FeatureNode, [u8; 16]);
    assert_eq_align!(FeatureNode, f64);
    assert_eq_size!(Problem, [u8; 32]);
    assert_eq_size!(Parameter, [u8; 64]);

    const_assert_eq!(offset_of!(FeatureNode, value), 8);
    const_assert_eq!(offset_of!(Problem, y), 8);
    const_assert_eq!(offset_of!(Problem, bias), 24);
    const_assert_eq!(offset_of!(Parameter, eps), 8);
    const_assert_eq!(offset_of!(Parameter, nr_weight), 24);
    const_assert_eq!(offset_of!(Parameter, weight_label), 32);
    const_assert_eq!(offset_of!(Parameter, p), 48);
    const_assert_eq!(offset_of!(Parameter, init_sol), 56);
}
