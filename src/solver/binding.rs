use std::ffi::CStr;
use std::fmt;
use std::os::raw::c_char;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use log::{debug, info};
#[cfg(feature = "liblinear")]
use once_cell::sync::OnceCell;

use crate::solver::ffi::{
    FreeModelContentFn, PredictProbabilityFn, PredictValuesFn, SetPrintStringFunctionFn, TrainFn,
};

/// Serializes foreign calls so that setting [`VERBOSE`] and the call that
/// reads it happen as one step.
static CALL_LOCK: Mutex<()> = Mutex::new(());

/// Read by the print hook on every message the solver emits.
static VERBOSE: AtomicBool = AtomicBool::new(false);

/// Print hook handed to the solver. Output is forwarded to the `liblinear`
/// log target while the current call is verbose and dropped otherwise.
extern "C" fn forward_solver_output(message: *const c_char) {
    if message.is_null() || !VERBOSE.load(Ordering::SeqCst) {
        return;
    }
    // SAFETY: the solver passes a NUL-terminated string valid for the call.
    let text = unsafe { CStr::from_ptr(message) }.to_string_lossy();
    let text = text.trim_end();
    if !text.is_empty() {
        info!(target: "liblinear", "{}", text);
    }
}

/// Entry points of one solver implementation.
///
/// Obtain the system LIBLINEAR through [`SolverBinding::linked`] (feature
/// `liblinear`), or the in-process reference solver through
/// [`crate::testing::reference_binding`].
pub struct SolverBinding {
    name: &'static str,
    train: TrainFn,
    predict_values: PredictValuesFn,
    predict_probability: PredictProbabilityFn,
    free_model_content: FreeModelContentFn,
}

impl SolverBinding {
    /// Bundle a set of entry points and install the print hook through
    /// `set_print_string_function`.
    ///
    /// # Safety
    ///
    /// Every function must honor the LIBLINEAR contract for its namesake:
    /// `train` may keep pointers into the problem and parameter blocks for
    /// the life of the model it returns, the predict functions write at most
    /// one score per class, and `free_model_content` releases a model once.
    pub unsafe fn new(
        name: &'static str,
        train: TrainFn,
        predict_values: PredictValuesFn,
        predict_probability: PredictProbabilityFn,
        free_model_content: FreeModelContentFn,
        set_print_string_function: SetPrintStringFunctionFn,
    ) -> Self {
        debug!("installing print hook for solver '{}'", name);
        set_print_string_function(Some(forward_solver_output));
        Self {
            name,
            train,
            predict_values,
            predict_probability,
            free_model_content,
        }
    }

    /// The LIBLINEAR library linked into the process, resolved on first use
    /// and cached for the life of the process.
    #[cfg(feature = "liblinear")]
    pub fn linked() -> &'static SolverBinding {
        use crate::solver::ffi::linked;

        static LINKED: OnceCell<SolverBinding> = OnceCell::new();
        LINKED.get_or_init(|| {
            // SAFETY: these are the library's own entry points.
            unsafe {
                SolverBinding::new(
                    "liblinear",
                    linked::train,
                    linked::predict_values,
                    linked::predict_probability,
                    linked::free_model_content,
                    linked::set_print_string_function,
                )
            }
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Run one foreign call with the verbosity flag set for it.
    ///
    /// The call lock is process-wide because the flag is. A panic inside a
    /// previous call leaves only `()` behind the lock, so poisoning is
    /// ignored.
    pub(crate) fn call<T>(&self, verbose: bool, f: impl FnOnce(&Calls) -> T) -> T {
        let _guard = CALL_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
        VERBOSE.store(verbose, Ordering::SeqCst);
        f(&Calls { binding: self })
    }
}

/// Raw entry points, reachable only while the call lock is held.
pub(crate) struct Calls<'a> {
    binding: &'a SolverBinding,
}

impl Calls<'_> {
    pub(crate) fn train(&self) -> TrainFn {
        self.binding.train
    }

    pub(crate) fn predict_values(&self) -> PredictValuesFn {
        self.binding.predict_values
    }

    pub(crate) fn predict_probability(&self) -> PredictProbabilityFn {
        self.binding.predict_probability
    }

    pub(crate) fn free_model_content(&self) -> FreeModelContentFn {
        self.binding.free_model_content
    }
}

impl fmt::Debug for SolverBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SolverBinding")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
