use thiserror::Error;

/// Errors raised while marshalling data to and from the solver.
#[derive(Debug, Error)]
pub enum Error {
    /// Two sizes that must agree do not (labels vs. instances at train time,
    /// feature counts at predict time).
    #[error("dimension mismatch: {what} (expected {expected}, found {found})")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    /// An option combination the solver cannot honor.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// A class code with no label behind it.
    #[error("class code {code} out of range for {len} known labels")]
    OutOfRange { code: i32, len: usize },

    /// The foreign train call returned no model.
    #[error("training failed: {0}")]
    Training(String),
}

pub type Result<T> = std::result::Result<T, Error>;
