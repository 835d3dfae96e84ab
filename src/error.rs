use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// A constructor argument lies outside the mathematical domain of the distribution.
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    /// Parallel arrays differ in length.
    #[error("dimension mismatch: `{name}` has {actual} elements, expected {expected}")]
    DimensionMismatch {
        name: &'static str,
        expected: usize,
        actual: usize,
    },

    /// The quantity has no defined value for this distribution.
    #[error("`{0}` is not defined for this distribution")]
    UnsupportedOperation(&'static str),

    /// The fitting input falls outside the family the estimator can represent.
    #[error("estimation not supported for this input: {0}")]
    NotSupported(String),

    #[error("optimizer stopped after {iterations} iterations without reaching a stationary point (gradient norm {gradient_norm})")]
    ConvergenceFailure { iterations: u64, gradient_norm: f64 },

    #[error("weight at index {index} is not finite: {value}")]
    InvalidWeight { index: usize, value: f64 },

    #[error("unrecognized value `{value}` for option `{option}`")]
    UnknownOption { option: &'static str, value: String },

    /// This error occurs when converting between vectors and distribution types
    #[error("error converting between vector of {0} elements and distribution with {1} parameters")]
    IncompatibleDistributionParameterCount(usize, usize),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl Error {
    pub(crate) fn invalid_parameter(name: &'static str, reason: impl Into<String>) -> Self {
        Error::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}
