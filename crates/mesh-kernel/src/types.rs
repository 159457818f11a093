/// Errors from kernel operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum KernelError {
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("degenerate profile: {reason}")]
    DegenerateProfile { reason: String },
}

impl KernelError {
    pub(crate) fn invalid(name: &str, reason: impl Into<String>) -> Self {
        KernelError::InvalidParameter {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

/// Reject non-finite or non-positive dimensions.
pub(crate) fn require_positive(name: &str, value: f64) -> Result<f64, KernelError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(KernelError::invalid(name, format!("must be a positive number, got {value}")))
    }
}

/// Reject non-finite or negative dimensions.
pub(crate) fn require_non_negative(name: &str, value: f64) -> Result<f64, KernelError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(KernelError::invalid(name, format!("must be zero or positive, got {value}")))
    }
}
