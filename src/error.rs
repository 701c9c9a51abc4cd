//! Error taxonomy for alignment analysis.
//!
//! Extraction failures (`Decode`, `DetectorUnavailable`, `Timeout`) are
//! expected at runtime and get downgraded to an `unknown` verdict by the
//! analyzer. `ContractViolation` marks an integration bug and is always
//! propagated to the caller.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AlignError {
    /// The image could not be read or decoded as a raster image.
    #[error("failed to decode image '{handle}': {reason}")]
    Decode { handle: String, reason: String },

    /// The extraction backend could not be initialized or reached.
    #[error("detector unavailable: {0}")]
    DetectorUnavailable(String),

    /// Extraction exceeded its time budget.
    #[error("extraction exceeded {budget_ms}ms budget")]
    Timeout { budget_ms: u64 },

    /// The caller broke the analyzer's contract (empty handle, bad parameters).
    #[error("contract violation: {0}")]
    ContractViolation(String),
}

impl AlignError {
    pub fn decode(handle: impl Into<String>, reason: impl ToString) -> Self {
        Self::Decode {
            handle: handle.into(),
            reason: reason.to_string(),
        }
    }

    /// True for failures the analyzer converts into an `unknown` verdict.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::ContractViolation(_))
    }
}

pub type AlignResult<T> = std::result::Result<T, AlignError>;
