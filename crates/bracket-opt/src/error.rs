//! Error types for the search and its collaborators.
//!
//! Only [`SearchError`] ends a run. [`ExtensionError`] and [`EvaluationFault`]
//! concern a single candidate, which the engine then skips.

use std::fmt;

/// Terminal outcomes of a search invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchError {
    /// No candidate validated anywhere in the design space.
    InfeasibleDesign { evaluated: usize },
    /// The cancel token was observed at a yield point.
    Cancelled { evaluated: usize },
    /// Inputs could not be resolved into effective parameters.
    InvalidInputs { reason: String },
}

impl SearchError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidInputs {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for SearchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InfeasibleDesign { evaluated } => write!(
                f,
                "no valid bracket configuration found ({evaluated} structural candidates evaluated)"
            ),
            Self::Cancelled { evaluated } => {
                write!(f, "search cancelled after {evaluated} structural candidates")
            }
            Self::InvalidInputs { reason } => write!(f, "invalid design inputs: {reason}"),
        }
    }
}

impl std::error::Error for SearchError {}

/// Candidate-local failure of the angle extension step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExtensionError {
    /// The extended vertical leg is taller than the rolling limit.
    ManufacturingLimitExceeded { extended_height: f64, limit: f64 },
}

impl fmt::Display for ExtensionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ManufacturingLimitExceeded {
                extended_height,
                limit,
            } => write!(
                f,
                "extended angle leg {extended_height:.1} mm exceeds manufacturing limit {limit:.0} mm"
            ),
        }
    }
}

impl std::error::Error for ExtensionError {}

/// Unexpected failure inside an evaluator for one candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationFault {
    pub reason: String,
}

impl EvaluationFault {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for EvaluationFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "evaluation fault: {}", self.reason)
    }
}

impl std::error::Error for EvaluationFault {}
