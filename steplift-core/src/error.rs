//! Error taxonomy for the step engine
//!
//! Corpus files that fail to open are not errors: they are skipped with a
//! warning and the scan continues with whatever opened.

use crate::position::SourcePosition;

/// Failures surfaced by core operations
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum StepError {
    /// Malformed parameters at the API boundary (e.g. a zero target indent)
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A destination span or record id could not be found
    #[error("unresolved target: {0}")]
    UnresolvedTarget(String),

    /// An edit batch was rejected by the document
    #[error("edit rejected: {0}")]
    Document(String),
}

impl StepError {
    pub(crate) fn out_of_bounds(position: SourcePosition) -> Self {
        StepError::Document(format!(
            "position {}:{} is outside the document",
            position.line, position.column
        ))
    }
}
