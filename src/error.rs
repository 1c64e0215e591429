use thiserror::Error;

use crate::selection::SelectionError;
use crate::submission::GateError;

/// Errors raised by the course API functions.
///
/// Endpoints surface these to the caller as their `Display` text, which is
/// what the client shows in its notification area.
#[derive(Debug, Error, PartialEq)]
pub enum CourseError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("Unauthorized: {0}")]
    Unauthorized(&'static str),
    #[error("{0}")]
    Validation(String),
    #[error("Invalid transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },
    #[error(transparent)]
    Gate(#[from] GateError),
    #[error(transparent)]
    Selection(#[from] SelectionError),
}

pub type Result<T> = std::result::Result<T, CourseError>;

impl From<CourseError> for String {
    fn from(err: CourseError) -> Self {
        err.to_string()
    }
}
