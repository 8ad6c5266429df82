use thiserror::Error;

use crate::domain::error::DomainError;

/// Errors that are safe to expose to other modules
#[derive(Error, Debug, Clone, PartialEq)]
pub enum VirtualEducationError {
    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Internal error")]
    Internal,
}

impl VirtualEducationError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn internal() -> Self {
        Self::Internal
    }
}

impl From<DomainError> for VirtualEducationError {
    fn from(e: DomainError) -> Self {
        use DomainError::*;
        match &e {
            CourseNotFound { .. }
            | StudentNotFound { .. }
            | EnrollmentNotFound { .. }
            | NoActiveEnrollment { .. } => Self::not_found(e.to_string()),
            AlreadyEnrolled { .. }
            | CourseHasActiveEnrollments { .. }
            | StudentHasEnrollments { .. }
            | EnrollmentClosed { .. } => Self::conflict(e.to_string()),
            Validation { violations } => Self::validation(
                violations
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("; "),
            ),
            Database { .. } => Self::internal(),
        }
    }
}
