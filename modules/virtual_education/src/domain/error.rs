use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// A rejected input field with a human-readable reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldViolation {
    pub field: String,
    pub message: String,
}

impl FieldViolation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn join_violations(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Domain-specific errors using thiserror
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Course not found: {id}")]
    CourseNotFound { id: Uuid },

    #[error("Student not found: {id}")]
    StudentNotFound { id: Uuid },

    #[error("Enrollment not found: {id}")]
    EnrollmentNotFound { id: Uuid },

    #[error("No enrollment in progress for student {student_id} in course {course_id}")]
    NoActiveEnrollment { student_id: Uuid, course_id: Uuid },

    #[error("Student {student_id} is already enrolled in a course")]
    AlreadyEnrolled { student_id: Uuid },

    #[error("Course {id} has enrollments in progress; they must be concluded before deletion")]
    CourseHasActiveEnrollments { id: Uuid },

    #[error("Student {id} has enrollments that were not withdrawn and cannot be deleted")]
    StudentHasEnrollments { id: Uuid },

    #[error("Enrollment {id} is already closed with status {status}")]
    EnrollmentClosed { id: Uuid, status: String },

    #[error("Validation failed: {}", join_violations(violations))]
    Validation { violations: Vec<FieldViolation> },

    #[error("Database error: {message}")]
    Database { message: String },
}

impl DomainError {
    pub fn course_not_found(id: Uuid) -> Self {
        Self::CourseNotFound { id }
    }

    pub fn student_not_found(id: Uuid) -> Self {
        Self::StudentNotFound { id }
    }

    pub fn enrollment_not_found(id: Uuid) -> Self {
        Self::EnrollmentNotFound { id }
    }

    pub fn no_active_enrollment(student_id: Uuid, course_id: Uuid) -> Self {
        Self::NoActiveEnrollment {
            student_id,
            course_id,
        }
    }

    pub fn already_enrolled(student_id: Uuid) -> Self {
        Self::AlreadyEnrolled { student_id }
    }

    pub fn course_has_active_enrollments(id: Uuid) -> Self {
        Self::CourseHasActiveEnrollments { id }
    }

    pub fn student_has_enrollments(id: Uuid) -> Self {
        Self::StudentHasEnrollments { id }
    }

    pub fn enrollment_closed(id: Uuid, status: impl Into<String>) -> Self {
        Self::EnrollmentClosed {
            id,
            status: status.into(),
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            violations: vec![FieldViolation::new(field, message)],
        }
    }

    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
        }
    }

    /// Business-rule conflicts, as opposed to malformed input or missing rows.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::AlreadyEnrolled { .. }
                | Self::CourseHasActiveEnrollments { .. }
                | Self::StudentHasEnrollments { .. }
                | Self::EnrollmentClosed { .. }
        )
    }
}

/// Infra failures are reported as opaque database errors.
pub(crate) fn db_err(e: anyhow::Error) -> DomainError {
    DomainError::database(format!("{e:#}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_message_lists_every_field() {
        let e = DomainError::Validation {
            violations: vec![
                FieldViolation::new("name", "This field is required."),
                FieldViolation::new("duration", "This field is required."),
            ],
        };
        assert_eq!(
            e.to_string(),
            "Validation failed: name: This field is required.; duration: This field is required."
        );
    }

    #[test]
    fn conflicts_are_classified() {
        let id = Uuid::new_v4();
        assert!(DomainError::already_enrolled(id).is_conflict());
        assert!(DomainError::enrollment_closed(id, "Aprovado").is_conflict());
        assert!(!DomainError::course_not_found(id).is_conflict());
        assert!(!DomainError::validation("x", "y").is_conflict());
    }
}
