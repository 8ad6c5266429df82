use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;

use crate::api::rest::problem::{FieldError, Problem, ProblemResponse};
use crate::domain::error::DomainError;

/// Helper to create a ProblemResponse with less boilerplate
pub fn from_parts(
    status: StatusCode,
    code: &str,
    title: &str,
    detail: impl Into<String>,
    instance: &str,
) -> ProblemResponse {
    let problem = Problem::new(status, title, detail)
        .with_type(format!("https://errors.virtual-education.local/{code}"))
        .with_code(code)
        .with_instance(instance);
    ProblemResponse(problem)
}

/// Per-field validation problem.
pub fn validation_problem(errors: Vec<FieldError>, instance: &str) -> ProblemResponse {
    let detail = errors
        .iter()
        .map(|e| format!("{}: {}", e.pointer.trim_start_matches('/'), e.detail))
        .collect::<Vec<_>>()
        .join("; ");
    let mut resp = from_parts(
        StatusCode::BAD_REQUEST,
        "VALIDATION",
        "Validation error",
        detail,
        instance,
    );
    resp.0 = resp.0.with_errors(errors);
    resp
}

pub fn json_rejection(rejection: &JsonRejection, instance: &str) -> ProblemResponse {
    from_parts(
        StatusCode::BAD_REQUEST,
        "MALFORMED_BODY",
        "Malformed request body",
        rejection.body_text(),
        instance,
    )
}

pub fn query_rejection(rejection: &QueryRejection, instance: &str) -> ProblemResponse {
    from_parts(
        StatusCode::BAD_REQUEST,
        "INVALID_QUERY",
        "Invalid query parameters",
        rejection.body_text(),
        instance,
    )
}

/// Map domain error to RFC9457 ProblemResponse
pub fn map_domain_error(e: &DomainError, instance: &str) -> ProblemResponse {
    match e {
        DomainError::CourseNotFound { .. } => from_parts(
            StatusCode::NOT_FOUND,
            "COURSE_NOT_FOUND",
            "Course not found",
            e.to_string(),
            instance,
        ),
        DomainError::StudentNotFound { .. } => from_parts(
            StatusCode::NOT_FOUND,
            "STUDENT_NOT_FOUND",
            "Student not found",
            e.to_string(),
            instance,
        ),
        DomainError::EnrollmentNotFound { .. } | DomainError::NoActiveEnrollment { .. } => {
            from_parts(
                StatusCode::NOT_FOUND,
                "ENROLLMENT_NOT_FOUND",
                "Enrollment not found",
                e.to_string(),
                instance,
            )
        }
        DomainError::AlreadyEnrolled { .. } => from_parts(
            StatusCode::BAD_REQUEST,
            "ALREADY_ENROLLED",
            "Student already enrolled",
            "The student is already enrolled in a course.",
            instance,
        ),
        DomainError::CourseHasActiveEnrollments { .. } => from_parts(
            StatusCode::BAD_REQUEST,
            "COURSE_IN_USE",
            "Course has enrollments in progress",
            "There are enrollments in progress for this course; conclude them before deleting it.",
            instance,
        ),
        DomainError::StudentHasEnrollments { .. } => from_parts(
            StatusCode::BAD_REQUEST,
            "STUDENT_IN_USE",
            "Student has enrollments",
            "The student is enrolled in a course and cannot be deleted.",
            instance,
        ),
        DomainError::EnrollmentClosed { .. } => from_parts(
            StatusCode::BAD_REQUEST,
            "ENROLLMENT_CLOSED",
            "Enrollment already closed",
            e.to_string(),
            instance,
        ),
        DomainError::Validation { violations } => validation_problem(
            violations
                .iter()
                .map(|v| FieldError::new(&v.field, v.message.clone()))
                .collect(),
            instance,
        ),
        DomainError::Database { .. } => {
            // Log the internal error details but don't expose them to the client
            tracing::error!(error = ?e, "Database error occurred");
            from_parts(
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_DB",
                "Internal error",
                "An internal database error occurred",
                instance,
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::FieldViolation;
    use uuid::Uuid;

    #[test]
    fn status_codes_per_variant() {
        let id = Uuid::new_v4();
        let cases = [
            (DomainError::course_not_found(id), 404),
            (DomainError::no_active_enrollment(id, id), 404),
            (DomainError::already_enrolled(id), 400),
            (DomainError::course_has_active_enrollments(id), 400),
            (DomainError::student_has_enrollments(id), 400),
            (DomainError::enrollment_closed(id, "Aprovado"), 400),
            (DomainError::validation("score", "This field is required."), 400),
            (DomainError::database("disk full"), 500),
        ];
        for (err, status) in cases {
            assert_eq!(map_domain_error(&err, "/x").0.status, status, "{err}");
        }
    }

    #[test]
    fn validation_carries_pointers() {
        let err = DomainError::Validation {
            violations: vec![
                FieldViolation::new("name", "This field is required."),
                FieldViolation::new("duration", "This field is required."),
            ],
        };
        let p = map_domain_error(&err, "/courses").0;
        let errors = p.errors.unwrap();
        assert_eq!(errors[0].pointer, "/name");
        assert_eq!(errors[1].pointer, "/duration");
        assert_eq!(p.code, "VALIDATION");
        assert_eq!(p.instance, "/courses");
    }

    #[test]
    fn database_details_stay_internal() {
        let p = map_domain_error(&DomainError::database("password=secret"), "/x").0;
        assert!(!p.detail.contains("secret"));
    }
}
