use utoipa::OpenApi;

use crate::api::rest::dto::{
    CancelReq, CompleteReq, CourseDto, CourseListDto, CourseReq, DaysLeftDto, EnrollmentDto,
    EnrollmentListDto, EnrollmentReq, StudentDto, StudentListDto, StudentReq,
};
use crate::api::rest::handlers;
use crate::api::rest::problem::{FieldError, Problem};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Virtual Education API",
        description = "Courses, students and their enrollments"
    ),
    paths(
        handlers::list_courses,
        handlers::get_course,
        handlers::create_course,
        handlers::replace_course,
        handlers::update_course,
        handlers::delete_course,
        handlers::list_students,
        handlers::get_student,
        handlers::create_student,
        handlers::replace_student,
        handlers::update_student,
        handlers::delete_student,
        handlers::list_enrollments,
        handlers::get_enrollment,
        handlers::create_enrollment,
        handlers::replace_enrollment,
        handlers::update_enrollment,
        handlers::delete_enrollment,
        handlers::complete_enrollment,
        handlers::cancel_enrollment,
        handlers::days_left,
    ),
    components(schemas(
        CourseDto,
        CourseReq,
        CourseListDto,
        StudentDto,
        StudentReq,
        StudentListDto,
        EnrollmentDto,
        EnrollmentReq,
        EnrollmentListDto,
        CompleteReq,
        CancelReq,
        DaysLeftDto,
        Problem,
        FieldError,
    )),
    tags(
        (name = "courses", description = "Course catalogue"),
        (name = "students", description = "Students and their accounts"),
        (name = "enrollments", description = "Enrollment lifecycle")
    )
)]
pub struct ApiDoc;

/// The module's OpenAPI document.
pub fn document() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_route() {
        let doc = document();
        for path in [
            "/courses",
            "/courses/{id}",
            "/students",
            "/students/{id}",
            "/enrollments",
            "/enrollments/{id}",
            "/enrollments/{id}/complete",
            "/enrollments/{id}/cancel",
            "/enrollments/{id}/days-left",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
