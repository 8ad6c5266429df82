use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query,
    },
    http::{StatusCode, Uri},
    response::Json,
    Extension,
};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::api::rest::dto::{
    CancelReq, CompleteReq, CourseDto, CourseListDto, CourseListQuery, CourseReq, DaysLeftDto,
    EnrollmentDto, EnrollmentListDto, EnrollmentListQuery, EnrollmentReq, StudentDto,
    StudentListDto, StudentListQuery, StudentReq,
};
use crate::api::rest::error::{
    json_rejection, map_domain_error, query_rejection, validation_problem,
};
use crate::api::rest::problem::{Problem, ProblemResponse};
use crate::domain::error::DomainError;
use crate::domain::service::Service;

/// Log a failed operation and turn it into a problem response.
fn failure(what: &str, e: &DomainError, uri: &Uri) -> ProblemResponse {
    match e {
        DomainError::Database { .. } => error!("Failed to {what}: {e}"),
        _ => warn!("Failed to {what}: {e}"),
    }
    map_domain_error(e, uri.path())
}

fn body<T>(payload: Result<Json<T>, JsonRejection>, uri: &Uri) -> Result<T, ProblemResponse> {
    payload
        .map(|Json(v)| v)
        .map_err(|e| json_rejection(&e, uri.path()))
}

fn query<T>(q: Result<Query<T>, QueryRejection>, uri: &Uri) -> Result<T, ProblemResponse> {
    q.map(|Query(v)| v)
        .map_err(|e| query_rejection(&e, uri.path()))
}

// ---------------------------------------------------------------------------
// Courses
// ---------------------------------------------------------------------------

/// List courses, filtered and paginated
#[utoipa::path(
    get,
    path = "/courses",
    tag = "courses",
    params(CourseListQuery),
    responses(
        (status = 200, description = "Page of courses", body = CourseListDto),
        (status = 400, description = "Bad Request", body = Problem),
        (status = 500, description = "Internal Server Error", body = Problem)
    )
)]
pub async fn list_courses(
    Extension(svc): Extension<Arc<Service>>,
    uri: Uri,
    q: Result<Query<CourseListQuery>, QueryRejection>,
) -> Result<Json<CourseListDto>, ProblemResponse> {
    let q = query(q, &uri)?;
    info!("Listing courses with query: {:?}", q);

    let page = svc
        .page_request(q.page, q.page_size)
        .map_err(|e| failure("list courses", &e, &uri))?;
    match svc.list_courses(q.filter(), page).await {
        Ok(page) => Ok(Json(page.into())),
        Err(e) => Err(failure("list courses", &e, &uri)),
    }
}

/// Get a course by ID
#[utoipa::path(
    get,
    path = "/courses/{id}",
    tag = "courses",
    params(("id" = Uuid, Path, description = "Course UUID")),
    responses(
        (status = 200, description = "Course found", body = CourseDto),
        (status = 404, description = "Not Found", body = Problem)
    )
)]
pub async fn get_course(
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<Uuid>,
    uri: Uri,
) -> Result<Json<CourseDto>, ProblemResponse> {
    info!("Getting course with id: {}", id);

    match svc.get_course(id).await {
        Ok(course) => Ok(Json(course.into())),
        Err(e) => Err(failure("get course", &e, &uri)),
    }
}

/// Create a course
#[utoipa::path(
    post,
    path = "/courses",
    tag = "courses",
    request_body = CourseReq,
    responses(
        (status = 201, description = "Created course", body = CourseDto),
        (status = 400, description = "Bad Request", body = Problem)
    )
)]
pub async fn create_course(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
    payload: Result<Json<CourseReq>, JsonRejection>,
) -> Result<(StatusCode, Json<CourseDto>), ProblemResponse> {
    let req = body(payload, &uri)?;
    info!("Creating course: {:?}", req);

    let new_course = req
        .into_new()
        .map_err(|errors| validation_problem(errors, uri.path()))?;
    match svc.create_course(new_course).await {
        Ok(course) => Ok((StatusCode::CREATED, Json(course.into()))),
        Err(e) => Err(failure("create course", &e, &uri)),
    }
}

/// Replace a course; every field is required
#[utoipa::path(
    put,
    path = "/courses/{id}",
    tag = "courses",
    params(("id" = Uuid, Path, description = "Course UUID")),
    request_body = CourseReq,
    responses(
        (status = 200, description = "Updated course", body = CourseDto),
        (status = 400, description = "Bad Request", body = Problem),
        (status = 404, description = "Not Found", body = Problem)
    )
)]
pub async fn replace_course(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<Uuid>,
    payload: Result<Json<CourseReq>, JsonRejection>,
) -> Result<Json<CourseDto>, ProblemResponse> {
    let req = body(payload, &uri)?;
    info!("Replacing course {} with: {:?}", id, req);

    let patch = req
        .into_full_patch()
        .map_err(|errors| validation_problem(errors, uri.path()))?;
    match svc.update_course(id, patch).await {
        Ok(course) => Ok(Json(course.into())),
        Err(e) => Err(failure("replace course", &e, &uri)),
    }
}

/// Partially update a course
#[utoipa::path(
    patch,
    path = "/courses/{id}",
    tag = "courses",
    params(("id" = Uuid, Path, description = "Course UUID")),
    request_body = CourseReq,
    responses(
        (status = 200, description = "Updated course", body = CourseDto),
        (status = 400, description = "Bad Request", body = Problem),
        (status = 404, description = "Not Found", body = Problem)
    )
)]
pub async fn update_course(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<Uuid>,
    payload: Result<Json<CourseReq>, JsonRejection>,
) -> Result<Json<CourseDto>, ProblemResponse> {
    let req = body(payload, &uri)?;
    info!("Updating course {} with: {:?}", id, req);

    match svc.update_course(id, req.into()).await {
        Ok(course) => Ok(Json(course.into())),
        Err(e) => Err(failure("update course", &e, &uri)),
    }
}

/// Delete a course without enrollments in progress
#[utoipa::path(
    delete,
    path = "/courses/{id}",
    tag = "courses",
    params(("id" = Uuid, Path, description = "Course UUID")),
    responses(
        (status = 204, description = "Course deleted"),
        (status = 400, description = "Course has enrollments in progress", body = Problem),
        (status = 404, description = "Not Found", body = Problem)
    )
)]
pub async fn delete_course(
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<Uuid>,
    uri: Uri,
) -> Result<StatusCode, ProblemResponse> {
    info!("Deleting course: {}", id);

    match svc.delete_course(id).await {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(e) => Err(failure("delete course", &e, &uri)),
    }
}

// ---------------------------------------------------------------------------
// Students
// ---------------------------------------------------------------------------

/// List students, filtered and paginated
#[utoipa::path(
    get,
    path = "/students",
    tag = "students",
    params(StudentListQuery),
    responses(
        (status = 200, description = "Page of students", body = StudentListDto),
        (status = 400, description = "Bad Request", body = Problem)
    )
)]
pub async fn list_students(
    Extension(svc): Extension<Arc<Service>>,
    uri: Uri,
    q: Result<Query<StudentListQuery>, QueryRejection>,
) -> Result<Json<StudentListDto>, ProblemResponse> {
    let q = query(q, &uri)?;
    info!("Listing students with query: {:?}", q);

    let page = svc
        .page_request(q.page, q.page_size)
        .map_err(|e| failure("list students", &e, &uri))?;
    match svc.list_students(q.filter(), page).await {
        Ok(page) => Ok(Json(page.into())),
        Err(e) => Err(failure("list students", &e, &uri)),
    }
}

/// Get a student by ID
#[utoipa::path(
    get,
    path = "/students/{id}",
    tag = "students",
    params(("id" = Uuid, Path, description = "Student UUID")),
    responses(
        (status = 200, description = "Student found", body = StudentDto),
        (status = 404, description = "Not Found", body = Problem)
    )
)]
pub async fn get_student(
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<Uuid>,
    uri: Uri,
) -> Result<Json<StudentDto>, ProblemResponse> {
    info!("Getting student with id: {}", id);

    match svc.get_student(id).await {
        Ok(student) => Ok(Json(student.into())),
        Err(e) => Err(failure("get student", &e, &uri)),
    }
}

/// Create a student and its user account
#[utoipa::path(
    post,
    path = "/students",
    tag = "students",
    request_body = StudentReq,
    responses(
        (status = 201, description = "Created student", body = StudentDto),
        (status = 400, description = "Bad Request", body = Problem)
    )
)]
pub async fn create_student(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
    payload: Result<Json<StudentReq>, JsonRejection>,
) -> Result<(StatusCode, Json<StudentDto>), ProblemResponse> {
    let req = body(payload, &uri)?;
    info!("Creating student: {:?}", req);

    let new_student = req
        .into_new()
        .map_err(|errors| validation_problem(errors, uri.path()))?;
    match svc.create_student(new_student).await {
        Ok(student) => Ok((StatusCode::CREATED, Json(student.into()))),
        Err(e) => Err(failure("create student", &e, &uri)),
    }
}

/// Replace a student; every field is required
#[utoipa::path(
    put,
    path = "/students/{id}",
    tag = "students",
    params(("id" = Uuid, Path, description = "Student UUID")),
    request_body = StudentReq,
    responses(
        (status = 200, description = "Updated student", body = StudentDto),
        (status = 400, description = "Bad Request", body = Problem),
        (status = 404, description = "Not Found", body = Problem)
    )
)]
pub async fn replace_student(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<Uuid>,
    payload: Result<Json<StudentReq>, JsonRejection>,
) -> Result<Json<StudentDto>, ProblemResponse> {
    let req = body(payload, &uri)?;
    info!("Replacing student {} with: {:?}", id, req);

    let patch = req
        .into_full_patch()
        .map_err(|errors| validation_problem(errors, uri.path()))?;
    match svc.update_student(id, patch).await {
        Ok(student) => Ok(Json(student.into())),
        Err(e) => Err(failure("replace student", &e, &uri)),
    }
}

/// Partially update a student
#[utoipa::path(
    patch,
    path = "/students/{id}",
    tag = "students",
    params(("id" = Uuid, Path, description = "Student UUID")),
    request_body = StudentReq,
    responses(
        (status = 200, description = "Updated student", body = StudentDto),
        (status = 400, description = "Bad Request", body = Problem),
        (status = 404, description = "Not Found", body = Problem)
    )
)]
pub async fn update_student(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<Uuid>,
    payload: Result<Json<StudentReq>, JsonRejection>,
) -> Result<Json<StudentDto>, ProblemResponse> {
    let req = body(payload, &uri)?;
    info!("Updating student {} with: {:?}", id, req);

    match svc.update_student(id, req.into()).await {
        Ok(student) => Ok(Json(student.into())),
        Err(e) => Err(failure("update student", &e, &uri)),
    }
}

/// Delete a student whose enrollments were all withdrawn
#[utoipa::path(
    delete,
    path = "/students/{id}",
    tag = "students",
    params(("id" = Uuid, Path, description = "Student UUID")),
    responses(
        (status = 204, description = "Student deleted"),
        (status = 400, description = "Student has enrollments", body = Problem),
        (status = 404, description = "Not Found", body = Problem)
    )
)]
pub async fn delete_student(
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<Uuid>,
    uri: Uri,
) -> Result<StatusCode, ProblemResponse> {
    info!("Deleting student: {}", id);

    match svc.delete_student(id).await {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(e) => Err(failure("delete student", &e, &uri)),
    }
}

// ---------------------------------------------------------------------------
// Enrollments
// ---------------------------------------------------------------------------

/// List enrollments, filtered and paginated
#[utoipa::path(
    get,
    path = "/enrollments",
    tag = "enrollments",
    params(EnrollmentListQuery),
    responses(
        (status = 200, description = "Page of enrollments", body = EnrollmentListDto),
        (status = 400, description = "Bad Request", body = Problem)
    )
)]
pub async fn list_enrollments(
    Extension(svc): Extension<Arc<Service>>,
    uri: Uri,
    q: Result<Query<EnrollmentListQuery>, QueryRejection>,
) -> Result<Json<EnrollmentListDto>, ProblemResponse> {
    let q = query(q, &uri)?;
    info!("Listing enrollments with query: {:?}", q);

    let page = svc
        .page_request(q.page, q.page_size)
        .map_err(|e| failure("list enrollments", &e, &uri))?;
    match svc.list_enrollments(q.filter(), page).await {
        Ok(page) => Ok(Json(page.into())),
        Err(e) => Err(failure("list enrollments", &e, &uri)),
    }
}

/// Get an enrollment by ID
#[utoipa::path(
    get,
    path = "/enrollments/{id}",
    tag = "enrollments",
    params(("id" = Uuid, Path, description = "Enrollment UUID")),
    responses(
        (status = 200, description = "Enrollment found", body = EnrollmentDto),
        (status = 404, description = "Not Found", body = Problem)
    )
)]
pub async fn get_enrollment(
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<Uuid>,
    uri: Uri,
) -> Result<Json<EnrollmentDto>, ProblemResponse> {
    info!("Getting enrollment with id: {}", id);

    match svc.get_enrollment(id).await {
        Ok(enrollment) => Ok(Json(enrollment.into())),
        Err(e) => Err(failure("get enrollment", &e, &uri)),
    }
}

/// Enroll a student in a course
#[utoipa::path(
    post,
    path = "/enrollments",
    tag = "enrollments",
    request_body = EnrollmentReq,
    responses(
        (status = 201, description = "Created enrollment", body = EnrollmentDto),
        (status = 400, description = "Invalid input or student already enrolled", body = Problem)
    )
)]
pub async fn create_enrollment(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
    payload: Result<Json<EnrollmentReq>, JsonRejection>,
) -> Result<(StatusCode, Json<EnrollmentDto>), ProblemResponse> {
    let req = body(payload, &uri)?;
    info!("Creating enrollment: {:?}", req);

    let new = req
        .into_new()
        .map_err(|errors| validation_problem(errors, uri.path()))?;
    match svc.enroll(new).await {
        Ok(enrollment) => Ok((StatusCode::CREATED, Json(enrollment.into()))),
        Err(e) => Err(failure("create enrollment", &e, &uri)),
    }
}

/// Replace an enrollment's student, course and close date
#[utoipa::path(
    put,
    path = "/enrollments/{id}",
    tag = "enrollments",
    params(("id" = Uuid, Path, description = "Enrollment UUID")),
    request_body = EnrollmentReq,
    responses(
        (status = 200, description = "Updated enrollment", body = EnrollmentDto),
        (status = 400, description = "Bad Request", body = Problem),
        (status = 404, description = "Not Found", body = Problem)
    )
)]
pub async fn replace_enrollment(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<Uuid>,
    payload: Result<Json<EnrollmentReq>, JsonRejection>,
) -> Result<Json<EnrollmentDto>, ProblemResponse> {
    let req = body(payload, &uri)?;
    info!("Replacing enrollment {} with: {:?}", id, req);

    let patch = req
        .into_full_patch()
        .map_err(|errors| validation_problem(errors, uri.path()))?;
    match svc.update_enrollment(id, patch).await {
        Ok(enrollment) => Ok(Json(enrollment.into())),
        Err(e) => Err(failure("replace enrollment", &e, &uri)),
    }
}

/// Partially update an enrollment; `score` completes it, `justification` cancels it
#[utoipa::path(
    patch,
    path = "/enrollments/{id}",
    tag = "enrollments",
    params(("id" = Uuid, Path, description = "Enrollment UUID")),
    request_body = EnrollmentReq,
    responses(
        (status = 200, description = "Updated enrollment", body = EnrollmentDto),
        (status = 400, description = "Bad Request", body = Problem),
        (status = 404, description = "Not Found", body = Problem)
    )
)]
pub async fn update_enrollment(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<Uuid>,
    payload: Result<Json<EnrollmentReq>, JsonRejection>,
) -> Result<Json<EnrollmentDto>, ProblemResponse> {
    let req = body(payload, &uri)?;
    info!("Updating enrollment {} with: {:?}", id, req);

    match svc.update_enrollment(id, req.into()).await {
        Ok(enrollment) => Ok(Json(enrollment.into())),
        Err(e) => Err(failure("update enrollment", &e, &uri)),
    }
}

/// Delete an enrollment
#[utoipa::path(
    delete,
    path = "/enrollments/{id}",
    tag = "enrollments",
    params(("id" = Uuid, Path, description = "Enrollment UUID")),
    responses(
        (status = 204, description = "Enrollment deleted"),
        (status = 404, description = "Not Found", body = Problem)
    )
)]
pub async fn delete_enrollment(
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<Uuid>,
    uri: Uri,
) -> Result<StatusCode, ProblemResponse> {
    info!("Deleting enrollment: {}", id);

    match svc.delete_enrollment(id).await {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(e) => Err(failure("delete enrollment", &e, &uri)),
    }
}

/// Grade an enrollment in progress
#[utoipa::path(
    post,
    path = "/enrollments/{id}/complete",
    tag = "enrollments",
    params(("id" = Uuid, Path, description = "Enrollment UUID")),
    request_body = CompleteReq,
    responses(
        (status = 200, description = "Completed enrollment", body = EnrollmentDto),
        (status = 400, description = "Missing score or enrollment already closed", body = Problem),
        (status = 404, description = "Not Found", body = Problem)
    )
)]
pub async fn complete_enrollment(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<Uuid>,
    payload: Result<Json<CompleteReq>, JsonRejection>,
) -> Result<Json<EnrollmentDto>, ProblemResponse> {
    let req = body(payload, &uri)?;
    info!("Completing enrollment {} with: {:?}", id, req);

    match svc.complete_by_id(id, req.score).await {
        Ok(enrollment) => Ok(Json(enrollment.into())),
        Err(e) => Err(failure("complete enrollment", &e, &uri)),
    }
}

/// Withdraw from an enrollment in progress
#[utoipa::path(
    post,
    path = "/enrollments/{id}/cancel",
    tag = "enrollments",
    params(("id" = Uuid, Path, description = "Enrollment UUID")),
    request_body = CancelReq,
    responses(
        (status = 200, description = "Cancelled enrollment", body = EnrollmentDto),
        (status = 400, description = "Enrollment already closed", body = Problem),
        (status = 404, description = "Not Found", body = Problem)
    )
)]
pub async fn cancel_enrollment(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<Uuid>,
    payload: Result<Json<CancelReq>, JsonRejection>,
) -> Result<Json<EnrollmentDto>, ProblemResponse> {
    let req = body(payload, &uri)?;
    info!("Cancelling enrollment {}", id);

    match svc.cancel(id, req.justification).await {
        Ok(enrollment) => Ok(Json(enrollment.into())),
        Err(e) => Err(failure("cancel enrollment", &e, &uri)),
    }
}

/// Days remaining until the enrollment closes
#[utoipa::path(
    get,
    path = "/enrollments/{id}/days-left",
    tag = "enrollments",
    params(("id" = Uuid, Path, description = "Enrollment UUID")),
    responses(
        (status = 200, description = "Remaining days message", body = DaysLeftDto),
        (status = 404, description = "Not Found", body = Problem)
    )
)]
pub async fn days_left(
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<Uuid>,
    uri: Uri,
) -> Result<Json<DaysLeftDto>, ProblemResponse> {
    match svc.days_left(id).await {
        Ok(message) => Ok(Json(DaysLeftDto {
            enrollment: id,
            message,
        })),
        Err(e) => Err(failure("compute days left", &e, &uri)),
    }
}
