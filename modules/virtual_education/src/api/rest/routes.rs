use std::sync::Arc;

use axum::{
    routing::{get, post},
    Extension, Router,
};

use crate::api::rest::handlers;
use crate::domain::service::Service;

pub fn register_routes(router: Router, service: Arc<Service>) -> Router {
    router
        .route(
            "/courses",
            get(handlers::list_courses).post(handlers::create_course),
        )
        .route(
            "/courses/{id}",
            get(handlers::get_course)
                .put(handlers::replace_course)
                .patch(handlers::update_course)
                .delete(handlers::delete_course),
        )
        .route(
            "/students",
            get(handlers::list_students).post(handlers::create_student),
        )
        .route(
            "/students/{id}",
            get(handlers::get_student)
                .put(handlers::replace_student)
                .patch(handlers::update_student)
                .delete(handlers::delete_student),
        )
        .route(
            "/enrollments",
            get(handlers::list_enrollments).post(handlers::create_enrollment),
        )
        .route(
            "/enrollments/{id}",
            get(handlers::get_enrollment)
                .put(handlers::replace_enrollment)
                .patch(handlers::update_enrollment)
                .delete(handlers::delete_enrollment),
        )
        .route(
            "/enrollments/{id}/complete",
            post(handlers::complete_enrollment),
        )
        .route("/enrollments/{id}/cancel", post(handlers::cancel_enrollment))
        .route("/enrollments/{id}/days-left", get(handlers::days_left))
        .layer(Extension(service))
}
