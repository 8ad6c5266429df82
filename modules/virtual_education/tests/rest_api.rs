//! REST layer exercised through the real router with `tower::ServiceExt::oneshot`.

mod common;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use common::create_test_module;

async fn app() -> Router {
    let t = create_test_module().await;
    t.module.register_rest(Router::new())
}

async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(v) => {
            req = req.header(header::CONTENT_TYPE, "application/json");
            Body::from(v.to_string())
        }
        None => Body::empty(),
    };
    let resp = app
        .clone()
        .oneshot(req.body(body).unwrap())
        .await
        .unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn create_course(app: &Router, name: &str) -> Value {
    let (status, body) = call(
        app,
        Method::POST,
        "/courses",
        Some(json!({ "name": name, "description": "Intro", "duration": 20 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body
}

async fn create_student(app: &Router, nickname: &str) -> Value {
    let (status, body) = call(
        app,
        Method::POST,
        "/students",
        Some(json!({
            "nickname": nickname,
            "email": format!("{nickname}@example.com"),
            "phone": "555-0101"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body
}

async fn enroll(app: &Router, student: &Value, course: &Value, close: &str) -> (StatusCode, Value) {
    call(
        app,
        Method::POST,
        "/enrollments",
        Some(json!({
            "student": student["id"],
            "course": course["id"],
            "date_close": close
        })),
    )
    .await
}

fn pointers(problem: &Value) -> Vec<String> {
    problem["errors"]
        .as_array()
        .map(|errors| {
            errors
                .iter()
                .filter_map(|e| e["pointer"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

#[tokio::test]
async fn course_crud_roundtrip() {
    let app = app().await;
    let course = create_course(&app, "Rust").await;
    assert_eq!(course["name"], "Rust");
    assert!(course["date_created"].is_string());
    let id = course["id"].as_str().unwrap();

    let (status, got) = call(&app, Method::GET, &format!("/courses/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(got["id"], course["id"]);

    let (status, patched) = call(
        &app,
        Method::PATCH,
        &format!("/courses/{id}"),
        Some(json!({ "duration": 30 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(patched["duration"], 30);
    assert_eq!(patched["name"], "Rust");

    let (status, problem) = call(
        &app,
        Method::PUT,
        &format!("/courses/{id}"),
        Some(json!({ "name": "Rust 2" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(pointers(&problem), ["/description", "/duration"]);

    let (status, _) = call(&app, Method::DELETE, &format!("/courses/{id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, problem) = call(&app, Method::GET, &format!("/courses/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(problem["code"], "COURSE_NOT_FOUND");
}

#[tokio::test]
async fn missing_required_fields_are_named() {
    let app = app().await;

    let (status, problem) = call(&app, Method::POST, "/courses", Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(pointers(&problem), ["/name", "/description", "/duration"]);
    assert_eq!(problem["status"], 400);

    let (status, problem) = call(
        &app,
        Method::POST,
        "/students",
        Some(json!({ "nickname": "ana" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(pointers(&problem), ["/email", "/phone"]);
}

#[tokio::test]
async fn malformed_json_is_a_bad_request() {
    let app = app().await;
    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/courses")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        resp.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/problem+json"
    );
}

#[tokio::test]
async fn enrollment_lifecycle_over_http() {
    let app = app().await;
    let course = create_course(&app, "Rust").await;
    let other = create_course(&app, "Go").await;
    let student = create_student(&app, "ana").await;

    let (status, e) = enroll(&app, &student, &course, "2099-12-31").await;
    assert_eq!(status, StatusCode::CREATED, "{e}");
    assert_eq!(e["status"], "Andamento");
    assert_eq!(e["score"], Value::Null);
    let id = e["id"].as_str().unwrap().to_string();

    let (status, problem) = enroll(&app, &student, &other, "2099-12-31").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(problem["code"], "ALREADY_ENROLLED");

    // Status is read-only; sending it changes nothing.
    let (status, same) = call(
        &app,
        Method::PATCH,
        &format!("/enrollments/{id}"),
        Some(json!({ "status": "Aprovado" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(same["status"], "Andamento");

    let (status, problem) = call(
        &app,
        Method::DELETE,
        &format!("/courses/{}", course["id"].as_str().unwrap()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(problem["code"], "COURSE_IN_USE");

    let (status, graded) = call(
        &app,
        Method::PATCH,
        &format!("/enrollments/{id}"),
        Some(json!({ "score": 5.5 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(graded["status"], "Reprovado");
    assert_eq!(graded["score"], 5.5);

    let (status, problem) = call(
        &app,
        Method::POST,
        &format!("/enrollments/{id}/cancel"),
        Some(json!({ "justification": "too late" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(problem["code"], "ENROLLMENT_CLOSED");

    let (status, problem) = call(
        &app,
        Method::DELETE,
        &format!("/students/{}", student["id"].as_str().unwrap()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(problem["code"], "STUDENT_IN_USE");
}

#[tokio::test]
async fn complete_and_cancel_endpoints() {
    let app = app().await;
    let course = create_course(&app, "Rust").await;
    let ana = create_student(&app, "ana").await;
    let bia = create_student(&app, "bia").await;

    let (_, a) = enroll(&app, &ana, &course, "2099-01-01T12:00:00Z").await;
    let (_, b) = enroll(&app, &bia, &course, "2099-01-01").await;
    let a_id = a["id"].as_str().unwrap();
    let b_id = b["id"].as_str().unwrap();

    let (status, problem) = call(
        &app,
        Method::POST,
        &format!("/enrollments/{a_id}/complete"),
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(pointers(&problem), ["/score"]);

    let (status, done) = call(
        &app,
        Method::POST,
        &format!("/enrollments/{a_id}/complete"),
        Some(json!({ "score": 6 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(done["status"], "Aprovado");

    let (status, cancelled) = call(
        &app,
        Method::POST,
        &format!("/enrollments/{b_id}/cancel"),
        Some(json!({ "justification": "moving" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["status"], "Desistiu");
    assert_eq!(cancelled["justification"], "moving");

    // Withdrawn only: bia can now be deleted.
    let (status, _) = call(
        &app,
        Method::DELETE,
        &format!("/students/{}", bia["id"].as_str().unwrap()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn unknown_references_are_field_errors() {
    let app = app().await;
    let missing = Uuid::new_v4();
    let (status, problem) = call(
        &app,
        Method::POST,
        "/enrollments",
        Some(json!({ "student": missing, "course": missing, "date_close": "2099-01-01" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(pointers(&problem), ["/student", "/course"]);
    assert_eq!(
        problem["errors"][0]["detail"],
        format!("Invalid pk \"{missing}\" - object does not exist.")
    );
}

#[tokio::test]
async fn list_endpoints_filter_and_page() {
    let app = app().await;
    for i in 0..11 {
        create_course(&app, &format!("Course {i}")).await;
    }
    create_course(&app, "Python Basics").await;

    let (status, page) = call(&app, Method::GET, "/courses", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["count"], 12);
    assert_eq!(page["page_size"], 10);
    assert_eq!(page["results"].as_array().unwrap().len(), 10);

    let (_, page2) = call(&app, Method::GET, "/courses?page=2", None).await;
    assert_eq!(page2["results"].as_array().unwrap().len(), 2);

    let (_, found) = call(&app, Method::GET, "/courses?name=PYTHON", None).await;
    assert_eq!(found["count"], 1);
    assert_eq!(found["results"][0]["name"], "Python Basics");

    let (_, none) = call(&app, Method::GET, "/courses?duration__gte=21", None).await;
    assert_eq!(none["count"], 0);

    let (status, problem) = call(&app, Method::GET, "/courses?page=0", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(pointers(&problem), ["/page"]);

    for uri in [
        "/courses?page=18446744073709551615",
        "/students?page=18446744073709551615",
        "/enrollments?page=18446744073709551615",
    ] {
        let (status, problem) = call(&app, Method::GET, uri, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(pointers(&problem), ["/page"], "{uri}");
    }

    let (_, exact_day) = call(&app, Method::GET, "/courses?date_created=2000-01-01", None).await;
    assert_eq!(exact_day["count"], 0);
    let today = chrono::Utc::now().date_naive();
    let (_, created_today) = call(
        &app,
        Method::GET,
        &format!("/courses?date_created={today}&date_created__gte=2000-01-01"),
        None,
    )
    .await;
    assert_eq!(created_today["count"], 12);

    let (status, _) = call(&app, Method::GET, "/courses?duration=abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let student = create_student(&app, "ana").await;
    let (_, by_email) = call(&app, Method::GET, "/students?email=ANA@", None).await;
    assert_eq!(by_email["count"], 1);
    assert_eq!(by_email["results"][0]["id"], student["id"]);
    assert_eq!(by_email["results"][0]["phone"], "555-0101");

    let course = create_course(&app, "Rust").await;
    enroll(&app, &student, &course, "2099-01-01").await;
    let (_, active) = call(&app, Method::GET, "/enrollments?status=ANDAMENTO", None).await;
    assert_eq!(active["count"], 1);
    let (_, by_course) = call(
        &app,
        Method::GET,
        &format!("/enrollments?course={}", course["id"].as_str().unwrap()),
        None,
    )
    .await;
    assert_eq!(by_course["count"], 1);
    let (_, later) = call(&app, Method::GET, "/enrollments?date_close=2100-01-01", None).await;
    assert_eq!(later["count"], 0);
}

#[tokio::test]
async fn days_left_endpoint() {
    let app = app().await;
    let course = create_course(&app, "Rust").await;
    let student = create_student(&app, "ana").await;
    let close = (chrono::Utc::now() + chrono::Duration::days(5) + chrono::Duration::hours(2))
        .to_rfc3339();
    let (_, e) = enroll(&app, &student, &course, &close).await;

    let (status, body) = call(
        &app,
        Method::GET,
        &format!("/enrollments/{}/days-left", e["id"].as_str().unwrap()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "5 days left until the end of course Rust");

    let (status, _) = call(
        &app,
        Method::GET,
        &format!("/enrollments/{}/days-left", Uuid::new_v4()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
