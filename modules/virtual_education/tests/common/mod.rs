#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use uuid::Uuid;

use virtual_education::{
    domain::{ports::ExpiryNotifier, service::Service},
    model::{Course, ExpiringEnrollment, NewCourse, NewEnrollment, NewStudent, Student},
    VirtualEducation, VirtualEducationConfig,
};

/// Fresh in-memory SQLite database with migrations applied.
/// One pooled connection, so every query sees the same database.
pub async fn create_test_db() -> DatabaseConnection {
    let mut opts = ConnectOptions::new("sqlite::memory:");
    opts.max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let db = Database::connect(opts)
        .await
        .expect("Failed to connect to test database");
    VirtualEducation::migrate(&db)
        .await
        .expect("Failed to run migrations");
    db
}

/// Collects reminders instead of sending them.
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<ExpiringEnrollment>>,
}

#[async_trait]
impl ExpiryNotifier for RecordingNotifier {
    async fn notify(&self, expiring: &ExpiringEnrollment) -> anyhow::Result<()> {
        self.sent.lock().push(expiring.clone());
        Ok(())
    }
}

pub struct TestModule {
    pub module: VirtualEducation,
    pub notifier: Arc<RecordingNotifier>,
}

impl TestModule {
    pub fn service(&self) -> Arc<Service> {
        self.module.service()
    }
}

pub async fn create_test_module() -> TestModule {
    create_test_module_with(VirtualEducationConfig::default()).await
}

pub async fn create_test_module_with(cfg: VirtualEducationConfig) -> TestModule {
    let db = create_test_db().await;
    let notifier = Arc::new(RecordingNotifier::default());
    let module = VirtualEducation::with_notifier(db, cfg, notifier.clone())
        .expect("Failed to build module");
    TestModule { module, notifier }
}

pub fn in_days(days: i64) -> DateTime<Utc> {
    Utc::now() + Duration::days(days)
}

pub async fn course(svc: &Service, name: &str) -> Course {
    svc.create_course(NewCourse {
        name: name.to_string(),
        description: format!("All about {name}"),
        duration: 40,
    })
    .await
    .expect("create course")
}

pub async fn student(svc: &Service, nickname: &str) -> Student {
    svc.create_student(NewStudent {
        nickname: nickname.to_string(),
        email: format!("{}@example.com", nickname.to_lowercase()),
        phone: "+55 11 99999-0000".to_string(),
    })
    .await
    .expect("create student")
}

pub fn enrollment(student_id: Uuid, course_id: Uuid, days: i64) -> NewEnrollment {
    NewEnrollment {
        student_id,
        course_id,
        closes_at: in_days(days),
    }
}
