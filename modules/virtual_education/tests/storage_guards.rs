//! Repository guarantees that hold without the service's pre-checks.

mod common;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;
use virtual_education::{
    domain::{
        error::DomainError,
        repo::{CoursesRepository, DeleteOutcome, EnrollmentsRepository, StudentsRepository},
        service::{Repositories, Service, ServiceConfig},
    },
    infra::storage::SeaOrmRepository,
    model::{
        Enrollment, EnrollmentStatus, NewStudent, Page, PageRequest, Student, StudentFilter,
        StudentPatch,
    },
    VirtualEducation, VirtualEducationConfig,
};

use common::{course, create_test_db, enrollment, in_days, student, RecordingNotifier};

fn open_enrollment(student_id: Uuid, course_id: Uuid) -> Enrollment {
    Enrollment {
        id: Uuid::new_v4(),
        student_id,
        course_id,
        enrolled_at: Utc::now(),
        closes_at: in_days(30),
        score: None,
        status: EnrollmentStatus::InProgress,
        justification: None,
    }
}

#[tokio::test]
async fn course_delete_rechecks_inside_its_transaction() {
    let db = create_test_db().await;
    let module = VirtualEducation::init(db.clone(), VirtualEducationConfig::default()).unwrap();
    let svc = module.service();
    let repo = SeaOrmRepository::new(db);

    let c = course(&svc, "Rust").await;
    let ana = student(&svc, "ana").await;
    let bob = student(&svc, "bob").await;
    let done = svc.enroll(enrollment(bob.id, c.id, 10)).await.unwrap();
    svc.complete(bob.id, c.id, Some(8.0)).await.unwrap();
    // Lands after any guard a caller may have run.
    let active = svc.enroll(enrollment(ana.id, c.id, 30)).await.unwrap();

    let outcome = CoursesRepository::delete(&repo, c.id).await.unwrap();
    assert_eq!(outcome, DeleteOutcome::Blocked);
    assert!(svc.get_course(c.id).await.is_ok());
    assert!(svc.get_enrollment(active.id).await.is_ok());
    // The blocked delete rolled back its cleanup of closed enrollments.
    assert!(svc.get_enrollment(done.id).await.is_ok());

    svc.cancel(active.id, None).await.unwrap();
    let outcome = CoursesRepository::delete(&repo, c.id).await.unwrap();
    assert_eq!(outcome, DeleteOutcome::Deleted);
    assert!(EnrollmentsRepository::find_by_id(&repo, done.id)
        .await
        .unwrap()
        .is_none());

    let outcome = CoursesRepository::delete(&repo, c.id).await.unwrap();
    assert_eq!(outcome, DeleteOutcome::NotFound);
}

#[tokio::test]
async fn student_delete_rechecks_inside_its_transaction() {
    let db = create_test_db().await;
    let module = VirtualEducation::init(db.clone(), VirtualEducationConfig::default()).unwrap();
    let svc = module.service();
    let repo = SeaOrmRepository::new(db);

    let c = course(&svc, "Rust").await;
    let s = student(&svc, "ana").await;
    let withdrawn = svc.enroll(enrollment(s.id, c.id, 10)).await.unwrap();
    svc.cancel(withdrawn.id, None).await.unwrap();
    svc.enroll(enrollment(s.id, c.id, 30)).await.unwrap();
    svc.complete(s.id, c.id, Some(3.0)).await.unwrap();

    let outcome = StudentsRepository::delete(&repo, s.id).await.unwrap();
    assert_eq!(outcome, DeleteOutcome::Blocked);
    assert!(svc.get_student(s.id).await.is_ok());
    assert!(svc.get_enrollment(withdrawn.id).await.is_ok());

    assert_eq!(
        StudentsRepository::delete(&repo, Uuid::new_v4()).await.unwrap(),
        DeleteOutcome::NotFound
    );
}

#[tokio::test]
async fn second_active_row_is_refused_by_the_index() {
    let db = create_test_db().await;
    let module = VirtualEducation::init(db.clone(), VirtualEducationConfig::default()).unwrap();
    let svc = module.service();
    let repo = SeaOrmRepository::new(db);

    let rust = course(&svc, "Rust").await;
    let go = course(&svc, "Go").await;
    let s = student(&svc, "ana").await;

    assert!(repo
        .insert_if_no_active(open_enrollment(s.id, rust.id))
        .await
        .unwrap());
    assert!(!repo
        .insert_if_no_active(open_enrollment(s.id, go.id))
        .await
        .unwrap());

    let mut closed = open_enrollment(s.id, go.id);
    closed.status = EnrollmentStatus::Withdrawn;
    assert!(repo.insert_if_no_active(closed.clone()).await.unwrap());

    // Reopening the withdrawn row would make two active ones.
    closed.status = EnrollmentStatus::InProgress;
    assert!(!EnrollmentsRepository::update(&repo, closed).await.unwrap());
}

#[tokio::test]
async fn taken_email_is_reported_by_the_repository() {
    let db = create_test_db().await;
    let module = VirtualEducation::init(db.clone(), VirtualEducationConfig::default()).unwrap();
    let svc = module.service();
    let repo = SeaOrmRepository::new(db);

    let ana = student(&svc, "ana").await;
    let mut bob = student(&svc, "bob").await;

    let clash = Student {
        id: Uuid::new_v4(),
        user_id: Uuid::new_v4(),
        email: ana.email.clone(),
        ..bob.clone()
    };
    assert!(!StudentsRepository::insert(&repo, clash).await.unwrap());

    bob.email = ana.email.clone();
    assert!(!StudentsRepository::update(&repo, bob).await.unwrap());
}

/// Lets every email through the pre-check, as when a concurrent write commits
/// right after it.
struct LateEmailCheck(Arc<SeaOrmRepository<sea_orm::DatabaseConnection>>);

#[async_trait]
impl StudentsRepository for LateEmailCheck {
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Student>> {
        StudentsRepository::find_by_id(self.0.as_ref(), id).await
    }

    async fn email_taken(&self, _email: &str, _except_user: Option<Uuid>) -> anyhow::Result<bool> {
        Ok(false)
    }

    async fn insert(&self, s: Student) -> anyhow::Result<bool> {
        StudentsRepository::insert(self.0.as_ref(), s).await
    }

    async fn update(&self, s: Student) -> anyhow::Result<bool> {
        StudentsRepository::update(self.0.as_ref(), s).await
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<DeleteOutcome> {
        StudentsRepository::delete(self.0.as_ref(), id).await
    }

    async fn list_page(
        &self,
        filter: &StudentFilter,
        page: PageRequest,
    ) -> anyhow::Result<Page<Student>> {
        StudentsRepository::list_page(self.0.as_ref(), filter, page).await
    }
}

#[tokio::test]
async fn email_race_is_a_field_error() {
    let repo = Arc::new(SeaOrmRepository::new(create_test_db().await));
    let mut repos = Repositories::from_shared(repo.clone());
    repos.students = Arc::new(LateEmailCheck(repo));
    let svc = Service::new(
        repos,
        Arc::new(RecordingNotifier::default()),
        ServiceConfig::default(),
    );

    let new_student = |nickname: &str, email: &str| NewStudent {
        nickname: nickname.into(),
        email: email.into(),
        phone: "555-0101".into(),
    };
    svc.create_student(new_student("ana", "ana@example.com"))
        .await
        .unwrap();

    let err = svc
        .create_student(new_student("ana2", "ana@example.com"))
        .await
        .unwrap_err();
    assert!(
        matches!(&err, DomainError::Validation { violations } if violations[0].field == "email"),
        "{err:?}"
    );

    let bob = svc
        .create_student(new_student("bob", "bob@example.com"))
        .await
        .unwrap();
    let err = svc
        .update_student(
            bob.id,
            StudentPatch {
                email: Some("ana@example.com".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(
        matches!(&err, DomainError::Validation { violations } if violations[0].field == "email"),
        "{err:?}"
    );
    assert_eq!(svc.get_student(bob.id).await.unwrap().email, "bob@example.com");
}
