use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::contract::model::{
    Course, CourseFilter, Enrollment, EnrollmentFilter, Page, PageRequest, Student, StudentFilter,
};

/// Result of a delete that is refused while blocking rows still reference the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
    Blocked,
}

/// Persistence port for courses.
#[async_trait]
pub trait CoursesRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Course>>;
    async fn insert(&self, c: Course) -> anyhow::Result<()>;
    async fn update(&self, c: Course) -> anyhow::Result<()>;
    /// Delete the course together with its closed enrollments. Blocked while
    /// an enrollment in the course is still in progress; the check and the
    /// delete happen in one transaction.
    async fn delete(&self, id: Uuid) -> anyhow::Result<DeleteOutcome>;
    async fn list_page(
        &self,
        filter: &CourseFilter,
        page: PageRequest,
    ) -> anyhow::Result<Page<Course>>;
}

/// Persistence port for students and the user accounts behind them.
#[async_trait]
pub trait StudentsRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Student>>;
    /// True if some user other than `except_user` owns `email`.
    async fn email_taken(&self, email: &str, except_user: Option<Uuid>) -> anyhow::Result<bool>;
    /// Insert the user account and the student row together.
    /// Returns false when the email already belongs to another user.
    async fn insert(&self, s: Student) -> anyhow::Result<bool>;
    /// Returns false when the email already belongs to another user.
    async fn update(&self, s: Student) -> anyhow::Result<bool>;
    /// Delete the student, its withdrawn enrollments and its user account.
    /// Blocked while any other enrollment of the student remains.
    async fn delete(&self, id: Uuid) -> anyhow::Result<DeleteOutcome>;
    async fn list_page(
        &self,
        filter: &StudentFilter,
        page: PageRequest,
    ) -> anyhow::Result<Page<Student>>;
}

/// Persistence port for enrollments.
///
/// Writes that would produce a second "Andamento" enrollment for one student
/// return `false` instead of failing. The storage constraint decides, so
/// concurrent writers cannot both succeed.
#[async_trait]
pub trait EnrollmentsRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Enrollment>>;
    /// The in-progress enrollment of `student_id` in `course_id`, if any.
    async fn find_active(
        &self,
        student_id: Uuid,
        course_id: Uuid,
    ) -> anyhow::Result<Option<Enrollment>>;
    async fn course_has_active(&self, course_id: Uuid) -> anyhow::Result<bool>;
    /// True if the student has any enrollment that is not withdrawn.
    async fn student_has_unwithdrawn(&self, student_id: Uuid) -> anyhow::Result<bool>;
    async fn insert_if_no_active(&self, e: Enrollment) -> anyhow::Result<bool>;
    async fn update(&self, e: Enrollment) -> anyhow::Result<bool>;
    async fn delete(&self, id: Uuid) -> anyhow::Result<bool>;
    async fn list_page(
        &self,
        filter: &EnrollmentFilter,
        page: PageRequest,
    ) -> anyhow::Result<Page<Enrollment>>;
    /// In-progress enrollments closing before `before`, oldest close date first,
    /// each paired with its course name.
    async fn list_closing_before(
        &self,
        before: DateTime<Utc>,
    ) -> anyhow::Result<Vec<(Enrollment, String)>>;
}
