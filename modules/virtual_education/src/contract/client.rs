use async_trait::async_trait;
use uuid::Uuid;

use crate::contract::{
    error::VirtualEducationError,
    model::{
        Course, CourseFilter, CoursePatch, Enrollment, EnrollmentFilter, EnrollmentPatch,
        ExpiringEnrollment, NewCourse, NewEnrollment, NewStudent, Page, PageRequest, Student,
        StudentFilter, StudentPatch,
    },
};

/// Public API of the virtual education module for in-process consumers.
#[async_trait]
pub trait VirtualEducationApi: Send + Sync {
    async fn get_course(&self, id: Uuid) -> Result<Course, VirtualEducationError>;
    async fn list_courses(
        &self,
        filter: CourseFilter,
        page: PageRequest,
    ) -> Result<Page<Course>, VirtualEducationError>;
    async fn create_course(&self, new_course: NewCourse) -> Result<Course, VirtualEducationError>;
    async fn update_course(
        &self,
        id: Uuid,
        patch: CoursePatch,
    ) -> Result<Course, VirtualEducationError>;
    async fn delete_course(&self, id: Uuid) -> Result<(), VirtualEducationError>;

    async fn get_student(&self, id: Uuid) -> Result<Student, VirtualEducationError>;
    async fn list_students(
        &self,
        filter: StudentFilter,
        page: PageRequest,
    ) -> Result<Page<Student>, VirtualEducationError>;
    async fn create_student(
        &self,
        new_student: NewStudent,
    ) -> Result<Student, VirtualEducationError>;
    async fn update_student(
        &self,
        id: Uuid,
        patch: StudentPatch,
    ) -> Result<Student, VirtualEducationError>;
    async fn delete_student(&self, id: Uuid) -> Result<(), VirtualEducationError>;

    async fn get_enrollment(&self, id: Uuid) -> Result<Enrollment, VirtualEducationError>;
    async fn list_enrollments(
        &self,
        filter: EnrollmentFilter,
        page: PageRequest,
    ) -> Result<Page<Enrollment>, VirtualEducationError>;
    /// Open an "Andamento" enrollment for the student.
    async fn enroll(&self, new: NewEnrollment) -> Result<Enrollment, VirtualEducationError>;
    /// Grade the student's in-progress enrollment in the course.
    async fn complete(
        &self,
        student_id: Uuid,
        course_id: Uuid,
        score: Option<f64>,
    ) -> Result<Enrollment, VirtualEducationError>;
    async fn cancel(
        &self,
        enrollment_id: Uuid,
        justification: Option<String>,
    ) -> Result<Enrollment, VirtualEducationError>;
    async fn update_enrollment(
        &self,
        id: Uuid,
        patch: EnrollmentPatch,
    ) -> Result<Enrollment, VirtualEducationError>;
    async fn delete_enrollment(&self, id: Uuid) -> Result<(), VirtualEducationError>;
    async fn list_expiring(
        &self,
        within_days: i64,
    ) -> Result<Vec<ExpiringEnrollment>, VirtualEducationError>;
}
