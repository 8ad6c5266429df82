use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::contract::{
    client::VirtualEducationApi,
    error::VirtualEducationError,
    model::{
        Course, CourseFilter, CoursePatch, Enrollment, EnrollmentFilter, EnrollmentPatch,
        ExpiringEnrollment, NewCourse, NewEnrollment, NewStudent, Page, PageRequest, Student,
        StudentFilter, StudentPatch,
    },
};
use crate::domain::service::Service;

/// Local implementation of the VirtualEducationApi trait that delegates to the domain service
pub struct VirtualEducationLocalClient {
    service: Arc<Service>,
}

impl VirtualEducationLocalClient {
    pub fn new(service: Arc<Service>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl VirtualEducationApi for VirtualEducationLocalClient {
    async fn get_course(&self, id: Uuid) -> Result<Course, VirtualEducationError> {
        self.service.get_course(id).await.map_err(Into::into)
    }

    async fn list_courses(
        &self,
        filter: CourseFilter,
        page: PageRequest,
    ) -> Result<Page<Course>, VirtualEducationError> {
        self.service
            .list_courses(filter, page)
            .await
            .map_err(Into::into)
    }

    async fn create_course(&self, new_course: NewCourse) -> Result<Course, VirtualEducationError> {
        self.service
            .create_course(new_course)
            .await
            .map_err(Into::into)
    }

    async fn update_course(
        &self,
        id: Uuid,
        patch: CoursePatch,
    ) -> Result<Course, VirtualEducationError> {
        self.service
            .update_course(id, patch)
            .await
            .map_err(Into::into)
    }

    async fn delete_course(&self, id: Uuid) -> Result<(), VirtualEducationError> {
        self.service.delete_course(id).await.map_err(Into::into)
    }

    async fn get_student(&self, id: Uuid) -> Result<Student, VirtualEducationError> {
        self.service.get_student(id).await.map_err(Into::into)
    }

    async fn list_students(
        &self,
        filter: StudentFilter,
        page: PageRequest,
    ) -> Result<Page<Student>, VirtualEducationError> {
        self.service
            .list_students(filter, page)
            .await
            .map_err(Into::into)
    }

    async fn create_student(
        &self,
        new_student: NewStudent,
    ) -> Result<Student, VirtualEducationError> {
        self.service
            .create_student(new_student)
            .await
            .map_err(Into::into)
    }

    async fn update_student(
        &self,
        id: Uuid,
        patch: StudentPatch,
    ) -> Result<Student, VirtualEducationError> {
        self.service
            .update_student(id, patch)
            .await
            .map_err(Into::into)
    }

    async fn delete_student(&self, id: Uuid) -> Result<(), VirtualEducationError> {
        self.service.delete_student(id).await.map_err(Into::into)
    }

    async fn get_enrollment(&self, id: Uuid) -> Result<Enrollment, VirtualEducationError> {
        self.service.get_enrollment(id).await.map_err(Into::into)
    }

    async fn list_enrollments(
        &self,
        filter: EnrollmentFilter,
        page: PageRequest,
    ) -> Result<Page<Enrollment>, VirtualEducationError> {
        self.service
            .list_enrollments(filter, page)
            .await
            .map_err(Into::into)
    }

    async fn enroll(&self, new: NewEnrollment) -> Result<Enrollment, VirtualEducationError> {
        self.service.enroll(new).await.map_err(Into::into)
    }

    async fn complete(
        &self,
        student_id: Uuid,
        course_id: Uuid,
        score: Option<f64>,
    ) -> Result<Enrollment, VirtualEducationError> {
        self.service
            .complete(student_id, course_id, score)
            .await
            .map_err(Into::into)
    }

    async fn cancel(
        &self,
        enrollment_id: Uuid,
        justification: Option<String>,
    ) -> Result<Enrollment, VirtualEducationError> {
        self.service
            .cancel(enrollment_id, justification)
            .await
            .map_err(Into::into)
    }

    async fn update_enrollment(
        &self,
        id: Uuid,
        patch: EnrollmentPatch,
    ) -> Result<Enrollment, VirtualEducationError> {
        self.service
            .update_enrollment(id, patch)
            .await
            .map_err(Into::into)
    }

    async fn delete_enrollment(&self, id: Uuid) -> Result<(), VirtualEducationError> {
        self.service.delete_enrollment(id).await.map_err(Into::into)
    }

    async fn list_expiring(
        &self,
        within_days: i64,
    ) -> Result<Vec<ExpiringEnrollment>, VirtualEducationError> {
        self.service
            .list_expiring(within_days)
            .await
            .map_err(Into::into)
    }
}
