use chrono::Utc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::Service;
use crate::contract::model::{Course, CourseFilter, CoursePatch, NewCourse, Page, PageRequest};
use crate::domain::error::{db_err, DomainError};
use crate::domain::repo::DeleteOutcome;
use crate::domain::validation::Violations;

impl Service {
    #[instrument(name = "virtual_education.service.get_course", skip(self), fields(course_id = %id))]
    pub async fn get_course(&self, id: Uuid) -> Result<Course, DomainError> {
        debug!("Getting course by id");
        self.courses
            .find_by_id(id)
            .await
            .map_err(db_err)?
            .ok_or_else(|| DomainError::course_not_found(id))
    }

    #[instrument(name = "virtual_education.service.list_courses", skip(self, filter))]
    pub async fn list_courses(
        &self,
        filter: CourseFilter,
        page: PageRequest,
    ) -> Result<Page<Course>, DomainError> {
        let page = self.courses.list_page(&filter, page).await.map_err(db_err)?;
        debug!("Listed {} of {} courses", page.items.len(), page.total);
        Ok(page)
    }

    #[instrument(
        name = "virtual_education.service.create_course",
        skip(self, new_course),
        fields(name = %new_course.name)
    )]
    pub async fn create_course(&self, new_course: NewCourse) -> Result<Course, DomainError> {
        info!("Creating new course");
        self.validate_course(&new_course.name, &new_course.description, new_course.duration)?;

        let now = Utc::now();
        let course = Course {
            id: Uuid::new_v4(),
            name: new_course.name,
            description: new_course.description,
            duration: new_course.duration,
            created_at: now,
            updated_at: now,
        };
        self.courses.insert(course.clone()).await.map_err(db_err)?;

        info!("Successfully created course with id={}", course.id);
        Ok(course)
    }

    #[instrument(name = "virtual_education.service.update_course", skip(self, patch), fields(course_id = %id))]
    pub async fn update_course(&self, id: Uuid, patch: CoursePatch) -> Result<Course, DomainError> {
        info!("Updating course");
        let mut current = self.get_course(id).await?;

        if let Some(name) = patch.name {
            current.name = name;
        }
        if let Some(description) = patch.description {
            current.description = description;
        }
        if let Some(duration) = patch.duration {
            current.duration = duration;
        }
        self.validate_course(&current.name, &current.description, current.duration)?;
        current.updated_at = Utc::now();

        self.courses.update(current.clone()).await.map_err(db_err)?;
        info!("Successfully updated course");
        Ok(current)
    }

    /// Fails while any enrollment in the course is still in progress.
    pub async fn assert_course_deletable(&self, id: Uuid) -> Result<(), DomainError> {
        if self
            .enrollments
            .course_has_active(id)
            .await
            .map_err(db_err)?
        {
            return Err(DomainError::course_has_active_enrollments(id));
        }
        Ok(())
    }

    #[instrument(name = "virtual_education.service.delete_course", skip(self), fields(course_id = %id))]
    pub async fn delete_course(&self, id: Uuid) -> Result<(), DomainError> {
        info!("Deleting course");
        match self.courses.delete(id).await.map_err(db_err)? {
            DeleteOutcome::Deleted => {}
            DeleteOutcome::NotFound => return Err(DomainError::course_not_found(id)),
            DeleteOutcome::Blocked => {
                warn!("Course still has enrollments in progress");
                return Err(DomainError::course_has_active_enrollments(id));
            }
        }
        info!("Successfully deleted course");
        Ok(())
    }

    fn validate_course(
        &self,
        name: &str,
        description: &str,
        duration: i32,
    ) -> Result<(), DomainError> {
        let mut v = Violations::default();
        v.text("name", name, Some(self.config.max_course_name_length));
        v.text("description", description, None);
        v.non_negative("duration", duration);
        v.into_result()
    }
}
