use chrono::Utc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::Service;
use crate::contract::model::{NewStudent, Page, PageRequest, Student, StudentFilter, StudentPatch};
use crate::domain::error::{db_err, DomainError};
use crate::domain::repo::DeleteOutcome;
use crate::domain::validation::Violations;

const EMAIL_TAKEN: &str = "A user with this email already exists.";

impl Service {
    #[instrument(name = "virtual_education.service.get_student", skip(self), fields(student_id = %id))]
    pub async fn get_student(&self, id: Uuid) -> Result<Student, DomainError> {
        debug!("Getting student by id");
        self.students
            .find_by_id(id)
            .await
            .map_err(db_err)?
            .ok_or_else(|| DomainError::student_not_found(id))
    }

    #[instrument(name = "virtual_education.service.list_students", skip(self, filter))]
    pub async fn list_students(
        &self,
        filter: StudentFilter,
        page: PageRequest,
    ) -> Result<Page<Student>, DomainError> {
        let page = self
            .students
            .list_page(&filter, page)
            .await
            .map_err(db_err)?;
        debug!("Listed {} of {} students", page.items.len(), page.total);
        Ok(page)
    }

    #[instrument(
        name = "virtual_education.service.create_student",
        skip(self, new_student),
        fields(email = %new_student.email)
    )]
    pub async fn create_student(&self, new_student: NewStudent) -> Result<Student, DomainError> {
        info!("Creating new student");
        let mut v = self.check_student(
            &new_student.nickname,
            &new_student.email,
            &new_student.phone,
        );
        if v.is_empty()
            && self
                .students
                .email_taken(&new_student.email, None)
                .await
                .map_err(db_err)?
        {
            v.push("email", EMAIL_TAKEN);
        }
        v.into_result()?;

        let now = Utc::now();
        let student = Student {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            nickname: new_student.nickname,
            email: new_student.email,
            phone: new_student.phone,
            created_at: now,
            updated_at: now,
        };
        // A concurrent create can take the email after the check above.
        let inserted = self.students.insert(student.clone()).await.map_err(db_err)?;
        if !inserted {
            return Err(DomainError::validation("email", EMAIL_TAKEN));
        }

        info!("Successfully created student with id={}", student.id);
        Ok(student)
    }

    #[instrument(name = "virtual_education.service.update_student", skip(self, patch), fields(student_id = %id))]
    pub async fn update_student(
        &self,
        id: Uuid,
        patch: StudentPatch,
    ) -> Result<Student, DomainError> {
        info!("Updating student");
        let mut current = self.get_student(id).await?;
        let email_changed = patch
            .email
            .as_ref()
            .is_some_and(|email| *email != current.email);

        if let Some(nickname) = patch.nickname {
            current.nickname = nickname;
        }
        if let Some(email) = patch.email {
            current.email = email;
        }
        if let Some(phone) = patch.phone {
            current.phone = phone;
        }

        let mut v = self.check_student(&current.nickname, &current.email, &current.phone);
        if v.is_empty()
            && email_changed
            && self
                .students
                .email_taken(&current.email, Some(current.user_id))
                .await
                .map_err(db_err)?
        {
            v.push("email", EMAIL_TAKEN);
        }
        v.into_result()?;

        current.updated_at = Utc::now();
        let updated = self
            .students
            .update(current.clone())
            .await
            .map_err(db_err)?;
        if !updated {
            return Err(DomainError::validation("email", EMAIL_TAKEN));
        }
        info!("Successfully updated student");
        Ok(current)
    }

    /// Fails while the student has any enrollment that was not withdrawn.
    pub async fn assert_student_deletable(&self, id: Uuid) -> Result<(), DomainError> {
        if self
            .enrollments
            .student_has_unwithdrawn(id)
            .await
            .map_err(db_err)?
        {
            return Err(DomainError::student_has_enrollments(id));
        }
        Ok(())
    }

    #[instrument(name = "virtual_education.service.delete_student", skip(self), fields(student_id = %id))]
    pub async fn delete_student(&self, id: Uuid) -> Result<(), DomainError> {
        info!("Deleting student");
        match self.students.delete(id).await.map_err(db_err)? {
            DeleteOutcome::Deleted => {}
            DeleteOutcome::NotFound => return Err(DomainError::student_not_found(id)),
            DeleteOutcome::Blocked => {
                warn!("Student still has enrollments that were not withdrawn");
                return Err(DomainError::student_has_enrollments(id));
            }
        }
        info!("Successfully deleted student");
        Ok(())
    }

    fn check_student(&self, nickname: &str, email: &str, phone: &str) -> Violations {
        let mut v = Violations::default();
        v.text("nickname", nickname, Some(self.config.max_nickname_length));
        v.email("email", email, self.config.max_email_length);
        v.text("phone", phone, Some(self.config.max_phone_length));
        v
    }
}
