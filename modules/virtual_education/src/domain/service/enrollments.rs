use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::Service;
use crate::contract::model::{
    days_left_message, Enrollment, EnrollmentFilter, EnrollmentPatch, EnrollmentStatus,
    ExpiringEnrollment, NewEnrollment, Page, PageRequest,
};
use crate::domain::error::{db_err, DomainError};
use crate::domain::validation::{missing_pk, round_score, Violations, REQUIRED};

/// Whole days from `now` until `closes_at`, truncated toward zero.
pub fn days_remaining(closes_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (closes_at - now).num_days()
}

fn close_with_score(e: &mut Enrollment, score: f64, now: DateTime<Utc>) {
    e.score = Some(score);
    e.status = EnrollmentStatus::from_score(score);
    e.closes_at = now;
}

fn close_as_withdrawn(e: &mut Enrollment, justification: Option<String>, now: DateTime<Utc>) {
    e.status = EnrollmentStatus::Withdrawn;
    e.justification = justification;
    e.closes_at = now;
}

impl Service {
    #[instrument(name = "virtual_education.service.get_enrollment", skip(self), fields(enrollment_id = %id))]
    pub async fn get_enrollment(&self, id: Uuid) -> Result<Enrollment, DomainError> {
        debug!("Getting enrollment by id");
        self.enrollments
            .find_by_id(id)
            .await
            .map_err(db_err)?
            .ok_or_else(|| DomainError::enrollment_not_found(id))
    }

    #[instrument(name = "virtual_education.service.list_enrollments", skip(self, filter))]
    pub async fn list_enrollments(
        &self,
        filter: EnrollmentFilter,
        page: PageRequest,
    ) -> Result<Page<Enrollment>, DomainError> {
        let page = self
            .enrollments
            .list_page(&filter, page)
            .await
            .map_err(db_err)?;
        debug!("Listed {} of {} enrollments", page.items.len(), page.total);
        Ok(page)
    }

    /// Open an "Andamento" enrollment. A student may hold only one at a time.
    #[instrument(
        name = "virtual_education.service.enroll",
        skip(self, new),
        fields(student_id = %new.student_id, course_id = %new.course_id)
    )]
    pub async fn enroll(&self, new: NewEnrollment) -> Result<Enrollment, DomainError> {
        info!("Enrolling student");
        self.check_references(Some(new.student_id), Some(new.course_id))
            .await?
            .into_result()?;

        let enrollment = Enrollment {
            id: Uuid::new_v4(),
            student_id: new.student_id,
            course_id: new.course_id,
            enrolled_at: Utc::now(),
            closes_at: new.closes_at,
            score: None,
            status: EnrollmentStatus::InProgress,
            justification: None,
        };

        let inserted = self
            .enrollments
            .insert_if_no_active(enrollment.clone())
            .await
            .map_err(db_err)?;
        if !inserted {
            warn!("Student already has an enrollment in progress");
            return Err(DomainError::already_enrolled(new.student_id));
        }

        info!("Successfully created enrollment with id={}", enrollment.id);
        Ok(enrollment)
    }

    /// Grade the in-progress enrollment of a student in a course.
    #[instrument(
        name = "virtual_education.service.complete",
        skip(self),
        fields(student_id = %student_id, course_id = %course_id)
    )]
    pub async fn complete(
        &self,
        student_id: Uuid,
        course_id: Uuid,
        score: Option<f64>,
    ) -> Result<Enrollment, DomainError> {
        info!("Completing enrollment");
        let score = self.checked_score(score)?;

        let mut enrollment = self
            .enrollments
            .find_active(student_id, course_id)
            .await
            .map_err(db_err)?
            .ok_or_else(|| DomainError::no_active_enrollment(student_id, course_id))?;

        close_with_score(&mut enrollment, score, Utc::now());
        self.store(enrollment).await
    }

    /// Grade a specific enrollment. Closed enrollments are a conflict rather than a miss.
    #[instrument(name = "virtual_education.service.complete_by_id", skip(self), fields(enrollment_id = %id))]
    pub async fn complete_by_id(
        &self,
        id: Uuid,
        score: Option<f64>,
    ) -> Result<Enrollment, DomainError> {
        let enrollment = self.get_enrollment(id).await?;
        if enrollment.status.is_terminal() {
            return Err(DomainError::enrollment_closed(id, enrollment.status.as_str()));
        }
        self.complete(enrollment.student_id, enrollment.course_id, score)
            .await
    }

    /// Withdraw from an in-progress enrollment.
    #[instrument(name = "virtual_education.service.cancel", skip(self, justification), fields(enrollment_id = %id))]
    pub async fn cancel(
        &self,
        id: Uuid,
        justification: Option<String>,
    ) -> Result<Enrollment, DomainError> {
        info!("Cancelling enrollment");
        let mut enrollment = self.get_enrollment(id).await?;
        if enrollment.status.is_terminal() {
            return Err(DomainError::enrollment_closed(id, enrollment.status.as_str()));
        }

        close_as_withdrawn(&mut enrollment, justification, Utc::now());
        self.store(enrollment).await
    }

    /// Apply a client edit. A score completes the enrollment, a justification
    /// cancels it; both only apply to enrollments still in progress.
    #[instrument(name = "virtual_education.service.update_enrollment", skip(self, patch), fields(enrollment_id = %id))]
    pub async fn update_enrollment(
        &self,
        id: Uuid,
        patch: EnrollmentPatch,
    ) -> Result<Enrollment, DomainError> {
        info!("Updating enrollment");
        let mut enrollment = self.get_enrollment(id).await?;

        let mut v = self
            .check_references(patch.student_id, patch.course_id)
            .await?;
        if patch.score.is_some() && patch.justification.is_some() {
            v.push(
                "justification",
                "A score and a justification cannot be sent together.",
            );
        }
        if let Some(score) = patch.score {
            v.score("score", score, self.config.max_score);
        }
        v.into_result()?;

        if let Some(student_id) = patch.student_id {
            enrollment.student_id = student_id;
        }
        if let Some(course_id) = patch.course_id {
            enrollment.course_id = course_id;
        }
        if let Some(closes_at) = patch.closes_at {
            enrollment.closes_at = closes_at;
        }

        let closing = patch.score.is_some() || patch.justification.is_some();
        if closing && enrollment.status.is_terminal() {
            return Err(DomainError::enrollment_closed(id, enrollment.status.as_str()));
        }
        let now = Utc::now();
        if let Some(score) = patch.score {
            close_with_score(&mut enrollment, round_score(score), now);
        } else if patch.justification.is_some() {
            close_as_withdrawn(&mut enrollment, patch.justification, now);
        }

        self.store(enrollment).await
    }

    #[instrument(name = "virtual_education.service.delete_enrollment", skip(self), fields(enrollment_id = %id))]
    pub async fn delete_enrollment(&self, id: Uuid) -> Result<(), DomainError> {
        info!("Deleting enrollment");
        let deleted = self.enrollments.delete(id).await.map_err(db_err)?;
        if !deleted {
            return Err(DomainError::enrollment_not_found(id));
        }
        info!("Successfully deleted enrollment");
        Ok(())
    }

    /// In-progress enrollments whose close date is less than `within_days` away,
    /// overdue ones included.
    #[instrument(name = "virtual_education.service.list_expiring", skip(self))]
    pub async fn list_expiring(
        &self,
        within_days: i64,
    ) -> Result<Vec<ExpiringEnrollment>, DomainError> {
        let now = Utc::now();
        let before = Duration::try_days(within_days)
            .and_then(|window| now.checked_add_signed(window))
            .ok_or_else(|| DomainError::validation("within_days", "Window is out of range."))?;
        let rows = self
            .enrollments
            .list_closing_before(before)
            .await
            .map_err(db_err)?;

        Ok(rows
            .into_iter()
            .map(|(enrollment, course_name)| ExpiringEnrollment {
                days_remaining: days_remaining(enrollment.closes_at, now),
                enrollment,
                course_name,
            })
            .collect())
    }

    /// Report every expiring enrollment to the notifier. A failed delivery is
    /// logged and does not stop the others. Returns the number delivered.
    #[instrument(name = "virtual_education.service.notify_expiring", skip(self))]
    pub async fn notify_expiring(&self, within_days: i64) -> Result<usize, DomainError> {
        let expiring = self.list_expiring(within_days).await?;
        let mut delivered = 0;
        for item in &expiring {
            match self.notifier.notify(item).await {
                Ok(()) => delivered += 1,
                Err(e) => warn!(
                    enrollment_id = %item.enrollment.id,
                    "Failed to deliver expiry notification: {e:#}"
                ),
            }
        }
        info!(
            "Delivered {delivered} of {} expiry notifications",
            expiring.len()
        );
        Ok(delivered)
    }

    /// "<n> days left until the end of course <name>" for one enrollment.
    #[instrument(name = "virtual_education.service.days_left", skip(self), fields(enrollment_id = %id))]
    pub async fn days_left(&self, id: Uuid) -> Result<String, DomainError> {
        let enrollment = self.get_enrollment(id).await?;
        let course = self.get_course(enrollment.course_id).await?;
        Ok(days_left_message(
            days_remaining(enrollment.closes_at, Utc::now()),
            &course.name,
        ))
    }

    fn checked_score(&self, score: Option<f64>) -> Result<f64, DomainError> {
        let mut v = Violations::default();
        match score {
            None => v.push("score", REQUIRED),
            Some(score) => v.score("score", score, self.config.max_score),
        }
        v.into_result()?;
        Ok(score.map(round_score).unwrap_or_default())
    }

    /// Existence checks for referenced rows, reported as field violations.
    async fn check_references(
        &self,
        student_id: Option<Uuid>,
        course_id: Option<Uuid>,
    ) -> Result<Violations, DomainError> {
        let mut v = Violations::default();
        if let Some(id) = student_id {
            if self.students.find_by_id(id).await.map_err(db_err)?.is_none() {
                v.push("student", missing_pk(id));
            }
        }
        if let Some(id) = course_id {
            if self.courses.find_by_id(id).await.map_err(db_err)?.is_none() {
                v.push("course", missing_pk(id));
            }
        }
        Ok(v)
    }

    async fn store(&self, enrollment: Enrollment) -> Result<Enrollment, DomainError> {
        let stored = self
            .enrollments
            .update(enrollment.clone())
            .await
            .map_err(db_err)?;
        if !stored {
            return Err(DomainError::already_enrolled(enrollment.student_id));
        }
        info!(status = %enrollment.status, "Successfully stored enrollment");
        Ok(enrollment)
    }
}
