use chrono::{DateTime, Utc};
use std::fmt;
use uuid::Uuid;

/// Scores below this threshold fail the course.
pub const PASSING_SCORE: f64 = 6.0;

/// Lifecycle state of an enrollment. Stored and exposed with its Portuguese label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnrollmentStatus {
    /// "Andamento": the only non-terminal state.
    InProgress,
    /// "Aprovado"
    Passed,
    /// "Reprovado"
    Failed,
    /// "Desistiu"
    Withdrawn,
}

impl EnrollmentStatus {
    pub const ALL: [EnrollmentStatus; 4] = [
        Self::InProgress,
        Self::Passed,
        Self::Failed,
        Self::Withdrawn,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InProgress => "Andamento",
            Self::Passed => "Aprovado",
            Self::Failed => "Reprovado",
            Self::Withdrawn => "Desistiu",
        }
    }

    /// Case-insensitive lookup of a stored label.
    pub fn parse(label: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|s| s.as_str().eq_ignore_ascii_case(label.trim()))
    }

    /// Outcome of completing a course with `score`.
    pub fn from_score(score: f64) -> Self {
        if score < PASSING_SCORE {
            Self::Failed
        } else {
            Self::Passed
        }
    }

    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::InProgress)
    }
}

impl fmt::Display for EnrollmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Course {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    /// Length of the course in hours.
    pub duration: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewCourse {
    pub name: String,
    pub description: String,
    pub duration: i32,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CoursePatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub duration: Option<i32>,
}

/// A student together with the user account it is backed by.
#[derive(Debug, Clone, PartialEq)]
pub struct Student {
    pub id: Uuid,
    pub user_id: Uuid,
    pub nickname: String,
    pub email: String,
    pub phone: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewStudent {
    pub nickname: String,
    pub email: String,
    pub phone: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct StudentPatch {
    pub nickname: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Enrollment {
    pub id: Uuid,
    pub student_id: Uuid,
    pub course_id: Uuid,
    pub enrolled_at: DateTime<Utc>,
    pub closes_at: DateTime<Utc>,
    pub score: Option<f64>,
    pub status: EnrollmentStatus,
    pub justification: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewEnrollment {
    pub student_id: Uuid,
    pub course_id: Uuid,
    pub closes_at: DateTime<Utc>,
}

/// Client-editable enrollment fields. Status is never set directly:
/// a score completes the enrollment and a justification cancels it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EnrollmentPatch {
    pub student_id: Option<Uuid>,
    pub course_id: Option<Uuid>,
    pub closes_at: Option<DateTime<Utc>>,
    pub score: Option<f64>,
    pub justification: Option<String>,
}

/// An in-progress enrollment whose close date falls inside the notification window.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpiringEnrollment {
    pub enrollment: Enrollment,
    pub course_name: String,
    /// Whole days until the close date; zero or negative when overdue.
    pub days_remaining: i64,
}

impl ExpiringEnrollment {
    pub fn message(&self) -> String {
        days_left_message(self.days_remaining, &self.course_name)
    }
}

pub fn days_left_message(days: i64, course_name: &str) -> String {
    format!("{days} days left until the end of course {course_name}")
}

/// Course filters. Lower bounds are inclusive, `*_before` bounds exclusive.
#[derive(Debug, Clone, Default)]
pub struct CourseFilter {
    pub name_contains: Option<String>,
    pub duration: Option<i32>,
    pub duration_min: Option<i32>,
    pub duration_max: Option<i32>,
    pub created_from: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
    pub updated_from: Option<DateTime<Utc>>,
    pub updated_before: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
pub struct StudentFilter {
    pub created_from: Option<DateTime<Utc>>,
    pub nickname_contains: Option<String>,
    pub email_contains: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct EnrollmentFilter {
    /// Matched case-insensitively against the stored label.
    pub status: Option<String>,
    pub student_id: Option<Uuid>,
    pub course_id: Option<Uuid>,
    pub enrolled_from: Option<DateTime<Utc>>,
    pub closes_from: Option<DateTime<Utc>>,
}

/// 1-based page selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub page_size: u64,
}

impl PageRequest {
    pub fn offset(&self) -> u64 {
        (self.page.saturating_sub(1)).saturating_mul(self.page_size)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Number of rows matching the filter across all pages.
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            page_size: self.page_size,
        }
    }
}
