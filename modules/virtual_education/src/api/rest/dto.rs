use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::api::rest::problem::FieldError;
use crate::contract::model::{
    Course, CourseFilter, CoursePatch, Enrollment, EnrollmentFilter, EnrollmentPatch, NewCourse,
    NewEnrollment, NewStudent, Page, Student, StudentFilter, StudentPatch,
};

const REQUIRED: &str = "This field is required.";

/// Accepts RFC 3339 timestamps, naive "YYYY-MM-DDTHH:MM:SS" (read as UTC)
/// and plain dates (midnight UTC).
pub mod flexible_datetime {
    use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
    use serde::{de::Error, Deserialize, Deserializer};

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        let raw = raw.trim();
        DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                    .ok()
                    .map(|dt| dt.and_utc())
            })
            .or_else(|| {
                NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
                    .map(|dt| dt.and_utc())
            })
    }

    pub fn option<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        raw.map(|s| {
            parse(&s).ok_or_else(|| {
                D::Error::custom(format!(
                    "invalid datetime '{s}', expected RFC 3339 or YYYY-MM-DD"
                ))
            })
        })
        .transpose()
    }
}

fn start_of(day: NaiveDate) -> DateTime<Utc> {
    day.and_time(chrono::NaiveTime::MIN).and_utc()
}

/// Exclusive upper bound covering the whole of `day`.
fn end_of(day: NaiveDate) -> DateTime<Utc> {
    start_of(day) + Duration::days(1)
}

/// Half-open range from an exact day combined with `__gte` / `__lte` bounds.
fn day_range(
    exact: Option<NaiveDate>,
    gte: Option<NaiveDate>,
    lte: Option<NaiveDate>,
) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
    let from = exact.max(gte).map(start_of);
    let until = match (exact, lte) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    };
    (from, until.map(end_of))
}

fn require<T>(value: Option<T>, field: &str, errors: &mut Vec<FieldError>) -> Option<T> {
    if value.is_none() {
        errors.push(FieldError::new(field, REQUIRED));
    }
    value
}

// ---------------------------------------------------------------------------
// Courses
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CourseDto {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    /// Course length in hours.
    pub duration: i32,
    pub date_created: DateTime<Utc>,
    pub date_updated: DateTime<Utc>,
}

/// Body of POST, PUT and PATCH on courses. PATCH accepts any subset.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct CourseReq {
    pub name: Option<String>,
    pub description: Option<String>,
    pub duration: Option<i32>,
}

impl CourseReq {
    /// Full representation, every field required.
    pub fn into_new(self) -> Result<NewCourse, Vec<FieldError>> {
        let mut errors = Vec::new();
        let name = require(self.name, "name", &mut errors);
        let description = require(self.description, "description", &mut errors);
        let duration = require(self.duration, "duration", &mut errors);
        match (name, description, duration) {
            (Some(name), Some(description), Some(duration)) => Ok(NewCourse {
                name,
                description,
                duration,
            }),
            _ => Err(errors),
        }
    }

    pub fn into_full_patch(self) -> Result<CoursePatch, Vec<FieldError>> {
        self.into_new().map(|c| CoursePatch {
            name: Some(c.name),
            description: Some(c.description),
            duration: Some(c.duration),
        })
    }
}

impl From<CourseReq> for CoursePatch {
    fn from(req: CourseReq) -> Self {
        Self {
            name: req.name,
            description: req.description,
            duration: req.duration,
        }
    }
}

impl From<Course> for CourseDto {
    fn from(c: Course) -> Self {
        Self {
            id: c.id,
            name: c.name,
            description: c.description,
            duration: c.duration,
            date_created: c.created_at,
            date_updated: c.updated_at,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CourseListQuery {
    /// 1-based page number.
    pub page: Option<u64>,
    pub page_size: Option<u64>,
    /// Case-insensitive substring of the course name.
    pub name: Option<String>,
    pub duration: Option<i32>,
    #[serde(rename = "duration__gte")]
    pub duration_gte: Option<i32>,
    #[serde(rename = "duration__lte")]
    pub duration_lte: Option<i32>,
    /// Created on this day.
    pub date_created: Option<NaiveDate>,
    #[serde(rename = "date_created__gte")]
    pub date_created_gte: Option<NaiveDate>,
    #[serde(rename = "date_created__lte")]
    pub date_created_lte: Option<NaiveDate>,
    /// Updated on this day.
    pub date_updated: Option<NaiveDate>,
    #[serde(rename = "date_updated__gte")]
    pub date_updated_gte: Option<NaiveDate>,
    #[serde(rename = "date_updated__lte")]
    pub date_updated_lte: Option<NaiveDate>,
}

impl CourseListQuery {
    pub fn filter(&self) -> CourseFilter {
        let (created_from, created_before) =
            day_range(self.date_created, self.date_created_gte, self.date_created_lte);
        let (updated_from, updated_before) =
            day_range(self.date_updated, self.date_updated_gte, self.date_updated_lte);
        CourseFilter {
            name_contains: self.name.clone().filter(|s| !s.is_empty()),
            duration: self.duration,
            duration_min: self.duration_gte,
            duration_max: self.duration_lte,
            created_from,
            created_before,
            updated_from,
            updated_before,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CourseListDto {
    /// Matches across all pages.
    pub count: u64,
    pub page: u64,
    pub page_size: u64,
    pub results: Vec<CourseDto>,
}

impl From<Page<Course>> for CourseListDto {
    fn from(p: Page<Course>) -> Self {
        Self {
            count: p.total,
            page: p.page,
            page_size: p.page_size,
            results: p.items.into_iter().map(Into::into).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Students
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StudentDto {
    pub id: Uuid,
    pub nickname: String,
    pub email: String,
    pub phone: String,
    pub date_created: DateTime<Utc>,
    pub date_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct StudentReq {
    pub nickname: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl StudentReq {
    pub fn into_new(self) -> Result<NewStudent, Vec<FieldError>> {
        let mut errors = Vec::new();
        let nickname = require(self.nickname, "nickname", &mut errors);
        let email = require(self.email, "email", &mut errors);
        let phone = require(self.phone, "phone", &mut errors);
        match (nickname, email, phone) {
            (Some(nickname), Some(email), Some(phone)) => Ok(NewStudent {
                nickname,
                email,
                phone,
            }),
            _ => Err(errors),
        }
    }

    pub fn into_full_patch(self) -> Result<StudentPatch, Vec<FieldError>> {
        self.into_new().map(|s| StudentPatch {
            nickname: Some(s.nickname),
            email: Some(s.email),
            phone: Some(s.phone),
        })
    }
}

impl From<StudentReq> for StudentPatch {
    fn from(req: StudentReq) -> Self {
        Self {
            nickname: req.nickname,
            email: req.email,
            phone: req.phone,
        }
    }
}

impl From<Student> for StudentDto {
    fn from(s: Student) -> Self {
        Self {
            id: s.id,
            nickname: s.nickname,
            email: s.email,
            phone: s.phone,
            date_created: s.created_at,
            date_updated: s.updated_at,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StudentListQuery {
    pub page: Option<u64>,
    pub page_size: Option<u64>,
    /// Students created on or after this date.
    pub date_created: Option<NaiveDate>,
    pub nickname: Option<String>,
    pub email: Option<String>,
}

impl StudentListQuery {
    pub fn filter(&self) -> StudentFilter {
        StudentFilter {
            created_from: self.date_created.map(start_of),
            nickname_contains: self.nickname.clone().filter(|s| !s.is_empty()),
            email_contains: self.email.clone().filter(|s| !s.is_empty()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StudentListDto {
    pub count: u64,
    pub page: u64,
    pub page_size: u64,
    pub results: Vec<StudentDto>,
}

impl From<Page<Student>> for StudentListDto {
    fn from(p: Page<Student>) -> Self {
        Self {
            count: p.total,
            page: p.page,
            page_size: p.page_size,
            results: p.items.into_iter().map(Into::into).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Enrollments
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EnrollmentDto {
    pub id: Uuid,
    pub student: Uuid,
    pub course: Uuid,
    pub date_enroll: DateTime<Utc>,
    pub date_close: DateTime<Utc>,
    pub score: Option<f64>,
    /// Andamento, Aprovado, Reprovado or Desistiu. Read-only.
    pub status: String,
    pub justification: Option<String>,
}

/// Body of POST, PUT and PATCH on enrollments. A `status` sent by the client is ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct EnrollmentReq {
    pub student: Option<Uuid>,
    pub course: Option<Uuid>,
    #[serde(default, deserialize_with = "flexible_datetime::option")]
    #[schema(value_type = Option<String>)]
    pub date_close: Option<DateTime<Utc>>,
    /// Completes the enrollment (updates only).
    pub score: Option<f64>,
    /// Cancels the enrollment (updates only).
    pub justification: Option<String>,
}

impl EnrollmentReq {
    pub fn into_new(self) -> Result<NewEnrollment, Vec<FieldError>> {
        let mut errors = Vec::new();
        let student_id = require(self.student, "student", &mut errors);
        let course_id = require(self.course, "course", &mut errors);
        let closes_at = require(self.date_close, "date_close", &mut errors);
        match (student_id, course_id, closes_at) {
            (Some(student_id), Some(course_id), Some(closes_at)) => Ok(NewEnrollment {
                student_id,
                course_id,
                closes_at,
            }),
            _ => Err(errors),
        }
    }

    /// PUT: the reference fields are required, score and justification stay optional.
    pub fn into_full_patch(self) -> Result<EnrollmentPatch, Vec<FieldError>> {
        let (score, justification) = (self.score, self.justification.clone());
        self.into_new().map(|n| EnrollmentPatch {
            student_id: Some(n.student_id),
            course_id: Some(n.course_id),
            closes_at: Some(n.closes_at),
            score,
            justification,
        })
    }
}

impl From<EnrollmentReq> for EnrollmentPatch {
    fn from(req: EnrollmentReq) -> Self {
        Self {
            student_id: req.student,
            course_id: req.course,
            closes_at: req.date_close,
            score: req.score,
            justification: req.justification,
        }
    }
}

impl From<Enrollment> for EnrollmentDto {
    fn from(e: Enrollment) -> Self {
        Self {
            id: e.id,
            student: e.student_id,
            course: e.course_id,
            date_enroll: e.enrolled_at,
            date_close: e.closes_at,
            score: e.score,
            status: e.status.as_str().to_string(),
            justification: e.justification,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct CompleteReq {
    pub score: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct CancelReq {
    pub justification: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DaysLeftDto {
    pub enrollment: Uuid,
    pub message: String,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct EnrollmentListQuery {
    pub page: Option<u64>,
    pub page_size: Option<u64>,
    /// Case-insensitive exact status label.
    pub status: Option<String>,
    pub student: Option<Uuid>,
    pub course: Option<Uuid>,
    /// Enrolled on or after this date.
    pub date_enroll: Option<NaiveDate>,
    /// Closing on or after this date.
    pub date_close: Option<NaiveDate>,
}

impl EnrollmentListQuery {
    pub fn filter(&self) -> EnrollmentFilter {
        EnrollmentFilter {
            status: self.status.clone().filter(|s| !s.is_empty()),
            student_id: self.student,
            course_id: self.course,
            enrolled_from: self.date_enroll.map(start_of),
            closes_from: self.date_close.map(start_of),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EnrollmentListDto {
    pub count: u64,
    pub page: u64,
    pub page_size: u64,
    pub results: Vec<EnrollmentDto>,
}

impl From<Page<Enrollment>> for EnrollmentListDto {
    fn from(p: Page<Enrollment>) -> Self {
        Self {
            count: p.total,
            page: p.page,
            page_size: p.page_size,
            results: p.items.into_iter().map(Into::into).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn flexible_dates() {
        let midnight = Utc.with_ymd_and_hms(2024, 12, 31, 0, 0, 0).unwrap();
        assert_eq!(flexible_datetime::parse("2024-12-31"), Some(midnight));
        assert_eq!(
            flexible_datetime::parse("2024-12-31T10:00:00-03:00"),
            Some(Utc.with_ymd_and_hms(2024, 12, 31, 13, 0, 0).unwrap())
        );
        assert_eq!(
            flexible_datetime::parse("2024-12-31T10:00:00"),
            Some(Utc.with_ymd_and_hms(2024, 12, 31, 10, 0, 0).unwrap())
        );
        assert_eq!(flexible_datetime::parse("31/12/2024"), None);
    }

    #[test]
    fn enrollment_body_accepts_plain_date_and_ignores_status() {
        let req: EnrollmentReq = serde_json::from_value(serde_json::json!({
            "student": Uuid::nil(),
            "course": Uuid::nil(),
            "date_close": "2030-01-15",
            "status": "Aprovado"
        }))
        .unwrap();
        assert_eq!(
            req.date_close,
            Some(Utc.with_ymd_and_hms(2030, 1, 15, 0, 0, 0).unwrap())
        );
        assert!(req.into_new().is_ok());
    }

    #[test]
    fn bad_date_is_rejected() {
        let res: Result<EnrollmentReq, _> =
            serde_json::from_value(serde_json::json!({ "date_close": "soon" }));
        assert!(res.is_err());
    }

    #[test]
    fn missing_fields_are_all_reported() {
        let errors = CourseReq {
            name: Some("Rust".into()),
            ..Default::default()
        }
        .into_new()
        .unwrap_err();
        let pointers: Vec<_> = errors.iter().map(|e| e.pointer.as_str()).collect();
        assert_eq!(pointers, ["/description", "/duration"]);
    }

    #[test]
    fn date_lte_covers_the_whole_day() {
        let q = CourseListQuery {
            date_created_lte: NaiveDate::from_ymd_opt(2024, 2, 29),
            ..Default::default()
        };
        assert_eq!(
            q.filter().created_before,
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn exact_day_narrows_the_range() {
        let q = CourseListQuery {
            date_updated: NaiveDate::from_ymd_opt(2024, 5, 10),
            date_updated_gte: NaiveDate::from_ymd_opt(2024, 1, 1),
            ..Default::default()
        };
        let f = q.filter();
        assert_eq!(
            f.updated_from,
            Some(Utc.with_ymd_and_hms(2024, 5, 10, 0, 0, 0).unwrap())
        );
        assert_eq!(
            f.updated_before,
            Some(Utc.with_ymd_and_hms(2024, 5, 11, 0, 0, 0).unwrap())
        );
        assert_eq!(f.created_from, None);
        assert_eq!(f.created_before, None);
    }
}
