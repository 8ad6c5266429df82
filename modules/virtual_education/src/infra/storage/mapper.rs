use anyhow::anyhow;
use sea_orm::Set;

use crate::contract::model::{Course, Enrollment, EnrollmentStatus, Student};
use crate::infra::storage::entity::{course, enrollment, student, user};

impl From<course::Model> for Course {
    fn from(m: course::Model) -> Self {
        Self {
            id: m.id,
            name: m.name,
            description: m.description,
            duration: m.duration,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

pub fn course_active_model(c: Course) -> course::ActiveModel {
    course::ActiveModel {
        id: Set(c.id),
        name: Set(c.name),
        description: Set(c.description),
        duration: Set(c.duration),
        created_at: Set(c.created_at),
        updated_at: Set(c.updated_at),
    }
}

/// Join a student row with its user account.
pub fn student_from_rows(s: student::Model, u: user::Model) -> Student {
    Student {
        id: s.id,
        user_id: u.id,
        nickname: u.nickname,
        email: u.email,
        phone: u.phone,
        created_at: u.created_at,
        updated_at: u.updated_at,
    }
}

pub fn student_active_models(s: Student) -> (student::ActiveModel, user::ActiveModel) {
    (
        student::ActiveModel {
            id: Set(s.id),
            user_id: Set(s.user_id),
        },
        user::ActiveModel {
            id: Set(s.user_id),
            nickname: Set(s.nickname),
            email: Set(s.email),
            phone: Set(s.phone),
            created_at: Set(s.created_at),
            updated_at: Set(s.updated_at),
        },
    )
}

impl TryFrom<enrollment::Model> for Enrollment {
    type Error = anyhow::Error;

    fn try_from(m: enrollment::Model) -> Result<Self, Self::Error> {
        let status = EnrollmentStatus::parse(&m.status)
            .ok_or_else(|| anyhow!("enrollment {} has unknown status '{}'", m.id, m.status))?;
        Ok(Self {
            id: m.id,
            student_id: m.student_id,
            course_id: m.course_id,
            enrolled_at: m.enrolled_at,
            closes_at: m.closes_at,
            score: m.score,
            status,
            justification: m.justification,
        })
    }
}

pub fn enrollment_active_model(e: Enrollment) -> enrollment::ActiveModel {
    enrollment::ActiveModel {
        id: Set(e.id),
        student_id: Set(e.student_id),
        course_id: Set(e.course_id),
        enrolled_at: Set(e.enrolled_at),
        closes_at: Set(e.closes_at),
        score: Set(e.score),
        status: Set(e.status.as_str().to_string()),
        justification: Set(e.justification),
    }
}
