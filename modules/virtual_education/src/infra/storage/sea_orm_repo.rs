//! SeaORM-backed implementation of the repository ports.
//!
//! Generic over the connection so it can run on a `DatabaseConnection` in the
//! server and on an in-memory SQLite connection in tests. Multi-row writes run
//! in a transaction opened on that connection.
//!
//! SQLite upgrades a deferred transaction from a read lock to a write lock
//! lazily, and two transactions doing that at once fail with "database is
//! locked" instead of waiting. Transactions here therefore start with a write,
//! and the single-active-enrollment rule is left to the partial unique index
//! rather than a read before the insert.

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, Func, IntoColumnRef, LikeExpr, SimpleExpr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseTransaction, DbErr, EntityTrait,
    JoinType, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, QueryTrait, RelationTrait,
    SqlErr, TransactionTrait,
};
use uuid::Uuid;

use crate::contract::model::{
    Course, CourseFilter, Enrollment, EnrollmentFilter, EnrollmentStatus, Page, PageRequest,
    Student, StudentFilter,
};
use crate::domain::repo::{
    CoursesRepository, DeleteOutcome, EnrollmentsRepository, StudentsRepository,
};
use crate::infra::storage::entity::{course, enrollment, student, user};
use crate::infra::storage::mapper::{
    course_active_model, enrollment_active_model, student_active_models, student_from_rows,
};

/// SeaORM repository impl.
/// Holds a connection object; its lifetime/ownership is up to the caller.
pub struct SeaOrmRepository<C>
where
    C: ConnectionTrait + TransactionTrait + Send + Sync,
{
    conn: C,
}

impl<C> SeaOrmRepository<C>
where
    C: ConnectionTrait + TransactionTrait + Send + Sync,
{
    pub fn new(conn: C) -> Self {
        Self { conn }
    }

    async fn begin(&self) -> anyhow::Result<DatabaseTransaction> {
        self.conn.begin().await.context("begin transaction failed")
    }
}

/// Case-insensitive substring match. `%`, `_` and `\` in the needle match literally.
fn icontains(col: impl IntoColumnRef, needle: &str) -> SimpleExpr {
    let escaped = needle
        .to_lowercase()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    Expr::expr(Func::lower(Expr::col(col))).like(LikeExpr::new(format!("%{escaped}%")).escape('\\'))
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

const IN_PROGRESS: &str = EnrollmentStatus::InProgress.as_str();

fn to_enrollments(rows: Vec<enrollment::Model>) -> anyhow::Result<Vec<Enrollment>> {
    rows.into_iter().map(Enrollment::try_from).collect()
}

/// Unique violations become `Ok(false)`; anything else is an error.
fn unique_or_err<T>(res: Result<T, DbErr>, what: &'static str) -> anyhow::Result<bool> {
    match res {
        Ok(_) => Ok(true),
        Err(err) if is_unique_violation(&err) => Ok(false),
        Err(err) => Err(anyhow::Error::new(err).context(what)),
    }
}

#[async_trait]
impl<C> CoursesRepository for SeaOrmRepository<C>
where
    C: ConnectionTrait + TransactionTrait + Send + Sync + 'static,
{
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Course>> {
        let found = course::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("find course failed")?;
        Ok(found.map(Into::into))
    }

    async fn insert(&self, c: Course) -> anyhow::Result<()> {
        course_active_model(c)
            .insert(&self.conn)
            .await
            .context("insert course failed")?;
        Ok(())
    }

    async fn update(&self, c: Course) -> anyhow::Result<()> {
        course_active_model(c)
            .update(&self.conn)
            .await
            .context("update course failed")?;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<DeleteOutcome> {
        let txn = self.begin().await?;
        enrollment::Entity::delete_many()
            .filter(enrollment::Column::CourseId.eq(id))
            .filter(enrollment::Column::Status.ne(IN_PROGRESS))
            .exec(&txn)
            .await
            .context("delete course enrollments failed")?;
        // Row lock on postgres holds off enrollments referencing the course.
        let found = course::Entity::find_by_id(id)
            .lock_exclusive()
            .one(&txn)
            .await
            .context("find course failed")?;
        if found.is_none() {
            txn.rollback().await.context("rollback failed")?;
            return Ok(DeleteOutcome::NotFound);
        }
        let active = enrollment::Entity::find()
            .filter(enrollment::Column::CourseId.eq(id))
            .filter(enrollment::Column::Status.eq(IN_PROGRESS))
            .count(&txn)
            .await
            .context("course enrollment check failed")?;
        if active > 0 {
            txn.rollback().await.context("rollback failed")?;
            return Ok(DeleteOutcome::Blocked);
        }
        course::Entity::delete_by_id(id)
            .exec(&txn)
            .await
            .context("delete course failed")?;
        txn.commit().await.context("commit failed")?;
        Ok(DeleteOutcome::Deleted)
    }

    async fn list_page(
        &self,
        filter: &CourseFilter,
        page: PageRequest,
    ) -> anyhow::Result<Page<Course>> {
        let select = course::Entity::find()
            .apply_if(filter.name_contains.as_deref(), |q, name| {
                q.filter(icontains((course::Entity, course::Column::Name), name))
            })
            .apply_if(filter.duration, |q, d| q.filter(course::Column::Duration.eq(d)))
            .apply_if(filter.duration_min, |q, d| {
                q.filter(course::Column::Duration.gte(d))
            })
            .apply_if(filter.duration_max, |q, d| {
                q.filter(course::Column::Duration.lte(d))
            })
            .apply_if(filter.created_from, |q, t| {
                q.filter(course::Column::CreatedAt.gte(t))
            })
            .apply_if(filter.created_before, |q, t| {
                q.filter(course::Column::CreatedAt.lt(t))
            })
            .apply_if(filter.updated_from, |q, t| {
                q.filter(course::Column::UpdatedAt.gte(t))
            })
            .apply_if(filter.updated_before, |q, t| {
                q.filter(course::Column::UpdatedAt.lt(t))
            });

        let total = select
            .clone()
            .count(&self.conn)
            .await
            .context("count courses failed")?;
        let rows = select
            .order_by_asc(course::Column::CreatedAt)
            .order_by_asc(course::Column::Id)
            .offset(page.offset())
            .limit(page.page_size)
            .all(&self.conn)
            .await
            .context("list courses failed")?;

        Ok(Page {
            items: rows.into_iter().map(Into::into).collect(),
            total,
            page: page.page,
            page_size: page.page_size,
        })
    }
}

#[async_trait]
impl<C> StudentsRepository for SeaOrmRepository<C>
where
    C: ConnectionTrait + TransactionTrait + Send + Sync + 'static,
{
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Student>> {
        let found = student::Entity::find_by_id(id)
            .find_also_related(user::Entity)
            .one(&self.conn)
            .await
            .context("find student failed")?;
        match found {
            Some((s, Some(u))) => Ok(Some(student_from_rows(s, u))),
            Some((s, None)) => Err(anyhow!("student {} has no user account", s.id)),
            None => Ok(None),
        }
    }

    async fn email_taken(&self, email: &str, except_user: Option<Uuid>) -> anyhow::Result<bool> {
        let count = user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .apply_if(except_user, |q, id| q.filter(user::Column::Id.ne(id)))
            .count(&self.conn)
            .await
            .context("email lookup failed")?;
        Ok(count > 0)
    }

    async fn insert(&self, s: Student) -> anyhow::Result<bool> {
        let (student_am, user_am) = student_active_models(s);
        let txn = self.begin().await?;
        if !unique_or_err(user_am.insert(&txn).await, "insert user failed")? {
            txn.rollback().await.context("rollback failed")?;
            return Ok(false);
        }
        student_am
            .insert(&txn)
            .await
            .context("insert student failed")?;
        txn.commit().await.context("commit failed")?;
        Ok(true)
    }

    async fn update(&self, s: Student) -> anyhow::Result<bool> {
        let (_, user_am) = student_active_models(s);
        unique_or_err(user_am.update(&self.conn).await, "update user failed")
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<DeleteOutcome> {
        let txn = self.begin().await?;
        enrollment::Entity::delete_many()
            .filter(enrollment::Column::StudentId.eq(id))
            .filter(enrollment::Column::Status.eq(EnrollmentStatus::Withdrawn.as_str()))
            .exec(&txn)
            .await
            .context("delete student enrollments failed")?;
        let Some(row) = student::Entity::find_by_id(id)
            .lock_exclusive()
            .one(&txn)
            .await
            .context("find student failed")?
        else {
            txn.rollback().await.context("rollback failed")?;
            return Ok(DeleteOutcome::NotFound);
        };
        let remaining = enrollment::Entity::find()
            .filter(enrollment::Column::StudentId.eq(id))
            .count(&txn)
            .await
            .context("student enrollment check failed")?;
        if remaining > 0 {
            txn.rollback().await.context("rollback failed")?;
            return Ok(DeleteOutcome::Blocked);
        }
        student::Entity::delete_by_id(id)
            .exec(&txn)
            .await
            .context("delete student failed")?;
        user::Entity::delete_by_id(row.user_id)
            .exec(&txn)
            .await
            .context("delete user failed")?;
        txn.commit().await.context("commit failed")?;
        Ok(DeleteOutcome::Deleted)
    }

    async fn list_page(
        &self,
        filter: &StudentFilter,
        page: PageRequest,
    ) -> anyhow::Result<Page<Student>> {
        let select = student::Entity::find()
            .join(JoinType::InnerJoin, student::Relation::User.def())
            .apply_if(filter.created_from, |q, t| {
                q.filter(user::Column::CreatedAt.gte(t))
            })
            .apply_if(filter.nickname_contains.as_deref(), |q, s| {
                q.filter(icontains((user::Entity, user::Column::Nickname), s))
            })
            .apply_if(filter.email_contains.as_deref(), |q, s| {
                q.filter(icontains((user::Entity, user::Column::Email), s))
            });

        let total = select
            .clone()
            .count(&self.conn)
            .await
            .context("count students failed")?;
        let rows = select
            .select_also(user::Entity)
            .order_by_asc(user::Column::CreatedAt)
            .order_by_asc(student::Column::Id)
            .offset(page.offset())
            .limit(page.page_size)
            .all(&self.conn)
            .await
            .context("list students failed")?;

        let items = rows
            .into_iter()
            .map(|(s, u)| match u {
                Some(u) => Ok(student_from_rows(s, u)),
                None => Err(anyhow!("student {} has no user account", s.id)),
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        Ok(Page {
            items,
            total,
            page: page.page,
            page_size: page.page_size,
        })
    }
}

#[async_trait]
impl<C> EnrollmentsRepository for SeaOrmRepository<C>
where
    C: ConnectionTrait + TransactionTrait + Send + Sync + 'static,
{
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Enrollment>> {
        enrollment::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("find enrollment failed")?
            .map(Enrollment::try_from)
            .transpose()
    }

    async fn find_active(
        &self,
        student_id: Uuid,
        course_id: Uuid,
    ) -> anyhow::Result<Option<Enrollment>> {
        enrollment::Entity::find()
            .filter(enrollment::Column::StudentId.eq(student_id))
            .filter(enrollment::Column::CourseId.eq(course_id))
            .filter(enrollment::Column::Status.eq(IN_PROGRESS))
            .one(&self.conn)
            .await
            .context("find active enrollment failed")?
            .map(Enrollment::try_from)
            .transpose()
    }

    async fn course_has_active(&self, course_id: Uuid) -> anyhow::Result<bool> {
        let count = enrollment::Entity::find()
            .filter(enrollment::Column::CourseId.eq(course_id))
            .filter(enrollment::Column::Status.eq(IN_PROGRESS))
            .count(&self.conn)
            .await
            .context("course enrollment check failed")?;
        Ok(count > 0)
    }

    async fn student_has_unwithdrawn(&self, student_id: Uuid) -> anyhow::Result<bool> {
        let count = enrollment::Entity::find()
            .filter(enrollment::Column::StudentId.eq(student_id))
            .filter(enrollment::Column::Status.ne(EnrollmentStatus::Withdrawn.as_str()))
            .count(&self.conn)
            .await
            .context("student enrollment check failed")?;
        Ok(count > 0)
    }

    // ux_enrollments_active_student rejects a second in-progress row.
    async fn insert_if_no_active(&self, e: Enrollment) -> anyhow::Result<bool> {
        unique_or_err(
            enrollment_active_model(e).insert(&self.conn).await,
            "insert enrollment failed",
        )
    }

    async fn update(&self, e: Enrollment) -> anyhow::Result<bool> {
        unique_or_err(
            enrollment_active_model(e).update(&self.conn).await,
            "update enrollment failed",
        )
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let res = enrollment::Entity::delete_by_id(id)
            .exec(&self.conn)
            .await
            .context("delete enrollment failed")?;
        Ok(res.rows_affected > 0)
    }

    async fn list_page(
        &self,
        filter: &EnrollmentFilter,
        page: PageRequest,
    ) -> anyhow::Result<Page<Enrollment>> {
        let select = enrollment::Entity::find()
            .apply_if(filter.status.as_deref(), |q, status| {
                q.filter(
                    Expr::expr(Func::lower(Expr::col((
                        enrollment::Entity,
                        enrollment::Column::Status,
                    ))))
                    .eq(status.trim().to_lowercase()),
                )
            })
            .apply_if(filter.student_id, |q, id| {
                q.filter(enrollment::Column::StudentId.eq(id))
            })
            .apply_if(filter.course_id, |q, id| {
                q.filter(enrollment::Column::CourseId.eq(id))
            })
            .apply_if(filter.enrolled_from, |q, t| {
                q.filter(enrollment::Column::EnrolledAt.gte(t))
            })
            .apply_if(filter.closes_from, |q, t| {
                q.filter(enrollment::Column::ClosesAt.gte(t))
            });

        let total = select
            .clone()
            .count(&self.conn)
            .await
            .context("count enrollments failed")?;
        let rows = select
            .order_by_asc(enrollment::Column::EnrolledAt)
            .order_by_asc(enrollment::Column::Id)
            .offset(page.offset())
            .limit(page.page_size)
            .all(&self.conn)
            .await
            .context("list enrollments failed")?;

        Ok(Page {
            items: to_enrollments(rows)?,
            total,
            page: page.page,
            page_size: page.page_size,
        })
    }

    async fn list_closing_before(
        &self,
        before: DateTime<Utc>,
    ) -> anyhow::Result<Vec<(Enrollment, String)>> {
        let rows = enrollment::Entity::find()
            .filter(enrollment::Column::Status.eq(IN_PROGRESS))
            .filter(enrollment::Column::ClosesAt.lt(before))
            .find_also_related(course::Entity)
            .order_by_asc(enrollment::Column::ClosesAt)
            .all(&self.conn)
            .await
            .context("list expiring enrollments failed")?;

        rows.into_iter()
            .map(|(e, c)| {
                let course = c.ok_or_else(|| anyhow!("enrollment {} has no course", e.id))?;
                Ok((Enrollment::try_from(e)?, course.name))
            })
            .collect()
    }
}
