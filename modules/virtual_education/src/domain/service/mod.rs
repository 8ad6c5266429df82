//! Domain service with the enrollment business rules.
//! Depends only on the repository and notifier ports, not on infra types.

use std::sync::Arc;

use crate::contract::model::PageRequest;
use crate::domain::error::DomainError;
use crate::domain::ports::ExpiryNotifier;
use crate::domain::repo::{CoursesRepository, EnrollmentsRepository, StudentsRepository};
use crate::domain::validation::Violations;

mod courses;
mod enrollments;
mod students;

/// The repository ports the service needs.
#[derive(Clone)]
pub struct Repositories {
    pub courses: Arc<dyn CoursesRepository>,
    pub students: Arc<dyn StudentsRepository>,
    pub enrollments: Arc<dyn EnrollmentsRepository>,
}

impl Repositories {
    /// Use one object for all three ports.
    pub fn from_shared<R>(repo: Arc<R>) -> Self
    where
        R: CoursesRepository + StudentsRepository + EnrollmentsRepository + 'static,
    {
        Self {
            courses: repo.clone(),
            students: repo.clone(),
            enrollments: repo,
        }
    }
}

/// Configuration for the domain service
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub max_course_name_length: usize,
    pub max_nickname_length: usize,
    pub max_email_length: usize,
    pub max_phone_length: usize,
    pub max_score: f64,
    pub default_page_size: u64,
    pub max_page_size: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            max_course_name_length: 100,
            max_nickname_length: 50,
            max_email_length: 254,
            max_phone_length: 20,
            max_score: 999.99,
            default_page_size: 10,
            max_page_size: 100,
        }
    }
}

#[derive(Clone)]
pub struct Service {
    courses: Arc<dyn CoursesRepository>,
    students: Arc<dyn StudentsRepository>,
    enrollments: Arc<dyn EnrollmentsRepository>,
    notifier: Arc<dyn ExpiryNotifier>,
    config: ServiceConfig,
}

impl Service {
    pub fn new(
        repos: Repositories,
        notifier: Arc<dyn ExpiryNotifier>,
        config: ServiceConfig,
    ) -> Self {
        Self {
            courses: repos.courses,
            students: repos.students,
            enrollments: repos.enrollments,
            notifier,
            config,
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Resolve optional paging input. Page numbers start at 1; oversized pages are capped.
    pub fn page_request(
        &self,
        page: Option<u64>,
        page_size: Option<u64>,
    ) -> Result<PageRequest, DomainError> {
        let mut v = Violations::default();
        let page = page.unwrap_or(1);
        if page == 0 {
            v.push("page", "Invalid page.");
        }
        let page_size = page_size
            .unwrap_or(self.config.default_page_size)
            .min(self.config.max_page_size);
        if page_size == 0 {
            v.push("page_size", "Ensure this value is greater than or equal to 1.");
        }
        // Offsets are bound as signed 64-bit integers.
        let offset = page.saturating_sub(1).checked_mul(page_size);
        if page != 0 && !offset.is_some_and(|o| i64::try_from(o).is_ok()) {
            v.push("page", "Invalid page.");
        }
        v.into_result()?;
        Ok(PageRequest { page, page_size })
    }
}
