use std::sync::Arc;

use anyhow::Context;
use sea_orm::DatabaseConnection;
use sea_orm_migration::MigratorTrait;
use tracing::{debug, info};

use crate::api::rest::{openapi, routes};
use crate::config::VirtualEducationConfig;
use crate::contract::client::VirtualEducationApi;
use crate::domain::ports::ExpiryNotifier;
use crate::domain::service::{Repositories, Service, ServiceConfig};
use crate::gateways::local::VirtualEducationLocalClient;
use crate::infra::notify::TracingNotifier;
use crate::infra::storage::migrations::Migrator;
use crate::infra::storage::SeaOrmRepository;
use crate::jobs::{DailySchedule, ExpiryJob};

pub const MODULE_NAME: &str = "virtual_education";

/// Wires storage, the domain service, REST routes and the expiry job together.
#[derive(Clone)]
pub struct VirtualEducation {
    service: Arc<Service>,
    schedule: DailySchedule,
    config: VirtualEducationConfig,
}

impl VirtualEducation {
    /// Bring the schema up to date.
    pub async fn migrate(db: &DatabaseConnection) -> anyhow::Result<()> {
        info!("Running virtual_education database migrations");
        Migrator::up(db, None)
            .await
            .context("virtual_education migrations failed")?;
        info!("virtual_education database migrations completed successfully");
        Ok(())
    }

    /// Build the module with reminders going to the tracing notifier.
    pub fn init(db: DatabaseConnection, cfg: VirtualEducationConfig) -> anyhow::Result<Self> {
        Self::with_notifier(db, cfg, Arc::new(TracingNotifier))
    }

    pub fn with_notifier(
        db: DatabaseConnection,
        cfg: VirtualEducationConfig,
        notifier: Arc<dyn ExpiryNotifier>,
    ) -> anyhow::Result<Self> {
        info!("Initializing virtual_education module");
        cfg.validate()?;
        let schedule = DailySchedule::parse(&cfg.notify_at)?;
        debug!(
            "Loaded virtual_education config: default_page_size={}, max_page_size={}, notify_at={}",
            cfg.default_page_size, cfg.max_page_size, cfg.notify_at
        );

        let repo = Arc::new(SeaOrmRepository::new(db));
        let service_config = ServiceConfig {
            default_page_size: cfg.default_page_size,
            max_page_size: cfg.max_page_size,
            ..ServiceConfig::default()
        };
        let service = Service::new(Repositories::from_shared(repo), notifier, service_config);

        Ok(Self {
            service: Arc::new(service),
            schedule,
            config: cfg,
        })
    }

    pub fn service(&self) -> Arc<Service> {
        self.service.clone()
    }

    /// In-process client for other modules.
    pub fn client(&self) -> Arc<dyn VirtualEducationApi> {
        Arc::new(VirtualEducationLocalClient::new(self.service.clone()))
    }

    pub fn register_rest(&self, router: axum::Router) -> axum::Router {
        info!("Registering virtual_education REST routes");
        routes::register_routes(router, self.service.clone())
    }

    pub fn openapi() -> utoipa::openapi::OpenApi {
        openapi::document()
    }

    /// The daily reminder job, or `None` when notifications are disabled.
    pub fn expiry_job(&self) -> Option<Arc<ExpiryJob>> {
        self.config.notifications_enabled.then(|| {
            Arc::new(ExpiryJob::new(
                self.service.clone(),
                self.schedule,
                self.config.expiry_window_days,
            ))
        })
    }

    /// A job for a single pass, used regardless of `notifications_enabled`.
    pub fn expiry_pass(&self) -> ExpiryJob {
        ExpiryJob::new(
            self.service.clone(),
            self.schedule,
            self.config.expiry_window_days,
        )
    }
}
