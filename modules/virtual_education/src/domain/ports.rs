use async_trait::async_trait;

use crate::contract::model::ExpiringEnrollment;

/// Outbound channel for expiry reminders.
#[async_trait]
pub trait ExpiryNotifier: Send + Sync {
    async fn notify(&self, expiring: &ExpiringEnrollment) -> anyhow::Result<()>;
}
