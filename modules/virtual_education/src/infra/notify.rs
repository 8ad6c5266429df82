use async_trait::async_trait;
use tracing::info;

use crate::contract::model::ExpiringEnrollment;
use crate::domain::ports::ExpiryNotifier;

/// Emits each reminder as a structured `tracing` event under its own target,
/// so log routing decides where reminders end up.
#[derive(Debug, Default, Clone)]
pub struct TracingNotifier;

#[async_trait]
impl ExpiryNotifier for TracingNotifier {
    async fn notify(&self, expiring: &ExpiringEnrollment) -> anyhow::Result<()> {
        info!(
            target: "virtual_education::notifications",
            enrollment_id = %expiring.enrollment.id,
            student_id = %expiring.enrollment.student_id,
            course_id = %expiring.enrollment.course_id,
            days_remaining = expiring.days_remaining,
            "{}",
            expiring.message()
        );
        Ok(())
    }
}
