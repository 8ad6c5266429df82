use anyhow::ensure;
use serde::{Deserialize, Serialize};

/// Longest reminder window accepted, in days.
pub const MAX_EXPIRY_WINDOW_DAYS: i64 = 3650;

/// Configuration for the virtual_education module
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VirtualEducationConfig {
    #[serde(default = "default_page_size")]
    pub default_page_size: u64,
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u64,
    /// Enrollments closing within this many days get a reminder.
    #[serde(default = "default_expiry_window_days")]
    pub expiry_window_days: i64,
    /// UTC time of day for the reminder pass, "HH:MM".
    #[serde(default = "default_notify_at")]
    pub notify_at: String,
    #[serde(default = "default_notifications_enabled")]
    pub notifications_enabled: bool,
}

impl Default for VirtualEducationConfig {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
            expiry_window_days: default_expiry_window_days(),
            notify_at: default_notify_at(),
            notifications_enabled: default_notifications_enabled(),
        }
    }
}

impl VirtualEducationConfig {
    /// Range checks serde cannot express.
    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(self.default_page_size > 0, "default_page_size must be positive");
        ensure!(
            self.max_page_size >= self.default_page_size,
            "max_page_size must be at least default_page_size"
        );
        ensure!(
            (0..=MAX_EXPIRY_WINDOW_DAYS).contains(&self.expiry_window_days),
            "expiry_window_days must be between 0 and {MAX_EXPIRY_WINDOW_DAYS}"
        );
        Ok(())
    }
}

fn default_page_size() -> u64 {
    10
}

fn default_max_page_size() -> u64 {
    100
}

fn default_expiry_window_days() -> i64 {
    7
}

fn default_notify_at() -> String {
    "08:00".to_string()
}

fn default_notifications_enabled() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_defaults() {
        let cfg: VirtualEducationConfig =
            serde_json::from_value(serde_json::json!({ "notify_at": "07:30" })).unwrap();
        assert_eq!(cfg.notify_at, "07:30");
        assert_eq!(cfg.default_page_size, 10);
        assert_eq!(cfg.expiry_window_days, 7);
        assert!(cfg.notifications_enabled);
    }

    #[test]
    fn window_is_bounded() {
        let mut cfg = VirtualEducationConfig::default();
        assert!(cfg.validate().is_ok());

        cfg.expiry_window_days = MAX_EXPIRY_WINDOW_DAYS;
        assert!(cfg.validate().is_ok());

        cfg.expiry_window_days = i64::MAX;
        let err = cfg.validate().unwrap_err().to_string();
        assert!(err.contains("expiry_window_days"), "{err}");

        cfg.expiry_window_days = -1;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn page_sizes_must_be_consistent() {
        let cfg = VirtualEducationConfig {
            default_page_size: 50,
            max_page_size: 20,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let res: Result<VirtualEducationConfig, _> =
            serde_json::from_value(serde_json::json!({ "page": 3 }));
        assert!(res.is_err());
    }
}
