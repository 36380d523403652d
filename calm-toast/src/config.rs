//! Toast manager configuration

use calm_common::config::{NotificationSettings, DEFAULT_EVENT_CAPACITY, DEFAULT_EXPIRY_MS};
use calm_common::{Error, Result};
use std::time::Duration;

/// Runtime configuration for a [`NotificationManager`](crate::NotificationManager)
///
/// The expiry delay is manager-wide; there is no per-notification override.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToastConfig {
    /// Delay between enqueue and auto-expiry
    pub expiry: Duration,

    /// Maximum simultaneously active notifications
    ///
    /// When reached, the oldest notifications are evicted before a new one
    /// is appended. `None` (the default) never evicts.
    pub max_active: Option<usize>,

    /// Lifecycle event channel capacity
    pub event_capacity: usize,
}

impl Default for ToastConfig {
    fn default() -> Self {
        Self {
            expiry: Duration::from_millis(DEFAULT_EXPIRY_MS),
            max_active: None,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl ToastConfig {
    #[must_use]
    pub fn with_expiry(mut self, expiry: Duration) -> Self {
        self.expiry = expiry;
        self
    }

    #[must_use]
    pub fn with_max_active(mut self, max_active: Option<usize>) -> Self {
        self.max_active = max_active;
        self
    }

    #[must_use]
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    /// Reject configurations the manager cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.expiry.is_zero() {
            return Err(Error::Config("expiry must be greater than zero".to_string()));
        }
        if self.max_active == Some(0) {
            return Err(Error::Config("max_active must be at least 1".to_string()));
        }
        if self.event_capacity == 0 {
            return Err(Error::Config("event_capacity must be greater than zero".to_string()));
        }
        Ok(())
    }
}

impl From<&NotificationSettings> for ToastConfig {
    fn from(settings: &NotificationSettings) -> Self {
        Self {
            expiry: settings.expiry(),
            max_active: settings.max_active,
            event_capacity: settings.event_capacity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_expiry_is_five_seconds() {
        let config = ToastConfig::default();
        assert_eq!(config.expiry, Duration::from_millis(5000));
        assert_eq!(config.max_active, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_settings() {
        let settings = NotificationSettings {
            expiry_ms: 1200,
            max_active: Some(3),
            event_capacity: 8,
        };
        let config = ToastConfig::from(&settings);
        assert_eq!(config.expiry, Duration::from_millis(1200));
        assert_eq!(config.max_active, Some(3));
        assert_eq!(config.event_capacity, 8);
    }

    #[test]
    fn test_validate_rejects_unusable_values() {
        assert!(ToastConfig::default().with_expiry(Duration::ZERO).validate().is_err());
        assert!(ToastConfig::default().with_max_active(Some(0)).validate().is_err());
        assert!(ToastConfig::default().with_event_capacity(0).validate().is_err());
    }
}
