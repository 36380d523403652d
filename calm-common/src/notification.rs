//! Notification entity shared between the toast manager and its renderers
//!
//! A notification is a transient user-facing message with a severity hint.
//! Instances are created by the toast manager and handed to rendering
//! collaborators as read-only snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::{time, uuid_utils};

/// Opaque notification identifier
///
/// Stable for the notification's lifetime and never reused. Used as the
/// sole key for dismissal and expiry timer association.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationId(Uuid);

impl NotificationId {
    /// Generate a fresh random identifier
    pub fn new() -> Self {
        Self(uuid_utils::generate())
    }

    /// Get the underlying UUID
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for NotificationId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for NotificationId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for NotificationId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        uuid_utils::parse(s).map(Self)
    }
}

/// Presentation hint for a notification
///
/// Severity has no effect on the notification lifecycle: every severity
/// expires after the same manager-wide delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Severity {
    /// Neutral message
    #[default]
    Default,
    /// Operation completed successfully
    Success,
    /// Something failed
    Error,
    /// Something needs attention but did not fail
    Warning,
}

impl Severity {
    /// All severity levels, in declaration order
    pub const ALL: [Severity; 4] = [
        Severity::Default,
        Severity::Success,
        Severity::Error,
        Severity::Warning,
    ];

    /// Parse a severity name, falling back to [`Severity::Default`]
    ///
    /// Matching is case-insensitive and ignores surrounding whitespace.
    /// Unrecognized names never fail.
    pub fn parse_lossy(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "success" => Severity::Success,
            "error" => Severity::Error,
            "warning" => Severity::Warning,
            _ => Severity::Default,
        }
    }

    /// Lowercase name used on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Default => "default",
            Severity::Success => "success",
            Severity::Error => "error",
            Severity::Warning => "warning",
        }
    }
}

impl From<&str> for Severity {
    fn from(s: &str) -> Self {
        Severity::parse_lossy(s)
    }
}

impl From<String> for Severity {
    fn from(s: String) -> Self {
        Severity::parse_lossy(&s)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input for enqueueing a toast
///
/// Neither title nor description is required to be non-empty.
///
/// # Examples
///
/// ```
/// use calm_common::{Severity, ToastRequest};
///
/// let request = ToastRequest::success("Saved").description("Your changes were saved");
/// assert_eq!(request.severity, Some(Severity::Success));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToastRequest {
    /// Optional short text
    #[serde(default)]
    pub title: Option<String>,
    /// Optional longer text
    #[serde(default)]
    pub description: Option<String>,
    /// Presentation hint; `None` means [`Severity::Default`]
    #[serde(default)]
    pub severity: Option<Severity>,
}

impl ToastRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request with a title and default severity
    pub fn info(title: impl Into<String>) -> Self {
        Self::new().title(title)
    }

    pub fn success(title: impl Into<String>) -> Self {
        Self::new().title(title).severity(Severity::Success)
    }

    pub fn warning(title: impl Into<String>) -> Self {
        Self::new().title(title).severity(Severity::Warning)
    }

    pub fn error(title: impl Into<String>) -> Self {
        Self::new().title(title).severity(Severity::Error)
    }

    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn severity(mut self, severity: Severity) -> Self {
        self.severity = Some(severity);
        self
    }
}

/// A transient notification in the active set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    id: NotificationId,
    title: Option<String>,
    description: Option<String>,
    severity: Severity,
    created_at: DateTime<Utc>,
}

impl Notification {
    /// Build a notification for an already-allocated id
    ///
    /// Only the toast manager should allocate ids; renderers receive
    /// finished notifications through snapshots.
    pub fn from_request(id: NotificationId, request: ToastRequest) -> Self {
        Self {
            id,
            title: request.title,
            description: request.description,
            severity: request.severity.unwrap_or_default(),
            created_at: time::now(),
        }
    }

    pub fn id(&self) -> NotificationId {
        self.id
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// Wall-clock creation time (informational only, expiry uses a monotonic clock)
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_ids_are_unique() {
        let a = NotificationId::new();
        let b = NotificationId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn test_notification_id_parses_its_display() {
        let id = NotificationId::new();
        let parsed: NotificationId = id.to_string().parse().expect("should parse");
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_notification_id_is_random_v4() {
        let id = NotificationId::new();
        assert_eq!(id.as_uuid().get_version_num(), 4);
        assert_eq!(NotificationId::from(id.as_uuid()), id);
    }

    #[test]
    fn test_severity_parse_lossy() {
        assert_eq!(Severity::parse_lossy("success"), Severity::Success);
        assert_eq!(Severity::parse_lossy("  ERROR "), Severity::Error);
        assert_eq!(Severity::parse_lossy("Warning"), Severity::Warning);
        assert_eq!(Severity::parse_lossy("default"), Severity::Default);
        assert_eq!(Severity::parse_lossy("destructive"), Severity::Default);
        assert_eq!(Severity::parse_lossy(""), Severity::Default);
    }

    #[test]
    fn test_severity_serde_uses_lowercase_and_falls_back() {
        let json = serde_json::to_string(&Severity::Warning).unwrap();
        assert_eq!(json, "\"warning\"");

        let parsed: Severity = serde_json::from_str("\"Success\"").unwrap();
        assert_eq!(parsed, Severity::Success);

        let unknown: Severity = serde_json::from_str("\"info\"").unwrap();
        assert_eq!(unknown, Severity::Default);
    }

    #[test]
    fn test_every_severity_round_trips_through_its_name() {
        for severity in Severity::ALL {
            assert_eq!(Severity::parse_lossy(severity.as_str()), severity);
            let json = serde_json::to_string(&severity).unwrap();
            assert_eq!(json, format!("\"{}\"", severity.as_str()));
            assert_eq!(serde_json::from_str::<Severity>(&json).unwrap(), severity);
        }
    }

    #[test]
    fn test_request_builders_set_severity() {
        assert_eq!(ToastRequest::info("x").severity, None);
        assert_eq!(ToastRequest::success("x").severity, Some(Severity::Success));
        assert_eq!(ToastRequest::warning("x").severity, Some(Severity::Warning));
        assert_eq!(ToastRequest::error("x").severity, Some(Severity::Error));
    }

    #[test]
    fn test_from_request_defaults_severity() {
        let id = NotificationId::new();
        let notification = Notification::from_request(id, ToastRequest::new().description("body"));

        assert_eq!(notification.id(), id);
        assert_eq!(notification.title(), None);
        assert_eq!(notification.description(), Some("body"));
        assert_eq!(notification.severity(), Severity::Default);
    }

    #[test]
    fn test_notification_serializes_for_renderers() {
        let notification = Notification::from_request(
            NotificationId::new(),
            ToastRequest::success("Saved").description("Your changes were saved"),
        );

        let json = serde_json::to_string(&notification).unwrap();
        assert!(json.contains("\"title\":\"Saved\""));
        assert!(json.contains("\"severity\":\"success\""));

        let back: Notification = serde_json::from_str(&json).unwrap();
        assert_eq!(back, notification);
    }
}
