//! Event types for the toast lifecycle
//!
//! Provides the shared ToastEvent definition and EventBus used by the
//! notification manager to announce changes to its active set.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::notification::{Notification, NotificationId};

/// Why a notification left the active set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalReason {
    /// Explicit dismiss call (user click or application)
    Dismissed,
    /// Expiry timer fired
    Expired,
    /// Pushed out by a newer notification when the active cap was reached
    Evicted,
    /// Removed by a bulk clear
    Cleared,
}

/// Toast lifecycle events
///
/// Events are broadcast via EventBus and can be serialized for transmission
/// to a rendering layer. Every event is emitted after the state change it
/// describes has been applied.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ToastEvent {
    /// Notification appended to the active set
    Added {
        /// The new notification
        notification: Notification,
        /// Index in the active set after the append (always the last slot)
        position: usize,
        /// When it was added
        timestamp: DateTime<Utc>,
    },

    /// Notification removed from the active set
    Removed {
        /// Removed notification id
        id: NotificationId,
        /// Which path performed the removal
        reason: RemovalReason,
        /// When it was removed
        timestamp: DateTime<Utc>,
    },

    /// Manager torn down; all pending timers cancelled
    ShutDown {
        /// Number of expiry timers that were still pending
        cancelled_timers: usize,
        /// When the manager shut down
        timestamp: DateTime<Utc>,
    },
}

impl ToastEvent {
    /// Get the event type as a string (matches the serde tag)
    pub fn event_type(&self) -> &'static str {
        match self {
            ToastEvent::Added { .. } => "Added",
            ToastEvent::Removed { .. } => "Removed",
            ToastEvent::ShutDown { .. } => "ShutDown",
        }
    }

    /// The notification id this event concerns, if any
    pub fn notification_id(&self) -> Option<NotificationId> {
        match self {
            ToastEvent::Added { notification, .. } => Some(notification.id()),
            ToastEvent::Removed { id, .. } => Some(*id),
            ToastEvent::ShutDown { .. } => None,
        }
    }

    /// Serialize to a single JSON line
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

// ================================================================================================
// EventBus Implementation
// ================================================================================================

/// Broadcast channel for toast lifecycle events
///
/// The EventBus uses tokio::broadcast internally, providing:
/// - Multiple subscribers (renderers, loggers, tests)
/// - Non-blocking emit from synchronous code
/// - Bounded buffering; slow subscribers observe `RecvError::Lagged`
///
/// # Examples
///
/// ```
/// use calm_common::events::EventBus;
///
/// let bus = EventBus::new(16);
/// let _rx = bus.subscribe();
/// assert_eq!(bus.subscriber_count(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ToastEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// # Arguments
    ///
    /// * `capacity` - Number of events to buffer before dropping old events
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero (tokio broadcast requirement). The
    /// configuration layer rejects zero before it gets here.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<ToastEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: ToastEvent,
    ) -> Result<usize, broadcast::error::SendError<ToastEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: ToastEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
