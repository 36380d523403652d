//! Notification Manager
//!
//! Owns the active set of transient notifications and one expiry timer per
//! notification. Consumers only enqueue, dismiss, and read snapshots.
//!
//! # Lifecycle per notification id
//!
//! ```text
//! [absent] --enqueue--> [active, timer pending]
//! [active, timer pending] --dismiss--> [absent]        (timer cancelled)
//! [active, timer pending] --timer elapses--> [absent]  (registry entry cleared)
//! [absent] --dismiss--> [absent]                        (no-op)
//! ```
//!
//! Ids are never reused, so an id that returned to absent stays there.
//!
//! # Concurrency
//!
//! Active set and timer registry live behind one mutex. Dismiss and timer
//! expiry both remove through that lock, so for any id exactly one of them
//! performs the removal and the other observes an absent entry.
//!
//! Snapshots are captured under the lock but published to watchers after it
//! is released, so a watcher holding a borrow never stalls the lock.

mod state;
mod timer;

use calm_common::events::{EventBus, RemovalReason, ToastEvent};
use calm_common::{time, Error, Notification, NotificationId, Result, ToastRequest};
use calm_common::Severity;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::runtime::Handle;
use tokio::sync::{broadcast, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::ToastConfig;
use state::State;

/// State shared between the manager and its expiry timers
pub(crate) struct Shared {
    state: Mutex<State>,
    events: EventBus,
    snapshots: watch::Sender<Vec<Notification>>,
    /// Version of the snapshot watchers currently see
    published: AtomicU64,
}

/// Snapshot captured under the lock, waiting to be published
type Pending = (u64, Vec<Notification>);

impl Shared {
    /// Lock the state, recovering from poisoning
    ///
    /// Every operation leaves the state consistent before it can panic, so
    /// a poisoned lock still guards valid data.
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Push a captured snapshot to watchers
    ///
    /// Must be called without the state lock: sending waits for outstanding
    /// watch borrows. A snapshot older than the one already sent is dropped.
    fn publish(&self, (version, snapshot): Pending) {
        self.snapshots.send_if_modified(|current| {
            // Only ever touched under the watch write lock
            if self.published.load(Ordering::Relaxed) >= version {
                return false;
            }
            self.published.store(version, Ordering::Relaxed);
            *current = snapshot;
            true
        });
    }

    fn emit_removed(&self, id: NotificationId, reason: RemovalReason) {
        self.events.emit_lossy(ToastEvent::Removed {
            id,
            reason,
            timestamp: time::now(),
        });
    }

    /// Idempotent removal shared by dismiss and clear
    fn remove(&self, id: NotificationId, reason: RemovalReason) -> Option<Notification> {
        let (removed, pending) = {
            let mut state = self.lock();
            let removed = state.remove(id)?;
            self.emit_removed(id, reason);
            (removed, state.versioned_snapshot())
        };

        self.publish(pending);
        Some(removed)
    }

    /// Timer-fired path
    ///
    /// A cancelled token means dismiss, eviction or shutdown already won the
    /// race; the state no longer holds this id and nothing happens.
    pub(crate) fn expire(&self, id: NotificationId, token: &CancellationToken) {
        let pending = {
            let mut state = self.lock();
            if token.is_cancelled() {
                debug!(%id, "Expiry lost race to dismissal");
                return;
            }
            if state.remove(id).is_none() {
                return;
            }
            debug!(%id, "Notification expired");
            self.emit_removed(id, RemovalReason::Expired);
            state.versioned_snapshot()
        };

        self.publish(pending);
    }
}

/// Transient notification manager
///
/// Lifecycle operations are synchronous and never fail. Expiry timers run as
/// tokio tasks on the runtime captured at construction. Dropping the manager
/// cancels every outstanding timer.
///
/// Share between tasks with `Arc<NotificationManager>`.
pub struct NotificationManager {
    shared: Arc<Shared>,
    runtime: Handle,
    config: ToastConfig,
}

impl NotificationManager {
    /// Create a manager on the current tokio runtime
    ///
    /// # Errors
    ///
    /// - `Error::Runtime` when called outside a tokio runtime
    /// - `Error::Config` when the configuration is unusable
    pub fn new(config: ToastConfig) -> Result<Self> {
        let runtime = Handle::try_current()
            .map_err(|e| Error::Runtime(format!("Notification manager needs a tokio runtime: {}", e)))?;
        Self::with_handle(config, runtime)
    }

    /// Create a manager with the default configuration (5 s expiry, unbounded)
    pub fn with_defaults() -> Result<Self> {
        Self::new(ToastConfig::default())
    }

    /// Create a manager whose timers run on `runtime`
    ///
    /// Lets hosts enqueue and dismiss from threads that are not part of the
    /// runtime. The runtime must outlive the manager: timers dropped by a
    /// runtime shutdown never fire, and their notifications stay active
    /// until dismissed (a warning is logged for each).
    pub fn with_handle(config: ToastConfig, runtime: Handle) -> Result<Self> {
        config.validate()?;

        let (snapshots, _) = watch::channel(Vec::new());
        let shared = Arc::new(Shared {
            state: Mutex::new(State::new()),
            events: EventBus::new(config.event_capacity),
            snapshots,
            published: AtomicU64::new(0),
        });

        debug!(
            "Notification manager created (expiry {:?}, max_active {:?})",
            config.expiry, config.max_active
        );

        Ok(Self {
            shared,
            runtime,
            config,
        })
    }

    /// Add a notification and schedule its expiry
    ///
    /// The notification is appended after every currently active one. Its
    /// id is fresh: never equal to any id in the active set. When
    /// `max_active` is configured and reached, the oldest notifications are
    /// evicted first.
    ///
    /// Always succeeds. After [`shutdown`](Self::shutdown) the manager is
    /// inert: an id is still returned but nothing is recorded.
    pub fn enqueue(&self, request: ToastRequest) -> NotificationId {
        let mut state = self.shared.lock();

        let mut id = NotificationId::new();
        while state.contains(id) || state.has_timer(id) {
            id = NotificationId::new();
        }

        if state.is_shut_down() {
            warn!(%id, "Notification manager is shut down, ignoring enqueue");
            return id;
        }

        if let Some(max) = self.config.max_active {
            while state.len() >= max {
                match state.evict_oldest() {
                    Some(evicted) => {
                        debug!(id = %evicted.id(), "Evicted oldest notification");
                        self.shared.emit_removed(evicted.id(), RemovalReason::Evicted);
                    }
                    None => break,
                }
            }
        }

        let notification = Notification::from_request(id, request);
        let token = CancellationToken::new();
        let deadline = Instant::now() + self.config.expiry;

        let position = state.insert(notification.clone(), token.clone());
        timer::spawn_expiry(&self.runtime, Arc::downgrade(&self.shared), id, token, deadline);

        debug!(%id, severity = %notification.severity(), position, "Notification enqueued");
        self.shared.events.emit_lossy(ToastEvent::Added {
            notification,
            position,
            timestamp: time::now(),
        });
        let pending = state.versioned_snapshot();
        drop(state);

        self.shared.publish(pending);
        id
    }

    /// Enqueue from loose parts
    ///
    /// `severity` is parsed leniently: `None` or an unrecognized name yields
    /// [`Severity::Default`].
    pub fn enqueue_with(
        &self,
        title: Option<&str>,
        description: Option<&str>,
        severity: Option<&str>,
    ) -> NotificationId {
        self.enqueue(ToastRequest {
            title: title.map(str::to_string),
            description: description.map(str::to_string),
            severity: Some(severity.map(Severity::parse_lossy).unwrap_or_default()),
        })
    }

    /// Remove a notification and cancel its pending timer
    ///
    /// Idempotent: unknown, already-dismissed and already-expired ids are a
    /// no-op. When this returns, no notification with `id` is active and no
    /// timer for `id` is pending.
    pub fn dismiss(&self, id: NotificationId) {
        self.try_dismiss(id);
    }

    /// Like [`dismiss`](Self::dismiss), reporting whether this call removed anything
    pub fn try_dismiss(&self, id: NotificationId) -> bool {
        let removed = self.shared.remove(id, RemovalReason::Dismissed).is_some();
        if removed {
            debug!(%id, "Notification dismissed");
        } else {
            debug!(%id, "Dismiss of inactive notification ignored");
        }
        removed
    }

    /// Dismiss every active notification
    ///
    /// Returns how many were removed. The manager stays usable.
    pub fn clear(&self) -> usize {
        let mut state = self.shared.lock();
        let (removed, _) = state.drain();
        if removed.is_empty() {
            return 0;
        }

        for notification in &removed {
            self.shared.emit_removed(notification.id(), RemovalReason::Cleared);
        }
        let pending = state.versioned_snapshot();
        drop(state);

        self.shared.publish(pending);

        debug!("Cleared {} notifications", removed.len());
        removed.len()
    }

    /// Cancel every pending timer, drop all notifications and go inert
    ///
    /// Called automatically on drop. Repeated calls are no-ops.
    pub fn shutdown(&self) {
        let mut state = self.shared.lock();
        if state.is_shut_down() {
            return;
        }

        let (removed, cancelled_timers) = state.shut_down();
        self.shared.events.emit_lossy(ToastEvent::ShutDown {
            cancelled_timers,
            timestamp: time::now(),
        });
        let pending = state.versioned_snapshot();
        drop(state);

        self.shared.publish(pending);
        info!(
            "Notification manager shut down ({} active, {} timers cancelled)",
            removed.len(),
            cancelled_timers
        );
    }

    /// Ordered copy of the active set, oldest first
    pub fn snapshot(&self) -> Vec<Notification> {
        self.shared.lock().snapshot()
    }

    /// Receiver that observes a new snapshot after every state change
    ///
    /// Rapid changes may coalesce; the receiver always ends on the latest
    /// snapshot. Do not hold a [`borrow()`](watch::Receiver::borrow) across a
    /// call into the manager on the same thread: mutating calls publish, and
    /// publishing waits until every borrow is released.
    pub fn watch(&self) -> watch::Receiver<Vec<Notification>> {
        self.shared.snapshots.subscribe()
    }

    /// Subscribe to lifecycle events emitted after this call
    pub fn subscribe(&self) -> broadcast::Receiver<ToastEvent> {
        self.shared.events.subscribe()
    }

    pub fn len(&self) -> usize {
        self.shared.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.lock().is_empty()
    }

    pub fn contains(&self, id: NotificationId) -> bool {
        self.shared.lock().contains(id)
    }

    pub fn get(&self, id: NotificationId) -> Option<Notification> {
        self.shared.lock().get(id).cloned()
    }

    /// Number of expiry timers still pending
    pub fn pending_timers(&self) -> usize {
        self.shared.lock().pending_timers()
    }

    /// Whether a timer is pending for `id`
    pub fn has_pending_timer(&self, id: NotificationId) -> bool {
        self.shared.lock().has_timer(id)
    }

    pub fn is_shut_down(&self) -> bool {
        self.shared.lock().is_shut_down()
    }

    pub fn config(&self) -> &ToastConfig {
        &self.config
    }
}

impl Drop for NotificationManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for NotificationManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.lock();
        f.debug_struct("NotificationManager")
            .field("active", &state.len())
            .field("pending_timers", &state.pending_timers())
            .field("shut_down", &state.is_shut_down())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_new_outside_runtime_fails() {
        let err = NotificationManager::new(ToastConfig::default()).unwrap_err();
        assert!(matches!(err, Error::Runtime(_)));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        let config = ToastConfig::default().with_expiry(Duration::ZERO);

        let err = NotificationManager::with_handle(config, runtime.handle().clone()).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[tokio::test]
    async fn test_enqueue_registers_one_timer_per_notification() {
        let manager = NotificationManager::with_defaults().unwrap();
        let a = manager.enqueue(ToastRequest::info("a"));
        let b = manager.enqueue(ToastRequest::info("b"));

        assert_eq!(manager.len(), 2);
        assert_eq!(manager.pending_timers(), 2);
        assert!(manager.has_pending_timer(a));
        assert!(manager.has_pending_timer(b));
    }

    #[tokio::test]
    async fn test_enqueue_with_parses_severity_leniently() {
        let manager = NotificationManager::with_defaults().unwrap();
        let ok = manager.enqueue_with(Some("Saved"), None, Some("success"));
        let odd = manager.enqueue_with(None, Some("Body only"), Some("destructive"));
        let none = manager.enqueue_with(None, None, None);

        assert_eq!(manager.get(ok).unwrap().severity(), Severity::Success);
        assert_eq!(manager.get(odd).unwrap().severity(), Severity::Default);
        assert_eq!(manager.get(odd).unwrap().title(), None);
        assert_eq!(manager.get(none).unwrap().severity(), Severity::Default);
    }

    #[tokio::test]
    async fn test_try_dismiss_reports_removal_once() {
        let manager = NotificationManager::with_defaults().unwrap();
        let id = manager.enqueue(ToastRequest::info("a"));

        assert!(manager.try_dismiss(id));
        assert!(!manager.try_dismiss(id));
        assert!(!manager.has_pending_timer(id));
    }

    #[tokio::test]
    async fn test_clear_keeps_manager_usable() {
        let manager = NotificationManager::with_defaults().unwrap();
        manager.enqueue(ToastRequest::info("a"));
        manager.enqueue(ToastRequest::info("b"));

        assert_eq!(manager.clear(), 2);
        assert_eq!(manager.clear(), 0);
        assert_eq!(manager.pending_timers(), 0);

        manager.enqueue(ToastRequest::info("c"));
        assert_eq!(manager.len(), 1);
    }

    #[tokio::test]
    async fn test_enqueue_after_shutdown_is_inert() {
        let manager = NotificationManager::with_defaults().unwrap();
        manager.shutdown();

        let id = manager.enqueue(ToastRequest::info("late"));
        assert!(!manager.contains(id));
        assert!(manager.is_empty());
        assert_eq!(manager.pending_timers(), 0);
        assert!(manager.is_shut_down());
    }
}
