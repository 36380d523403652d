//! Expiry timer tasks
//!
//! One lightweight tokio task per notification. The task owns the
//! notification's cancellation token and a weak reference back to the
//! manager, so a dropped manager never keeps timers (or itself) alive.

use calm_common::NotificationId;
use std::sync::Weak;
use tokio::runtime::Handle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{trace, warn};

use super::Shared;

/// Owned by the timer task; reports a task dropped before it settled
///
/// Built before spawning so it is dropped even if the task is never polled.
struct ExpiryGuard {
    id: NotificationId,
    token: CancellationToken,
    settled: bool,
}

impl Drop for ExpiryGuard {
    fn drop(&mut self) {
        // A cancelled token means the manager no longer needs this timer
        if !self.settled && !self.token.is_cancelled() {
            warn!(
                id = %self.id,
                "Expiry timer dropped by its runtime; notification will not expire"
            );
        }
    }
}

/// Spawn the expiry timer for `id`
///
/// The deadline is computed by the caller at enqueue time, so a task that
/// gets polled late still fires at the original deadline.
pub(super) fn spawn_expiry(
    runtime: &Handle,
    shared: Weak<Shared>,
    id: NotificationId,
    token: CancellationToken,
    deadline: Instant,
) {
    let mut guard = ExpiryGuard {
        id,
        token,
        settled: false,
    };

    runtime.spawn(async move {
        tokio::select! {
            biased;

            _ = guard.token.cancelled() => {
                trace!(%id, "Expiry timer cancelled");
            }
            _ = tokio::time::sleep_until(deadline) => {
                match shared.upgrade() {
                    Some(shared) => shared.expire(id, &guard.token),
                    None => trace!(%id, "Expiry timer fired after manager teardown"),
                }
            }
        }
        guard.settled = true;
    });
}
