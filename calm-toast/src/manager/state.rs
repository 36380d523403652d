//! Active set and timer registry
//!
//! Pure bookkeeping with no async or locking concerns. The manager wraps a
//! single `State` in a mutex so every mutation of the two structures below
//! happens in one critical section.

use calm_common::{Notification, NotificationId};
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;

/// Active set plus timer registry for one manager
#[derive(Debug, Default)]
pub(crate) struct State {
    /// Active notifications, oldest first
    active: Vec<Notification>,
    /// Pending expiry timers keyed by notification id
    timers: HashMap<NotificationId, CancellationToken>,
    /// Set once by shutdown; an inert state accepts no new entries
    shut_down: bool,
    /// Bumped for every snapshot taken for publication
    version: u64,
}

impl State {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn len(&self) -> usize {
        self.active.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub(crate) fn contains(&self, id: NotificationId) -> bool {
        self.position(id).is_some()
    }

    pub(crate) fn get(&self, id: NotificationId) -> Option<&Notification> {
        self.active.iter().find(|n| n.id() == id)
    }

    pub(crate) fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    pub(crate) fn has_timer(&self, id: NotificationId) -> bool {
        self.timers.contains_key(&id)
    }

    pub(crate) fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    /// Ordered copy of the active set
    pub(crate) fn snapshot(&self) -> Vec<Notification> {
        self.active.clone()
    }

    /// Ordered copy of the active set tagged with a fresh version
    ///
    /// Versions strictly increase in lock order, so publishers racing after
    /// the lock is released can tell which snapshot is newer.
    pub(crate) fn versioned_snapshot(&mut self) -> (u64, Vec<Notification>) {
        self.version += 1;
        (self.version, self.active.clone())
    }

    /// Append a notification and register its expiry timer
    ///
    /// Returns the index the notification landed at (always the last slot).
    /// The caller guarantees the id is fresh.
    pub(crate) fn insert(&mut self, notification: Notification, timer: CancellationToken) -> usize {
        let id = notification.id();
        debug_assert!(!self.contains(id), "duplicate notification id {id}");

        self.timers.insert(id, timer);
        self.active.push(notification);
        self.active.len() - 1
    }

    /// Remove a notification and cancel its timer
    ///
    /// Idempotent: returns `None` when neither the notification nor a timer
    /// was present. Remaining entries keep their relative order.
    pub(crate) fn remove(&mut self, id: NotificationId) -> Option<Notification> {
        if let Some(timer) = self.timers.remove(&id) {
            timer.cancel();
        }
        self.position(id).map(|index| self.active.remove(index))
    }

    /// Remove the oldest notification, cancelling its timer
    pub(crate) fn evict_oldest(&mut self) -> Option<Notification> {
        let oldest = self.active.first()?.id();
        self.remove(oldest)
    }

    /// Remove everything, cancelling every pending timer
    ///
    /// Returns the removed notifications (oldest first) and the number of
    /// timers that were cancelled.
    pub(crate) fn drain(&mut self) -> (Vec<Notification>, usize) {
        let cancelled = self.timers.len();
        for (_, timer) in self.timers.drain() {
            timer.cancel();
        }
        (std::mem::take(&mut self.active), cancelled)
    }

    /// Drain and mark inert
    pub(crate) fn shut_down(&mut self) -> (Vec<Notification>, usize) {
        self.shut_down = true;
        self.drain()
    }

    fn position(&self, id: NotificationId) -> Option<usize> {
        self.active.iter().position(|n| n.id() == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use calm_common::ToastRequest;

    fn notification(title: &str) -> Notification {
        Notification::from_request(NotificationId::new(), ToastRequest::info(title))
    }

    fn ids(state: &State) -> Vec<NotificationId> {
        state.snapshot().iter().map(Notification::id).collect()
    }

    #[test]
    fn test_insert_appends_and_registers_timer() {
        let mut state = State::new();
        let first = notification("first");
        let second = notification("second");
        let (a, b) = (first.id(), second.id());

        assert_eq!(state.insert(first, CancellationToken::new()), 0);
        assert_eq!(state.insert(second, CancellationToken::new()), 1);

        assert_eq!(ids(&state), vec![a, b]);
        assert_eq!(state.pending_timers(), 2);
        assert!(state.has_timer(a));
        assert!(state.has_timer(b));
    }

    #[test]
    fn test_remove_cancels_timer_and_keeps_order() {
        let mut state = State::new();
        let entries: Vec<Notification> = (0..4).map(|i| notification(&format!("n{i}"))).collect();
        let all_ids: Vec<NotificationId> = entries.iter().map(Notification::id).collect();
        let tokens: Vec<CancellationToken> = entries
            .into_iter()
            .map(|n| {
                let token = CancellationToken::new();
                state.insert(n, token.clone());
                token
            })
            .collect();

        let removed = state.remove(all_ids[1]).expect("should remove");
        assert_eq!(removed.id(), all_ids[1]);
        assert!(tokens[1].is_cancelled());
        assert!(!tokens[0].is_cancelled());
        assert!(!state.has_timer(all_ids[1]));
        assert_eq!(ids(&state), vec![all_ids[0], all_ids[2], all_ids[3]]);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut state = State::new();
        let n = notification("once");
        let id = n.id();
        state.insert(n, CancellationToken::new());

        assert!(state.remove(id).is_some());
        assert!(state.remove(id).is_none());
        assert!(state.remove(NotificationId::new()).is_none());
        assert!(state.is_empty());
        assert_eq!(state.pending_timers(), 0);
    }

    #[test]
    fn test_evict_oldest() {
        let mut state = State::new();
        let old = notification("old");
        let new = notification("new");
        let (old_id, new_id) = (old.id(), new.id());
        let old_token = CancellationToken::new();
        state.insert(old, old_token.clone());
        state.insert(new, CancellationToken::new());

        assert_eq!(state.evict_oldest().map(|n| n.id()), Some(old_id));
        assert!(old_token.is_cancelled());
        assert_eq!(ids(&state), vec![new_id]);

        state.evict_oldest();
        assert!(state.evict_oldest().is_none());
    }

    #[test]
    fn test_versioned_snapshot_increases() {
        let mut state = State::new();
        let (v1, empty) = state.versioned_snapshot();
        assert!(empty.is_empty());

        let n = notification("a");
        let id = n.id();
        state.insert(n, CancellationToken::new());
        let (v2, snapshot) = state.versioned_snapshot();

        assert!(v2 > v1);
        assert_eq!(snapshot.iter().map(Notification::id).collect::<Vec<_>>(), vec![id]);
    }

    #[test]
    fn test_shut_down_drains_and_cancels_everything() {
        let mut state = State::new();
        let tokens: Vec<CancellationToken> = (0..3)
            .map(|i| {
                let token = CancellationToken::new();
                state.insert(notification(&format!("n{i}")), token.clone());
                token
            })
            .collect();

        let (removed, cancelled) = state.shut_down();
        assert_eq!(removed.len(), 3);
        assert_eq!(cancelled, 3);
        assert!(tokens.iter().all(CancellationToken::is_cancelled));
        assert!(state.is_empty());
        assert_eq!(state.pending_timers(), 0);
        assert!(state.is_shut_down());
    }
}
