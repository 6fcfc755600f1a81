//! Transient user notifications.
//!
//! Controllers receive a [`NotificationSink`] instead of reaching for a global
//! toast channel. [`ToastManager`] keeps a bounded queue that a view layer can
//! render; [`TracingSink`] only logs.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ToastId(pub u64);

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NotificationKind {
    Info,
    Success,
    Error,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
}

impl Notification {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Info,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Error,
            message: message.into(),
        }
    }
}

/// Fire-and-forget receiver of user-facing notifications.
pub trait NotificationSink: Send + Sync + 'static {
    fn notify(&self, notification: Notification);
}

impl<S: NotificationSink + ?Sized> NotificationSink for Arc<S> {
    fn notify(&self, notification: Notification) {
        (**self).notify(notification);
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ToastEntry {
    pub id: ToastId,
    pub notification: Notification,
    pub auto_close_ms: Option<u32>,
}

struct ToastState {
    queue: VecDeque<ToastEntry>,
    max_visible: usize,
}

#[derive(Clone)]
pub struct ToastManager {
    next_id: Arc<AtomicU64>,
    state: Arc<RwLock<ToastState>>,
}

impl Default for ToastManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ToastManager {
    pub fn new() -> Self {
        Self::with_max_visible(5)
    }

    pub fn with_max_visible(max_visible: usize) -> Self {
        Self {
            next_id: Arc::new(AtomicU64::new(0)),
            state: Arc::new(RwLock::new(ToastState {
                queue: VecDeque::new(),
                max_visible: max_visible.max(1),
            })),
        }
    }

    pub fn show(&self, notification: Notification) -> ToastId {
        let id = ToastId(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        let auto_close_ms = match notification.kind {
            NotificationKind::Error => Some(6_000),
            NotificationKind::Info | NotificationKind::Success => Some(4_000),
        };

        let mut state = match self.state.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        state.queue.push_back(ToastEntry {
            id,
            notification,
            auto_close_ms,
        });
        while state.queue.len() > state.max_visible {
            state.queue.pop_front();
        }
        id
    }

    pub fn dismiss(&self, id: ToastId) -> bool {
        let mut state = match self.state.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(index) = state.queue.iter().position(|entry| entry.id == id) {
            state.queue.remove(index);
            return true;
        }
        false
    }

    pub fn dismiss_all(&self) {
        match self.state.write() {
            Ok(mut guard) => guard.queue.clear(),
            Err(poisoned) => poisoned.into_inner().queue.clear(),
        }
    }

    pub fn list(&self) -> Vec<ToastEntry> {
        let state = match self.state.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        state.queue.iter().cloned().collect()
    }

    pub fn messages(&self) -> Vec<Notification> {
        self.list()
            .into_iter()
            .map(|entry| entry.notification)
            .collect()
    }
}

impl NotificationSink for ToastManager {
    fn notify(&self, notification: Notification) {
        self.show(notification);
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn notify(&self, notification: Notification) {
        match notification.kind {
            NotificationKind::Error => {
                tracing::warn!(message = %notification.message, "user notification")
            }
            NotificationKind::Info | NotificationKind::Success => {
                tracing::info!(message = %notification.message, "user notification")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toast_manager_enforces_visible_limit() {
        let manager = ToastManager::with_max_visible(2);
        manager.notify(Notification::info("a"));
        manager.notify(Notification::success("b"));
        manager.notify(Notification::error("c"));

        let visible = manager.list();
        assert_eq!(visible.len(), 2);
        assert_eq!(visible[0].notification, Notification::success("b"));
        assert_eq!(visible[1].notification.kind, NotificationKind::Error);
        assert_eq!(visible[1].auto_close_ms, Some(6_000));
    }

    #[test]
    fn dismiss_removes_only_the_matching_toast() {
        let manager = ToastManager::new();
        let first = manager.show(Notification::info("first"));
        manager.show(Notification::info("second"));

        assert!(manager.dismiss(first));
        assert!(!manager.dismiss(first));
        assert_eq!(manager.messages(), vec![Notification::info("second")]);

        manager.dismiss_all();
        assert!(manager.list().is_empty());
    }

    #[test]
    fn shared_sink_forwards_through_arc() {
        let manager = Arc::new(ToastManager::new());
        let sink: Arc<dyn NotificationSink> = manager.clone();
        sink.notify(Notification::error("boom"));
        TracingSink.notify(Notification::info("logged only"));
        assert_eq!(manager.messages(), vec![Notification::error("boom")]);
    }
}
