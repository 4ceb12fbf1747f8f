//! Transient notifications shown outside the page flow.
//!
//! Toasts display in insertion order and leave either when dismissed or when
//! their time to live runs out.

use std::{collections::VecDeque, sync::Arc, time::Duration};

use serde::Serialize;
use shared::domain::{ToastId, ToastLevel};
use tokio::{
    sync::{broadcast, broadcast::error::RecvError, Mutex, Notify},
    task::JoinHandle,
    time::{sleep_until, Instant},
};
use tracing::debug;

pub const DEFAULT_TOAST_TTL: Duration = Duration::from_secs(5);
pub const DISMISS_LABEL: &str = "Dismiss";
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToastNotification {
    pub id: ToastId,
    pub title: String,
    pub description: String,
    pub level: ToastLevel,
    pub dismiss_label: String,
    pub action_label: Option<String>,
    pub ttl: Duration,
    #[serde(skip)]
    pub created_at: Instant,
}

impl ToastNotification {
    /// Saturates at roughly thirty years out for effectively endless ttls.
    pub fn expires_at(&self) -> Instant {
        self.created_at
            .checked_add(self.ttl)
            .unwrap_or_else(|| self.created_at + FAR_FUTURE)
    }
}

/// A toast before the queue assigns it an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToastDraft {
    pub title: String,
    pub description: String,
    pub level: ToastLevel,
    pub action_label: Option<String>,
    pub ttl: Option<Duration>,
}

impl ToastDraft {
    pub fn new(level: ToastLevel, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            level,
            action_label: None,
            ttl: None,
        }
    }

    pub fn success(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(ToastLevel::Success, title, description)
    }

    pub fn error(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(ToastLevel::Error, title, description)
    }

    pub fn with_action(mut self, label: impl Into<String>) -> Self {
        self.action_label = Some(label.into());
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalReason {
    Dismissed,
    Expired,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToastEvent {
    Shown(ToastNotification),
    Removed { id: ToastId, reason: RemovalReason },
}

struct ToastQueueState {
    toasts: VecDeque<ToastNotification>,
    next_id: u64,
}

/// Shared handle to the page's notification queue. Any number of producers
/// push; the renderer reads [`ToastQueue::visible`] or listens for events.
#[derive(Clone)]
pub struct ToastQueue {
    inner: Arc<Mutex<ToastQueueState>>,
    events: broadcast::Sender<ToastEvent>,
    wake: Arc<Notify>,
    default_ttl: Duration,
}

impl Default for ToastQueue {
    fn default() -> Self {
        Self::new(DEFAULT_TOAST_TTL)
    }
}

impl ToastQueue {
    pub fn new(default_ttl: Duration) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            inner: Arc::new(Mutex::new(ToastQueueState {
                toasts: VecDeque::new(),
                next_id: 0,
            })),
            events,
            wake: Arc::new(Notify::new()),
            default_ttl,
        }
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ToastEvent> {
        self.events.subscribe()
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    pub async fn push(&self, draft: ToastDraft, now: Instant) -> ToastId {
        let toast = {
            let mut state = self.inner.lock().await;
            state.next_id += 1;
            let toast = ToastNotification {
                id: ToastId(state.next_id),
                title: draft.title,
                description: draft.description,
                level: draft.level,
                dismiss_label: DISMISS_LABEL.to_string(),
                action_label: draft.action_label,
                ttl: draft.ttl.unwrap_or(self.default_ttl),
                created_at: now,
            };
            state.toasts.push_back(toast.clone());
            toast
        };
        let id = toast.id;
        debug!(toast_id = id.0, title = %toast.title, "toast: shown");
        let _ = self.events.send(ToastEvent::Shown(toast));
        self.wake.notify_one();
        id
    }

    pub async fn dismiss(&self, id: ToastId) -> bool {
        let removed = {
            let mut state = self.inner.lock().await;
            let before = state.toasts.len();
            state.toasts.retain(|toast| toast.id != id);
            state.toasts.len() != before
        };
        if removed {
            debug!(toast_id = id.0, "toast: dismissed");
            let _ = self.events.send(ToastEvent::Removed {
                id,
                reason: RemovalReason::Dismissed,
            });
        }
        removed
    }

    /// Removes every toast whose time to live has run out by `now` and
    /// returns their ids in display order.
    pub async fn expire(&self, now: Instant) -> Vec<ToastId> {
        let expired: Vec<ToastId> = {
            let mut state = self.inner.lock().await;
            let mut expired = Vec::new();
            state.toasts.retain(|toast| {
                let live = toast.expires_at() > now;
                if !live {
                    expired.push(toast.id);
                }
                live
            });
            expired
        };
        for id in &expired {
            debug!(toast_id = id.0, "toast: expired");
            let _ = self.events.send(ToastEvent::Removed {
                id: *id,
                reason: RemovalReason::Expired,
            });
        }
        expired
    }

    /// Toasts currently on screen, oldest first.
    pub async fn visible(&self) -> Vec<ToastNotification> {
        self.inner.lock().await.toasts.iter().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.toasts.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn contains(&self, id: ToastId) -> bool {
        self.inner
            .lock()
            .await
            .toasts
            .iter()
            .any(|toast| toast.id == id)
    }

    pub async fn next_deadline(&self) -> Option<Instant> {
        self.inner
            .lock()
            .await
            .toasts
            .iter()
            .map(ToastNotification::expires_at)
            .min()
    }

    /// Resolves once `id` is no longer queued, whatever removed it.
    pub async fn wait_removed(&self, id: ToastId) {
        let mut rx = self.events.subscribe();
        if !self.contains(id).await {
            return;
        }
        loop {
            match rx.recv().await {
                Ok(ToastEvent::Removed { id: removed, .. }) if removed == id => return,
                Ok(_) => {}
                Err(RecvError::Lagged(_)) => {
                    if !self.contains(id).await {
                        return;
                    }
                }
                Err(RecvError::Closed) => return,
            }
        }
    }

    /// Expires toasts as their deadlines pass. Never returns; run it on its
    /// own task.
    pub async fn run_expiry(&self) {
        loop {
            match self.next_deadline().await {
                Some(deadline) => {
                    tokio::select! {
                        _ = sleep_until(deadline) => {
                            self.expire(Instant::now()).await;
                        }
                        _ = self.wake.notified() => {}
                    }
                }
                None => self.wake.notified().await,
            }
        }
    }

    pub fn spawn_expiry(&self) -> JoinHandle<()> {
        let queue = self.clone();
        tokio::spawn(async move { queue.run_expiry().await })
    }
}

#[cfg(test)]
#[path = "tests/toast_tests.rs"]
mod tests;
