// ── Notification queue ──
//
// Transient user-facing messages. Each timed notification owns one
// expiry task; `dismiss` cancels that task before removing the entry,
// so a manual dismissal never races the timer.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use dashmap::DashMap;
use serde::Serialize;
use strum::Display;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// Process-local notification id. Strictly increasing per enqueue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct NotificationId(u64);

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

impl Severity {
    /// How long a notification of this severity stays visible by default.
    pub fn default_duration(self) -> Duration {
        match self {
            Self::Error => Duration::from_millis(5000),
            Self::Info | Self::Success | Self::Warning => Duration::from_millis(3000),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub id: NotificationId,
    pub message: String,
    pub severity: Severity,
}

/// Queue of visible notifications.
///
/// Cheaply cloneable; clones share the same list. Enqueueing a timed
/// notification spawns a tokio task, so it must run inside a runtime.
#[derive(Clone)]
pub struct NotificationQueue {
    inner: Arc<QueueInner>,
}

struct QueueInner {
    next_id: AtomicU64,
    list: watch::Sender<Arc<Vec<Notification>>>,
    expiries: DashMap<NotificationId, CancellationToken>,
}

impl Default for NotificationQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationQueue {
    pub fn new() -> Self {
        let (list, _) = watch::channel(Arc::new(Vec::new()));
        Self {
            inner: Arc::new(QueueInner {
                next_id: AtomicU64::new(1),
                list,
                expiries: DashMap::new(),
            }),
        }
    }

    /// Append a notification. A zero `duration` keeps it until dismissed.
    pub fn enqueue(
        &self,
        message: impl Into<String>,
        severity: Severity,
        duration: Duration,
    ) -> NotificationId {
        let id = NotificationId(self.inner.next_id.fetch_add(1, Ordering::SeqCst));
        let notification = Notification {
            id,
            message: message.into(),
            severity,
        };
        trace!(%id, %severity, message = %notification.message, "notification enqueued");

        self.inner.list.send_modify(|list| Arc::make_mut(list).push(notification));

        if !duration.is_zero() {
            let token = CancellationToken::new();
            self.inner.expiries.insert(id, token.clone());
            let queue = Arc::downgrade(&self.inner);
            tokio::spawn(expire_after(queue, id, duration, token));
        }

        id
    }

    pub fn info(&self, message: impl Into<String>) -> NotificationId {
        self.enqueue(message, Severity::Info, Severity::Info.default_duration())
    }

    pub fn success(&self, message: impl Into<String>) -> NotificationId {
        self.enqueue(message, Severity::Success, Severity::Success.default_duration())
    }

    pub fn warning(&self, message: impl Into<String>) -> NotificationId {
        self.enqueue(message, Severity::Warning, Severity::Warning.default_duration())
    }

    pub fn error(&self, message: impl Into<String>) -> NotificationId {
        self.enqueue(message, Severity::Error, Severity::Error.default_duration())
    }

    /// Remove a notification now. Unknown or already-expired ids are ignored.
    pub fn dismiss(&self, id: NotificationId) {
        if let Some((_, token)) = self.inner.expiries.remove(&id) {
            token.cancel();
        }
        self.inner.remove(id);
    }

    /// Visible notifications in enqueue order.
    pub fn snapshot(&self) -> Arc<Vec<Notification>> {
        self.inner.list.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<Vec<Notification>>> {
        self.inner.list.subscribe()
    }
}

impl QueueInner {
    fn remove(&self, id: NotificationId) {
        self.list.send_if_modified(|list| {
            if !list.iter().any(|n| n.id == id) {
                return false;
            }
            Arc::make_mut(list).retain(|n| n.id != id);
            true
        });
    }
}

async fn expire_after(
    queue: Weak<QueueInner>,
    id: NotificationId,
    duration: Duration,
    token: CancellationToken,
) {
    tokio::select! {
        biased;
        () = token.cancelled() => {}
        () = tokio::time::sleep(duration) => {
            if let Some(queue) = queue.upgrade() {
                queue.expiries.remove(&id);
                queue.remove(id);
                trace!(%id, "notification expired");
            }
        }
    }
}
