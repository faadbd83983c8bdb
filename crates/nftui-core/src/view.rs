// ── Derived views ──
//
// Pure projections of store snapshots. Each view is computed from one
// snapshot taken in a single read, so it can never mix two generations.

use std::cmp::Ordering;
use std::sync::Arc;

use tokio::sync::watch;

use crate::model::{ForwardingRule, Quota};

/// Exceeded quotas first, then descending `usage_percent`.
///
/// Stable: quotas that compare equal keep their snapshot order.
pub fn sort_quotas(quotas: &[Arc<Quota>]) -> Vec<Arc<Quota>> {
    let mut sorted = quotas.to_vec();
    sorted.sort_by(|a, b| compare_quotas(a, b));
    sorted
}

fn compare_quotas(a: &Quota, b: &Quota) -> Ordering {
    b.status
        .is_exceeded()
        .cmp(&a.status.is_exceeded())
        .then_with(|| b.usage_percent.total_cmp(&a.usage_percent))
}

/// Enabled rules first, then ascending `src_port`.
pub fn sort_forwarding_rules(rules: &[Arc<ForwardingRule>]) -> Vec<Arc<ForwardingRule>> {
    let mut sorted = rules.to_vec();
    sorted.sort_by(|a, b| {
        b.enabled
            .cmp(&a.enabled)
            .then_with(|| a.src_port.cmp(&b.src_port))
    });
    sorted
}

/// A live, sorted projection of one collection.
///
/// Recomputes on read from the latest snapshot; never caches a result
/// that could lag behind its source.
pub struct SortedView<T: Send + Sync + 'static> {
    receiver: watch::Receiver<Arc<Vec<Arc<T>>>>,
    sort: fn(&[Arc<T>]) -> Vec<Arc<T>>,
}

impl<T: Send + Sync + 'static> SortedView<T> {
    pub(crate) fn new(
        receiver: watch::Receiver<Arc<Vec<Arc<T>>>>,
        sort: fn(&[Arc<T>]) -> Vec<Arc<T>>,
    ) -> Self {
        Self { receiver, sort }
    }

    /// The view of the latest snapshot.
    pub fn get(&self) -> Vec<Arc<T>> {
        let snap = self.receiver.borrow().clone();
        (self.sort)(&snap)
    }

    /// Wait for the source to change and return the new view.
    /// `None` once the store is dropped.
    pub async fn changed(&mut self) -> Option<Vec<Arc<T>>> {
        self.receiver.changed().await.ok()?;
        let snap = self.receiver.borrow_and_update().clone();
        Some((self.sort)(&snap))
    }
}
