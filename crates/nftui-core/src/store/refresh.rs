// ── Snapshot application and load bookkeeping ──
//
// Applies fetched snapshots to the DataStore, tracks in-flight loads
// for the `loading` flags, and orders overlapping loads so that an
// older response can never overwrite a newer one.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use chrono::Utc;
use tokio::sync::{Mutex, watch};

use super::DataStore;
use crate::api::{ForwardingSnapshot, QuotaSnapshot};

impl DataStore {
    /// Replace quotas, allowed ports and the service-supplied scalars.
    pub(crate) fn apply_quota_snapshot(&self, snap: QuotaSnapshot) {
        self.quotas.replace(snap.quotas);
        self.allowed_ports.replace(snap.allowed_ports);
        self.set_read_only(snap.read_only);
        // Only notify on an actual change; the polling task restarts its
        // timer on every notification.
        if let Some(interval) = snap.refresh_interval {
            self.refresh_interval.send_if_modified(|current| {
                let changed = *current != interval;
                *current = interval;
                changed
            });
        }
        self.last_quota_refresh.send_replace(Some(Utc::now()));
    }

    /// Replace the forwarding rules.
    pub(crate) fn apply_forwarding_snapshot(&self, snap: ForwardingSnapshot) {
        self.forwarding_rules.replace(snap.rules);
        self.set_read_only(snap.read_only);
        self.last_forwarding_refresh.send_replace(Some(Utc::now()));
    }

    fn set_read_only(&self, read_only: bool) {
        self.read_only.send_if_modified(|current| {
            let changed = *current != read_only;
            *current = read_only;
            changed
        });
    }

    pub(crate) fn set_error(&self, error: Option<String>) {
        self.error.send_if_modified(|current| {
            let changed = *current != error;
            *current = error;
            changed
        });
    }
}

// ── In-flight tracking ───────────────────────────────────────────────

/// Boolean flag that stays `true` while at least one load is running.
pub(crate) struct LoadFlag {
    in_flight: AtomicUsize,
    flag: watch::Sender<bool>,
}

impl LoadFlag {
    pub(crate) fn new() -> Self {
        let (flag, _) = watch::channel(false);
        Self {
            in_flight: AtomicUsize::new(0),
            flag,
        }
    }

    /// Mark a load as started. The flag drops back when every guard is gone.
    pub(crate) fn begin(&self) -> LoadGuard<'_> {
        // Counter updates happen under the channel's lock so the published
        // flag always matches the count.
        self.flag.send_if_modified(|flag| {
            self.in_flight.fetch_add(1, Ordering::SeqCst);
            let was = *flag;
            *flag = true;
            !was
        });
        LoadGuard { owner: self }
    }

    pub(crate) fn get(&self) -> bool {
        *self.flag.borrow()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<bool> {
        self.flag.subscribe()
    }

    fn finish(&self) {
        self.flag.send_if_modified(|flag| {
            let remaining = self.in_flight.fetch_sub(1, Ordering::SeqCst).saturating_sub(1);
            let now = remaining > 0;
            let changed = *flag != now;
            *flag = now;
            changed
        });
    }
}

/// Decrements the in-flight count on drop.
pub(crate) struct LoadGuard<'a> {
    owner: &'a LoadFlag,
}

impl Drop for LoadGuard<'_> {
    fn drop(&mut self) {
        self.owner.finish();
    }
}

// ── Ordering of overlapping loads ────────────────────────────────────

/// Issues increasing sequence numbers to loads and remembers the newest
/// one that has settled. A response from an older load is discarded.
pub(crate) struct LoadSequence {
    issued: AtomicU64,
    settled: Mutex<u64>,
}

impl LoadSequence {
    pub(crate) fn new() -> Self {
        Self {
            issued: AtomicU64::new(0),
            settled: Mutex::new(0),
        }
    }

    pub(crate) fn next(&self) -> u64 {
        self.issued.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Run `apply` if `seq` is newer than every load settled so far.
    ///
    /// Returns `false` when the response was stale and dropped.
    pub(crate) async fn settle(&self, seq: u64, apply: impl FnOnce()) -> bool {
        let mut settled = self.settled.lock().await;
        if seq <= *settled {
            return false;
        }
        *settled = seq;
        apply();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshots_record_refresh_time_without_subscribers() {
        let store = DataStore::new(20);
        assert!(store.last_quota_refresh().is_none());

        store.apply_quota_snapshot(QuotaSnapshot::default());
        store.apply_forwarding_snapshot(ForwardingSnapshot::default());

        assert!(store.last_quota_refresh().is_some());
        assert!(store.last_forwarding_refresh().is_some());
    }

    #[test]
    fn missing_interval_keeps_current_value() {
        let store = DataStore::new(20);
        store.apply_quota_snapshot(QuotaSnapshot {
            refresh_interval: Some(7),
            ..QuotaSnapshot::default()
        });
        store.apply_quota_snapshot(QuotaSnapshot::default());
        assert_eq!(store.refresh_interval(), 7);
    }

    #[test]
    fn load_flag_tracks_overlapping_loads() {
        let flag = LoadFlag::new();
        assert!(!flag.get());

        let first = flag.begin();
        let second = flag.begin();
        assert!(flag.get());

        drop(first);
        assert!(flag.get(), "still loading while one load is in flight");

        drop(second);
        assert!(!flag.get());
    }

    #[tokio::test]
    async fn stale_sequence_is_discarded() {
        let seq = LoadSequence::new();
        let older = seq.next();
        let newer = seq.next();

        let mut applied = Vec::new();
        assert!(seq.settle(newer, || applied.push(newer)).await);
        assert!(!seq.settle(older, || applied.push(older)).await);
        assert_eq!(applied, vec![newer]);
    }

    #[tokio::test]
    async fn in_order_sequences_all_apply() {
        let seq = LoadSequence::new();
        let a = seq.next();
        let b = seq.next();
        assert!(seq.settle(a, || {}).await);
        assert!(seq.settle(b, || {}).await);
    }
}
