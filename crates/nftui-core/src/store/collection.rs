// ── Generic reactive entity collection ──
//
// Holds one entity type as an immutable snapshot that is replaced
// wholesale. Subscribers are notified through a `watch` channel.

use std::sync::Arc;

use tokio::sync::watch;

/// A reactive collection for a single entity type.
///
/// Every `replace` bumps a version counter and publishes a new snapshot.
/// Readers only ever see a complete snapshot.
pub(crate) struct EntityCollection<T: Send + Sync + 'static> {
    /// Version counter, bumped on every replacement.
    version: watch::Sender<u64>,

    snapshot: watch::Sender<Arc<Vec<Arc<T>>>>,
}

impl<T: Send + Sync + 'static> EntityCollection<T> {
    pub(crate) fn new() -> Self {
        let (version, _) = watch::channel(0u64);
        let (snapshot, _) = watch::channel(Arc::new(Vec::new()));
        Self { version, snapshot }
    }

    /// Replace the whole collection with `items`.
    pub(crate) fn replace(&self, items: Vec<T>) {
        let values: Vec<Arc<T>> = items.into_iter().map(Arc::new).collect();
        // `send_modify` updates unconditionally, even with zero receivers.
        self.snapshot.send_modify(|snap| *snap = Arc::new(values));
        self.version.send_modify(|v| *v += 1);
    }

    /// Get the current snapshot (cheap `Arc` clone).
    pub(crate) fn snapshot(&self) -> Arc<Vec<Arc<T>>> {
        self.snapshot.borrow().clone()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<Arc<Vec<Arc<T>>>> {
        self.snapshot.subscribe()
    }

    /// First entity matching `pred` in the current snapshot.
    pub(crate) fn find(&self, pred: impl Fn(&T) -> bool) -> Option<Arc<T>> {
        self.snapshot
            .borrow()
            .iter()
            .find(|item| pred(item))
            .map(Arc::clone)
    }

    pub(crate) fn len(&self) -> usize {
        self.snapshot.borrow().len()
    }

    pub(crate) fn version(&self) -> u64 {
        *self.version.borrow()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn starts_empty() {
        let col: EntityCollection<String> = EntityCollection::new();
        assert!(col.snapshot().is_empty());
        assert_eq!(col.version(), 0);
    }

    #[test]
    fn replace_swaps_whole_snapshot() {
        let col: EntityCollection<String> = EntityCollection::new();
        col.replace(vec!["a".into(), "b".into()]);
        col.replace(vec!["c".into()]);

        let snap = col.snapshot();
        assert_eq!(snap.len(), 1);
        assert_eq!(*snap[0], "c");
        assert_eq!(col.version(), 2);
    }

    #[test]
    fn old_snapshots_are_unaffected_by_replace() {
        let col: EntityCollection<String> = EntityCollection::new();
        col.replace(vec!["a".into()]);
        let before = col.snapshot();

        col.replace(Vec::new());
        assert_eq!(before.len(), 1);
        assert_eq!(col.len(), 0);
    }

    #[test]
    fn find_searches_current_snapshot() {
        let col: EntityCollection<String> = EntityCollection::new();
        col.replace(vec!["alpha".into(), "beta".into()]);

        assert_eq!(*col.find(|s| s.starts_with('b')).unwrap(), "beta");
        assert!(col.find(|s| s.is_empty()).is_none());
    }

    #[tokio::test]
    async fn subscribers_see_replacement() {
        let col: EntityCollection<u16> = EntityCollection::new();
        let mut rx = col.subscribe();

        col.replace(vec![80, 443]);
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().len(), 2);
    }
}
