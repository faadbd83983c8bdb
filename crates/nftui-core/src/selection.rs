// ── Selection set ──
//
// Quota ids marked for batch operations. Membership only, no ordering.

use std::collections::BTreeSet;
use std::sync::Arc;

use tokio::sync::watch;

use crate::model::QuotaId;

/// The set of quota ids currently selected.
///
/// Every change is published as a fresh `Arc` snapshot, so `has_selection`
/// and `selected_count` are always read from a consistent membership.
pub struct SelectionSet {
    ids: watch::Sender<Arc<BTreeSet<QuotaId>>>,
}

impl Default for SelectionSet {
    fn default() -> Self {
        Self::new()
    }
}

impl SelectionSet {
    pub fn new() -> Self {
        let (ids, _) = watch::channel(Arc::new(BTreeSet::new()));
        Self { ids }
    }

    /// Flip membership of `id`. Returns whether it is now selected.
    pub fn toggle(&self, id: &QuotaId) -> bool {
        let mut selected = false;
        self.ids.send_modify(|set| {
            let set = Arc::make_mut(set);
            selected = if set.remove(id) {
                false
            } else {
                set.insert(id.clone());
                true
            };
        });
        selected
    }

    pub fn clear(&self) {
        self.ids.send_if_modified(|set| {
            if set.is_empty() {
                return false;
            }
            *set = Arc::new(BTreeSet::new());
            true
        });
    }

    /// Replace the selection with exactly `ids`.
    pub fn select_all<I>(&self, ids: I)
    where
        I: IntoIterator<Item = QuotaId>,
    {
        let next: BTreeSet<QuotaId> = ids.into_iter().collect();
        self.ids.send_replace(Arc::new(next));
    }

    /// Drop every selected id for which `keep` returns `false`.
    pub fn retain(&self, mut keep: impl FnMut(&QuotaId) -> bool) {
        self.ids.send_if_modified(|set| {
            if set.iter().all(&mut keep) {
                return false;
            }
            Arc::make_mut(set).retain(&mut keep);
            true
        });
    }

    pub fn contains(&self, id: &QuotaId) -> bool {
        self.ids.borrow().contains(id)
    }

    pub fn has_selection(&self) -> bool {
        !self.ids.borrow().is_empty()
    }

    pub fn selected_count(&self) -> usize {
        self.ids.borrow().len()
    }

    /// Current membership, sorted by id.
    pub fn snapshot(&self) -> Arc<BTreeSet<QuotaId>> {
        self.ids.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<BTreeSet<QuotaId>>> {
        self.ids.subscribe()
    }
}
