// ── Central reactive data store ──
//
// Authoritative client-side copies of quotas, allowed ports and
// forwarding rules, plus the service-supplied scalars and the transient
// loading/error flags. Mutations are broadcast via `watch` channels.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;

use super::collection::EntityCollection;
use super::refresh::LoadFlag;
use crate::model::{AllowedPort, ForwardingRule, Quota, QuotaId, RuleId};
use crate::stream::EntityStream;
use crate::view::{self, SortedView};

/// Central reactive store for the service's entities.
///
/// Stores are empty until the first successful load; each later load
/// replaces them wholesale. Only the controller's actions write here.
pub struct DataStore {
    pub(crate) quotas: EntityCollection<Quota>,
    pub(crate) allowed_ports: EntityCollection<AllowedPort>,
    pub(crate) forwarding_rules: EntityCollection<ForwardingRule>,
    pub(crate) read_only: watch::Sender<bool>,
    pub(crate) refresh_interval: watch::Sender<u64>,
    pub(crate) loading: LoadFlag,
    pub(crate) forwarding_loading: LoadFlag,
    pub(crate) error: watch::Sender<Option<String>>,
    pub(crate) last_quota_refresh: watch::Sender<Option<DateTime<Utc>>>,
    pub(crate) last_forwarding_refresh: watch::Sender<Option<DateTime<Utc>>>,
}

impl DataStore {
    /// Create an empty store. `refresh_interval_secs` is used until the
    /// service reports its own value.
    pub fn new(refresh_interval_secs: u64) -> Self {
        let (read_only, _) = watch::channel(false);
        let (refresh_interval, _) = watch::channel(refresh_interval_secs);
        let (error, _) = watch::channel(None);
        let (last_quota_refresh, _) = watch::channel(None);
        let (last_forwarding_refresh, _) = watch::channel(None);

        Self {
            quotas: EntityCollection::new(),
            allowed_ports: EntityCollection::new(),
            forwarding_rules: EntityCollection::new(),
            read_only,
            refresh_interval,
            loading: LoadFlag::new(),
            forwarding_loading: LoadFlag::new(),
            error,
            last_quota_refresh,
            last_forwarding_refresh,
        }
    }

    // ── Snapshot accessors ───────────────────────────────────────────

    pub fn quotas_snapshot(&self) -> Arc<Vec<Arc<Quota>>> {
        self.quotas.snapshot()
    }

    pub fn allowed_ports_snapshot(&self) -> Arc<Vec<Arc<AllowedPort>>> {
        self.allowed_ports.snapshot()
    }

    pub fn forwarding_rules_snapshot(&self) -> Arc<Vec<Arc<ForwardingRule>>> {
        self.forwarding_rules.snapshot()
    }

    // ── Derived views ────────────────────────────────────────────────

    /// Quotas with exceeded entries first, then by descending usage.
    pub fn sorted_quotas(&self) -> Vec<Arc<Quota>> {
        view::sort_quotas(&self.quotas.snapshot())
    }

    /// Forwarding rules with enabled entries first, then by source port.
    pub fn sorted_forwarding_rules(&self) -> Vec<Arc<ForwardingRule>> {
        view::sort_forwarding_rules(&self.forwarding_rules.snapshot())
    }

    pub fn quota_view(&self) -> SortedView<Quota> {
        SortedView::new(self.quotas.subscribe(), view::sort_quotas)
    }

    pub fn forwarding_rule_view(&self) -> SortedView<ForwardingRule> {
        SortedView::new(self.forwarding_rules.subscribe(), view::sort_forwarding_rules)
    }

    // ── Single-entity lookups ────────────────────────────────────────

    pub fn quota_by_id(&self, id: &QuotaId) -> Option<Arc<Quota>> {
        self.quotas.find(|q| &q.id == id)
    }

    pub fn allowed_port(&self, port: u16) -> Option<Arc<AllowedPort>> {
        self.allowed_ports.find(|p| p.port == port)
    }

    pub fn forwarding_rule_by_id(&self, id: &RuleId) -> Option<Arc<ForwardingRule>> {
        self.forwarding_rules.find(|r| &r.id == id)
    }

    // ── Count / version accessors ────────────────────────────────────

    pub fn quota_count(&self) -> usize {
        self.quotas.len()
    }

    pub fn forwarding_rule_count(&self) -> usize {
        self.forwarding_rules.len()
    }

    /// Number of quota snapshots applied so far.
    pub fn quotas_version(&self) -> u64 {
        self.quotas.version()
    }

    /// Number of forwarding-rule snapshots applied so far.
    pub fn forwarding_rules_version(&self) -> u64 {
        self.forwarding_rules.version()
    }

    // ── Scalars and flags ────────────────────────────────────────────

    pub fn read_only(&self) -> bool {
        *self.read_only.borrow()
    }

    /// Seconds between background refreshes, as last reported by the service.
    pub fn refresh_interval(&self) -> u64 {
        *self.refresh_interval.borrow()
    }

    /// `true` while any quota load is in flight.
    pub fn is_loading(&self) -> bool {
        self.loading.get()
    }

    pub fn is_forwarding_loading(&self) -> bool {
        self.forwarding_loading.get()
    }

    /// Reason the most recent quota load failed, if it did.
    pub fn error(&self) -> Option<String> {
        self.error.borrow().clone()
    }

    pub fn last_quota_refresh(&self) -> Option<DateTime<Utc>> {
        *self.last_quota_refresh.borrow()
    }

    pub fn last_forwarding_refresh(&self) -> Option<DateTime<Utc>> {
        *self.last_forwarding_refresh.borrow()
    }

    // ── Subscriptions ────────────────────────────────────────────────

    pub fn subscribe_quotas(&self) -> EntityStream<Quota> {
        EntityStream::new(self.quotas.subscribe())
    }

    pub fn subscribe_allowed_ports(&self) -> EntityStream<AllowedPort> {
        EntityStream::new(self.allowed_ports.subscribe())
    }

    pub fn subscribe_forwarding_rules(&self) -> EntityStream<ForwardingRule> {
        EntityStream::new(self.forwarding_rules.subscribe())
    }

    pub fn subscribe_read_only(&self) -> watch::Receiver<bool> {
        self.read_only.subscribe()
    }

    pub fn subscribe_refresh_interval(&self) -> watch::Receiver<u64> {
        self.refresh_interval.subscribe()
    }

    pub fn subscribe_loading(&self) -> watch::Receiver<bool> {
        self.loading.subscribe()
    }

    pub fn subscribe_forwarding_loading(&self) -> watch::Receiver<bool> {
        self.forwarding_loading.subscribe()
    }

    pub fn subscribe_error(&self) -> watch::Receiver<Option<String>> {
        self.error.subscribe()
    }
}
