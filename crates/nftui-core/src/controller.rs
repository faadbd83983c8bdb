// ── Controller ──
//
// Application-state object owned by the composition root. Holds the
// stores, the selection, the notification queue and the API boundary,
// and exposes the synchronization actions as the only way to mutate
// state. Every write follows invoke -> notify -> reload; a failed write
// leaves the stores untouched, is notified, and is returned to the caller.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use nftui_api::{BasicAuth, NftClient, TlsMode, TransportConfig};

use crate::api::QuotaApi;
use crate::config::{ControllerConfig, TlsVerification};
use crate::error::CoreError;
use crate::model::{PortHandle, QuotaId, RuleId};
use crate::notify::NotificationQueue;
use crate::requests::{CreateForwardingRequest, UpdateForwardingRequest};
use crate::selection::SelectionSet;
use crate::store::{DataStore, LoadSequence};

// ── Controller ───────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<ControllerInner>`; clones share all state.
#[derive(Clone)]
pub struct Controller {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    config: ControllerConfig,
    api: Arc<dyn QuotaApi>,
    store: Arc<DataStore>,
    selection: SelectionSet,
    notifications: NotificationQueue,
    /// Editing gate: `true` while a modal edit is open.
    editing: watch::Sender<bool>,
    quota_loads: LoadSequence,
    rule_loads: LoadSequence,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

/// Which collection a successful write reloads.
#[derive(Debug, Clone, Copy)]
enum Reload {
    Quotas,
    ForwardingRules,
}

/// Messages and reconciliation target for one write.
struct Action {
    success: String,
    failure: &'static str,
    reload: Reload,
}

impl Action {
    fn new(success: impl Into<String>, failure: &'static str, reload: Reload) -> Self {
        Self {
            success: success.into(),
            failure,
            reload,
        }
    }
}

impl Controller {
    /// Create a controller talking HTTP to `config.url`. Does not load
    /// anything; call [`refresh()`](Self::refresh) and
    /// [`start()`](Self::start) for that.
    pub fn new(config: ControllerConfig) -> Result<Self, CoreError> {
        let transport = TransportConfig {
            tls: tls_to_transport(&config.tls),
            timeout: config.timeout,
        };
        let credentials = config.auth.as_ref().map(|auth| BasicAuth {
            username: auth.username.clone(),
            password: auth.password.clone(),
        });
        let client = NftClient::new(config.url.clone(), credentials, &transport)?;
        Ok(Self::with_api(config, Arc::new(client)))
    }

    /// Create a controller over any implementation of the API boundary.
    pub fn with_api(config: ControllerConfig, api: Arc<dyn QuotaApi>) -> Self {
        let store = Arc::new(DataStore::new(config.refresh_interval_secs));
        let (editing, _) = watch::channel(false);

        Self {
            inner: Arc::new(ControllerInner {
                config,
                api,
                store,
                selection: SelectionSet::new(),
                notifications: NotificationQueue::new(),
                editing,
                quota_loads: LoadSequence::new(),
                rule_loads: LoadSequence::new(),
                cancel: CancellationToken::new(),
                task_handles: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &Arc<DataStore> {
        &self.inner.store
    }

    pub fn selection(&self) -> &SelectionSet {
        &self.inner.selection
    }

    pub fn notifications(&self) -> &NotificationQueue {
        &self.inner.notifications
    }

    // ── Loads ────────────────────────────────────────────────────

    /// Reload quotas and forwarding rules. Never blocked by the editing gate.
    pub async fn refresh(&self) {
        tokio::join!(self.load_quotas(), self.load_forwarding_rules());
    }

    /// Fetch quotas, allowed ports and the service scalars.
    ///
    /// Failures are recorded in the store's `error` and never returned.
    /// The selection is pruned to ids present in the applied snapshot.
    pub async fn load_quotas(&self) {
        let inner = &self.inner;
        let seq = inner.quota_loads.next();
        let _loading = inner.store.loading.begin();
        inner.store.set_error(None);

        let result = inner.api.fetch_quotas().await;

        let applied = inner
            .quota_loads
            .settle(seq, || match result {
                Ok(snap) => {
                    debug!(seq, quotas = snap.quotas.len(), "applying quota snapshot");
                    let present: HashSet<QuotaId> =
                        snap.quotas.iter().map(|q| q.id.clone()).collect();
                    inner.store.apply_quota_snapshot(snap);
                    inner.selection.retain(|id| present.contains(id));
                }
                Err(e) => {
                    warn!(seq, error = %e, "failed to load quotas");
                    inner.store.set_error(Some(e.to_string()));
                }
            })
            .await;

        if !applied {
            debug!(seq, "discarding stale quota response");
        }
    }

    /// Fetch forwarding rules. Failures are notified and never returned.
    pub async fn load_forwarding_rules(&self) {
        let inner = &self.inner;
        let seq = inner.rule_loads.next();
        let _loading = inner.store.forwarding_loading.begin();

        let result = inner.api.fetch_forwarding_rules().await;

        let applied = inner
            .rule_loads
            .settle(seq, || match result {
                Ok(snap) => {
                    debug!(seq, rules = snap.rules.len(), "applying forwarding snapshot");
                    inner.store.apply_forwarding_snapshot(snap);
                }
                Err(e) => {
                    warn!(seq, error = %e, "failed to load forwarding rules");
                    inner
                        .notifications
                        .error(format!("Failed to load forwarding rules: {e}"));
                }
            })
            .await;

        if !applied {
            debug!(seq, "discarding stale forwarding response");
        }
    }

    // ── Allowed ports ────────────────────────────────────────────

    pub async fn add_allowed_port(&self, port: u16) -> Result<(), CoreError> {
        let call = async {
            validate_port("Port", port)?;
            self.inner.api.add_port(port).await
        };
        self.perform(
            Action::new("Port added successfully", "Failed to add port", Reload::Quotas),
            call,
        )
        .await
    }

    pub async fn remove_allowed_port(&self, handle: PortHandle) -> Result<(), CoreError> {
        let call = self.inner.api.delete_port(handle);
        self.perform(
            Action::new("Port deleted successfully", "Failed to delete port", Reload::Quotas),
            call,
        )
        .await
    }

    // ── Quotas ───────────────────────────────────────────────────

    pub async fn reset_quota(&self, id: &QuotaId) -> Result<(), CoreError> {
        let call = self.inner.api.reset_quota(id);
        self.perform(
            Action::new("Quota reset", "Failed to reset quota", Reload::Quotas),
            call,
        )
        .await
    }

    /// Reset every selected quota in one batch call, then clear the selection.
    pub async fn reset_selected(&self) -> Result<(), CoreError> {
        let ids: Vec<QuotaId> = self.inner.selection.snapshot().iter().cloned().collect();
        let count = ids.len();
        let call = async {
            if ids.is_empty() {
                return Err(CoreError::validation("No quotas selected"));
            }
            self.inner.api.batch_reset_quotas(&ids).await?;
            self.inner.selection.clear();
            Ok(())
        };
        self.perform(
            Action::new(
                format!("Reset {count} quotas"),
                "Failed to reset quotas",
                Reload::Quotas,
            ),
            call,
        )
        .await
    }

    pub async fn modify_quota(&self, id: &QuotaId, bytes: u64) -> Result<(), CoreError> {
        let call = async {
            validate_quota_bytes(bytes)?;
            self.inner.api.modify_quota(id, bytes).await
        };
        self.perform(
            Action::new("Quota updated", "Failed to update quota", Reload::Quotas),
            call,
        )
        .await
    }

    pub async fn add_quota(&self, port: u16, bytes: u64, comment: &str) -> Result<(), CoreError> {
        let call = async {
            validate_port("Port", port)?;
            validate_quota_bytes(bytes)?;
            self.inner.api.add_quota(port, bytes, comment).await
        };
        self.perform(
            Action::new("Quota added", "Failed to add quota", Reload::Quotas),
            call,
        )
        .await
    }

    pub async fn delete_quota(&self, id: &QuotaId) -> Result<(), CoreError> {
        let call = self.inner.api.delete_quota(id);
        self.perform(
            Action::new("Quota deleted", "Failed to delete quota", Reload::Quotas),
            call,
        )
        .await
    }

    // ── Forwarding rules ─────────────────────────────────────────

    pub async fn add_forwarding_rule(&self, req: &CreateForwardingRequest) -> Result<(), CoreError> {
        let call = async {
            validate_port("Source port", req.src_port)?;
            validate_port("Destination port", req.dst_port)?;
            self.inner.api.add_forwarding_rule(req).await
        };
        self.perform(
            Action::new(
                "Forwarding rule added",
                "Failed to add forwarding rule",
                Reload::ForwardingRules,
            ),
            call,
        )
        .await
    }

    pub async fn edit_forwarding_rule(
        &self,
        id: &RuleId,
        req: &UpdateForwardingRequest,
    ) -> Result<(), CoreError> {
        let call = async {
            validate_port("Destination port", req.dst_port)?;
            self.inner.api.edit_forwarding_rule(id, req).await
        };
        self.perform(
            Action::new(
                "Forwarding rule updated",
                "Failed to update forwarding rule",
                Reload::ForwardingRules,
            ),
            call,
        )
        .await
    }

    pub async fn remove_forwarding_rule(&self, id: &RuleId) -> Result<(), CoreError> {
        let call = self.inner.api.delete_forwarding_rule(id);
        self.perform(
            Action::new(
                "Forwarding rule deleted",
                "Failed to delete forwarding rule",
                Reload::ForwardingRules,
            ),
            call,
        )
        .await
    }

    pub async fn enable_forwarding_rule(&self, id: &RuleId) -> Result<(), CoreError> {
        let call = self.inner.api.enable_forwarding_rule(id);
        self.perform(
            Action::new(
                "Forwarding rule enabled",
                "Failed to enable forwarding rule",
                Reload::ForwardingRules,
            ),
            call,
        )
        .await
    }

    pub async fn disable_forwarding_rule(&self, id: &RuleId) -> Result<(), CoreError> {
        let call = self.inner.api.disable_forwarding_rule(id);
        self.perform(
            Action::new(
                "Forwarding rule disabled",
                "Failed to disable forwarding rule",
                Reload::ForwardingRules,
            ),
            call,
        )
        .await
    }

    /// Run one write: refuse in read-only mode, await the boundary call,
    /// then notify and reconcile (success) or notify and return (failure).
    ///
    /// `call` is not polled when the store is read-only.
    async fn perform<F>(&self, action: Action, call: F) -> Result<(), CoreError>
    where
        F: Future<Output = Result<(), CoreError>>,
    {
        let result = if self.inner.store.read_only() {
            Err(CoreError::ReadOnly)
        } else {
            call.await
        };

        match result {
            Ok(()) => {
                info!(outcome = %action.success, "action succeeded");
                self.inner.notifications.success(action.success);
                match action.reload {
                    Reload::Quotas => self.load_quotas().await,
                    Reload::ForwardingRules => self.load_forwarding_rules().await,
                }
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "{}", action.failure);
                self.inner
                    .notifications
                    .error(format!("{}: {e}", action.failure));
                Err(e)
            }
        }
    }

    // ── Editing gate ─────────────────────────────────────────────

    /// Suspend background refresh while an edit is in progress.
    pub fn pause_refresh(&self) {
        self.inner.editing.send_replace(true);
        debug!("background refresh paused");
    }

    pub fn resume_refresh(&self) {
        self.inner.editing.send_replace(false);
        debug!("background refresh resumed");
    }

    pub fn is_editing(&self) -> bool {
        *self.inner.editing.borrow()
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Spawn the background refresh task. Calling it again is a no-op.
    pub async fn start(&self) {
        let mut handles = self.inner.task_handles.lock().await;
        if !handles.is_empty() {
            return;
        }
        let ctrl = self.clone();
        let cancel = self.inner.cancel.child_token();
        handles.push(tokio::spawn(refresh_task(ctrl, cancel)));
        info!(
            interval_secs = self.inner.store.refresh_interval(),
            "background refresh started"
        );
    }

    /// Cancel background work and wait for it to finish.
    ///
    /// A controller that has been shut down cannot be started again.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();
        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            if let Err(e) = handle.await {
                warn!(error = %e, "background task ended abnormally");
            }
        }
        debug!("controller shut down");
    }

    /// One background tick: quotas, plus forwarding rules when configured.
    async fn poll_once(&self) {
        if self.inner.config.poll_forwarding {
            self.refresh().await;
        } else {
            self.load_quotas().await;
        }
    }
}

// ── Validation ───────────────────────────────────────────────────

fn validate_port(field: &str, port: u16) -> Result<(), CoreError> {
    if port == 0 {
        return Err(CoreError::validation(format!(
            "{field} must be between 1 and 65535"
        )));
    }
    Ok(())
}

fn validate_quota_bytes(bytes: u64) -> Result<(), CoreError> {
    if bytes == 0 {
        return Err(CoreError::validation("Quota limit must be positive"));
    }
    Ok(())
}

fn tls_to_transport(tls: &TlsVerification) -> TlsMode {
    match tls {
        TlsVerification::SystemDefaults => TlsMode::System,
        TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
        TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
    }
}

// ── Background tasks ─────────────────────────────────────────────

/// Deadline of the first tick, or `None` when polling is off: a zero
/// period, or one too large to schedule two ticks ahead.
fn first_tick(period: Duration) -> Option<Instant> {
    if period.is_zero() {
        return None;
    }
    Instant::now()
        .checked_add(period)
        .filter(|start| start.checked_add(period).is_some())
}

/// Periodic reload driven by the store's `refresh_interval`.
///
/// The timer restarts whenever the interval changes. An interval of 0
/// stops ticking until a non-zero value arrives. Ticks that land while
/// the editing gate is closed are skipped, not deferred.
async fn refresh_task(controller: Controller, cancel: CancellationToken) {
    let mut interval_rx = controller.inner.store.subscribe_refresh_interval();

    'outer: loop {
        let secs = *interval_rx.borrow_and_update();
        let period = Duration::from_secs(secs);

        let Some(start) = first_tick(period) else {
            if secs == 0 {
                debug!("refresh interval is 0, polling suspended");
            } else {
                warn!(interval_secs = secs, "refresh interval out of range, polling suspended");
            }
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                changed = interval_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
            }
        };

        let mut interval = tokio::time::interval_at(start, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break 'outer,
                changed = interval_rx.changed() => {
                    if changed.is_err() {
                        break 'outer;
                    }
                    debug!("refresh interval changed, restarting timer");
                    continue 'outer;
                }
                _ = interval.tick() => {
                    if controller.is_editing() {
                        debug!("edit in progress, skipping refresh");
                        continue;
                    }
                    controller.poll_once().await;
                }
            }
        }
    }

    debug!("refresh task stopped");
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::VecDeque;
    use std::net::Ipv4Addr;
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use url::Url;

    use super::*;
    use crate::api::{ForwardingSnapshot, QuotaSnapshot};
    use crate::model::{AllowedPort, ForwardingRule, Protocol, Quota, QuotaStatus};
    use crate::notify::Severity;

    // ── Scripted service ─────────────────────────────────────────

    type ScriptedFetch = (Duration, Result<QuotaSnapshot, CoreError>);

    /// In-memory service. Quota fetches pop `quota_script` first and fall
    /// back to `quotas`; writes are recorded and fail with `write_failure`.
    #[derive(Default)]
    struct FakeApi {
        quota_script: StdMutex<VecDeque<ScriptedFetch>>,
        quotas: StdMutex<QuotaSnapshot>,
        rules: StdMutex<ForwardingSnapshot>,
        rule_failure: StdMutex<Option<String>>,
        write_failure: StdMutex<Option<String>>,
        calls: StdMutex<Vec<String>>,
        quota_fetches: AtomicUsize,
        rule_fetches: AtomicUsize,
    }

    impl FakeApi {
        fn record(&self, call: String) -> Result<(), CoreError> {
            self.calls.lock().unwrap().push(call);
            match self.write_failure.lock().unwrap().clone() {
                Some(message) => Err(CoreError::Api {
                    message,
                    status: Some(409),
                }),
                None => Ok(()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn quota_fetches(&self) -> usize {
            self.quota_fetches.load(Ordering::SeqCst)
        }

        fn rule_fetches(&self) -> usize {
            self.rule_fetches.load(Ordering::SeqCst)
        }

        fn set_quotas(&self, snap: QuotaSnapshot) {
            *self.quotas.lock().unwrap() = snap;
        }

        fn script(&self, delay_ms: u64, result: Result<QuotaSnapshot, CoreError>) {
            self.quota_script
                .lock()
                .unwrap()
                .push_back((Duration::from_millis(delay_ms), result));
        }

        fn fail_writes(&self, message: &str) {
            *self.write_failure.lock().unwrap() = Some(message.into());
        }

        fn set_rule_enabled(&self, id: &RuleId, enabled: bool) {
            let mut rules = self.rules.lock().unwrap();
            for rule in &mut rules.rules {
                if &rule.id == id {
                    rule.enabled = enabled;
                }
            }
        }
    }

    #[async_trait]
    impl QuotaApi for FakeApi {
        async fn fetch_quotas(&self) -> Result<QuotaSnapshot, CoreError> {
            self.quota_fetches.fetch_add(1, Ordering::SeqCst);
            let scripted = self.quota_script.lock().unwrap().pop_front();
            if let Some((delay, result)) = scripted {
                tokio::time::sleep(delay).await;
                return result;
            }
            let snap = self.quotas.lock().unwrap().clone();
            Ok(snap)
        }

        async fn reset_quota(&self, id: &QuotaId) -> Result<(), CoreError> {
            self.record(format!("reset_quota {id}"))
        }

        async fn batch_reset_quotas(&self, ids: &[QuotaId]) -> Result<(), CoreError> {
            let ids: Vec<_> = ids.iter().map(ToString::to_string).collect();
            self.record(format!("batch_reset {}", ids.join(",")))
        }

        async fn modify_quota(&self, id: &QuotaId, bytes: u64) -> Result<(), CoreError> {
            self.record(format!("modify_quota {id} {bytes}"))
        }

        async fn add_quota(&self, port: u16, bytes: u64, comment: &str) -> Result<(), CoreError> {
            self.record(format!("add_quota {port} {bytes} {comment}"))
        }

        async fn delete_quota(&self, id: &QuotaId) -> Result<(), CoreError> {
            self.record(format!("delete_quota {id}"))
        }

        async fn add_port(&self, port: u16) -> Result<(), CoreError> {
            self.record(format!("add_port {port}"))
        }

        async fn delete_port(&self, handle: PortHandle) -> Result<(), CoreError> {
            self.record(format!("delete_port {handle}"))
        }

        async fn fetch_forwarding_rules(&self) -> Result<ForwardingSnapshot, CoreError> {
            self.rule_fetches.fetch_add(1, Ordering::SeqCst);
            let failure = self.rule_failure.lock().unwrap().clone();
            if let Some(message) = failure {
                return Err(CoreError::Api {
                    message,
                    status: Some(500),
                });
            }
            let snap = self.rules.lock().unwrap().clone();
            Ok(snap)
        }

        async fn add_forwarding_rule(&self, req: &CreateForwardingRequest) -> Result<(), CoreError> {
            self.record(format!("add_forwarding {} {}", req.src_port, req.dst_ip))
        }

        async fn edit_forwarding_rule(
            &self,
            id: &RuleId,
            req: &UpdateForwardingRequest,
        ) -> Result<(), CoreError> {
            self.record(format!("edit_forwarding {id} {}", req.dst_port))
        }

        async fn delete_forwarding_rule(&self, id: &RuleId) -> Result<(), CoreError> {
            self.record(format!("delete_forwarding {id}"))
        }

        async fn enable_forwarding_rule(&self, id: &RuleId) -> Result<(), CoreError> {
            self.record(format!("enable_forwarding {id}"))?;
            self.set_rule_enabled(id, true);
            Ok(())
        }

        async fn disable_forwarding_rule(&self, id: &RuleId) -> Result<(), CoreError> {
            self.record(format!("disable_forwarding {id}"))?;
            self.set_rule_enabled(id, false);
            Ok(())
        }
    }

    // ── Helpers ──────────────────────────────────────────────────

    fn quota(id: &str, usage: f64, status: QuotaStatus) -> Quota {
        Quota {
            id: QuotaId::from(id),
            port: 9000,
            bytes: 1_000,
            used: 0,
            usage_percent: usage,
            status,
            comment: None,
            token: None,
        }
    }

    fn rule(id: &str, src_port: u16, enabled: bool) -> ForwardingRule {
        ForwardingRule {
            id: RuleId::from(id),
            src_port,
            dst_ip: Ipv4Addr::new(10, 0, 0, 5),
            dst_port: 22,
            protocol: Protocol::Tcp,
            comment: String::new(),
            limit_mbps: 0,
            enabled,
        }
    }

    fn snapshot(quotas: Vec<Quota>) -> QuotaSnapshot {
        QuotaSnapshot {
            quotas,
            allowed_ports: Vec::new(),
            read_only: false,
            refresh_interval: Some(20),
        }
    }

    fn setup() -> (Arc<FakeApi>, Controller) {
        let fake = Arc::new(FakeApi::default());
        let api: Arc<dyn QuotaApi> = fake.clone();
        let config = ControllerConfig::new(Url::parse("http://127.0.0.1:8080").unwrap());
        (fake, Controller::with_api(config, api))
    }

    fn ids(controller: &Controller) -> Vec<String> {
        controller
            .store()
            .sorted_quotas()
            .iter()
            .map(|q| q.id.to_string())
            .collect()
    }

    fn notes(controller: &Controller) -> Vec<(Severity, String)> {
        controller
            .notifications()
            .snapshot()
            .iter()
            .map(|n| (n.severity, n.message.clone()))
            .collect()
    }

    // ── Loads ────────────────────────────────────────────────────

    #[tokio::test]
    async fn load_quotas_populates_sorted_view() {
        let (fake, c) = setup();
        fake.set_quotas(snapshot(vec![
            quota("a", 50.0, QuotaStatus::Ok),
            quota("b", 95.0, QuotaStatus::Exceeded),
        ]));

        c.load_quotas().await;

        assert_eq!(ids(&c), vec!["b", "a"]);
        assert!(!c.store().is_loading());
        assert_eq!(c.store().error(), None);
        assert_eq!(c.store().refresh_interval(), 20);
    }

    #[tokio::test]
    async fn load_failure_sets_error_and_keeps_data() {
        let (fake, c) = setup();
        fake.set_quotas(snapshot(vec![quota("a", 10.0, QuotaStatus::Ok)]));
        c.load_quotas().await;

        fake.script(
            0,
            Err(CoreError::Api {
                message: "nft list failed".into(),
                status: Some(500),
            }),
        );
        c.load_quotas().await;

        assert_eq!(c.store().error().as_deref(), Some("nft list failed"));
        assert_eq!(ids(&c), vec!["a"]);
        assert!(!c.store().is_loading());

        // A successful retry clears the error.
        c.load_quotas().await;
        assert_eq!(c.store().error(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn error_clears_and_loading_set_while_in_flight() {
        let (fake, c) = setup();
        fake.script(
            0,
            Err(CoreError::Api {
                message: "boom".into(),
                status: None,
            }),
        );
        c.load_quotas().await;
        assert!(c.store().error().is_some());

        fake.script(100, Ok(snapshot(Vec::new())));
        let probe = async {
            tokio::task::yield_now().await;
            (c.store().error(), c.store().is_loading())
        };
        let ((), (error, loading)) = tokio::join!(c.load_quotas(), probe);

        assert_eq!(error, None);
        assert!(loading);
        assert!(!c.store().is_loading());
    }

    #[tokio::test(start_paused = true)]
    async fn stale_quota_response_is_discarded() {
        let (fake, c) = setup();
        fake.script(100, Ok(snapshot(vec![quota("old", 1.0, QuotaStatus::Ok)])));
        fake.script(10, Ok(snapshot(vec![quota("new", 1.0, QuotaStatus::Ok)])));

        tokio::join!(c.load_quotas(), c.load_quotas());

        assert_eq!(ids(&c), vec!["new"]);
        assert_eq!(c.store().quotas_version(), 1);
        assert!(!c.store().is_loading());
    }

    #[tokio::test(start_paused = true)]
    async fn stale_failure_does_not_set_error() {
        let (fake, c) = setup();
        fake.script(
            100,
            Err(CoreError::Api {
                message: "late failure".into(),
                status: None,
            }),
        );
        fake.script(10, Ok(snapshot(vec![quota("fresh", 1.0, QuotaStatus::Ok)])));

        tokio::join!(c.load_quotas(), c.load_quotas());

        assert_eq!(c.store().error(), None);
        assert_eq!(ids(&c), vec!["fresh"]);
    }

    #[tokio::test]
    async fn reload_prunes_selection_to_present_ids() {
        let (fake, c) = setup();
        c.selection()
            .select_all(["a", "gone"].map(QuotaId::from));

        fake.set_quotas(snapshot(vec![
            quota("a", 1.0, QuotaStatus::Ok),
            quota("b", 2.0, QuotaStatus::Ok),
        ]));
        c.load_quotas().await;

        assert_eq!(c.selection().selected_count(), 1);
        assert!(c.selection().contains(&QuotaId::from("a")));
    }

    #[tokio::test]
    async fn forwarding_load_failure_is_notified_and_keeps_rules() {
        let (fake, c) = setup();
        fake.rules.lock().unwrap().rules = vec![rule("r1", 2222, true)];
        c.load_forwarding_rules().await;

        *fake.rule_failure.lock().unwrap() = Some("nope".into());
        c.load_forwarding_rules().await;

        assert_eq!(c.store().forwarding_rule_count(), 1);
        assert!(!c.store().is_forwarding_loading());
        assert_eq!(
            notes(&c),
            vec![(Severity::Error, "Failed to load forwarding rules: nope".into())]
        );
    }

    #[tokio::test]
    async fn forwarding_response_updates_read_only() {
        let (fake, c) = setup();
        fake.rules.lock().unwrap().read_only = true;
        c.load_forwarding_rules().await;
        assert!(c.store().read_only());
    }

    // ── Writes ───────────────────────────────────────────────────

    #[tokio::test]
    async fn add_port_failure_notifies_and_raises() {
        let (fake, c) = setup();
        fake.set_quotas(QuotaSnapshot {
            allowed_ports: vec![AllowedPort {
                handle: PortHandle::new(4),
                port: 22,
                managed: false,
                comment: None,
            }],
            ..snapshot(Vec::new())
        });
        c.load_quotas().await;
        let before = c.store().allowed_ports_snapshot();
        fake.fail_writes("port in use");

        let err = c.add_allowed_port(8080).await.unwrap_err();

        assert_eq!(err.to_string(), "port in use");
        assert_eq!(c.store().allowed_ports_snapshot(), before);
        assert_eq!(
            notes(&c),
            vec![(Severity::Error, "Failed to add port: port in use".into())]
        );
        assert_eq!(fake.calls(), vec!["add_port 8080"]);
        assert_eq!(fake.quota_fetches(), 1, "no reload after a failed write");
    }

    #[tokio::test]
    async fn add_port_success_notifies_then_reloads() {
        let (fake, c) = setup();

        c.add_allowed_port(8080).await.unwrap();

        assert_eq!(fake.calls(), vec!["add_port 8080"]);
        assert_eq!(fake.quota_fetches(), 1);
        assert_eq!(
            notes(&c),
            vec![(Severity::Success, "Port added successfully".into())]
        );
    }

    #[tokio::test]
    async fn remove_port_uses_handle() {
        let (fake, c) = setup();
        c.remove_allowed_port(PortHandle::new(17)).await.unwrap();
        assert_eq!(fake.calls(), vec!["delete_port 17"]);
        assert_eq!(
            notes(&c),
            vec![(Severity::Success, "Port deleted successfully".into())]
        );
    }

    #[tokio::test]
    async fn enable_rule_reloads_rules_exactly_once() {
        let (fake, c) = setup();
        fake.rules.lock().unwrap().rules = vec![rule("r1", 2222, false), rule("r2", 80, true)];

        c.enable_forwarding_rule(&RuleId::from("r1")).await.unwrap();

        assert_eq!(fake.calls(), vec!["enable_forwarding r1"]);
        assert_eq!(fake.rule_fetches(), 1);
        assert_eq!(c.store().forwarding_rules_version(), 1);
        assert!(c.store().forwarding_rule_by_id(&RuleId::from("r1")).unwrap().enabled);
        assert_eq!(
            notes(&c),
            vec![(Severity::Success, "Forwarding rule enabled".into())]
        );

        let order: Vec<_> = c
            .store()
            .sorted_forwarding_rules()
            .iter()
            .map(|r| r.id.to_string())
            .collect();
        assert_eq!(order, vec!["r2", "r1"]);
    }

    #[tokio::test]
    async fn forwarding_failures_use_action_prefix() {
        let (fake, c) = setup();
        fake.fail_writes("rule not found");
        let id = RuleId::from("r9");

        assert!(c.disable_forwarding_rule(&id).await.is_err());
        assert!(c.remove_forwarding_rule(&id).await.is_err());
        let edit = UpdateForwardingRequest {
            dst_ip: Ipv4Addr::new(10, 0, 0, 9),
            dst_port: 2022,
            protocol: Protocol::Udp,
            comment: String::new(),
            limit_mbps: 0,
        };
        assert!(c.edit_forwarding_rule(&id, &edit).await.is_err());

        let messages: Vec<_> = notes(&c).into_iter().map(|(_, m)| m).collect();
        assert_eq!(
            messages,
            vec![
                "Failed to disable forwarding rule: rule not found",
                "Failed to delete forwarding rule: rule not found",
                "Failed to update forwarding rule: rule not found",
            ]
        );
        assert_eq!(fake.rule_fetches(), 0);
    }

    #[tokio::test]
    async fn add_forwarding_rule_validates_ports_locally() {
        let (fake, c) = setup();
        let req = CreateForwardingRequest {
            src_port: 0,
            dst_ip: Ipv4Addr::new(10, 0, 0, 5),
            dst_port: 22,
            protocol: Protocol::Tcp,
            comment: String::new(),
            limit_mbps: 0,
        };

        let err = c.add_forwarding_rule(&req).await.unwrap_err();

        assert!(matches!(err, CoreError::ValidationFailed { .. }));
        assert!(fake.calls().is_empty());
        assert_eq!(
            notes(&c),
            vec![(
                Severity::Error,
                "Failed to add forwarding rule: Source port must be between 1 and 65535".into()
            )]
        );
    }

    #[tokio::test]
    async fn read_only_refuses_writes_without_calling_service() {
        let (fake, c) = setup();
        fake.set_quotas(QuotaSnapshot {
            read_only: true,
            ..snapshot(Vec::new())
        });
        c.load_quotas().await;

        let err = c.add_allowed_port(8080).await.unwrap_err();

        assert!(matches!(err, CoreError::ReadOnly));
        assert!(fake.calls().is_empty());
        assert_eq!(
            notes(&c),
            vec![(
                Severity::Error,
                "Failed to add port: Server is in read-only mode".into()
            )]
        );
    }

    #[tokio::test]
    async fn quota_writes_reload_quotas() {
        let (fake, c) = setup();
        let id = QuotaId::from("q1");

        c.reset_quota(&id).await.unwrap();
        c.modify_quota(&id, 5_000).await.unwrap();
        c.add_quota(9000, 1_000, "bob").await.unwrap();
        c.delete_quota(&id).await.unwrap();

        assert_eq!(
            fake.calls(),
            vec![
                "reset_quota q1",
                "modify_quota q1 5000",
                "add_quota 9000 1000 bob",
                "delete_quota q1",
            ]
        );
        assert_eq!(fake.quota_fetches(), 4);
        let messages: Vec<_> = notes(&c).into_iter().map(|(_, m)| m).collect();
        assert_eq!(
            messages,
            vec!["Quota reset", "Quota updated", "Quota added", "Quota deleted"]
        );
    }

    #[tokio::test]
    async fn modify_quota_rejects_zero_bytes() {
        let (fake, c) = setup();
        let err = c.modify_quota(&QuotaId::from("q1"), 0).await.unwrap_err();
        assert_eq!(err.to_string(), "Quota limit must be positive");
        assert!(fake.calls().is_empty());
    }

    #[tokio::test]
    async fn reset_selected_batches_and_clears_selection() {
        let (fake, c) = setup();
        c.selection().toggle(&QuotaId::from("b"));
        c.selection().toggle(&QuotaId::from("a"));

        c.reset_selected().await.unwrap();

        assert_eq!(fake.calls(), vec!["batch_reset a,b"]);
        assert!(!c.selection().has_selection());
        assert_eq!(
            notes(&c),
            vec![(Severity::Success, "Reset 2 quotas".into())]
        );
    }

    #[tokio::test]
    async fn reset_selected_with_empty_selection_fails() {
        let (fake, c) = setup();
        let err = c.reset_selected().await.unwrap_err();
        assert!(matches!(err, CoreError::ValidationFailed { .. }));
        assert!(fake.calls().is_empty());
    }

    #[tokio::test]
    async fn failed_batch_reset_keeps_selection() {
        let (fake, c) = setup();
        c.selection().toggle(&QuotaId::from("a"));
        fake.fail_writes("nft error");

        assert!(c.reset_selected().await.is_err());
        assert!(c.selection().contains(&QuotaId::from("a")));
        assert_eq!(
            notes(&c),
            vec![(Severity::Error, "Failed to reset quotas: nft error".into())]
        );
    }

    // ── Polling driver ───────────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn polling_ticks_at_interval_and_respects_editing_gate() {
        let (fake, c) = setup();
        fake.set_quotas(snapshot(Vec::new()));
        c.start().await;

        tokio::time::sleep(Duration::from_secs(21)).await;
        assert_eq!(fake.quota_fetches(), 1);
        assert_eq!(fake.rule_fetches(), 1);

        c.pause_refresh();
        tokio::time::sleep(Duration::from_secs(40)).await;
        assert_eq!(fake.quota_fetches(), 1, "ticks skipped while editing");

        // Explicit reloads ignore the gate.
        c.load_quotas().await;
        assert_eq!(fake.quota_fetches(), 2);

        c.resume_refresh();
        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(fake.quota_fetches(), 3);

        c.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn polling_follows_service_interval() {
        let (fake, c) = setup();
        fake.set_quotas(QuotaSnapshot {
            refresh_interval: Some(5),
            ..snapshot(Vec::new())
        });
        c.start().await;
        c.load_quotas().await;
        assert_eq!(c.store().refresh_interval(), 5);

        tokio::time::sleep(Duration::from_secs(11)).await;
        assert_eq!(fake.quota_fetches(), 3);

        c.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn zero_interval_suspends_polling_until_nonzero() {
        let (fake, c) = setup();
        fake.set_quotas(QuotaSnapshot {
            refresh_interval: Some(0),
            ..snapshot(Vec::new())
        });
        c.load_quotas().await;
        c.start().await;

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(fake.quota_fetches(), 1);

        fake.set_quotas(QuotaSnapshot {
            refresh_interval: Some(5),
            ..snapshot(Vec::new())
        });
        c.load_quotas().await;
        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(fake.quota_fetches(), 3);

        c.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn oversized_interval_suspends_polling_without_killing_task() {
        let (fake, c) = setup();
        fake.set_quotas(QuotaSnapshot {
            refresh_interval: Some(u64::MAX),
            ..snapshot(Vec::new())
        });
        c.start().await;
        c.load_quotas().await;

        tokio::time::sleep(Duration::from_secs(3_600)).await;
        assert_eq!(fake.quota_fetches(), 1);

        fake.set_quotas(QuotaSnapshot {
            refresh_interval: Some(5),
            ..snapshot(Vec::new())
        });
        c.load_quotas().await;
        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(fake.quota_fetches(), 3, "task still polls after recovery");

        c.shutdown().await;
    }

    #[tokio::test]
    async fn first_tick_rejects_zero_and_overflow() {
        assert!(first_tick(Duration::ZERO).is_none());
        assert!(first_tick(Duration::from_secs(u64::MAX)).is_none());
        assert!(first_tick(Duration::from_secs(20)).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn polling_skips_forwarding_when_disabled() {
        let fake = Arc::new(FakeApi::default());
        let api: Arc<dyn QuotaApi> = fake.clone();
        let mut config = ControllerConfig::new(Url::parse("http://127.0.0.1:8080").unwrap());
        config.poll_forwarding = false;
        let c = Controller::with_api(config, api);
        fake.set_quotas(snapshot(Vec::new()));

        c.start().await;
        tokio::time::sleep(Duration::from_secs(21)).await;

        assert_eq!(fake.quota_fetches(), 1);
        assert_eq!(fake.rule_fetches(), 0);
        c.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_polling() {
        let (fake, c) = setup();
        c.start().await;
        c.start().await;
        c.shutdown().await;

        tokio::time::sleep(Duration::from_secs(100)).await;
        assert_eq!(fake.quota_fetches(), 0);
    }
}
