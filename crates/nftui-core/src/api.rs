// ── Service boundary ──
//
// The operations the core consumes. `NftClient` implements this over
// HTTP (see `convert`); tests substitute a scripted in-memory fake.

use async_trait::async_trait;

use crate::error::CoreError;
use crate::model::{AllowedPort, ForwardingRule, PortHandle, Quota, QuotaId, RuleId};
use crate::requests::{CreateForwardingRequest, UpdateForwardingRequest};

/// Everything returned by one quota fetch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuotaSnapshot {
    pub quotas: Vec<Quota>,
    pub allowed_ports: Vec<AllowedPort>,
    pub read_only: bool,
    /// Seconds between polls, as configured on the service. `None` when
    /// the service did not report one; the current value is kept.
    pub refresh_interval: Option<u64>,
}

/// Everything returned by one forwarding-rule fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ForwardingSnapshot {
    pub rules: Vec<ForwardingRule>,
    pub read_only: bool,
}

/// Calls the core makes against the quota/forwarding service.
///
/// Every failing call yields a `CoreError` whose display text is the
/// service's human-readable message.
#[async_trait]
pub trait QuotaApi: Send + Sync {
    async fn fetch_quotas(&self) -> Result<QuotaSnapshot, CoreError>;
    async fn reset_quota(&self, id: &QuotaId) -> Result<(), CoreError>;
    async fn batch_reset_quotas(&self, ids: &[QuotaId]) -> Result<(), CoreError>;
    async fn modify_quota(&self, id: &QuotaId, bytes: u64) -> Result<(), CoreError>;
    async fn add_quota(&self, port: u16, bytes: u64, comment: &str) -> Result<(), CoreError>;
    async fn delete_quota(&self, id: &QuotaId) -> Result<(), CoreError>;

    async fn add_port(&self, port: u16) -> Result<(), CoreError>;
    async fn delete_port(&self, handle: PortHandle) -> Result<(), CoreError>;

    async fn fetch_forwarding_rules(&self) -> Result<ForwardingSnapshot, CoreError>;
    async fn add_forwarding_rule(&self, req: &CreateForwardingRequest) -> Result<(), CoreError>;
    async fn edit_forwarding_rule(
        &self,
        id: &RuleId,
        req: &UpdateForwardingRequest,
    ) -> Result<(), CoreError>;
    async fn delete_forwarding_rule(&self, id: &RuleId) -> Result<(), CoreError>;
    async fn enable_forwarding_rule(&self, id: &RuleId) -> Result<(), CoreError>;
    async fn disable_forwarding_rule(&self, id: &RuleId) -> Result<(), CoreError>;
}
