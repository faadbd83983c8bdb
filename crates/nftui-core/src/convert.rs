// ── API-to-domain type conversions ──
//
// Bridges raw `nftui_api` wire types into `nftui_core::model` types and
// implements `QuotaApi` for `NftClient`. Entries the service sends in a
// shape the model cannot represent are logged and skipped rather than
// failing the whole snapshot.

use std::collections::HashSet;
use std::net::Ipv4Addr;

use async_trait::async_trait;
use tracing::warn;

use nftui_api::models as wire;
use nftui_api::NftClient;

use crate::api::{ForwardingSnapshot, QuotaApi, QuotaSnapshot};
use crate::error::CoreError;
use crate::model::{
    AllowedPort, ForwardingRule, PortHandle, Protocol, Quota, QuotaId, QuotaStatus, RuleId,
};
use crate::requests::{CreateForwardingRequest, UpdateForwardingRequest};

// ── Helpers ────────────────────────────────────────────────────────

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() { None } else { Some(s) }
}

/// Convert every item, logging and dropping the ones that fail.
fn convert_all<W, D>(items: Vec<W>, kind: &str) -> Vec<D>
where
    D: TryFrom<W, Error = CoreError>,
{
    items
        .into_iter()
        .filter_map(|raw| match D::try_from(raw) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!(kind, error = %e, "skipping malformed entry");
                None
            }
        })
        .collect()
}

// ── Quotas ─────────────────────────────────────────────────────────

impl TryFrom<wire::QuotaRule> for Quota {
    type Error = CoreError;

    fn try_from(raw: wire::QuotaRule) -> Result<Self, Self::Error> {
        let status: QuotaStatus = raw.status.parse().map_err(|_| {
            CoreError::Internal(format!("quota {}: unknown status {:?}", raw.id, raw.status))
        })?;

        Ok(Quota {
            id: QuotaId::from(raw.id),
            port: raw.port,
            bytes: raw.quota_bytes,
            used: raw.used_bytes,
            usage_percent: raw.usage_percent,
            status,
            comment: non_empty(raw.comment),
            token: raw.token.and_then(non_empty),
        })
    }
}

impl TryFrom<wire::AllowedPort> for AllowedPort {
    type Error = CoreError;

    fn try_from(raw: wire::AllowedPort) -> Result<Self, Self::Error> {
        Ok(AllowedPort {
            handle: PortHandle::new(raw.handle),
            port: raw.port,
            managed: raw.managed,
            comment: raw.comment.and_then(non_empty),
        })
    }
}

/// Keep the first quota for each id.
fn dedup_quotas(quotas: Vec<Quota>) -> Vec<Quota> {
    let mut seen = HashSet::with_capacity(quotas.len());
    quotas
        .into_iter()
        .filter(|q| {
            let first = seen.insert(q.id.clone());
            if !first {
                warn!(id = %q.id, port = q.port, "dropping quota with duplicate id");
            }
            first
        })
        .collect()
}

impl From<wire::QuotasResponse> for QuotaSnapshot {
    fn from(resp: wire::QuotasResponse) -> Self {
        QuotaSnapshot {
            quotas: dedup_quotas(convert_all(resp.quotas, "quota")),
            allowed_ports: convert_all(resp.allowed_ports, "allowed_port"),
            read_only: resp.read_only,
            refresh_interval: resp.refresh_interval,
        }
    }
}

// ── Forwarding ─────────────────────────────────────────────────────

impl TryFrom<wire::ForwardingRule> for ForwardingRule {
    type Error = CoreError;

    fn try_from(raw: wire::ForwardingRule) -> Result<Self, Self::Error> {
        let dst_ip: Ipv4Addr = raw.dst_ip.parse().map_err(|_| {
            CoreError::Internal(format!("rule {}: invalid destination IP {:?}", raw.id, raw.dst_ip))
        })?;
        let protocol: Protocol = raw.protocol.parse().map_err(|_| {
            CoreError::Internal(format!("rule {}: unknown protocol {:?}", raw.id, raw.protocol))
        })?;

        Ok(ForwardingRule {
            id: RuleId::from(raw.id),
            src_port: raw.src_port,
            dst_ip,
            dst_port: raw.dst_port,
            protocol,
            comment: raw.comment,
            limit_mbps: raw.limit_mbps,
            enabled: raw.enabled,
        })
    }
}

impl From<wire::ForwardingResponse> for ForwardingSnapshot {
    fn from(resp: wire::ForwardingResponse) -> Self {
        ForwardingSnapshot {
            rules: convert_all(resp.rules, "forwarding_rule"),
            read_only: resp.read_only,
        }
    }
}

impl From<&CreateForwardingRequest> for wire::AddForwardingRequest {
    fn from(req: &CreateForwardingRequest) -> Self {
        wire::AddForwardingRequest {
            src_port: req.src_port,
            dst_ip: req.dst_ip.to_string(),
            dst_port: req.dst_port,
            protocol: req.protocol.to_string(),
            comment: req.comment.clone(),
            limit_mbps: req.limit_mbps,
        }
    }
}

impl From<&UpdateForwardingRequest> for wire::EditForwardingRequest {
    fn from(req: &UpdateForwardingRequest) -> Self {
        wire::EditForwardingRequest {
            dst_ip: req.dst_ip.to_string(),
            dst_port: req.dst_port,
            protocol: req.protocol.to_string(),
            comment: req.comment.clone(),
            limit_mbps: req.limit_mbps,
        }
    }
}

// ── QuotaApi over HTTP ─────────────────────────────────────────────

#[async_trait]
impl QuotaApi for NftClient {
    async fn fetch_quotas(&self) -> Result<QuotaSnapshot, CoreError> {
        Ok(self.list_quotas().await?.into())
    }

    async fn reset_quota(&self, id: &QuotaId) -> Result<(), CoreError> {
        Ok(NftClient::reset_quota(self, id.as_str()).await?)
    }

    async fn batch_reset_quotas(&self, ids: &[QuotaId]) -> Result<(), CoreError> {
        let ids: Vec<String> = ids.iter().map(ToString::to_string).collect();
        Ok(NftClient::batch_reset_quotas(self, &ids).await?)
    }

    async fn modify_quota(&self, id: &QuotaId, bytes: u64) -> Result<(), CoreError> {
        Ok(NftClient::modify_quota(self, id.as_str(), bytes).await?)
    }

    async fn add_quota(&self, port: u16, bytes: u64, comment: &str) -> Result<(), CoreError> {
        Ok(NftClient::add_quota(self, port, bytes, comment).await?)
    }

    async fn delete_quota(&self, id: &QuotaId) -> Result<(), CoreError> {
        Ok(NftClient::delete_quota(self, id.as_str()).await?)
    }

    async fn add_port(&self, port: u16) -> Result<(), CoreError> {
        Ok(NftClient::add_port(self, port).await?)
    }

    async fn delete_port(&self, handle: PortHandle) -> Result<(), CoreError> {
        Ok(NftClient::delete_port(self, handle.get()).await?)
    }

    async fn fetch_forwarding_rules(&self) -> Result<ForwardingSnapshot, CoreError> {
        Ok(self.list_forwarding().await?.into())
    }

    async fn add_forwarding_rule(&self, req: &CreateForwardingRequest) -> Result<(), CoreError> {
        Ok(self.add_forwarding(&req.into()).await?)
    }

    async fn edit_forwarding_rule(
        &self,
        id: &RuleId,
        req: &UpdateForwardingRequest,
    ) -> Result<(), CoreError> {
        Ok(self.edit_forwarding(id.as_str(), &req.into()).await?)
    }

    async fn delete_forwarding_rule(&self, id: &RuleId) -> Result<(), CoreError> {
        Ok(self.delete_forwarding(id.as_str()).await?)
    }

    async fn enable_forwarding_rule(&self, id: &RuleId) -> Result<(), CoreError> {
        Ok(self.enable_forwarding(id.as_str()).await?)
    }

    async fn disable_forwarding_rule(&self, id: &RuleId) -> Result<(), CoreError> {
        Ok(self.disable_forwarding(id.as_str()).await?)
    }
}
