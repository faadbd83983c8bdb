// Wire types for the `/api/v1` surface.
//
// These mirror the service's JSON exactly. Domain-level types with
// stronger invariants live in `nftui-core`.

use serde::{Deserialize, Deserializer, Serialize};

/// The service encodes empty collections as `null`; treat that like `[]`.
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<Vec<T>>::deserialize(deserializer).map(Option::unwrap_or_default)
}

// ── Quotas ──────────────────────────────────────────────────────────

/// A per-port bandwidth quota as reported by `GET /quotas`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuotaRule {
    pub id: String,
    #[serde(default)]
    pub handle: i64,
    pub port: u16,
    pub quota_bytes: u64,
    #[serde(default)]
    pub used_bytes: u64,
    #[serde(default)]
    pub usage_percent: f64,
    pub status: String,
    #[serde(default)]
    pub comment: String,
    /// Public query token, present when the service has token queries configured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// An allowed inbound port from the service's input chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowedPort {
    pub port: u16,
    pub handle: i64,
    #[serde(default)]
    pub managed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// Response body of `GET /quotas`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuotasResponse {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub quotas: Vec<QuotaRule>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub allowed_ports: Vec<AllowedPort>,
    #[serde(default)]
    pub read_only: bool,
    /// Seconds between polls. Older service builds omit it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_interval: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct AddQuotaRequest<'a> {
    pub port: u16,
    pub bytes: u64,
    pub comment: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ModifyQuotaRequest {
    pub bytes: u64,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct BatchResetRequest<'a> {
    pub ids: &'a [String],
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct AddPortRequest {
    pub port: u16,
}

// ── Forwarding ──────────────────────────────────────────────────────

/// A DNAT forwarding rule as reported by `GET /forwarding`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForwardingRule {
    pub id: String,
    pub src_port: u16,
    pub dst_ip: String,
    pub dst_port: u16,
    pub protocol: String,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub limit_mbps: u32,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

/// Response body of `GET /forwarding`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForwardingResponse {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub rules: Vec<ForwardingRule>,
    #[serde(default)]
    pub read_only: bool,
}

/// Body of `POST /forwarding`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddForwardingRequest {
    pub src_port: u16,
    pub dst_ip: String,
    pub dst_port: u16,
    pub protocol: String,
    pub comment: String,
    pub limit_mbps: u32,
}

/// Body of `PUT /forwarding/{id}`. The source port is immutable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditForwardingRequest {
    pub dst_ip: String,
    pub dst_port: u16,
    pub protocol: String,
    pub comment: String,
    pub limit_mbps: u32,
}

// ── Generic envelope ────────────────────────────────────────────────

/// `{success, message?, error?}` body returned by every write endpoint
/// and by failing reads.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiResponse {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}
