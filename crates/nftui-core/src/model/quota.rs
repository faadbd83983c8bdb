// ── Quota domain types ──

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::ids::QuotaId;

/// Usage state computed by the service from `used / bytes`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum QuotaStatus {
    Ok,
    Warning,
    Exceeded,
}

impl QuotaStatus {
    pub fn is_exceeded(self) -> bool {
        matches!(self, Self::Exceeded)
    }
}

/// A per-port bandwidth quota.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quota {
    pub id: QuotaId,
    pub port: u16,
    /// Quota ceiling in bytes.
    pub bytes: u64,
    /// Bytes consumed so far.
    pub used: u64,
    /// Server-supplied usage, 0-100 and above when exceeded.
    pub usage_percent: f64,
    pub status: QuotaStatus,
    pub comment: Option<String>,
    /// Public query token, present when the service has token queries configured.
    pub token: Option<String>,
}

impl Quota {
    /// Bytes left before the quota is exhausted.
    pub fn remaining(&self) -> u64 {
        self.bytes.saturating_sub(self.used)
    }
}
