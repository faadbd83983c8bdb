// ── Identity types ──
//
// Opaque identifiers issued by the service. Quota and rule ids are
// strings; allowed-port handles are nftables rule handles.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a quota, unique within one snapshot.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuotaId(String);

impl QuotaId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QuotaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for QuotaId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for QuotaId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Identifier of a forwarding rule.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleId(String);

impl RuleId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for RuleId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for RuleId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Handle of an allowed-port rule in the service's input chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PortHandle(i64);

impl PortHandle {
    pub fn new(handle: i64) -> Self {
        Self(handle)
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for PortHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for PortHandle {
    fn from(h: i64) -> Self {
        Self(h)
    }
}
