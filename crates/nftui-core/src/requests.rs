// ── Typed request structs for forwarding mutations ──

use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

use crate::model::{ForwardingRule, Protocol};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateForwardingRequest {
    pub src_port: u16,
    pub dst_ip: Ipv4Addr,
    pub dst_port: u16,
    pub protocol: Protocol,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub limit_mbps: u32,
}

/// Replacement values for an existing rule. The source port cannot change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateForwardingRequest {
    pub dst_ip: Ipv4Addr,
    pub dst_port: u16,
    pub protocol: Protocol,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub limit_mbps: u32,
}

impl From<&ForwardingRule> for UpdateForwardingRequest {
    /// Start an edit from the rule's current values.
    fn from(rule: &ForwardingRule) -> Self {
        Self {
            dst_ip: rule.dst_ip,
            dst_port: rule.dst_port,
            protocol: rule.protocol,
            comment: rule.comment.clone(),
            limit_mbps: rule.limit_mbps,
        }
    }
}
