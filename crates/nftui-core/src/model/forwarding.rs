// ── Forwarding domain types ──

use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::ids::RuleId;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Protocol {
    Tcp,
    Udp,
    Both,
}

/// A DNAT forwarding rule: `src_port` on the host to `dst_ip:dst_port`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForwardingRule {
    pub id: RuleId,
    pub src_port: u16,
    pub dst_ip: Ipv4Addr,
    pub dst_port: u16,
    pub protocol: Protocol,
    pub comment: String,
    /// Rate limit in Mbit/s; 0 means unlimited.
    pub limit_mbps: u32,
    pub enabled: bool,
}

impl ForwardingRule {
    pub fn is_rate_limited(&self) -> bool {
        self.limit_mbps > 0
    }
}
