// ── Allowed-port domain type ──

use serde::{Deserialize, Serialize};

use super::ids::PortHandle;

/// A port registered as allowed in the service's input chain.
///
/// Ports outside this set are rejected by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowedPort {
    pub handle: PortHandle,
    pub port: u16,
    /// Whether the rule was created through the service (vs. pre-existing).
    pub managed: bool,
    pub comment: Option<String>,
}
