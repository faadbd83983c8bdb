// ── Domain model ──
//
// Canonical client-side representations of the service's entities.
// Every value is an immutable snapshot; stores replace them wholesale.

pub mod forwarding;
pub mod ids;
pub mod port;
pub mod quota;

pub use forwarding::{ForwardingRule, Protocol};
pub use ids::{PortHandle, QuotaId, RuleId};
pub use port::AllowedPort;
pub use quota::{Quota, QuotaStatus};
