// nftui-core: Reactive state layer between nftui-api and consumers (CLI).

pub mod api;
pub mod config;
pub mod controller;
pub mod convert;
pub mod error;
pub mod model;
pub mod notify;
pub mod requests;
pub mod selection;
pub mod store;
pub mod stream;
pub mod view;

// ── Primary re-exports ──────────────────────────────────────────────
pub use api::{ForwardingSnapshot, QuotaApi, QuotaSnapshot};
pub use config::{AuthCredentials, ControllerConfig, DEFAULT_REFRESH_INTERVAL_SECS, TlsVerification};
pub use controller::Controller;
pub use error::CoreError;
pub use notify::{Notification, NotificationId, NotificationQueue, Severity};
pub use requests::{CreateForwardingRequest, UpdateForwardingRequest};
pub use selection::SelectionSet;
pub use store::DataStore;
pub use stream::EntityStream;
pub use view::{SortedView, sort_forwarding_rules, sort_quotas};

// Re-export model types at the crate root for ergonomics.
pub use model::{
    AllowedPort, ForwardingRule, PortHandle, Protocol, Quota, QuotaId, QuotaStatus, RuleId,
};
