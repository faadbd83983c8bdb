// ── Runtime connection configuration ──
//
// Describes how to reach the service. Carries credentials and tuning but
// never touches disk; the CLI builds a `ControllerConfig` and hands it in.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use url::Url;

/// Refresh interval used until the service reports its own.
pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 20;

/// HTTP basic-auth credentials for services behind an authenticating proxy.
#[derive(Debug, Clone)]
pub struct AuthCredentials {
    pub username: String,
    pub password: SecretString,
}

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(PathBuf),
    /// Skip verification (self-signed certs).
    DangerAcceptInvalid,
}

/// Configuration for one service endpoint.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Service root, e.g. `http://10.0.0.1:8080`.
    pub url: Url,
    pub auth: Option<AuthCredentials>,
    pub tls: TlsVerification,
    /// Request timeout, enforced by the transport.
    pub timeout: Duration,
    /// Polling interval until the first load supplies the service's value.
    pub refresh_interval_secs: u64,
    /// Whether background refreshes also reload forwarding rules.
    pub poll_forwarding: bool,
}

impl ControllerConfig {
    /// Config for `url` with every other setting at its default.
    pub fn new(url: Url) -> Self {
        Self {
            url,
            auth: None,
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
            refresh_interval_secs: DEFAULT_REFRESH_INTERVAL_SECS,
            poll_forwarding: true,
        }
    }
}
