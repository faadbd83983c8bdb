// ── Core error types ──
//
// Errors surfaced to UI consumers. Service failures keep the service's
// own message as display text; consumers prefix it with the action name
// ("Failed to add port: port in use").

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Clone, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Request timed out")]
    Timeout,

    // ── Operation errors ─────────────────────────────────────────────
    /// The service rejected a call. `message` is the service's text.
    #[error("{message}")]
    Api {
        message: String,
        status: Option<u16>,
    },

    /// Refused locally because the last load reported read-only mode.
    #[error("Server is in read-only mode")]
    ReadOnly,

    #[error("{message}")]
    ValidationFailed { message: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::ValidationFailed {
            message: message.into(),
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<nftui_api::Error> for CoreError {
    fn from(err: nftui_api::Error) -> Self {
        match err {
            nftui_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            nftui_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            nftui_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            nftui_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            nftui_api::Error::Api { message, status } => CoreError::Api {
                message,
                status: Some(status),
            },
            nftui_api::Error::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_keeps_service_message() {
        let err: CoreError = nftui_api::Error::Api {
            message: "port in use".into(),
            status: 409,
        }
        .into();
        assert_eq!(err.to_string(), "port in use");
        assert!(matches!(err, CoreError::Api { status: Some(409), .. }));
    }

    #[test]
    fn authentication_maps_to_auth_failure() {
        let err: CoreError = nftui_api::Error::Authentication {
            message: "invalid credentials".into(),
        }
        .into();
        assert_eq!(err.to_string(), "Authentication failed: invalid credentials");
    }

    #[test]
    fn read_only_display_matches_service_wording() {
        assert_eq!(CoreError::ReadOnly.to_string(), "Server is in read-only mode");
    }
}
