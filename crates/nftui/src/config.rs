//! CLI configuration -- thin wrapper around `nftui_config` shared types.
//!
//! Re-exports the shared types and adds CLI-specific resolution that
//! respects `GlobalOpts` flag overrides (--server, --username, etc.).

use std::time::Duration;

use nftui_core::{AuthCredentials, ControllerConfig, TlsVerification};

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use nftui_config::{
    Config, DEFAULT_SERVER, Defaults, Profile, config_path, load_config_or_default, save_config,
};

// ── CLI-specific helpers ────────────────────────────────────────────

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Build a `ControllerConfig` from the config file, profile, and CLI overrides.
///
/// Flag values win over profile values. Without a profile, `--server`
/// (or `NFTUI_SERVER`) alone is enough.
pub fn build_controller_config(global: &GlobalOpts) -> Result<ControllerConfig, CliError> {
    let cfg = load_config_or_default();
    let profile_name = active_profile_name(global, &cfg);

    match cfg.profiles.get(&profile_name) {
        Some(profile) => resolve_profile(profile, &profile_name, &cfg.defaults, global),
        None if global.profile.is_some() => {
            let mut names: Vec<_> = cfg.profiles.keys().cloned().collect();
            names.sort();
            Err(CliError::ProfileNotFound {
                name: profile_name,
                available: if names.is_empty() {
                    "(none)".into()
                } else {
                    names.join(", ")
                },
            })
        }
        None => {
            let server = global.server.as_deref().ok_or_else(|| CliError::NoConfig {
                path: config_path().display().to_string(),
            })?;
            let profile = Profile {
                server: server.to_owned(),
                ..Profile::default()
            };
            resolve_profile(&profile, &profile_name, &cfg.defaults, global)
        }
    }
}

/// Translate a `Profile` + global flags into a `ControllerConfig`.
pub fn resolve_profile(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
    global: &GlobalOpts,
) -> Result<ControllerConfig, CliError> {
    let mut config = nftui_config::profile_to_controller_config(
        &Profile {
            server: global.server.clone().unwrap_or_else(|| profile.server.clone()),
            username: global.username.clone().or_else(|| profile.username.clone()),
            password: profile.password.clone(),
            password_env: profile.password_env.clone(),
            ca_cert: profile.ca_cert.clone(),
            insecure: profile.insecure,
            timeout: profile.timeout,
        },
        profile_name,
        defaults,
    )?;

    if global.insecure {
        config.tls = TlsVerification::DangerAcceptInvalid;
    }
    if let Some(secs) = global.timeout {
        config.timeout = Duration::from_secs(secs);
    }
    Ok(config)
}

/// Credentials that will be sent, for display only.
pub fn describe_auth(auth: Option<&AuthCredentials>) -> String {
    auth.map_or_else(|| "none".into(), |a| format!("basic ({})", a.username))
}
