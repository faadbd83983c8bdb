//! Shared helpers for command handlers.

use std::io::IsTerminal;
use std::sync::Arc;

use nftui_core::{Controller, ForwardingRule, QuotaId, RuleId, Severity};

use crate::error::CliError;

const RULE_LOAD_PREFIX: &str = "Failed to load forwarding rules";

/// Load quotas and allowed ports, failing if the load recorded an error.
pub async fn load_quotas(controller: &Controller) -> Result<(), CliError> {
    controller.load_quotas().await;
    match controller.store().error() {
        Some(message) => Err(CliError::LoadFailed {
            message: format!("Failed to load quotas: {message}"),
        }),
        None => Ok(()),
    }
}

/// Load forwarding rules, failing if the load was reported as failed.
///
/// Rule-load failures surface only as notifications, so the queue is
/// the source of the error text.
pub async fn load_forwarding_rules(controller: &Controller) -> Result<(), CliError> {
    controller.load_forwarding_rules().await;
    let failure = controller
        .notifications()
        .snapshot()
        .iter()
        .rev()
        .find(|n| n.severity == Severity::Error && n.message.starts_with(RULE_LOAD_PREFIX))
        .map(|n| n.message.clone());
    match failure {
        Some(message) => Err(CliError::LoadFailed { message }),
        None => Ok(()),
    }
}

/// Resolve a quota by id, or by port number when no id matches.
pub fn resolve_quota_id(controller: &Controller, identifier: &str) -> Result<QuotaId, CliError> {
    let store = controller.store();
    if let Some(q) = store.quota_by_id(&QuotaId::from(identifier)) {
        return Ok(q.id.clone());
    }
    if let Ok(port) = identifier.parse::<u16>() {
        if let Some(q) = store.quotas_snapshot().iter().find(|q| q.port == port) {
            return Ok(q.id.clone());
        }
    }
    Err(CliError::NotFound {
        resource_type: "quota".into(),
        identifier: identifier.into(),
        list_command: "quotas list".into(),
    })
}

pub fn resolve_rule(controller: &Controller, identifier: &str) -> Result<Arc<ForwardingRule>, CliError> {
    controller
        .store()
        .forwarding_rule_by_id(&RuleId::from(identifier))
        .ok_or_else(|| CliError::NotFound {
            resource_type: "forwarding rule".into(),
            identifier: identifier.into(),
            list_command: "forwarding list".into(),
        })
}

/// Prompt for confirmation, auto-approving if `--yes` was passed.
pub fn confirm(message: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: message.into(),
        });
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))?;
    Ok(confirmed)
}
