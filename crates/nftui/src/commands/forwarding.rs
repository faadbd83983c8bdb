//! Forwarding-rule command handlers.

use std::sync::Arc;

use tabled::Tabled;
use nftui_core::{Controller, CreateForwardingRequest, ForwardingRule, UpdateForwardingRequest};

use crate::cli::{ForwardingArgs, ForwardingCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct RuleRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Source")]
    src: u16,
    #[tabled(rename = "Destination")]
    dst: String,
    #[tabled(rename = "Proto")]
    protocol: String,
    #[tabled(rename = "Limit")]
    limit: String,
    #[tabled(rename = "Enabled")]
    enabled: String,
    #[tabled(rename = "Comment")]
    comment: String,
}

impl From<&Arc<ForwardingRule>> for RuleRow {
    fn from(r: &Arc<ForwardingRule>) -> Self {
        Self {
            id: r.id.to_string(),
            src: r.src_port,
            dst: format!("{}:{}", r.dst_ip, r.dst_port),
            protocol: r.protocol.to_string(),
            limit: if r.is_rate_limited() {
                format!("{} Mbps", r.limit_mbps)
            } else {
                "-".into()
            },
            enabled: if r.enabled { "yes" } else { "no" }.into(),
            comment: r.comment.clone(),
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    controller: &Controller,
    args: ForwardingArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    util::load_forwarding_rules(controller).await?;

    match args.command {
        ForwardingCommand::List => {
            let sorted = controller.store().sorted_forwarding_rules();
            let out = output::render_list(global.output, &sorted, |r| RuleRow::from(r), |r| {
                r.id.to_string()
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ForwardingCommand::Add {
            src_port,
            dst_ip,
            dst_port,
            opts,
        } => {
            let req = CreateForwardingRequest {
                src_port,
                dst_ip,
                dst_port,
                protocol: opts.protocol,
                comment: opts.comment,
                limit_mbps: opts.limit_mbps,
            };
            controller.add_forwarding_rule(&req).await?;
            Ok(())
        }

        ForwardingCommand::Edit {
            id,
            dst_ip,
            dst_port,
            protocol,
            comment,
            limit_mbps,
        } => {
            let rule = util::resolve_rule(controller, &id)?;
            let mut req = UpdateForwardingRequest::from(rule.as_ref());
            if let Some(ip) = dst_ip {
                req.dst_ip = ip;
            }
            if let Some(port) = dst_port {
                req.dst_port = port;
            }
            if let Some(protocol) = protocol {
                req.protocol = protocol;
            }
            if let Some(comment) = comment {
                req.comment = comment;
            }
            if let Some(limit) = limit_mbps {
                req.limit_mbps = limit;
            }
            controller.edit_forwarding_rule(&rule.id, &req).await?;
            Ok(())
        }

        ForwardingCommand::Delete { id } => {
            let rule = util::resolve_rule(controller, &id)?;
            if !util::confirm(
                &format!("Delete forwarding rule {} -> {}:{}?", rule.src_port, rule.dst_ip, rule.dst_port),
                global.yes,
            )? {
                return Ok(());
            }
            controller.remove_forwarding_rule(&rule.id).await?;
            Ok(())
        }

        ForwardingCommand::Enable { id } => {
            let rule = util::resolve_rule(controller, &id)?;
            controller.enable_forwarding_rule(&rule.id).await?;
            Ok(())
        }

        ForwardingCommand::Disable { id } => {
            let rule = util::resolve_rule(controller, &id)?;
            controller.disable_forwarding_rule(&rule.id).await?;
            Ok(())
        }
    }
}
