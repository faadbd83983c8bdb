//! Quota command handlers.

use std::sync::Arc;

use tabled::Tabled;
use nftui_core::{Controller, Quota, QuotaId};

use crate::cli::{GlobalOpts, OutputFormat, QuotasArgs, QuotasCommand};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct QuotaRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Port")]
    port: u16,
    #[tabled(rename = "Used")]
    used: String,
    #[tabled(rename = "Limit")]
    limit: String,
    #[tabled(rename = "Usage")]
    usage: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Comment")]
    comment: String,
}

impl QuotaRow {
    fn new(q: &Quota, color: bool) -> Self {
        Self {
            id: q.id.to_string(),
            port: q.port,
            used: output::bytes(q.used),
            limit: output::bytes(q.bytes),
            usage: format!("{:.1}%", q.usage_percent),
            status: output::status_label(q.status, color),
            comment: q.comment.clone().unwrap_or_default(),
        }
    }
}

/// Render quotas in display order.
pub(super) fn render(format: OutputFormat, quotas: &[Arc<Quota>], color: bool) -> String {
    output::render_list(format, quotas, |q| QuotaRow::new(q, color), |q| q.id.to_string())
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    controller: &Controller,
    args: QuotasArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    util::load_quotas(controller).await?;

    match args.command {
        QuotasCommand::List => {
            let sorted = controller.store().sorted_quotas();
            let color = output::should_color(global.color);
            output::print_output(&render(global.output, &sorted, color), global.quiet);
            Ok(())
        }

        QuotasCommand::Reset { id } => {
            let id = util::resolve_quota_id(controller, &id)?;
            controller.reset_quota(&id).await?;
            Ok(())
        }

        QuotasCommand::ResetAll { ids, exceeded } => {
            let targets: Vec<QuotaId> = if exceeded {
                controller
                    .store()
                    .quotas_snapshot()
                    .iter()
                    .filter(|q| q.status.is_exceeded())
                    .map(|q| q.id.clone())
                    .collect()
            } else {
                ids.iter()
                    .map(|id| util::resolve_quota_id(controller, id))
                    .collect::<Result<_, _>>()?
            };
            if targets.is_empty() {
                controller.notifications().info("No exceeded quotas");
                return Ok(());
            }
            controller.selection().select_all(targets);
            controller.reset_selected().await?;
            Ok(())
        }

        QuotasCommand::Set { id, bytes } => {
            let id = util::resolve_quota_id(controller, &id)?;
            controller.modify_quota(&id, bytes).await?;
            Ok(())
        }

        QuotasCommand::Add {
            port,
            bytes,
            comment,
        } => {
            controller.add_quota(port, bytes, &comment).await?;
            Ok(())
        }

        QuotasCommand::Delete { id } => {
            let id = util::resolve_quota_id(controller, &id)?;
            if !util::confirm(&format!("Delete quota '{id}'?"), global.yes)? {
                return Ok(());
            }
            controller.delete_quota(&id).await?;
            Ok(())
        }
    }
}
