//! Allowed-port command handlers.

use std::sync::Arc;

use tabled::Tabled;
use nftui_core::{AllowedPort, Controller};

use crate::cli::{GlobalOpts, PortsArgs, PortsCommand};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct PortRow {
    #[tabled(rename = "Port")]
    port: u16,
    #[tabled(rename = "Handle")]
    handle: String,
    #[tabled(rename = "Managed")]
    managed: String,
    #[tabled(rename = "Comment")]
    comment: String,
}

impl From<&Arc<AllowedPort>> for PortRow {
    fn from(p: &Arc<AllowedPort>) -> Self {
        Self {
            port: p.port,
            handle: p.handle.to_string(),
            managed: if p.managed { "yes" } else { "no" }.into(),
            comment: p.comment.clone().unwrap_or_default(),
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    controller: &Controller,
    args: PortsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    util::load_quotas(controller).await?;

    match args.command {
        PortsCommand::List => {
            let mut ports: Vec<_> = controller.store().allowed_ports_snapshot().to_vec();
            ports.sort_by_key(|p| p.port);
            let out = output::render_list(global.output, &ports, |p| PortRow::from(p), |p| {
                p.port.to_string()
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }

        PortsCommand::Add { port } => {
            controller.add_allowed_port(port).await?;
            Ok(())
        }

        PortsCommand::Delete { port } => {
            let entry = controller
                .store()
                .allowed_port(port)
                .ok_or_else(|| CliError::NotFound {
                    resource_type: "allowed port".into(),
                    identifier: port.to_string(),
                    list_command: "ports list".into(),
                })?;
            if !util::confirm(&format!("Remove port {port} from the allowed set?"), global.yes)? {
                return Ok(());
            }
            controller.remove_allowed_port(entry.handle).await?;
            Ok(())
        }
    }
}
