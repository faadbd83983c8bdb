//! Live quota view driven by the background refresh task.

use std::sync::Arc;

use chrono::{DateTime, Local, Utc};
use serde::Serialize;

use nftui_core::{Controller, ControllerConfig, Quota};

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::config;
use crate::error::CliError;
use crate::output;

use super::{quotas, util};

/// One emitted refresh, for structured output formats.
#[derive(Serialize)]
struct Frame<'a> {
    refreshed_at: Option<DateTime<Utc>>,
    read_only: bool,
    refresh_interval: u64,
    quotas: &'a [Arc<Quota>],
}

/// Apply `watch` flags to the controller config before it is built.
pub fn apply_args(args: &WatchArgs, config: &mut ControllerConfig) {
    if args.quotas_only {
        config.poll_forwarding = false;
    }
    if let Some(secs) = args.interval {
        config.refresh_interval_secs = secs;
    }
}

pub async fn handle(controller: &Controller, global: &GlobalOpts) -> Result<(), CliError> {
    util::load_quotas(controller).await?;
    if controller.config().poll_forwarding {
        controller.load_forwarding_rules().await;
    }

    if !global.quiet {
        eprintln!(
            "Watching {} (auth: {}), Ctrl-C to stop",
            controller.config().url,
            config::describe_auth(controller.config().auth.as_ref())
        );
    }

    let color = output::should_color(global.color);
    let mut view = controller.store().quota_view();
    let mut errors = controller.store().subscribe_error();
    controller.start().await;

    print_frame(controller, global, &view.get(), color);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            next = view.changed() => {
                let Some(sorted) = next else { break };
                print_frame(controller, global, &sorted, color);
            }
            Ok(()) = errors.changed() => {
                if let Some(message) = errors.borrow_and_update().clone() {
                    tracing::warn!(error = %message, "refresh failed");
                    controller.notifications().warning(format!("Refresh failed: {message}"));
                }
            }
        }
        output::flush_notifications(controller.notifications(), global.quiet, color, false);
    }

    Ok(())
}

fn print_frame(controller: &Controller, global: &GlobalOpts, sorted: &[Arc<Quota>], color: bool) {
    let store = controller.store();
    let rendered = match global.output {
        OutputFormat::Table | OutputFormat::Plain => {
            let stamp = store.last_quota_refresh().map_or_else(
                || "never".into(),
                |t| t.with_timezone(&Local).format("%H:%M:%S").to_string(),
            );
            let mode = if store.read_only() { ", read-only" } else { "" };
            format!(
                "── {stamp} ({} quotas{mode}) ──\n{}",
                sorted.len(),
                quotas::render(global.output, sorted, color)
            )
        }
        OutputFormat::Json | OutputFormat::JsonCompact | OutputFormat::Yaml => {
            let frame = Frame {
                refreshed_at: store.last_quota_refresh(),
                read_only: store.read_only(),
                refresh_interval: store.refresh_interval(),
                quotas: sorted,
            };
            // One frame per line so the stream stays parseable.
            let format = if matches!(global.output, OutputFormat::Yaml) {
                OutputFormat::Yaml
            } else {
                OutputFormat::JsonCompact
            };
            output::render_value(format, &frame)
        }
    };
    output::print_output(&rendered, global.quiet);
}
