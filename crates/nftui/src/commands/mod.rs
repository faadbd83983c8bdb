//! Command dispatch: bridges CLI args -> controller actions -> output formatting.

pub mod config_cmd;
pub mod forwarding;
pub mod ports;
pub mod quotas;
pub mod util;
pub mod watch;

use nftui_core::Controller;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;
use crate::output;

/// Dispatch a service-bound command to the appropriate handler, then
/// print whatever notifications the actions produced.
pub async fn dispatch(
    cmd: Command,
    controller: &Controller,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let result = match cmd {
        Command::Quotas(args) => quotas::handle(controller, args, global).await,
        Command::Ports(args) => ports::handle(controller, args, global).await,
        Command::Forwarding(args) => forwarding::handle(controller, args, global).await,
        Command::Watch(_) => watch::handle(controller, global).await,
        // Config and Completions are handled before a controller exists
        Command::Config(_) | Command::Completions(_) => Ok(()),
    };

    let color = output::should_color(global.color);
    output::flush_notifications(controller.notifications(), global.quiet, color, result.is_err());
    result
}
