//! Output formatting: table, JSON, YAML, plain.
//!
//! Renders data in the format selected by `--output`. Table uses `tabled`,
//! structured formats use serde, plain emits one identifier per line.

use std::io::{self, IsTerminal, Write};

use bytesize::ByteSize;
use owo_colors::OwoColorize;
use tabled::{Table, Tabled, settings::Style};

use nftui_core::{NotificationQueue, QuotaStatus, Severity};

use crate::cli::{ColorMode, OutputFormat};

// ── Color helpers ────────────────────────────────────────────────────

/// Determine whether color output should be enabled.
pub fn should_color(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

/// Quota status label, colored by severity when enabled.
pub fn status_label(status: QuotaStatus, color: bool) -> String {
    let label = status.to_string();
    if !color {
        return label;
    }
    match status {
        QuotaStatus::Ok => label.green().to_string(),
        QuotaStatus::Warning => label.yellow().to_string(),
        QuotaStatus::Exceeded => label.red().bold().to_string(),
    }
}

/// Human-readable byte count.
pub fn bytes(n: u64) -> String {
    ByteSize::b(n).to_string()
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a list of serde-serializable + tabled items in the chosen format.
///
/// - `table`: uses the `Tabled` derive to build a pretty table
/// - `json` / `json-compact`: serializes the original data via serde
/// - `yaml`: serializes via serde_yaml
/// - `plain`: calls `id_fn` on each item to emit one identifier per line
pub fn render_list<T, R>(
    format: OutputFormat,
    data: &[T],
    to_row: impl Fn(&T) -> R,
    id_fn: impl Fn(&T) -> String,
) -> String
where
    T: serde::Serialize,
    R: Tabled,
{
    match format {
        OutputFormat::Table => {
            let rows: Vec<R> = data.iter().map(to_row).collect();
            render_table(&rows)
        }
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => data.iter().map(&id_fn).collect::<Vec<_>>().join("\n"),
    }
}

/// Render a single serializable value. Table and plain fall back to pretty JSON.
pub fn render_value<T: serde::Serialize + ?Sized>(format: OutputFormat, data: &T) -> String {
    match format {
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Table | OutputFormat::Json | OutputFormat::Plain => render_json(data, false),
    }
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

/// Print queued notifications to stderr and dismiss them.
///
/// Errors are skipped when `skip_errors` is set, since the returned
/// error report already carries the same message.
pub fn flush_notifications(queue: &NotificationQueue, quiet: bool, color: bool, skip_errors: bool) {
    let mut stderr = io::stderr().lock();
    for n in queue.snapshot().iter() {
        queue.dismiss(n.id);
        let is_error = n.severity == Severity::Error;
        if (is_error && skip_errors) || (quiet && !is_error) {
            continue;
        }
        let _ = writeln!(stderr, "{}", notification_line(n.severity, &n.message, color));
    }
}

fn notification_line(severity: Severity, message: &str, color: bool) -> String {
    let marker = match severity {
        Severity::Success => "✓",
        Severity::Info => "•",
        Severity::Warning => "!",
        Severity::Error => "✗",
    };
    if !color {
        return format!("{marker} {message}");
    }
    match severity {
        Severity::Success => format!("{} {message}", marker.green()),
        Severity::Info => format!("{} {message}", marker.cyan()),
        Severity::Warning => format!("{} {message}", marker.yellow()),
        Severity::Error => format!("{} {message}", marker.red()),
    }
}

// ── Format-specific renderers ────────────────────────────────────────

fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

fn render_json<T: serde::Serialize + ?Sized>(data: &T, compact: bool) -> String {
    let result = if compact {
        serde_json::to_string(data)
    } else {
        serde_json::to_string_pretty(data)
    };
    result.unwrap_or_else(|e| format!("{{\"error\": \"serialization failed: {e}\"}}"))
}

fn render_yaml<T: serde::Serialize + ?Sized>(data: &T) -> String {
    serde_yaml::to_string(data).unwrap_or_else(|e| format!("error: serialization failed: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(serde::Serialize, Tabled)]
    struct Row {
        id: String,
    }

    fn rows() -> Vec<Row> {
        vec![Row { id: "a".into() }, Row { id: "b".into() }]
    }

    #[test]
    fn plain_emits_one_id_per_line() {
        let out = render_list(OutputFormat::Plain, &rows(), |r| Row { id: r.id.clone() }, |r| r.id.clone());
        assert_eq!(out, "a\nb");
    }

    #[test]
    fn compact_json_is_single_line() {
        let out = render_list(OutputFormat::JsonCompact, &rows(), |r| Row { id: r.id.clone() }, |r| r.id.clone());
        assert_eq!(out, r#"[{"id":"a"},{"id":"b"}]"#);
    }

    #[test]
    fn uncolored_labels_are_plain() {
        assert_eq!(status_label(QuotaStatus::Exceeded, false), "exceeded");
        assert_eq!(notification_line(Severity::Error, "boom", false), "✗ boom");
    }
}
