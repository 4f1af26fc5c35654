//! Output rendering.

use crate::simulate::SimulationReport;
use goldtrace::GoldConfig;
use serde::Serialize;

/// How results are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Text for a terminal
    Human,
    /// One JSON document
    Json,
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e))
}

/// Render the effective configuration.
pub fn format_init(config: &GoldConfig, mode: OutputMode) -> Result<String, String> {
    match mode {
        OutputMode::Json => Ok(to_json(config)),
        OutputMode::Human => config.to_toml_string().map_err(|e| e.to_string()),
    }
}

/// Render a simulation report.
pub fn format_simulation(report: &SimulationReport, mode: OutputMode) -> String {
    if mode == OutputMode::Json {
        return to_json(report);
    }
    let mut out = String::new();
    out.push_str(&format!(
        "commits: {} ({} with data, {} entries)\n",
        report.commits, report.commits_with_data, report.entries_written
    ));
    out.push_str(&format!(
        "dense tile: {} commits spanning {}\n",
        report.dense_commits, report.spanned_commits
    ));
    if let (Some(first), Some(last)) = (&report.first_dense_commit, &report.last_dense_commit) {
        out.push_str(&format!("  from {} to {}\n", short(first), short(last)));
    }
    out.push_str(&format!(
        "traces: {} ({} after {} ignore rules)\n",
        report.traces, report.traces_without_ignored, report.ignore_rules
    ));
    for row in &report.dump {
        let digests: Vec<&str> = row
            .digests
            .iter()
            .map(|d| if d.is_empty() { "-" } else { short(d) })
            .collect();
        let marker = if row.ignored { "  (ignored)" } else { "" };
        out.push_str(&format!("{}{}\n  {}\n", row.id, marker, digests.join(" ")));
    }
    out
}

fn short(s: &str) -> &str {
    s.get(..8).unwrap_or(s)
}
