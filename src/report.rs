use anyhow::{Context, Result};
use colored::*;
use console::style;
use serde::Serialize;
use std::fmt::Write as _;

use crate::display_println;
use crate::runner::{ScenarioOutcome, Status};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Pretty,
    Json,
    Tap,
}

impl OutputFormat {
    /// JSON and TAP own stdout
    pub fn is_machine_readable(self) -> bool {
        !matches!(self, OutputFormat::Pretty)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub total: usize,
}

impl Summary {
    pub fn of(outcomes: &[ScenarioOutcome]) -> Self {
        let count = |status| outcomes.iter().filter(|o| o.status == status).count();
        Self {
            passed: count(Status::Passed),
            failed: count(Status::Failed),
            skipped: count(Status::Skipped),
            total: outcomes.len(),
        }
    }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    summary: Summary,
    scenarios: &'a [ScenarioOutcome],
}

pub fn display_results(outcomes: &[ScenarioOutcome], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Pretty => {
            display_println!("{}", render_pretty(outcomes));
        }
        OutputFormat::Json => println!("{}", render_json(outcomes)?),
        OutputFormat::Tap => print!("{}", render_tap(outcomes)),
    }
    Ok(())
}

pub fn render_pretty(outcomes: &[ScenarioOutcome]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "\n{}\n", style("Scenario Results").bold().underlined());

    for outcome in outcomes {
        let status = match outcome.status {
            Status::Passed => "PASS".green().bold(),
            Status::Failed => "FAIL".red().bold(),
            Status::Skipped => "SKIP".yellow().bold(),
        };
        let detail = format!(
            "({}ms, {} commands)",
            outcome.duration.as_millis(),
            outcome.commands
        );
        let _ = writeln!(out, "{} {} {}", status, outcome.name, detail.dimmed());

        if let Some(error) = &outcome.error {
            match outcome.status {
                Status::Skipped => {
                    let _ = writeln!(out, "  {}", error.dimmed());
                }
                _ => {
                    let _ = writeln!(out, "  {}:", "Error".red());
                    for line in error.lines() {
                        let _ = writeln!(out, "    {line}");
                    }
                }
            }
        }
    }

    let summary = Summary::of(outcomes);
    let _ = writeln!(out, "\n{}", style("Summary").bold());
    let _ = writeln!(out, "  {} passed", summary.passed.to_string().green());
    let _ = writeln!(out, "  {} failed", summary.failed.to_string().red());
    let _ = writeln!(out, "  {} skipped", summary.skipped.to_string().yellow());
    let _ = write!(out, "  {} total", summary.total);
    out
}

pub fn render_json(outcomes: &[ScenarioOutcome]) -> Result<String> {
    serde_json::to_string_pretty(&JsonReport {
        summary: Summary::of(outcomes),
        scenarios: outcomes,
    })
    .context("Failed to serialize results")
}

pub fn render_tap(outcomes: &[ScenarioOutcome]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "TAP version 13");
    let _ = writeln!(out, "1..{}", outcomes.len());

    for (i, outcome) in outcomes.iter().enumerate() {
        let n = i + 1;
        match outcome.status {
            Status::Passed => {
                let _ = writeln!(out, "ok {} - {}", n, outcome.name);
            }
            Status::Skipped => {
                let reason = outcome.error.as_deref().unwrap_or("skipped");
                let _ = writeln!(out, "ok {} - {} # SKIP {}", n, outcome.name, reason);
            }
            Status::Failed => {
                let _ = writeln!(out, "not ok {} - {}", n, outcome.name);
                if let Some(error) = &outcome.error {
                    for line in error.lines() {
                        let _ = writeln!(out, "  # {line}");
                    }
                }
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn outcomes() -> Vec<ScenarioOutcome> {
        vec![
            ScenarioOutcome {
                name: "sql_aad_admin".into(),
                status: Status::Passed,
                duration: Duration::from_millis(12),
                commands: 5,
                error: None,
            },
            ScenarioOutcome {
                name: "pipeline".into(),
                status: Status::Failed,
                duration: Duration::from_millis(40),
                commands: 2,
                error: Some("check failed for 'name'\nsecond line".into()),
            },
            ScenarioOutcome {
                name: "data_flow".into(),
                status: Status::Skipped,
                duration: Duration::ZERO,
                commands: 0,
                error: Some("token issuer".into()),
            },
        ]
    }

    #[test]
    fn test_summary_counts() {
        assert_eq!(
            Summary::of(&outcomes()),
            Summary {
                passed: 1,
                failed: 1,
                skipped: 1,
                total: 3
            }
        );
    }

    #[test]
    fn test_tap_output() {
        let tap = render_tap(&outcomes());
        let lines: Vec<_> = tap.lines().collect();
        assert_eq!(
            lines,
            vec![
                "TAP version 13",
                "1..3",
                "ok 1 - sql_aad_admin",
                "not ok 2 - pipeline",
                "  # check failed for 'name'",
                "  # second line",
                "ok 3 - data_flow # SKIP token issuer",
            ]
        );
    }

    #[test]
    fn test_json_output() {
        let json: serde_json::Value = serde_json::from_str(&render_json(&outcomes()).unwrap()).unwrap();
        assert_eq!(json["summary"]["failed"], 1);
        assert_eq!(json["scenarios"][0]["name"], "sql_aad_admin");
        assert_eq!(json["scenarios"][1]["status"], "failed");
        assert_eq!(json["scenarios"][2]["error"], "token issuer");
    }

    #[test]
    fn test_pretty_output_mentions_every_scenario() {
        let pretty = render_pretty(&outcomes());
        for name in ["sql_aad_admin", "pipeline", "data_flow", "PASS", "FAIL", "SKIP", "second line"] {
            assert!(pretty.contains(name), "missing {name}");
        }
    }
}
