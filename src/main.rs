use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use console::style;
use serde_json::Value;
use std::path::PathBuf;
use tracing::warn;

use synapse_scenarios::checks::{self, Query};
use synapse_scenarios::config::{RunMode, RunnerConfig};
use synapse_scenarios::report::{self, OutputFormat};
use synapse_scenarios::scenario::{registry, Scenario};
use synapse_scenarios::{display_println, output, ScenarioRunner};

#[derive(Parser)]
#[command(name = "synapse-scenarios")]
#[command(
    about = "Scenario tests for the az synapse command-line interface",
    long_about = "Runs end-to-end scenarios against the az synapse CLI.\n\n\
                  Scenarios run live against Azure, record their command interactions,\n\
                  or replay earlier recordings offline.\n\n\
                  EXAMPLES:\n  \
                  synapse-scenarios list\n  \
                  synapse-scenarios run --filter 'sql_*' --mode record\n  \
                  synapse-scenarios run --mode playback --output tap\n  \
                  synapse-scenarios query workspace.json 'tags.key1' --expect '\"value1\"'"
)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List scenarios with their fixtures and skip reasons
    List {
        /// Substring or glob pattern on scenario names
        #[arg(short, long)]
        filter: Option<String>,
    },

    /// Describe one scenario
    Show {
        /// Scenario name
        name: String,
    },

    /// Run scenarios sequentially and report the outcome
    Run {
        /// Substring or glob pattern on scenario names
        #[arg(short, long)]
        filter: Option<String>,

        /// Where command output comes from
        #[arg(long, value_enum)]
        mode: Option<RunMode>,

        /// Report format
        #[arg(long, value_enum, default_value = "pretty")]
        output: OutputFormat,

        /// Directory holding recordings
        #[arg(long)]
        recordings: Option<PathBuf>,

        /// Path to the az executable
        #[arg(long)]
        cli: Option<PathBuf>,

        /// Leave fixture resources in place
        #[arg(long)]
        keep_resources: bool,
    },

    /// Evaluate a query against a JSON file
    Query {
        /// JSON document
        file: PathBuf,

        /// Query expression, e.g. `tags.key1` or `length([])`
        query: String,

        /// Expected value as JSON; bare text is taken as a string
        #[arg(long)]
        expect: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let output_mode = match &cli.command {
        Commands::Run { output, .. } if output.is_machine_readable() => output::OutputMode::Report,
        _ => output::OutputMode::Cli,
    };
    output::init_with_verbosity(output_mode, cli.verbose);

    let mut config = RunnerConfig::load(cli.config.as_deref()).await?;

    match cli.command {
        Commands::List { filter } => {
            let scenarios = registry::select(filter.as_deref())?;
            if scenarios.is_empty() {
                display_println!("No scenarios match");
            }
            for scenario in &scenarios {
                print_summary_line(scenario.as_ref());
            }
        }

        Commands::Show { name } => {
            let scenario = registry::find(&name)
                .with_context(|| format!("Unknown scenario: {name}"))?;
            print_details(scenario.as_ref());
        }

        Commands::Run {
            filter,
            mode,
            output,
            recordings,
            cli: executable,
            keep_resources,
        } => {
            if let Some(mode) = mode {
                config.mode = mode;
            }
            if let Some(dir) = recordings {
                config.recordings_dir = dir;
            }
            if let Some(executable) = executable {
                config.cli.executable = executable;
            }
            config.keep_resources |= keep_resources;

            let scenarios = registry::select(filter.as_deref())?;
            if scenarios.is_empty() {
                warn!("No scenarios match the filter");
                return Ok(());
            }

            let progress = output == OutputFormat::Pretty && output::is_interactive();
            let runner = ScenarioRunner::new(config).with_progress(progress);
            let outcomes = runner.run_sequential(&scenarios).await;

            report::display_results(&outcomes, output)?;

            if outcomes.iter().any(|outcome| outcome.is_failure()) {
                std::process::exit(1);
            }
        }

        Commands::Query {
            file,
            query,
            expect,
        } => {
            let contents = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let document: Value = serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse JSON in {}", file.display()))?;

            let actual = Query::parse(&query)?.evaluate(&document)?;
            display_println!("{}", serde_json::to_string_pretty(&actual)?);

            if let Some(expect) = expect {
                let expected: Value =
                    serde_json::from_str(&expect).unwrap_or(Value::String(expect));
                if !checks::loosely_equal(&actual, &expected, false) {
                    anyhow::bail!(
                        "'{}' evaluated to {} but {} was expected",
                        query,
                        checks::display(&actual),
                        checks::display(&expected)
                    );
                }
                display_println!("{} matches", style("✓").green().bold());
            }
        }
    }

    Ok(())
}

fn print_summary_line(scenario: &dyn Scenario) {
    let fixtures: Vec<String> = scenario.preparers().iter().map(|p| p.to_string()).collect();
    let mut notes = Vec::new();
    if !fixtures.is_empty() {
        notes.push(fixtures.join(", "));
    }
    if scenario.record_only() {
        notes.push("record-only".to_string());
    }
    if !scenario.tags().is_empty() {
        notes.push(scenario.tags().join(" "));
    }

    display_println!(
        "{} {}",
        style(scenario.name()).cyan().bold(),
        style(notes.join(" | ")).dim()
    );
    if let Some(reason) = scenario.skip_reason() {
        display_println!("    {} {}", style("skipped:").yellow(), reason);
    }
}

fn print_details(scenario: &dyn Scenario) {
    display_println!("{}", style(scenario.name()).cyan().bold());
    display_println!("  {}", scenario.description());

    let preparers = scenario.preparers();
    if preparers.is_empty() {
        display_println!("  {} none (uses existing resources)", style("fixtures:").bold());
    } else {
        display_println!("  {}", style("fixtures:").bold());
        for preparer in preparers {
            display_println!("    - {} -> {{{}}}", preparer, preparer.key());
        }
    }

    display_println!(
        "  {} {}",
        style("record-only:").bold(),
        if scenario.record_only() { "yes" } else { "no" }
    );
    if !scenario.tags().is_empty() {
        display_println!("  {} {}", style("tags:").bold(), scenario.tags().join(", "));
    }
    if let Some(reason) = scenario.skip_reason() {
        display_println!("  {} {}", style("skipped:").yellow().bold(), reason);
    }
}
