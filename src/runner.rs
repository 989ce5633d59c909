use anyhow::Result;
use serde::Serialize;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::config::{RunMode, RunnerConfig};
use crate::error::ScenarioError;
use crate::fixtures::Teardown;
use crate::harness::NameGenerator;
use crate::invoker::{
    AzCliInvoker, Cassette, CommandInvoker, PlaybackInvoker, RecordingInvoker, Scrubber,
};
use crate::scenario::{ContextOptions, Scenario, ScenarioContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Passed,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScenarioOutcome {
    pub name: String,
    pub status: Status,
    pub duration: Duration,
    pub commands: usize,
    /// Failure message or skip reason
    pub error: Option<String>,
}

impl ScenarioOutcome {
    fn skipped(name: &str, reason: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            status: Status::Skipped,
            duration: Duration::ZERO,
            commands: 0,
            error: Some(reason.into()),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.status == Status::Failed
    }
}

/// Where a scenario's commands go for the current run mode
enum Backend {
    Live,
    Record(Arc<RecordingInvoker>),
    Playback,
}

pub struct ScenarioRunner {
    config: RunnerConfig,
    invoker: Arc<dyn CommandInvoker>,
    progress: bool,
}

impl ScenarioRunner {
    pub fn new(config: RunnerConfig) -> Self {
        let invoker = Arc::new(AzCliInvoker::new(config.cli.clone()));
        Self {
            config,
            invoker,
            progress: false,
        }
    }

    /// Use `invoker` instead of the `az` CLI for live and record runs
    pub fn with_invoker(mut self, invoker: Arc<dyn CommandInvoker>) -> Self {
        self.invoker = invoker;
        self
    }

    /// Show spinners while polling
    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Run scenarios one after another; a failure never stops the run
    pub async fn run_sequential(&self, scenarios: &[Box<dyn Scenario>]) -> Vec<ScenarioOutcome> {
        let mut outcomes = Vec::new();

        for scenario in scenarios {
            outcomes.push(self.run_scenario(scenario.as_ref()).await);
        }

        outcomes
    }

    pub async fn run_scenario(&self, scenario: &dyn Scenario) -> ScenarioOutcome {
        let name = scenario.name();

        if let Some(reason) = scenario.skip_reason() {
            info!("Skipping {}: {}", name, reason);
            return ScenarioOutcome::skipped(name, reason);
        }
        if self.config.mode == RunMode::Live && scenario.record_only() {
            info!("Skipping record-only scenario {} in live mode", name);
            return ScenarioOutcome::skipped(name, "record-only scenario skipped in live mode");
        }

        info!("Running scenario: {} ({} mode)", name, self.config.mode);
        let start = Instant::now();

        let scrubber = Arc::new(RwLock::new(
            Scrubber::new().with(self.config.assets_dir.display().to_string(), "$ASSETS"),
        ));

        let (mut ctx, backend) = match self.context_for(name, scrubber).await {
            Ok(prepared) => prepared,
            Err(err) => {
                return ScenarioOutcome {
                    name: name.to_string(),
                    status: Status::Failed,
                    duration: start.elapsed(),
                    commands: 0,
                    error: Some(format!("{err:#}")),
                }
            }
        };

        let mut teardowns = Vec::new();
        let mut result = Ok(());
        for preparer in scenario.preparers() {
            debug!("Provisioning {}", preparer);
            match preparer.create(&mut ctx, &self.config.location).await {
                Ok(teardown) => teardowns.push(teardown),
                Err(err) => {
                    result = Err(err);
                    break;
                }
            }
        }

        if result.is_ok() {
            result = scenario.run(&mut ctx).await;
        }

        if self.config.keep_resources {
            for teardown in &teardowns {
                info!("Keeping {}", teardown.resource);
            }
        } else {
            self.teardown(&ctx, &teardowns).await;
        }

        let mut error = result.err().map(|err: ScenarioError| err.to_string());

        if error.is_none() {
            if let Backend::Record(recorder) = &backend {
                if let Err(err) = self.save_recording(name, &ctx, recorder).await {
                    error = Some(format!("{err:#}"));
                }
            }
        }

        let status = if error.is_some() {
            Status::Failed
        } else {
            Status::Passed
        };
        info!("Finished {}: {:?} in {:?}", name, status, start.elapsed());

        ScenarioOutcome {
            name: name.to_string(),
            status,
            duration: start.elapsed(),
            commands: ctx.commands_issued(),
            error,
        }
    }

    async fn context_for(
        &self,
        name: &str,
        scrubber: Arc<RwLock<Scrubber>>,
    ) -> Result<(ScenarioContext, Backend)> {
        let (invoker, names, backend): (Arc<dyn CommandInvoker>, _, _) = match self.config.mode {
            RunMode::Live => (self.invoker.clone(), NameGenerator::random(), Backend::Live),
            RunMode::Record => {
                let recorder = Arc::new(RecordingInvoker::new(self.invoker.clone(), scrubber.clone()));
                (
                    recorder.clone() as Arc<dyn CommandInvoker>,
                    NameGenerator::random(),
                    Backend::Record(recorder),
                )
            }
            RunMode::Playback => {
                let path = Cassette::path_for(&self.config.recordings_dir, name);
                if !path.exists() {
                    anyhow::bail!(
                        "No recording for {} at {} (run with --mode record first)",
                        name,
                        path.display()
                    );
                }
                let cassette = Cassette::load_from_file(&path).await?;
                debug!(
                    "Loaded {} interactions recorded at {}",
                    cassette.interactions.len(),
                    cassette.recorded_at
                );
                (
                    Arc::new(PlaybackInvoker::new(cassette.interactions, scrubber.clone()))
                        as Arc<dyn CommandInvoker>,
                    NameGenerator::replay(cassette.names),
                    Backend::Playback,
                )
            }
        };

        let options = ContextOptions {
            mode: self.config.mode,
            poll: self.config.poll_policy().with_progress(self.progress),
            overrides: self.config.overrides_for(name),
            names,
            assets_dir: self.config.assets_dir.clone(),
            scrubber,
        };

        Ok((ScenarioContext::new(invoker, options), backend))
    }

    async fn teardown(&self, ctx: &ScenarioContext, teardowns: &[Teardown]) {
        for teardown in teardowns.iter().rev() {
            debug!("Removing {}", teardown.resource);
            if let Err(err) = ctx.run_command(&teardown.command).await {
                warn!("Failed to remove {}: {}", teardown.resource, err);
            }
        }
    }

    async fn save_recording(
        &self,
        name: &str,
        ctx: &ScenarioContext,
        recorder: &RecordingInvoker,
    ) -> Result<()> {
        let mut cassette = Cassette::new(name);
        cassette.names = ctx.generated_names();
        cassette.interactions = recorder.take_interactions().await;

        let path = Cassette::path_for(&self.config.recordings_dir, name);
        cassette.save_to_file(&path).await?;
        info!(
            "Recorded {} interactions to {}",
            cassette.interactions.len(),
            path.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::Check;
    use crate::error::ScenarioResult;
    use crate::fixtures::Preparer;
    use crate::harness::CommandLine;
    use crate::invoker::CommandOutput;
    use async_trait::async_trait;
    use tempfile::TempDir;

    /// Answers `show` with a workspace document and everything else with `{}`
    struct FakeCloud;

    #[async_trait]
    impl CommandInvoker for FakeCloud {
        async fn invoke(&self, command: &CommandLine) -> ScenarioResult<CommandOutput> {
            if command.args().iter().any(|a| a == "show") {
                Ok(CommandOutput::success(r#"{"name": "zes0508test", "state": "Online"}"#))
            } else {
                Ok(CommandOutput::success("{}"))
            }
        }

        fn name(&self) -> &str {
            "fake"
        }
    }

    struct ShowWorkspace {
        expected_state: &'static str,
        record_only: bool,
        fixtures: bool,
    }

    #[async_trait]
    impl Scenario for ShowWorkspace {
        fn name(&self) -> &'static str {
            "show_workspace"
        }

        fn description(&self) -> &'static str {
            "shows a workspace"
        }

        fn preparers(&self) -> Vec<Preparer> {
            if self.fixtures {
                vec![Preparer::resource_group()]
            } else {
                Vec::new()
            }
        }

        fn record_only(&self) -> bool {
            self.record_only
        }

        async fn run(&self, ctx: &mut ScenarioContext) -> ScenarioResult<()> {
            ctx.defaults([("workspace", "zes0508test"), ("state", self.expected_state)]);
            ctx.cmd(
                "az synapse workspace show --name {workspace}",
                &[Check::equals("name", "{workspace}"), Check::equals("state", "{state}")],
            )
            .await?;
            Ok(())
        }
    }

    fn scenario(expected_state: &'static str) -> ShowWorkspace {
        ShowWorkspace {
            expected_state,
            record_only: true,
            fixtures: true,
        }
    }

    fn config(mode: RunMode, dir: &TempDir) -> RunnerConfig {
        RunnerConfig {
            mode,
            recordings_dir: dir.path().to_path_buf(),
            ..RunnerConfig::default()
        }
    }

    #[tokio::test]
    async fn test_record_then_playback() {
        let dir = TempDir::new().unwrap();

        let recorder = ScenarioRunner::new(config(RunMode::Record, &dir)).with_invoker(Arc::new(FakeCloud));
        let outcome = recorder.run_scenario(&scenario("Online")).await;
        assert_eq!(outcome.status, Status::Passed, "{:?}", outcome.error);
        // group create, show, group delete
        assert_eq!(outcome.commands, 3);

        let cassette = Cassette::load_from_file(Cassette::path_for(dir.path(), "show_workspace"))
            .await
            .unwrap();
        assert_eq!(cassette.names.len(), 1);
        assert_eq!(cassette.interactions.len(), 3);

        let player = ScenarioRunner::new(config(RunMode::Playback, &dir));
        let outcome = player.run_scenario(&scenario("Online")).await;
        assert_eq!(outcome.status, Status::Passed, "{:?}", outcome.error);
        assert_eq!(outcome.commands, 3);
    }

    #[tokio::test]
    async fn test_failed_check_is_reported_and_not_recorded() {
        let dir = TempDir::new().unwrap();
        let runner = ScenarioRunner::new(config(RunMode::Record, &dir)).with_invoker(Arc::new(FakeCloud));

        let outcome = runner.run_scenario(&scenario("Paused")).await;
        assert!(outcome.is_failure());
        assert!(outcome.error.unwrap().contains("state"));
        assert!(!Cassette::path_for(dir.path(), "show_workspace").exists());
    }

    #[tokio::test]
    async fn test_playback_without_recording_fails() {
        let dir = TempDir::new().unwrap();
        let outcome = ScenarioRunner::new(config(RunMode::Playback, &dir))
            .run_scenario(&scenario("Online"))
            .await;
        assert!(outcome.is_failure());
        assert!(outcome.error.unwrap().contains("No recording"));
    }

    #[tokio::test]
    async fn test_live_mode_skips_record_only() {
        let dir = TempDir::new().unwrap();
        let runner = ScenarioRunner::new(config(RunMode::Live, &dir)).with_invoker(Arc::new(FakeCloud));

        let outcome = runner.run_scenario(&scenario("Online")).await;
        assert_eq!(outcome.status, Status::Skipped);

        let live = ShowWorkspace {
            expected_state: "Online",
            record_only: false,
            fixtures: false,
        };
        let outcome = runner.run_scenario(&live).await;
        assert_eq!(outcome.status, Status::Passed);
        assert_eq!(outcome.commands, 1);
    }

    #[tokio::test]
    async fn test_keep_resources_skips_teardown() {
        let dir = TempDir::new().unwrap();
        let mut cfg = config(RunMode::Record, &dir);
        cfg.keep_resources = true;
        let runner = ScenarioRunner::new(cfg).with_invoker(Arc::new(FakeCloud));

        let outcome = runner.run_scenario(&scenario("Online")).await;
        assert_eq!(outcome.status, Status::Passed);
        assert_eq!(outcome.commands, 2);
    }

    #[tokio::test]
    async fn test_run_sequential_continues_after_failure() {
        let dir = TempDir::new().unwrap();
        let runner = ScenarioRunner::new(config(RunMode::Record, &dir)).with_invoker(Arc::new(FakeCloud));

        let scenarios: Vec<Box<dyn Scenario>> =
            vec![Box::new(scenario("Paused")), Box::new(scenario("Online"))];
        let outcomes = runner.run_sequential(&scenarios).await;
        let statuses: Vec<_> = outcomes.iter().map(|o| o.status).collect();
        assert_eq!(statuses, vec![Status::Failed, Status::Passed]);
    }
}
