//! Scenario definitions and the context they execute in

use async_trait::async_trait;
use once_cell::sync::OnceCell;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tempfile::TempDir;
use tracing::debug;

pub mod registry;

use crate::checks::{self, Check, Query};
use crate::config::RunMode;
use crate::error::{ScenarioError, ScenarioResult};
use crate::fixtures::Preparer;
use crate::harness::{CommandLine, Kwargs, NameGenerator};
use crate::invoker::{CommandInvoker, CommandOutput, Scrubber};
use crate::poll::{poll_until, PollPolicy, Attempt};

/// One end-to-end test against the CLI
#[async_trait]
pub trait Scenario: Send + Sync {
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// Fixtures provisioned before `run`, in order
    fn preparers(&self) -> Vec<Preparer> {
        Vec::new()
    }

    /// Depends on pre-existing resources or recorded state; skipped in live mode
    fn record_only(&self) -> bool {
        true
    }

    fn skip_reason(&self) -> Option<&'static str> {
        None
    }

    fn tags(&self) -> &'static [&'static str] {
        &[]
    }

    async fn run(&self, ctx: &mut ScenarioContext) -> ScenarioResult<()>;
}

/// A command together with its captured output
#[derive(Debug)]
pub struct ExecutionResult {
    pub command: CommandLine,
    pub output: CommandOutput,
    decoded: OnceCell<Value>,
}

impl ExecutionResult {
    pub fn new(command: CommandLine, output: CommandOutput) -> Self {
        Self {
            command,
            output,
            decoded: OnceCell::new(),
        }
    }

    /// Decoded stdout, parsed on first use
    pub fn json(&self) -> ScenarioResult<&Value> {
        self.decoded
            .get_or_try_init(|| self.output.json(&self.command))
    }

    /// Evaluate a query against the decoded output
    pub fn field(&self, query: &str) -> ScenarioResult<Value> {
        Query::parse(query)?.evaluate(self.json()?)
    }

    /// A queried value rendered as text, failing when it is missing
    pub fn text(&self, query: &str) -> ScenarioResult<String> {
        match self.field(query)? {
            Value::Null => Err(ScenarioError::Assertion(format!(
                "'{}' is missing from the output of `{}`",
                query, self.command
            ))),
            value => Ok(checks::display(&value)),
        }
    }
}

/// Knobs the runner sets when it builds a context
#[derive(Debug, Clone)]
pub struct ContextOptions {
    pub mode: RunMode,
    pub poll: PollPolicy,
    pub overrides: Kwargs,
    pub names: NameGenerator,
    pub assets_dir: PathBuf,
    pub scrubber: Arc<RwLock<Scrubber>>,
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self {
            mode: RunMode::Playback,
            poll: PollPolicy::default(),
            overrides: Kwargs::new(),
            names: NameGenerator::random(),
            assets_dir: PathBuf::from("assets"),
            scrubber: Arc::new(RwLock::new(Scrubber::new())),
        }
    }
}

/// State for one scenario execution: keyword arguments, names, the invoker
pub struct ScenarioContext {
    kwargs: Kwargs,
    overrides: Kwargs,
    names: NameGenerator,
    invoker: Arc<dyn CommandInvoker>,
    scrubber: Arc<RwLock<Scrubber>>,
    mode: RunMode,
    poll: PollPolicy,
    assets_dir: PathBuf,
    temp_dirs: Vec<TempDir>,
    commands: AtomicUsize,
}

impl ScenarioContext {
    pub fn new(invoker: Arc<dyn CommandInvoker>, options: ContextOptions) -> Self {
        let poll = if options.mode == RunMode::Playback {
            options.poll.immediate().with_progress(false)
        } else {
            options.poll
        };

        Self {
            kwargs: Kwargs::new(),
            overrides: options.overrides,
            names: options.names,
            invoker,
            scrubber: options.scrubber,
            mode: options.mode,
            poll,
            assets_dir: options.assets_dir,
            temp_dirs: Vec::new(),
            commands: AtomicUsize::new(0),
        }
    }

    pub fn mode(&self) -> RunMode {
        self.mode
    }

    pub fn is_live_or_recording(&self) -> bool {
        self.mode.is_live_or_recording()
    }

    pub fn kwargs(&self) -> &Kwargs {
        &self.kwargs
    }

    /// Set a keyword unconditionally
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.kwargs.insert(key, value);
    }

    /// Set keywords, letting configured overrides win
    pub fn defaults<K, V, I>(&mut self, pairs: I)
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        for (key, value) in pairs {
            let key = key.into();
            match self.overrides.get(&key) {
                Some(overridden) => {
                    let overridden = overridden.clone();
                    self.kwargs.insert(key, overridden);
                }
                None => self.kwargs.insert(key, value),
            }
        }
    }

    pub fn text(&self, key: &str) -> ScenarioResult<String> {
        self.kwargs.text(key)
    }

    pub fn random_name(&mut self, prefix: &str, length: usize) -> ScenarioResult<String> {
        self.names.create(prefix, length)
    }

    /// Names generated so far (recorded alongside interactions)
    pub fn generated_names(&self) -> Vec<String> {
        self.names.generated().to_vec()
    }

    pub fn commands_issued(&self) -> usize {
        self.commands.load(Ordering::Relaxed)
    }

    /// Absolute path of a bundled asset file
    pub fn asset(&self, file: &str) -> String {
        self.assets_dir.join(file).display().to_string()
    }

    pub fn assets_dir(&self) -> &Path {
        &self.assets_dir
    }

    /// Register machine-specific text that recordings store as `placeholder`
    pub fn scrub(&self, actual: impl Into<String>, placeholder: impl Into<String>) {
        match self.scrubber.write() {
            Ok(mut scrubber) => scrubber.add(actual, placeholder),
            Err(poisoned) => poisoned.into_inner().add(actual, placeholder),
        }
    }

    /// A temporary directory that lives as long as the context
    pub fn temp_dir(&mut self) -> ScenarioResult<PathBuf> {
        let dir = TempDir::new().map_err(|source| ScenarioError::Io {
            context: "Failed to create temporary directory".to_string(),
            source,
        })?;
        let path = dir.path().to_path_buf();
        self.scrub(
            path.display().to_string(),
            format!("$TEMP{}", self.temp_dirs.len()),
        );
        self.temp_dirs.push(dir);
        Ok(path)
    }

    /// Run a command; fail on a non-zero exit or a failing check
    pub async fn cmd(&self, template: &str, checks: &[Check]) -> ScenarioResult<ExecutionResult> {
        let result = self.execute(template).await?;
        self.ensure_success(&result)?;
        self.verify(&result, checks)?;
        Ok(result)
    }

    /// Run a command that must fail
    pub async fn cmd_expect_failure(&self, template: &str) -> ScenarioResult<CommandOutput> {
        let result = self.execute(template).await?;
        if result.output.is_success() {
            return Err(ScenarioError::UnexpectedSuccess {
                command: result.command.to_string(),
            });
        }
        Ok(result.output)
    }

    /// Re-run a command until it succeeds and every check passes
    pub async fn wait_for(
        &self,
        template: &str,
        checks: &[Check],
        timeout: Duration,
    ) -> ScenarioResult<ExecutionResult> {
        let condition = self.condition(template, "to pass its checks");
        poll_until(&condition, self.poll.with_timeout(timeout), move || async move {
            let result = self.execute(template).await?;
            if !result.output.is_success() {
                return Ok(Attempt::Pending(first_line(&result.output.stderr)));
            }
            match self.verify(&result, checks) {
                Ok(()) => Ok(Attempt::Ready(result)),
                Err(err @ ScenarioError::CheckFailed { .. }) => Ok(Attempt::Pending(err.to_string())),
                Err(err) => Err(err),
            }
        })
        .await
    }

    /// Re-run a command until it fails, e.g. after a deletion
    pub async fn wait_until_fails(&self, template: &str, timeout: Duration) -> ScenarioResult<()> {
        let condition = self.condition(template, "to fail");
        poll_until(&condition, self.poll.with_timeout(timeout), move || async move {
            let result = self.execute(template).await?;
            Ok(if result.output.is_success() {
                Attempt::Pending("command still succeeds".to_string())
            } else {
                Attempt::Ready(())
            })
        })
        .await
    }

    /// Re-run a command until it succeeds
    pub async fn wait_until_succeeds(
        &self,
        template: &str,
        timeout: Duration,
    ) -> ScenarioResult<ExecutionResult> {
        self.wait_for(template, &[], timeout).await
    }

    /// Sleep for `duration` when talking to the cloud; no-op in playback
    pub async fn settle(&self, duration: Duration) {
        if self.is_live_or_recording() {
            debug!("Settling for {:?}", duration);
            tokio::time::sleep(duration).await;
        }
    }

    /// Run an already rendered command, failing on a non-zero exit
    pub async fn run_command(&self, command: &CommandLine) -> ScenarioResult<ExecutionResult> {
        let output = self.invoke(command).await?;
        let result = ExecutionResult::new(command.clone(), output);
        self.ensure_success(&result)?;
        Ok(result)
    }

    async fn execute(&self, template: &str) -> ScenarioResult<ExecutionResult> {
        let rendered = self.kwargs.render(template)?;
        let command = CommandLine::parse(&rendered)?;
        let output = self.invoke(&command).await?;
        Ok(ExecutionResult::new(command, output))
    }

    async fn invoke(&self, command: &CommandLine) -> ScenarioResult<CommandOutput> {
        let index = self.commands.fetch_add(1, Ordering::Relaxed) + 1;
        debug!("[{}] {}", index, command);
        let output = self.invoker.invoke(command).await?;
        debug!("[{}] exit code {}", index, output.exit_code);
        Ok(output)
    }

    fn ensure_success(&self, result: &ExecutionResult) -> ScenarioResult<()> {
        if result.output.is_success() {
            Ok(())
        } else {
            Err(ScenarioError::CommandFailed {
                command: result.command.to_string(),
                exit_code: result.output.exit_code,
                stderr: result.output.stderr.trim().to_string(),
            })
        }
    }

    fn verify(&self, result: &ExecutionResult, checks: &[Check]) -> ScenarioResult<()> {
        if checks.is_empty() {
            return Ok(());
        }
        checks::verify_all(
            checks,
            &result.command.to_string(),
            result.json()?,
            &self.kwargs,
        )
    }

    fn condition(&self, template: &str, what: &str) -> String {
        let command = self
            .kwargs
            .render(template)
            .unwrap_or_else(|_| template.to_string());
        format!("`{command}` {what}")
    }
}

fn first_line(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("command failed")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::VecDeque;
    use tokio::sync::Mutex;

    /// Serves canned outputs and remembers the commands it saw
    struct Scripted {
        outputs: Mutex<VecDeque<CommandOutput>>,
        seen: Mutex<Vec<String>>,
    }

    impl Scripted {
        fn new(outputs: Vec<CommandOutput>) -> Arc<Self> {
            Arc::new(Self {
                outputs: Mutex::new(outputs.into()),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl CommandInvoker for Scripted {
        async fn invoke(&self, command: &CommandLine) -> ScenarioResult<CommandOutput> {
            self.seen.lock().await.push(command.to_string());
            self.outputs
                .lock()
                .await
                .pop_front()
                .ok_or_else(|| ScenarioError::CassetteExhausted {
                    command: command.to_string(),
                })
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    fn context(invoker: Arc<Scripted>) -> ScenarioContext {
        let mut ctx = ScenarioContext::new(invoker, ContextOptions::default());
        ctx.set("workspace", "clitest000001");
        ctx.set("rg", "synapse-cli000002");
        ctx
    }

    #[tokio::test]
    async fn test_cmd_renders_runs_and_checks() {
        let invoker = Scripted::new(vec![CommandOutput::success(
            r#"{"name": "clitest000001", "provisioningState": "Succeeded", "id": "/subs/x"}"#,
        )]);
        let ctx = context(invoker.clone());

        let result = ctx
            .cmd(
                "az synapse workspace show --name {workspace} --resource-group {rg}",
                &[
                    Check::equals("name", "{workspace}"),
                    Check::equals("provisioningState", "Succeeded"),
                ],
            )
            .await
            .unwrap();

        assert_eq!(result.text("id").unwrap(), "/subs/x");
        assert_eq!(ctx.commands_issued(), 1);
        assert_eq!(
            invoker.seen.lock().await[0],
            "az synapse workspace show --name clitest000001 --resource-group synapse-cli000002"
        );
    }

    #[tokio::test]
    async fn test_cmd_reports_failures() {
        let invoker = Scripted::new(vec![
            CommandOutput::failure(1, "ERROR: (ResourceNotFound)\nmore"),
            CommandOutput::success(r#"{"name": "other"}"#),
        ]);
        let ctx = context(invoker);

        let err = ctx.cmd("az synapse workspace show --name {workspace}", &[]).await.unwrap_err();
        assert!(matches!(err, ScenarioError::CommandFailed { exit_code: 1, .. }));

        let err = ctx
            .cmd("az synapse workspace show --name {workspace}", &[Check::equals("name", "{workspace}")])
            .await
            .unwrap_err();
        assert!(matches!(err, ScenarioError::CheckFailed { .. }));
    }

    #[tokio::test]
    async fn test_missing_keyword_issues_nothing() {
        let invoker = Scripted::new(vec![]);
        let ctx = context(invoker.clone());
        let err = ctx.cmd("az synapse pipeline show --name {pipeline}", &[]).await.unwrap_err();
        assert!(matches!(err, ScenarioError::MissingKeyword { .. }));
        assert!(invoker.seen.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_cmd_expect_failure() {
        let invoker = Scripted::new(vec![
            CommandOutput::failure(3, "not found"),
            CommandOutput::success("{}"),
        ]);
        let ctx = context(invoker);

        let output = ctx
            .cmd_expect_failure("az synapse workspace show --name {workspace}")
            .await
            .unwrap();
        assert_eq!(output.exit_code, 3);

        let err = ctx
            .cmd_expect_failure("az synapse workspace show --name {workspace}")
            .await
            .unwrap_err();
        assert!(matches!(err, ScenarioError::UnexpectedSuccess { .. }));
    }

    #[tokio::test]
    async fn test_wait_for_polls_until_checks_pass() {
        let invoker = Scripted::new(vec![
            CommandOutput::failure(1, "not yet"),
            CommandOutput::success(r#"{"state": "starting"}"#),
            CommandOutput::success(r#"{"state": "idle"}"#),
        ]);
        let ctx = context(invoker);

        let result = ctx
            .wait_for(
                "az synapse spark session show --workspace-name {workspace}",
                &[Check::equals("state", "idle")],
                Duration::from_secs(30),
            )
            .await
            .unwrap();
        assert_eq!(result.json().unwrap(), &json!({"state": "idle"}));
        assert_eq!(ctx.commands_issued(), 3);
    }

    #[tokio::test]
    async fn test_wait_until_fails_and_exhaustion() {
        let invoker = Scripted::new(vec![
            CommandOutput::success("{}"),
            CommandOutput::failure(3, "gone"),
        ]);
        let ctx = context(invoker);
        ctx.wait_until_fails("az synapse workspace show --name {workspace}", Duration::from_secs(30))
            .await
            .unwrap();

        let err = ctx
            .wait_until_succeeds("az synapse workspace show --name {workspace}", Duration::from_secs(30))
            .await
            .unwrap_err();
        assert!(matches!(err, ScenarioError::CassetteExhausted { .. }));
    }

    #[test]
    fn test_defaults_respect_overrides() {
        let options = ContextOptions {
            overrides: [("workspace", json!("myworkspace"))].into_iter().collect(),
            ..ContextOptions::default()
        };
        let mut ctx = ScenarioContext::new(Scripted::new(vec![]), options);
        ctx.defaults([("workspace", "zes0508test"), ("rg", "chayang-test-rg")]);
        assert_eq!(ctx.text("workspace").unwrap(), "myworkspace");
        assert_eq!(ctx.text("rg").unwrap(), "chayang-test-rg");
    }

    #[tokio::test]
    async fn test_settle_is_a_no_op_in_playback() {
        let ctx = context(Scripted::new(vec![]));
        let started = std::time::Instant::now();
        ctx.settle(Duration::from_secs(60)).await;
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_temp_dir_is_scrubbed() {
        let scrubber = Arc::new(RwLock::new(Scrubber::new()));
        let options = ContextOptions {
            scrubber: scrubber.clone(),
            ..ContextOptions::default()
        };
        let mut ctx = ScenarioContext::new(Scripted::new(vec![]), options);
        let dir = ctx.temp_dir().unwrap();
        assert!(dir.exists());

        let cmd = CommandLine::new(vec!["az".into(), format!("--path={}", dir.display())]);
        let scrubbed = scrubber.read().unwrap().scrub(&cmd);
        assert_eq!(scrubbed.args()[0], "--path=$TEMP0");
    }
}
