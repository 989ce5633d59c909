//! Recording and playback of command interactions
//!
//! A cassette stores every command a scenario issued together with its
//! captured output, plus the resource names it generated. Playing a cassette
//! back serves the same outputs in the same order without touching the cloud.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

use super::{CommandInvoker, CommandOutput};
use crate::error::{ScenarioError, ScenarioResult};
use crate::harness::CommandLine;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    pub command: CommandLine,
    #[serde(flatten)]
    pub output: CommandOutput,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cassette {
    pub scenario: String,
    pub recorded_at: DateTime<Utc>,
    #[serde(default)]
    pub names: Vec<String>,
    #[serde(default)]
    pub interactions: Vec<Interaction>,
}

impl Cassette {
    pub fn new(scenario: impl Into<String>) -> Self {
        Self {
            scenario: scenario.into(),
            recorded_at: Utc::now(),
            names: Vec::new(),
            interactions: Vec::new(),
        }
    }

    /// Location of a scenario's cassette inside a recordings directory
    pub fn path_for(recordings_dir: &Path, scenario: &str) -> PathBuf {
        recordings_dir.join(format!("{scenario}.yaml"))
    }

    pub async fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let contents = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read recording: {}", path.display()))?;

        serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse recording: {}", path.display()))
    }

    pub async fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.with_context(|| {
                format!("Failed to create recordings directory: {}", parent.display())
            })?;
        }

        let yaml = serde_yaml::to_string(self).context("Failed to serialize recording to YAML")?;

        fs::write(path, yaml)
            .await
            .with_context(|| format!("Failed to write recording: {}", path.display()))
    }
}

/// Replaces machine-specific text and secrets with stable placeholders
#[derive(Debug, Clone, Default)]
pub struct Scrubber {
    replacements: Vec<(String, String)>,
}

impl Scrubber {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, actual: impl Into<String>, placeholder: impl Into<String>) -> Self {
        self.add(actual, placeholder);
        self
    }

    pub fn add(&mut self, actual: impl Into<String>, placeholder: impl Into<String>) {
        let actual = actual.into();
        if !actual.is_empty() {
            self.replacements.push((actual, placeholder.into()));
        }
    }

    pub fn scrub(&self, command: &CommandLine) -> CommandLine {
        self.replacements
            .iter()
            .fold(command.clone(), |cmd, (actual, placeholder)| {
                cmd.replace(actual, placeholder)
            })
    }

    pub fn scrub_text(&self, text: &str) -> String {
        self.replacements
            .iter()
            .fold(text.to_string(), |text, (actual, placeholder)| {
                text.replace(actual.as_str(), placeholder)
            })
    }

    /// Scrub captured stdout and stderr
    pub fn scrub_output(&self, output: &CommandOutput) -> CommandOutput {
        CommandOutput {
            exit_code: output.exit_code,
            stdout: self.scrub_text(&output.stdout),
            stderr: self.scrub_text(&output.stderr),
        }
    }
}

/// Forwards to another invoker and records every interaction
pub struct RecordingInvoker {
    inner: Arc<dyn CommandInvoker>,
    scrubber: Arc<std::sync::RwLock<Scrubber>>,
    interactions: Mutex<Vec<Interaction>>,
}

impl RecordingInvoker {
    pub fn new(inner: Arc<dyn CommandInvoker>, scrubber: Arc<std::sync::RwLock<Scrubber>>) -> Self {
        Self {
            inner,
            scrubber,
            interactions: Mutex::new(Vec::new()),
        }
    }

    /// Move the recorded interactions out, leaving the recorder empty.
    ///
    /// Outputs are scrubbed with every replacement registered so far, including
    /// those added after the command ran.
    pub async fn take_interactions(&self) -> Vec<Interaction> {
        let interactions = std::mem::take(&mut *self.interactions.lock().await);
        let scrubber = match self.scrubber.read() {
            Ok(scrubber) => scrubber.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };

        interactions
            .into_iter()
            .map(|interaction| Interaction {
                output: scrubber.scrub_output(&interaction.output),
                command: interaction.command,
            })
            .collect()
    }
}

#[async_trait]
impl CommandInvoker for RecordingInvoker {
    async fn invoke(&self, command: &CommandLine) -> ScenarioResult<CommandOutput> {
        let output = self.inner.invoke(command).await?;
        let scrubbed = scrub_with(&self.scrubber, command);

        self.interactions.lock().await.push(Interaction {
            command: scrubbed,
            output: output.clone(),
        });

        Ok(output)
    }

    fn name(&self) -> &str {
        "recording"
    }
}

/// Serves outputs from a cassette, in order
pub struct PlaybackInvoker {
    scrubber: Arc<std::sync::RwLock<Scrubber>>,
    state: Mutex<PlaybackState>,
}

struct PlaybackState {
    interactions: Vec<Interaction>,
    next: usize,
}

impl PlaybackInvoker {
    pub fn new(interactions: Vec<Interaction>, scrubber: Arc<std::sync::RwLock<Scrubber>>) -> Self {
        Self {
            scrubber,
            state: Mutex::new(PlaybackState {
                interactions,
                next: 0,
            }),
        }
    }

    /// Interactions not yet served
    pub async fn remaining(&self) -> usize {
        let state = self.state.lock().await;
        state.interactions.len().saturating_sub(state.next)
    }
}

#[async_trait]
impl CommandInvoker for PlaybackInvoker {
    async fn invoke(&self, command: &CommandLine) -> ScenarioResult<CommandOutput> {
        let scrubbed = scrub_with(&self.scrubber, command);
        let mut state = self.state.lock().await;
        let index = state.next;

        let interaction =
            state
                .interactions
                .get(index)
                .ok_or_else(|| ScenarioError::CassetteExhausted {
                    command: scrubbed.to_string(),
                })?;

        if interaction.command != scrubbed {
            return Err(ScenarioError::CassetteMismatch {
                index,
                expected: interaction.command.to_string(),
                actual: scrubbed.to_string(),
            });
        }

        let output = interaction.output.clone();
        state.next += 1;
        debug!("Replayed interaction {}: {}", index, scrubbed);
        Ok(output)
    }

    fn name(&self) -> &str {
        "playback"
    }
}

fn scrub_with(scrubber: &std::sync::RwLock<Scrubber>, command: &CommandLine) -> CommandLine {
    match scrubber.read() {
        Ok(scrubber) => scrubber.scrub(command),
        Err(poisoned) => poisoned.into_inner().scrub(command),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    #[async_trait]
    impl CommandInvoker for Echo {
        async fn invoke(&self, command: &CommandLine) -> ScenarioResult<CommandOutput> {
            Ok(CommandOutput::success(format!("\"{}\"", command.args().join(" "))))
        }

        fn name(&self) -> &str {
            "echo"
        }
    }

    fn shared(scrubber: Scrubber) -> Arc<std::sync::RwLock<Scrubber>> {
        Arc::new(std::sync::RwLock::new(scrubber))
    }

    fn cmd(s: &str) -> CommandLine {
        CommandLine::parse(s).unwrap()
    }

    #[tokio::test]
    async fn test_record_then_playback() {
        let scrubber = shared(Scrubber::new().with("/home/me/assets", "$ASSETS"));
        let recorder = RecordingInvoker::new(Arc::new(Echo), scrubber.clone());

        let first = recorder
            .invoke(&cmd("az synapse pipeline create --file @/home/me/assets/pipeline.json"))
            .await
            .unwrap();
        recorder.invoke(&cmd("az synapse pipeline show")).await.unwrap();

        let interactions = recorder.take_interactions().await;
        assert_eq!(interactions.len(), 2);
        assert_eq!(
            interactions[0].command,
            cmd("az synapse pipeline create --file @$ASSETS/pipeline.json")
        );

        // Playback on another machine with a different assets directory
        let other = shared(Scrubber::new().with("/srv/ci/assets", "$ASSETS"));
        let player = PlaybackInvoker::new(interactions, other);
        let replayed = player
            .invoke(&cmd("az synapse pipeline create --file @/srv/ci/assets/pipeline.json"))
            .await
            .unwrap();
        assert_eq!(replayed, first);
        assert_eq!(player.remaining().await, 1);
    }

    struct Keys;

    #[async_trait]
    impl CommandInvoker for Keys {
        async fn invoke(&self, _command: &CommandLine) -> ScenarioResult<CommandOutput> {
            Ok(CommandOutput::success(
                r#"[{"keyName": "key1", "value": "SECRETKEY123=="}]"#,
            ))
        }

        fn name(&self) -> &str {
            "keys"
        }
    }

    #[tokio::test]
    async fn test_secret_registered_after_the_call_is_scrubbed_from_output() {
        let scrubber = shared(Scrubber::new());
        let recorder = RecordingInvoker::new(Arc::new(Keys), scrubber.clone());

        let output = recorder
            .invoke(&cmd("az storage account keys list -g rg -n adlsgen2abc"))
            .await
            .unwrap();
        assert!(output.stdout.contains("SECRETKEY123=="));
        scrubber.write().unwrap().add("SECRETKEY123==", "$STORAGE_KEY");

        let mut cassette = Cassette::new("sql_ws_audit_policy_logentry_eventhub");
        cassette.interactions = recorder.take_interactions().await;
        assert!(cassette.interactions[0].output.stdout.contains("$STORAGE_KEY"));

        let yaml = serde_yaml::to_string(&cassette).unwrap();
        assert!(!yaml.contains("SECRETKEY123=="));
    }

    #[tokio::test]
    async fn test_playback_mismatch_and_exhaustion() {
        let player = PlaybackInvoker::new(
            vec![Interaction {
                command: cmd("az synapse workspace show --name a"),
                output: CommandOutput::success("{}"),
            }],
            shared(Scrubber::new()),
        );

        let err = player
            .invoke(&cmd("az synapse workspace show --name b"))
            .await
            .unwrap_err();
        assert!(matches!(err, ScenarioError::CassetteMismatch { index: 0, .. }));

        player
            .invoke(&cmd("az synapse workspace show --name a"))
            .await
            .unwrap();
        let err = player
            .invoke(&cmd("az synapse workspace show --name a"))
            .await
            .unwrap_err();
        assert!(matches!(err, ScenarioError::CassetteExhausted { .. }));
    }

    #[tokio::test]
    async fn test_cassette_file_round_trip() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = Cassette::path_for(dir.path(), "sql_aad_admin");

        let mut cassette = Cassette::new("sql_aad_admin");
        cassette.names.push("rule0001".to_string());
        cassette.interactions.push(Interaction {
            command: cmd("az synapse sql ad-admin show --workspace-name ws"),
            output: CommandOutput::failure(3, "ResourceNotFound"),
        });
        cassette.save_to_file(&path).await.unwrap();

        let loaded = Cassette::load_from_file(&path).await.unwrap();
        assert_eq!(loaded, cassette);
        assert!(path.ends_with("sql_aad_admin.yaml"));
    }
}
