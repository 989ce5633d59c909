use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tokio::fs;

use crate::harness::Kwargs;
use crate::invoker::AzCliConfig;
use crate::poll::PollPolicy;

pub const CONFIG_FILE_NAME: &str = "synapse-scenarios.yaml";

pub const ENV_MODE: &str = "SYNAPSE_SCENARIOS_MODE";
pub const ENV_CLI: &str = "SYNAPSE_SCENARIOS_CLI";
pub const ENV_RECORDINGS: &str = "SYNAPSE_SCENARIOS_RECORDINGS";
pub const ENV_RUN_LIVE: &str = "AZURE_TEST_RUN_LIVE";

/// Where command outputs come from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Run against the cloud without recording; record-only scenarios are skipped
    Live,
    /// Run against the cloud and write a recording per passing scenario
    Record,
    /// Replay recordings offline
    #[default]
    Playback,
}

impl RunMode {
    pub fn is_live_or_recording(self) -> bool {
        matches!(self, RunMode::Live | RunMode::Record)
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunMode::Live => "live",
            RunMode::Record => "record",
            RunMode::Playback => "playback",
        };
        f.write_str(name)
    }
}

impl FromStr for RunMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "live" => Ok(RunMode::Live),
            "record" => Ok(RunMode::Record),
            "playback" => Ok(RunMode::Playback),
            other => Err(anyhow!(
                "Unknown run mode '{}' (expected live, record or playback)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollSettings {
    pub timeout_secs: u64,
    pub interval_secs: u64,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 600,
            interval_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    pub mode: RunMode,
    pub cli: AzCliConfig,
    /// Location for resource groups created by fixtures
    pub location: String,
    pub recordings_dir: PathBuf,
    pub assets_dir: PathBuf,
    pub poll: PollSettings,
    /// Leave fixture resources in place after a run
    pub keep_resources: bool,
    /// Keyword overrides per scenario name
    pub overrides: BTreeMap<String, BTreeMap<String, Value>>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            mode: RunMode::default(),
            cli: AzCliConfig::default(),
            location: "westus".to_string(),
            recordings_dir: default_recordings_dir(),
            assets_dir: default_assets_dir(),
            poll: PollSettings::default(),
            keep_resources: false,
            overrides: BTreeMap::new(),
        }
    }
}

impl RunnerConfig {
    pub async fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub async fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let yaml = serde_yaml::to_string(self).context("Failed to serialize config to YAML")?;

        fs::write(path, yaml)
            .await
            .with_context(|| format!("Failed to write config file: {}", path.display()))
    }

    /// Load from `explicit`, or the first config file found, then apply environment overrides
    pub async fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(anyhow!("Config file not found: {}", path.display()));
                }
                Self::load_from_file(path).await?
            }
            None => match default_config_path() {
                Some(path) => Self::load_from_file(path).await?,
                None => Self::default(),
            },
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply environment overrides looked up through `lookup`
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(mode) = lookup(ENV_MODE).filter(|v| !v.trim().is_empty()) {
            self.mode = mode
                .parse()
                .with_context(|| format!("Invalid {ENV_MODE}"))?;
        }
        if let Some(cli) = lookup(ENV_CLI).filter(|v| !v.trim().is_empty()) {
            self.cli.executable = PathBuf::from(cli);
        }
        if let Some(dir) = lookup(ENV_RECORDINGS).filter(|v| !v.trim().is_empty()) {
            self.recordings_dir = PathBuf::from(dir);
        }
        if lookup(ENV_RUN_LIVE).is_some_and(|v| v.trim().eq_ignore_ascii_case("true")) {
            self.mode = RunMode::Live;
        }
        Ok(())
    }

    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy::new(
            Duration::from_secs(self.poll.timeout_secs),
            Duration::from_secs(self.poll.interval_secs),
        )
    }

    /// Keyword overrides configured for one scenario
    pub fn overrides_for(&self, scenario: &str) -> Kwargs {
        self.overrides
            .get(scenario)
            .map(|values| values.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default()
    }
}

/// `./synapse-scenarios.yaml` if present, otherwise the user config directory
pub fn default_config_path() -> Option<PathBuf> {
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.exists() {
        return Some(local);
    }
    dirs::config_dir().map(|dir| dir.join("synapse-scenarios").join("config.yaml"))
}

fn default_recordings_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("recordings")
}

fn default_assets_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("assets")
}
