//! Catalogue scenarios driven through the runner without a cloud

use async_trait::async_trait;
use serde_json::json;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use synapse_scenarios::harness::CommandLine;
use synapse_scenarios::invoker::{Cassette, CommandInvoker, CommandOutput};
use synapse_scenarios::scenario::registry;
use synapse_scenarios::{RunMode, RunnerConfig, ScenarioResult, ScenarioRunner, Status};

/// Answers transparent data encryption commands and remembers what it saw
#[derive(Default)]
struct TdeService {
    seen: Mutex<Vec<CommandLine>>,
}

#[async_trait]
impl CommandInvoker for TdeService {
    async fn invoke(&self, command: &CommandLine) -> ScenarioResult<CommandOutput> {
        self.seen.lock().unwrap().push(command.clone());
        let args = command.args().join(" ");
        if args.contains("tde show") {
            Ok(CommandOutput::success(
                json!({"name": "current", "status": "Enabled"}).to_string(),
            ))
        } else if args.contains("tde set") {
            Ok(CommandOutput::success("{}"))
        } else {
            Ok(CommandOutput::failure(2, format!("ERROR: unexpected command {args}")))
        }
    }

    fn name(&self) -> &str {
        "tde"
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
async fn test_record_and_replay_catalogue_scenario() {
    let dir = TempDir::new().unwrap();
    let scenario = registry::find("sql_pool_tde").unwrap();

    let recorder =
        ScenarioRunner::new(config(RunMode::Record, &dir)).with_invoker(Arc::new(TdeService::default()));
    let outcome = recorder.run_scenario(scenario.as_ref()).await;
    assert_eq!(outcome.status, Status::Passed, "{:?}", outcome.error);

    let cassette = Cassette::load_from_file(Cassette::path_for(dir.path(), "sql_pool_tde"))
        .await
        .unwrap();
    assert_eq!(cassette.scenario, "sql_pool_tde");
    assert_eq!(cassette.interactions.len(), 2);
    assert!(cassette.names.is_empty());
    assert!(cassette.interactions[0]
        .command
        .args()
        .contains(&"--transparent-data-encryption-name".to_string()));

    let player = ScenarioRunner::new(config(RunMode::Playback, &dir));
    let outcome = player.run_scenario(scenario.as_ref()).await;
    assert_eq!(outcome.status, Status::Passed, "{:?}", outcome.error);
    assert_eq!(outcome.commands, 2);
}

#[tokio::test]
async fn test_overrides_replace_hard_coded_names() {
    let dir = TempDir::new().unwrap();
    let mut cfg = config(RunMode::Record, &dir);
    cfg.overrides.insert(
        "sql_pool_tde".to_string(),
        BTreeMap::from([("workspace".to_string(), json!("myworkspace"))]),
    );

    let service = Arc::new(TdeService::default());
    let runner = ScenarioRunner::new(cfg).with_invoker(service.clone());
    let scenario = registry::find("sql_pool_tde").unwrap();
    let outcome = runner.run_scenario(scenario.as_ref()).await;
    assert_eq!(outcome.status, Status::Passed, "{:?}", outcome.error);

    let seen = service.seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    for command in seen.iter() {
        assert!(command.args().contains(&"myworkspace".to_string()));
        assert!(!command.args().contains(&"zes0508test".to_string()));
    }
}

#[tokio::test]
async fn test_failure_does_not_stop_the_run() {
    let cfg = RunnerConfig {
        mode: RunMode::Playback,
        recordings_dir: PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("recordings"),
        ..RunnerConfig::default()
    };

    let mut scenarios = registry::select(Some("sql_pool_t*")).unwrap();
    scenarios.extend(registry::select(Some("sql_aad_admin")).unwrap());
    scenarios.extend(registry::select(Some("data_flow")).unwrap());

    let outcomes = ScenarioRunner::new(cfg).run_sequential(&scenarios).await;
    let statuses: Vec<(&str, Status)> = outcomes
        .iter()
        .map(|outcome| (outcome.name.as_str(), outcome.status))
        .collect();
    assert_eq!(
        statuses,
        vec![
            ("sql_pool_tde", Status::Failed),
            ("sql_pool_threat_policy", Status::Failed),
            ("sql_aad_admin", Status::Passed),
            ("data_flow", Status::Skipped),
        ]
    );
}

#[tokio::test]
async fn test_live_mode_runs_only_live_capable_scenarios() {
    let dir = TempDir::new().unwrap();
    let runner =
        ScenarioRunner::new(config(RunMode::Live, &dir)).with_invoker(Arc::new(TdeService::default()));

    let scenarios = registry::select(Some("sql_pool_tde")).unwrap();
    let outcomes = runner.run_sequential(&scenarios).await;
    assert_eq!(outcomes[0].status, Status::Skipped);
    assert_eq!(outcomes[0].commands, 0);
    assert!(!Cassette::path_for(dir.path(), "sql_pool_tde").exists());
}
