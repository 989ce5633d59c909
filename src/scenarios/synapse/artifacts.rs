//! Workspace artifacts managed through the data plane

use async_trait::async_trait;
use serde_json::json;

use super::{create_workspace, minutes, workspace_fixtures, LOCATION};
use crate::checks::Check;
use crate::error::{ScenarioError, ScenarioResult};
use crate::fixtures::Preparer;
use crate::scenario::{Scenario, ScenarioContext};

/// Open the workspace firewall to every address
async fn allow_all_ips(ctx: &ScenarioContext) -> ScenarioResult<()> {
    ctx.cmd(
        "az synapse workspace firewall-rule create --resource-group {rg} --name allowAll \
         --workspace-name {workspace} --start-ip-address 0.0.0.0 --end-ip-address 255.255.255.255",
        &[Check::equals("provisioningState", "Succeeded")],
    )
    .await?;
    Ok(())
}

/// Wait until the data plane accepts requests through the new firewall rule
async fn wait_for_data_plane(ctx: &ScenarioContext) -> ScenarioResult<()> {
    ctx.wait_until_succeeds(
        "az synapse linked-service list --workspace-name {workspace}",
        minutes(2),
    )
    .await
    .map(|_| ())
}

/// create from `{file}`, show, list, delete and show again expecting failure
async fn crud(ctx: &ScenarioContext, group: &str, file_arg: &str, list_type: &str) -> ScenarioResult<()> {
    let target = "--workspace-name {workspace} --name {name}";
    ctx.cmd(
        &format!("az synapse {group} create {target} --file {file_arg}"),
        &[Check::equals("name", "{name}")],
    )
    .await?;
    ctx.cmd(
        &format!("az synapse {group} show {target}"),
        &[Check::equals("name", "{name}")],
    )
    .await?;
    ctx.cmd(
        &format!("az synapse {group} list --workspace-name {{workspace}}"),
        &[Check::equals("[0].type", list_type)],
    )
    .await?;
    ctx.cmd(&format!("az synapse {group} delete {target} -y"), &[])
        .await?;
    ctx.cmd_expect_failure(&format!("az synapse {group} show {target}"))
        .await?;
    Ok(())
}

pub struct LinkedService;

#[async_trait]
impl Scenario for LinkedService {
    fn name(&self) -> &'static str {
        "linked_service"
    }

    fn description(&self) -> &'static str {
        "Linked service create from a JSON file, show, list and delete"
    }

    fn preparers(&self) -> Vec<Preparer> {
        workspace_fixtures()
    }

    fn tags(&self) -> &'static [&'static str] {
        &["artifacts"]
    }

    async fn run(&self, ctx: &mut ScenarioContext) -> ScenarioResult<()> {
        let file = ctx.asset("linkedservice.json");
        ctx.defaults([("name", "linkedservice")]);
        ctx.set("file", file);

        create_workspace(ctx, LOCATION, "").await?;
        allow_all_ips(ctx).await?;
        wait_for_data_plane(ctx).await?;

        crud(ctx, "linked-service", r#"@"{file}""#, "Microsoft.Synapse/workspaces/linkedservices").await
    }
}

pub struct Dataset;

#[async_trait]
impl Scenario for Dataset {
    fn name(&self) -> &'static str {
        "dataset"
    }

    fn description(&self) -> &'static str {
        "Dataset create from inline JSON, show, list and delete"
    }

    fn preparers(&self) -> Vec<Preparer> {
        workspace_fixtures()
    }

    fn tags(&self) -> &'static [&'static str] {
        &["artifacts"]
    }

    async fn run(&self, ctx: &mut ScenarioContext) -> ScenarioResult<()> {
        ctx.defaults([("name", "dataset")]);

        create_workspace(ctx, LOCATION, "").await?;
        allow_all_ips(ctx).await?;
        wait_for_data_plane(ctx).await?;

        let workspace = ctx.text("workspace")?;
        let definition = json!({
            "properties": {
                "linkedServiceName": {
                    "referenceName": format!("{workspace}-WorkspaceDefaultStorage"),
                    "type": "LinkedServiceReference"
                },
                "type": "Orc",
                "typeProperties": {"location": {"type": "AzureBlobFSLocation"}}
            }
        });
        ctx.set("file", definition.to_string());

        crud(ctx, "dataset", "'{file}'", "Microsoft.Synapse/workspaces/datasets").await
    }
}

pub struct Pipeline;

#[async_trait]
impl Scenario for Pipeline {
    fn name(&self) -> &'static str {
        "pipeline"
    }

    fn description(&self) -> &'static str {
        "Pipeline create, show, list, runs, activity runs and delete"
    }

    fn tags(&self) -> &'static [&'static str] {
        &["artifacts"]
    }

    async fn run(&self, ctx: &mut ScenarioContext) -> ScenarioResult<()> {
        let file = ctx.asset("pipeline.json");
        ctx.defaults([("workspace", "testsynapseworkspace"), ("name", "pipeline")]);
        ctx.set("file", file);

        let target = "--workspace-name {workspace} --name {name}";
        ctx.cmd(
            &format!(r#"az synapse pipeline create {target} --file @"{{file}}""#),
            &[Check::equals("name", "{name}")],
        )
        .await?;
        ctx.cmd(
            &format!("az synapse pipeline show {target}"),
            &[Check::equals("name", "{name}")],
        )
        .await?;
        ctx.cmd(
            "az synapse pipeline list --workspace-name {workspace}",
            &[Check::equals("[0].type", "Microsoft.Synapse/workspaces/pipelines")],
        )
        .await?;

        let run = ctx
            .cmd(&format!("az synapse pipeline create-run {target}"), &[])
            .await?;
        let run_id = run.text("runId")?;
        ctx.set("run-id", run_id);

        ctx.cmd(
            "az synapse pipeline-run cancel --workspace-name {workspace} --run-id {run-id} -y",
            &[],
        )
        .await?;
        ctx.wait_for(
            "az synapse pipeline-run show --workspace-name {workspace} --run-id {run-id}",
            &[Check::equals("status", "Cancelled")],
            minutes(2),
        )
        .await?;

        let window = "--last-updated-after 2020-09-01T00:36:44.3345758Z \
                      --last-updated-before 2020-10-16T00:36:44.3345758Z";
        ctx.cmd(
            &format!("az synapse pipeline-run query-by-workspace --workspace-name {{workspace}} {window}"),
            &[],
        )
        .await?;
        ctx.cmd(
            &format!("az synapse activity-run query-by-pipeline-run {target} --run-id {{run-id}} {window}"),
            &[],
        )
        .await?;

        ctx.cmd(&format!("az synapse pipeline delete {target} -y"), &[])
            .await?;
        ctx.cmd_expect_failure(&format!("az synapse pipeline show {target}"))
            .await?;
        Ok(())
    }
}

pub struct Trigger;

#[async_trait]
impl Scenario for Trigger {
    fn name(&self) -> &'static str {
        "trigger"
    }

    fn description(&self) -> &'static str {
        "Trigger CRUD, event subscriptions, start/stop and trigger-run rerun"
    }

    fn tags(&self) -> &'static [&'static str] {
        &["artifacts"]
    }

    async fn run(&self, ctx: &mut ScenarioContext) -> ScenarioResult<()> {
        let file = ctx.asset("trigger.json");
        ctx.defaults([
            ("workspace", "testsynapseworkspace"),
            ("name", "trigger"),
            ("event-trigger", "EventTrigger"),
            ("tumbling-window-trigger", "TumblingWindowTrigger"),
            ("run-id", "08586024051698130326966471413CU40"),
        ]);
        ctx.set("file", file);

        crud(ctx, "trigger", r#"@"{file}""#, "Microsoft.Synapse/workspaces/triggers").await?;

        let event = "--workspace-name {workspace} --name {event-trigger}";
        ctx.cmd(
            &format!("az synapse trigger subscribe-to-event {event}"),
            &[Check::equals("status", "Provisioning")],
        )
        .await?;
        ctx.wait_for(
            &format!("az synapse trigger get-event-subscription-status {event}"),
            &[Check::equals("status", "Enabled")],
            minutes(2),
        )
        .await?;
        ctx.cmd(
            &format!("az synapse trigger unsubscribe-from-event {event}"),
            &[Check::equals("status", "Deprovisioning")],
        )
        .await?;

        let tumbling = "--workspace-name {workspace} --name {tumbling-window-trigger}";
        ctx.cmd(&format!("az synapse trigger start {tumbling}"), &[])
            .await?;
        ctx.cmd(
            "az synapse trigger-run query-by-workspace --workspace-name {workspace} \
             --last-updated-after 2020-09-01T00:36:44.3345758Z \
             --last-updated-before 2020-10-01T00:36:44.3345758Z",
            &[],
        )
        .await?;
        ctx.cmd(
            &format!("az synapse trigger-run rerun {tumbling} --run-id {{run-id}}"),
            &[],
        )
        .await?;
        ctx.cmd(&format!("az synapse trigger stop {tumbling}"), &[])
            .await?;
        Ok(())
    }
}

pub struct DataFlow;

#[async_trait]
impl Scenario for DataFlow {
    fn name(&self) -> &'static str {
        "data_flow"
    }

    fn description(&self) -> &'static str {
        "Data flow create from a JSON file, show, list and delete"
    }

    fn skip_reason(&self) -> Option<&'static str> {
        Some("(InvalidTokenIssuer) Token Authentication failed with SecurityTokenInvalidIssuerException")
    }

    fn tags(&self) -> &'static [&'static str] {
        &["artifacts"]
    }

    async fn run(&self, ctx: &mut ScenarioContext) -> ScenarioResult<()> {
        let file = ctx.asset("dataflow.json");
        ctx.defaults([("workspace", "testsynapseworkspace"), ("name", "dataflow")]);
        ctx.set("file", file);

        crud(ctx, "data-flow", r#"@"{file}""#, "Microsoft.Synapse/workspaces/dataflows").await
    }
}

pub struct Notebook;

#[async_trait]
impl Scenario for Notebook {
    fn name(&self) -> &'static str {
        "notebook"
    }

    fn description(&self) -> &'static str {
        "Notebook create on a new spark pool, show, list, export and delete"
    }

    fn preparers(&self) -> Vec<Preparer> {
        workspace_fixtures()
    }

    fn tags(&self) -> &'static [&'static str] {
        &["artifacts", "spark"]
    }

    async fn run(&self, ctx: &mut ScenarioContext) -> ScenarioResult<()> {
        let file = ctx.asset("notebook.ipynb");
        ctx.defaults([
            ("workspace", "testsynapseworkspace"),
            ("name", "notebook"),
            ("spark-pool", "testpool"),
            ("spark-version", "2.4"),
        ]);
        ctx.set("file", file);

        create_workspace(ctx, LOCATION, "").await?;
        allow_all_ips(ctx).await?;

        ctx.cmd(
            "az synapse spark pool create --name {spark-pool} --spark-version {spark-version} \
             --workspace {workspace} --resource-group {rg} --node-count 3 --node-size Medium",
            &[
                Check::equals("name", "{spark-pool}"),
                Check::equals("type", "Microsoft.Synapse/workspaces/bigDataPools"),
                Check::equals("provisioningState", "Succeeded"),
            ],
        )
        .await?;

        let target = "--workspace-name {workspace} --name {name}";
        ctx.cmd(
            &format!(r#"az synapse notebook create {target} --file @"{{file}}" --spark-pool-name {{spark-pool}}"#),
            &[Check::equals("name", "{name}")],
        )
        .await?;
        ctx.cmd(
            &format!("az synapse notebook show {target}"),
            &[Check::equals("name", "{name}")],
        )
        .await?;
        ctx.cmd(
            "az synapse notebook list --workspace-name {workspace}",
            &[Check::equals("[0].type", "Microsoft.Synapse/workspaces/notebooks")],
        )
        .await?;

        let folder = ctx.temp_dir()?;
        ctx.set("output-folder", folder.display().to_string());
        ctx.cmd(
            &format!(r#"az synapse notebook export {target} --output-folder "{{output-folder}}""#),
            &[],
        )
        .await?;
        if ctx.is_live_or_recording() {
            let exported = folder.join(format!("{}.ipynb", ctx.text("name")?));
            if !exported.is_file() {
                return Err(ScenarioError::Assertion(format!(
                    "notebook export did not create {}",
                    exported.display()
                )));
            }
        }

        ctx.cmd(&format!("az synapse notebook delete {target} -y"), &[])
            .await?;
        ctx.cmd_expect_failure(&format!("az synapse notebook show {target}"))
            .await?;
        Ok(())
    }
}
