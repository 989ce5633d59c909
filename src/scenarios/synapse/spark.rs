use async_trait::async_trait;
use serde_json::json;

use super::{create_workspace, minutes, provisioned, workspace_fixtures, LOCATION};
use crate::checks::Check;
use crate::error::ScenarioResult;
use crate::fixtures::Preparer;
use crate::scenario::{Scenario, ScenarioContext};

const POOL_TYPE: &str = "Microsoft.Synapse/workspaces/bigDataPools";
const SAMPLES: &str = "abfss://testfilesystem@adlsgen2account.dfs.core.windows.net/samples/java/wordcount";

pub struct SparkPool;

#[async_trait]
impl Scenario for SparkPool {
    fn name(&self) -> &'static str {
        "spark_pool"
    }

    fn description(&self) -> &'static str {
        "Big-data pool create, show, list, update by id and delete on a new workspace"
    }

    fn preparers(&self) -> Vec<Preparer> {
        workspace_fixtures()
    }

    fn tags(&self) -> &'static [&'static str] {
        &["spark"]
    }

    async fn run(&self, ctx: &mut ScenarioContext) -> ScenarioResult<()> {
        let pool = ctx.random_name("testpool", 15)?;
        ctx.defaults([
            ("location", "eastus"),
            ("workspace", "testsynapseworkspace"),
            ("rg", "rg"),
            ("spark-version", "2.4"),
        ]);
        ctx.defaults([("spark-pool", pool)]);

        create_workspace(ctx, LOCATION, "").await?;

        ctx.cmd(
            "az synapse workspace check-name --name {workspace}",
            &[Check::equals("available", false)],
        )
        .await?;

        let created = ctx
            .cmd(
                "az synapse spark pool create --name {spark-pool} --spark-version {spark-version} \
                 --workspace {workspace} --resource-group {rg} --node-count 3 --node-size Medium",
                &provisioned(POOL_TYPE, "{spark-pool}"),
            )
            .await?;
        let id = created.text("id")?;
        ctx.set("pool-id", id);

        ctx.cmd(
            "az synapse spark pool show --name {spark-pool} --workspace {workspace} --resource-group {rg}",
            &provisioned(POOL_TYPE, "{spark-pool}"),
        )
        .await?;

        ctx.cmd(
            "az synapse spark pool list --workspace {workspace} --resource-group {rg}",
            &[Check::equals("[0].type", POOL_TYPE)],
        )
        .await?;

        let mut checks = vec![Check::equals("tags.key1", "value1")];
        checks.extend(provisioned(POOL_TYPE, "{spark-pool}"));
        ctx.cmd(
            "az synapse spark pool update --ids {pool-id} --tags key1=value1",
            &checks,
        )
        .await?;

        ctx.cmd(
            "az synapse spark pool delete --name {spark-pool} --workspace {workspace} --resource-group {rg} --yes",
            &[],
        )
        .await?;
        ctx.cmd_expect_failure(
            "az synapse spark pool show --name {spark-pool} --workspace {workspace} --resource-group {rg}",
        )
        .await?;
        Ok(())
    }
}

pub struct SparkJob;

#[async_trait]
impl Scenario for SparkJob {
    fn name(&self) -> &'static str {
        "spark_job"
    }

    fn description(&self) -> &'static str {
        "Spark batch job submit, show, list and cancel"
    }

    fn preparers(&self) -> Vec<Preparer> {
        vec![Preparer::resource_group()]
    }

    fn tags(&self) -> &'static [&'static str] {
        &["spark"]
    }

    async fn run(&self, ctx: &mut ScenarioContext) -> ScenarioResult<()> {
        ctx.defaults([
            ("spark-pool", json!("testsparkpool")),
            ("workspace", json!("testsynapseworkspace")),
            ("job", json!("WordCount_Java")),
            ("main-definition-file", json!(format!("{SAMPLES}/wordcount.jar"))),
            ("main-class-name", json!("WordCount")),
            (
                "arguments",
                json!([format!("{SAMPLES}/shakespeare.txt"), format!("{SAMPLES}/result/")]),
            ),
            ("executors", json!(2)),
            ("executor-size", json!("Medium")),
            (
                "configuration",
                json!(r#"{\"spark.dynamicAllocation.maxExecutors\":\"18\"}"#),
            ),
        ]);

        let job = ctx
            .cmd(
                "az synapse spark job submit --name {job} --workspace-name {workspace} \
                 --spark-pool-name {spark-pool} --main-definition-file {main-definition-file} \
                 --main-class-name {main-class-name} --arguments {arguments} \
                 --executors {executors} --executor-size {executor-size} --configuration {configuration}",
                &[
                    Check::equals("name", "{job}"),
                    Check::equals("jobType", "SparkBatch"),
                    Check::equals("state", "not_started"),
                    Check::equals(
                        "livyInfo.jobCreationRequest.configuration",
                        json!({"spark.dynamicAllocation.maxExecutors": "18"}),
                    ),
                ],
            )
            .await?;
        let batch = job.field("id")?;
        ctx.set("batch-id", batch);

        ctx.cmd(
            "az synapse spark job show --livy-id {batch-id} --workspace-name {workspace} \
             --spark-pool-name {spark-pool}",
            &[Check::equals("id", "{batch-id}")],
        )
        .await?;

        ctx.cmd(
            "az synapse spark job list --workspace-name {workspace} --spark-pool-name {spark-pool}",
            &[Check::equals("sessions[0].jobType", "SparkBatch")],
        )
        .await?;

        ctx.cmd(
            "az synapse spark job cancel --livy-id {batch-id} --workspace-name {workspace} \
             --spark-pool-name {spark-pool} --yes",
            &[],
        )
        .await?;
        ctx.wait_for(
            "az synapse spark job show --livy-id {batch-id} --workspace-name {workspace} \
             --spark-pool-name {spark-pool}",
            &[Check::equals("result", "Cancelled")],
            minutes(5),
        )
        .await?;
        Ok(())
    }
}

pub struct SparkSessionAndStatements;

#[async_trait]
impl Scenario for SparkSessionAndStatements {
    fn name(&self) -> &'static str {
        "spark_session_and_statements"
    }

    fn description(&self) -> &'static str {
        "Spark session lifecycle with statement invoke, show, list and cancel"
    }

    fn preparers(&self) -> Vec<Preparer> {
        vec![Preparer::resource_group()]
    }

    fn tags(&self) -> &'static [&'static str] {
        &["spark"]
    }

    async fn run(&self, ctx: &mut ScenarioContext) -> ScenarioResult<()> {
        let job = ctx.random_name("clisession", 14)?;
        ctx.defaults([
            ("spark-pool", json!("testsparkpool")),
            ("workspace", json!("testsynapseworkspace")),
            ("job", json!(job)),
            ("executor-size", json!("Small")),
            ("executors", json!(2)),
            (
                "code",
                json!("\"import time\ntime.sleep(10)\nprint('hello from cli')\""),
            ),
            ("language", json!("pyspark")),
        ]);

        let session = ctx
            .cmd(
                "az synapse spark session create --name {job} --workspace-name {workspace} \
                 --spark-pool-name {spark-pool} --executor-size {executor-size} --executors {executors}",
                &[
                    Check::equals("jobType", "SparkSession"),
                    Check::equals("name", "{job}"),
                    Check::equals("state", "not_started"),
                ],
            )
            .await?;
        let id = session.field("id")?;
        ctx.set("session-id", id);

        ctx.wait_for(
            "az synapse spark session show --livy-id {session-id} --workspace-name {workspace} \
             --spark-pool-name {spark-pool}",
            &[Check::equals("id", "{session-id}"), Check::equals("state", "idle")],
            minutes(15),
        )
        .await?;

        ctx.cmd(
            "az synapse spark session list --workspace-name {workspace} --spark-pool-name {spark-pool}",
            &[Check::equals("sessions[0].jobType", "SparkSession")],
        )
        .await?;

        ctx.cmd(
            "az synapse spark session reset-timeout --livy-id {session-id} --workspace-name {workspace} \
             --spark-pool-name {spark-pool}",
            &[],
        )
        .await?;

        let statement = ctx
            .cmd(
                "az synapse spark statement invoke --session-id {session-id} \
                 --workspace-name {workspace} --spark-pool-name {spark-pool} \
                 --code {code} --language {language}",
                &[Check::equals("state", "waiting")],
            )
            .await?;
        let id = statement.field("id")?;
        ctx.set("statement-id", id);

        ctx.wait_for(
            "az synapse spark statement show --livy-id {statement-id} --session-id {session-id} \
             --workspace-name {workspace} --spark-pool-name {spark-pool}",
            &[Check::equals("state", "running")],
            minutes(2),
        )
        .await?;

        ctx.cmd(
            "az synapse spark statement list --session-id {session-id} \
             --workspace-name {workspace} --spark-pool-name {spark-pool}",
            &[Check::equals("statements[0].state", "running")],
        )
        .await?;

        ctx.cmd(
            "az synapse spark statement cancel --livy-id {statement-id} --session-id {session-id} \
             --workspace-name {workspace} --spark-pool-name {spark-pool} --yes",
            &[Check::equals("msg", "canceled")],
        )
        .await?;

        ctx.cmd(
            "az synapse spark session cancel --livy-id {session-id} --workspace-name {workspace} \
             --spark-pool-name {spark-pool} --yes",
            &[],
        )
        .await?;
        ctx.wait_for(
            "az synapse spark session show --livy-id {session-id} --workspace-name {workspace} \
             --spark-pool-name {spark-pool}",
            &[Check::equals("state", "killed")],
            minutes(5),
        )
        .await?;
        Ok(())
    }
}
