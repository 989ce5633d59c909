use async_trait::async_trait;

use crate::checks::Check;
use crate::error::ScenarioResult;
use crate::scenario::{Scenario, ScenarioContext};

pub struct IntegrationRuntime;

#[async_trait]
impl Scenario for IntegrationRuntime {
    fn name(&self) -> &'static str {
        "integration_runtime"
    }

    fn description(&self) -> &'static str {
        "Managed integration runtime CRUD; self-hosted runtime keys, monitoring, nodes and status"
    }

    fn tags(&self) -> &'static [&'static str] {
        &["integration"]
    }

    async fn run(&self, ctx: &mut ScenarioContext) -> ScenarioResult<()> {
        ctx.defaults([
            ("rg", "chayang-test-rg"),
            ("workspace", "zes0219test"),
            ("name", "integrationruntime"),
            ("type", "Managed"),
            ("selfhosted-integration-runtime", "IntegrationRuntime0219selfhosted0507"),
            ("node", "MININT-Q3EGQJ8"),
        ]);

        let managed = "--resource-group {rg} --workspace-name {workspace} --name {name}";
        ctx.cmd(
            &format!("az synapse integration-runtime create {managed} --type {{type}}"),
            &[Check::equals("name", "{name}")],
        )
        .await?;
        ctx.cmd(
            &format!("az synapse integration-runtime show {managed}"),
            &[Check::equals("name", "{name}")],
        )
        .await?;
        ctx.cmd(
            "az synapse integration-runtime list --resource-group {rg} --workspace-name {workspace}",
            &[Check::equals("[0].type", "Microsoft.Synapse/workspaces/integrationruntimes")],
        )
        .await?;
        ctx.cmd(&format!("az synapse integration-runtime delete {managed} -y"), &[])
            .await?;
        ctx.cmd_expect_failure(&format!("az synapse integration-runtime show {managed}"))
            .await?;

        let hosted = "--resource-group {rg} --workspace-name {workspace} --name {selfhosted-integration-runtime}";
        let named_hosted = Check::equals("name", "{selfhosted-integration-runtime}");

        ctx.cmd(&format!("az synapse integration-runtime upgrade {hosted}"), &[])
            .await?;
        ctx.cmd(
            &format!("az synapse integration-runtime list-auth-key {hosted}"),
            &[Check::not_null("authKey1"), Check::not_null("authKey2")],
        )
        .await?;
        ctx.cmd(
            &format!("az synapse integration-runtime regenerate-auth-key {hosted} --key-name authKey1"),
            &[Check::not_null("authKey1"), Check::is_null("authKey2")],
        )
        .await?;
        ctx.cmd(
            &format!("az synapse integration-runtime get-monitoring-data {hosted}"),
            &[named_hosted.clone()],
        )
        .await?;

        let node = Check::equals("nodeName", "{node}");
        ctx.cmd(
            &format!("az synapse integration-runtime-node show {hosted} --node-name {{node}}"),
            &[node.clone()],
        )
        .await?;
        ctx.cmd(
            &format!(
                "az synapse integration-runtime-node update {hosted} --node-name {{node}} \
                 --auto-update On --update-delay-offset PT03H"
            ),
            &[node],
        )
        .await?;
        ctx.cmd(
            &format!("az synapse integration-runtime-node get-ip-address {hosted} --node-name {{node}}"),
            &[],
        )
        .await?;

        ctx.cmd(&format!("az synapse integration-runtime sync-credentials {hosted}"), &[])
            .await?;
        ctx.cmd(&format!("az synapse integration-runtime get-connection-info {hosted}"), &[])
            .await?;
        ctx.cmd(
            &format!("az synapse integration-runtime get-status {hosted}"),
            &[named_hosted],
        )
        .await?;
        Ok(())
    }
}
