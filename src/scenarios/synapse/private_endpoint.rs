use async_trait::async_trait;

use super::{minutes, seconds};
use crate::checks::Check;
use crate::error::ScenarioResult;
use crate::fixtures::Preparer;
use crate::scenario::{Scenario, ScenarioContext};

const STORAGE_ID: &str = "/subscriptions/051ddeca-1ed6-4d8b-ba6f-1ff561e5f3b3/resourceGroups/bigdataqa\
                          /providers/Microsoft.Storage/storageAccounts/hozhao0917gen2";

pub struct ManagedPrivateEndpoints;

#[async_trait]
impl Scenario for ManagedPrivateEndpoints {
    fn name(&self) -> &'static str {
        "managed_private_endpoints"
    }

    fn description(&self) -> &'static str {
        "Managed private endpoint to a storage account: create, show, list and delete"
    }

    fn preparers(&self) -> Vec<Preparer> {
        vec![Preparer::resource_group()]
    }

    fn tags(&self) -> &'static [&'static str] {
        &["network"]
    }

    async fn run(&self, ctx: &mut ScenarioContext) -> ScenarioResult<()> {
        ctx.defaults([
            ("workspace", "testsynapseworkspacepe"),
            ("name", "AzureDataLakeStoragePE"),
            ("private-link-resource-id", STORAGE_ID),
            ("group-id", "dfs"),
        ]);

        let target = "--workspace-name {workspace} --pe-name {name}";
        ctx.cmd(
            &format!(
                "az synapse managed-private-endpoints create {target} \
                 --resource-id {{private-link-resource-id}} --group-Id {{group-id}}"
            ),
            &[Check::equals("name", "{name}")],
        )
        .await?;

        ctx.wait_for(
            &format!("az synapse managed-private-endpoints show {target}"),
            &[Check::equals("name", "{name}")],
            seconds(90),
        )
        .await?;

        ctx.cmd(
            "az synapse managed-private-endpoints list --workspace-name {workspace}",
            &[Check::equals(
                "[0].type",
                "Microsoft.Synapse/workspaces/managedVirtualNetworks/managedPrivateEndpoints",
            )],
        )
        .await?;

        ctx.cmd(&format!("az synapse managed-private-endpoints delete {target} -y"), &[])
            .await?;
        ctx.wait_until_fails(
            &format!("az synapse managed-private-endpoints show {target}"),
            minutes(1),
        )
        .await
    }
}
