use std::path::Path;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};

use crate::action::ActionCollection;
use crate::api::PlanningApi;
use crate::config::DEFAULT_HOURS_PER_MONTH;
use crate::entity::EntityCollection;
use crate::error::PlanResult;
use crate::index::EntityActionIndex;
use crate::models::{ActionFilter, GroupRequest, PagingOptions, SupplyChainOptions};
use crate::plan::Plan;
use crate::poll::PollPolicy;
use crate::reports::{self, VmTemplateRow, VolumeTierRow, VM_HEADER_BAND, VOLUME_HEADER_BAND};
use crate::table::write_table;
use crate::templates;

const VIRTUAL_MACHINE: &str = "VirtualMachine";

fn uuid_of(group: &Value) -> &str {
    group.get("uuid").and_then(Value::as_str).unwrap_or_default()
}

fn display_name_of(group: &Value) -> &str {
    group.get("displayName").and_then(Value::as_str).unwrap_or_default()
}

fn epoch_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[derive(Debug, Clone, Default)]
pub struct MigrationOptions {
    /// Group whose members stay out of the migration. When unset, every VM
    /// already on the destination is excluded.
    pub exclude: Option<Value>,
    /// Bring-your-own-license OS mapping.
    pub byol: bool,
    pub hours_per_month: Option<f64>,
}

/// Migration of the VMs of one group onto the hosts of another, planned
/// twice by the server: once without resizing (allocation) and once with
/// (consumption).
pub struct CloudMigrationPlan {
    plan: Plan,
    hours_per_month: f64,
    allocation_actions: Option<ActionCollection>,
    consumption_actions: Option<ActionCollection>,
    entities: Option<EntityCollection>,
}

impl CloudMigrationPlan {
    pub async fn new(
        api: Arc<dyn PlanningApi>,
        from: &Value,
        to: &Value,
        name: &str,
        options: MigrationOptions,
    ) -> PlanResult<Self> {
        let exclude = match options.exclude {
            Some(group) => group,
            None => Self::exclude_destination_vms(api.as_ref(), to).await?,
        };

        let scenario = templates::cloud_migration_scenario(name, from, to, &exclude, options.byol);
        let market_name = format!("CLOUD_MIGRATION_{}_{}_{}", uuid_of(from), uuid_of(to), epoch_millis());
        debug!(market = %market_name, "built migration scenario");

        Ok(Self {
            plan: Plan::new(api, scenario, market_name),
            hours_per_month: options.hours_per_month.unwrap_or(DEFAULT_HOURS_PER_MONTH),
            allocation_actions: None,
            consumption_actions: None,
            entities: None,
        })
    }

    async fn exclude_destination_vms(api: &dyn PlanningApi, to: &Value) -> PlanResult<Value> {
        let options = SupplyChainOptions {
            types: vec![VIRTUAL_MACHINE.to_string()],
            detail_type: "entity".to_string(),
        };
        let members = api
            .get_supply_chain_by_entity_uuid(uuid_of(to), &options)
            .await?
            .instance_uuids(VIRTUAL_MACHINE);
        info!(count = members.len(), "excluding VMs already on the destination");

        let request = GroupRequest {
            group_type: VIRTUAL_MACHINE.to_string(),
            temporary: true,
            is_static: true,
            display_name: format!("All VMs in {}", display_name_of(to)),
            member_uuid_list: members,
        };
        Ok(api.create_group(&request).await?)
    }

    pub fn with_poll_policy(mut self, poll: PollPolicy) -> Self {
        self.plan = self.plan.with_poll_policy(poll);
        self
    }

    pub fn plan(&self) -> &Plan {
        &self.plan
    }

    pub fn plan_mut(&mut self) -> &mut Plan {
        &mut self.plan
    }

    pub fn hours_per_month(&self) -> f64 {
        self.hours_per_month
    }

    pub async fn run(&mut self) -> PlanResult<()> {
        self.plan.run().await
    }

    pub async fn wait(&mut self) -> PlanResult<()> {
        self.plan.wait().await
    }

    /// Current actions of the allocation (no-resize) market.
    pub async fn allocation_actions(&mut self) -> PlanResult<&ActionCollection> {
        let actions = match self.allocation_actions.take() {
            Some(actions) => actions,
            None => {
                self.plan.wait().await?;
                let market = self.plan.allocation_market_id()?.to_string();
                self.current_actions(&market).await?
            }
        };
        Ok(self.allocation_actions.insert(actions))
    }

    /// Current actions of the consumption (plan) market.
    pub async fn consumption_actions(&mut self) -> PlanResult<&ActionCollection> {
        let actions = match self.consumption_actions.take() {
            Some(actions) => actions,
            None => {
                self.plan.wait().await?;
                let market = self.plan.market_id()?.to_string();
                self.current_actions(&market).await?
            }
        };
        Ok(self.consumption_actions.insert(actions))
    }

    /// Entities of the allocation market.
    pub async fn entities(&mut self) -> PlanResult<&EntityCollection> {
        let entities = match self.entities.take() {
            Some(entities) => entities,
            None => {
                self.plan.wait().await?;
                let market = self.plan.allocation_market_id()?;
                let raw = self.plan.api().get_entities_by_market_uuid(market).await?;
                EntityCollection::from_raw(raw)
            }
        };
        Ok(self.entities.insert(entities))
    }

    async fn current_actions(&self, market: &str) -> PlanResult<ActionCollection> {
        let raw = self
            .plan
            .api()
            .get_current_actions_by_market_uuid(market, &PagingOptions::default())
            .await?;
        debug!(market, count = raw.len(), "fetched plan actions");
        Ok(ActionCollection::from_raw(raw))
    }

    /// Active VMs of the plan with their MOVE actions in both markets.
    pub async fn vms(&mut self) -> PlanResult<EntityActionIndex> {
        let entities = self.entities().await?.by_entity_type(VIRTUAL_MACHINE).by_state("ACTIVE");
        let allocation = self
            .allocation_actions()
            .await?
            .by_entity_type(VIRTUAL_MACHINE)
            .by_action_type("MOVE");
        let consumption = self
            .consumption_actions()
            .await?
            .by_entity_type(VIRTUAL_MACHINE)
            .by_action_type("MOVE");
        Ok(EntityActionIndex::build(entities, allocation, consumption))
    }

    // (consumption, allocation) actions matching `filter`
    async fn filtered_actions(&mut self, filter: &ActionFilter) -> PlanResult<(ActionCollection, ActionCollection)> {
        self.plan.wait().await?;
        let api = self.plan.api();
        let paging = PagingOptions::default();

        let consumption = api
            .get_actions_by_market_uuid(self.plan.market_id()?, &paging, filter)
            .await?;
        let allocation = api
            .get_actions_by_market_uuid(self.plan.allocation_market_id()?, &paging, filter)
            .await?;

        Ok((ActionCollection::from_raw(consumption), ActionCollection::from_raw(allocation)))
    }

    pub async fn generate_vm_template_mapping(&mut self) -> PlanResult<Vec<VmTemplateRow>> {
        let (consumption, allocation) = self
            .filtered_actions(&ActionFilter::new("MOVE", VIRTUAL_MACHINE))
            .await?;
        Ok(reports::vm_template_rows(&consumption, &allocation))
    }

    pub async fn generate_volume_mapping(&mut self) -> PlanResult<Vec<VolumeTierRow>> {
        let (consumption, allocation) = self
            .filtered_actions(&ActionFilter::new("CHANGE", "Storage"))
            .await?;
        Ok(reports::volume_tier_rows(&consumption, &allocation))
    }

    /// Writes the VM template report and returns the number of VM rows.
    pub async fn save_vm_template_mapping_csv(&mut self, path: &Path) -> PlanResult<usize> {
        let rows = self.generate_vm_template_mapping().await?;
        write_table(path, &VM_HEADER_BAND, &reports::vm_template_table(&rows, self.hours_per_month))?;
        Ok(rows.len())
    }

    /// Writes the volume tier report and returns the number of disk rows.
    pub async fn save_volume_mapping_csv(&mut self, path: &Path) -> PlanResult<usize> {
        let rows = self.generate_volume_mapping().await?;
        write_table(path, &VOLUME_HEADER_BAND, &reports::volume_tier_table(&rows, self.hours_per_month))?;
        Ok(rows.len())
    }
}

/// Resize and RI optimization of the workloads already in a cloud scope.
pub struct CloudOptimizePlan {
    plan: Plan,
}

impl CloudOptimizePlan {
    pub fn new(api: Arc<dyn PlanningApi>, scope: &Value, name: &str) -> Self {
        let scenario = templates::cloud_optimize_scenario(name, scope);
        let market_name = format!("CLOUD_OPTIMIZATION_{}_{}", uuid_of(scope), epoch_millis());
        Self { plan: Plan::new(api, scenario, market_name) }
    }

    pub fn with_poll_policy(mut self, poll: PollPolicy) -> Self {
        self.plan = self.plan.with_poll_policy(poll);
        self
    }

    pub fn plan(&self) -> &Plan {
        &self.plan
    }

    pub fn plan_mut(&mut self) -> &mut Plan {
        &mut self.plan
    }

    pub async fn run(&mut self) -> PlanResult<()> {
        self.plan.run().await
    }

    pub async fn wait(&mut self) -> PlanResult<()> {
        self.plan.wait().await
    }

    /// All actions of the optimization market, once it has succeeded.
    pub async fn actions(&mut self) -> PlanResult<ActionCollection> {
        self.plan.wait().await?;
        self.plan.get_actions().await
    }
}
