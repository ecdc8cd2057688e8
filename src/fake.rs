//! In-memory [`PlanningApi`] used by unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::{json, Value};

use crate::api::PlanningApi;
use crate::models::{
    ActionFilter, ApplyOptions, GroupRequest, MarketRef, MarketResponse, PagingOptions, ScenarioResponse,
    SupplyChain, SupplyChainOptions,
};

pub const SCENARIO: &str = "1001";
pub const PLAN_MARKET: &str = "2001";
pub const ALLOCATION_MARKET: &str = "2002";
pub const CREATED_GROUP: &str = "g-exclude";

#[derive(Default)]
pub struct FakeState {
    /// States handed out by successive market fetches; the last one repeats.
    pub market_states: VecDeque<String>,
    pub market_polls: usize,
    pub fail_apply: Option<String>,
    pub fail_market: Option<String>,

    /// Actions per market uuid. Filtered queries only honour `actionTypeList`.
    pub actions: HashMap<String, Vec<Value>>,
    pub entities: HashMap<String, Vec<Value>>,
    pub groups: HashMap<String, Value>,
    pub supply_chain: Value,

    pub created_scenarios: Vec<Value>,
    pub applied: Vec<(String, String, ApplyOptions)>,
    pub created_groups: Vec<GroupRequest>,
    pub supply_chain_queries: Vec<(String, SupplyChainOptions)>,
    pub last_filter: Option<ActionFilter>,
    pub action_queries: Vec<String>,
}

pub struct FakeApi {
    state: Mutex<FakeState>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::with_market_states(&["SUCCEEDED"])
    }

    pub fn with_market_states(states: &[&str]) -> Self {
        let state = FakeState {
            market_states: states.iter().map(|s| s.to_string()).collect(),
            supply_chain: json!({}),
            ..FakeState::default()
        };
        Self { state: Mutex::new(state) }
    }

    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }
}

fn plan_market(state: &str, related: bool) -> MarketResponse {
    MarketResponse {
        uuid: PLAN_MARKET.to_string(),
        state: state.to_string(),
        related_plan_markets: if related {
            vec![MarketRef {
                uuid: ALLOCATION_MARKET.to_string(),
                display_name: Some("plan_vmResize_false".to_string()),
            }]
        } else {
            Vec::new()
        },
        ..MarketResponse::default()
    }
}

#[async_trait]
impl PlanningApi for FakeApi {
    async fn create_scenario(&self, request: &Value) -> Result<ScenarioResponse> {
        self.state().created_scenarios.push(request.clone());
        Ok(ScenarioResponse { uuid: SCENARIO.to_string(), ..ScenarioResponse::default() })
    }

    async fn apply_and_run_scenario(
        &self,
        market_name: &str,
        scenario_id: &str,
        options: &ApplyOptions,
    ) -> Result<MarketResponse> {
        let mut state = self.state();
        if let Some(msg) = &state.fail_apply {
            return Err(anyhow!(msg.clone()));
        }
        state
            .applied
            .push((market_name.to_string(), scenario_id.to_string(), options.clone()));
        Ok(plan_market("RUNNING", true))
    }

    async fn get_market_by_uuid(&self, market_id: &str) -> Result<MarketResponse> {
        let mut state = self.state();
        state.market_polls += 1;
        if let Some(msg) = &state.fail_market {
            return Err(anyhow!(msg.clone()));
        }
        if market_id != PLAN_MARKET {
            return Err(anyhow!("unknown market {market_id}"));
        }
        let next = if state.market_states.len() > 1 {
            state.market_states.pop_front().unwrap_or_default()
        } else {
            state.market_states.front().cloned().unwrap_or_default()
        };
        Ok(plan_market(&next, false))
    }

    async fn get_actions_by_market_uuid(
        &self,
        market_id: &str,
        _paging: &PagingOptions,
        filter: &ActionFilter,
    ) -> Result<Vec<Value>> {
        let mut state = self.state();
        state.last_filter = Some(filter.clone());
        state.action_queries.push(market_id.to_string());
        let all = state.actions.get(market_id).cloned().unwrap_or_default();
        Ok(all
            .into_iter()
            .filter(|a| {
                filter.action_type_list.is_empty()
                    || a.get("actionType")
                        .and_then(Value::as_str)
                        .is_some_and(|t| filter.action_type_list.iter().any(|f| f == t))
            })
            .collect())
    }

    async fn get_current_actions_by_market_uuid(&self, market_id: &str, _paging: &PagingOptions) -> Result<Vec<Value>> {
        let mut state = self.state();
        state.action_queries.push(market_id.to_string());
        Ok(state.actions.get(market_id).cloned().unwrap_or_default())
    }

    async fn get_entities_by_market_uuid(&self, market_id: &str) -> Result<Vec<Value>> {
        Ok(self.state().entities.get(market_id).cloned().unwrap_or_default())
    }

    async fn get_supply_chain_by_entity_uuid(&self, id: &str, options: &SupplyChainOptions) -> Result<SupplyChain> {
        let mut state = self.state();
        state.supply_chain_queries.push((id.to_string(), options.clone()));
        Ok(serde_json::from_value(state.supply_chain.clone())?)
    }

    async fn create_group(&self, body: &GroupRequest) -> Result<Value> {
        self.state().created_groups.push(body.clone());
        Ok(json!({"uuid": CREATED_GROUP, "displayName": body.display_name, "className": "Group"}))
    }

    async fn get_group_by_uuid(&self, uuid: &str) -> Result<Value> {
        self.state()
            .groups
            .get(uuid)
            .cloned()
            .ok_or_else(|| anyhow!("group {uuid} not found"))
    }
}
