use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ---- scenario / market responses ----

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScenarioResponse {
    pub uuid: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketResponse {
    pub uuid: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub related_plan_markets: Vec<MarketRef>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketRef {
    pub uuid: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

// ---- request options ----

/// Query options for applying a scenario to a market.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApplyOptions {
    pub disable_hateoas: bool,
    pub ignore_constraints: bool,
    pub plan_market_name: String,
}

/// Paging options for list endpoints. Empty means "fetch everything".
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PagingOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ascending: Option<bool>,
}

/// Body of an action query. Empty lists are omitted, which the server reads
/// as "no restriction".
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionFilter {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub action_type_list: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub related_entity_types: Vec<String>,
}

impl ActionFilter {
    pub fn new(action_type: &str, entity_type: &str) -> Self {
        Self {
            action_type_list: vec![action_type.to_string()],
            related_entity_types: vec![entity_type.to_string()],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SupplyChainOptions {
    pub types: Vec<String>,
    pub detail_type: String,
}

// ---- supply chain ----

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplyChain {
    #[serde(default)]
    pub se_map: IndexMap<String, SupplyChainTier>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SupplyChainTier {
    #[serde(default)]
    pub instances: IndexMap<String, Value>,
}

impl SupplyChain {
    /// Instance uuids of one entity type, in response order.
    pub fn instance_uuids(&self, entity_type: &str) -> Vec<String> {
        self.se_map
            .get(entity_type)
            .map(|tier| tier.instances.keys().cloned().collect())
            .unwrap_or_default()
    }
}

// ---- groups ----

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupRequest {
    pub group_type: String,
    pub temporary: bool,
    pub is_static: bool,
    pub display_name: String,
    pub member_uuid_list: Vec<String>,
}
