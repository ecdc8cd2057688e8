use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::collection::{field_matches, Collection, Record};
use crate::stats::{parse_stats, Stat};

/// Reserved-instance purchase decision for one action. `cost_with_ri` is an
/// hourly price and is zero whenever `to_buy` is false.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RiDecision {
    pub to_buy: bool,
    pub cost_with_ri: f64,
}

impl RiDecision {
    pub const NONE: Self = Self { to_buy: false, cost_with_ri: 0.0 };
}

/// The `reservedInstance` object. Fields are read one at a time; a
/// malformed one falls back to its default alone.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ReservedInstance {
    pub to_buy: bool,
    pub effective_hourly_cost: f64,
}

impl ReservedInstance {
    pub fn from_value(raw: &Value) -> Self {
        Self {
            to_buy: raw.get("toBuy").and_then(Value::as_bool).unwrap_or(false),
            effective_hourly_cost: raw.get("effectiveHourlyCost").and_then(Value::as_f64).unwrap_or(0.0),
        }
    }
}

/// The two shapes upstream has used to describe an RI purchase. Records that
/// carry a `reservedInstance` object use the current shape; everything else
/// encodes the purchase as a "superSavings" cost stat.
#[derive(Debug, Clone)]
pub enum RiSchema {
    Legacy { stats: Vec<Stat> },
    Current(ReservedInstance),
}

impl RiSchema {
    pub fn detect(raw: &Value) -> Self {
        match raw.get("reservedInstance") {
            Some(ri) => Self::Current(ReservedInstance::from_value(ri)),
            None => Self::Legacy { stats: parse_stats(raw.get("stats")) },
        }
    }

    pub fn decision(&self) -> RiDecision {
        match self {
            // No early exit: with several qualifying entries the last one wins.
            Self::Legacy { stats } => {
                let mut decision = RiDecision::NONE;
                for stat in stats.iter().filter(|s| s.is_named("costPrice")) {
                    for filter in &stat.filters {
                        if filter.matches("savingsType", "superSavings") {
                            // reported as a negative saving
                            decision = RiDecision {
                                to_buy: true,
                                cost_with_ri: -stat.value.unwrap_or(0.0),
                            };
                        }
                    }
                }
                decision
            }
            Self::Current(ri) if ri.to_buy => RiDecision {
                to_buy: true,
                cost_with_ri: ri.effective_hourly_cost,
            },
            Self::Current(_) => RiDecision::NONE,
        }
    }
}

/// Derives the RI decision for a raw action record. Only virtual machine
/// targets are eligible.
pub fn derive_ri(raw: &Value) -> RiDecision {
    let target_type = raw.pointer("/target/className").and_then(Value::as_str);
    if !field_matches(target_type, "virtualmachine") {
        return RiDecision::NONE;
    }
    RiSchema::detect(raw).decision()
}

/// One recommended change to one target entity. Keeps the raw record intact
/// and adds the derived RI decision.
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    raw: Value,
    ri: RiDecision,
}

impl Action {
    pub fn new(raw: Value) -> Self {
        let ri = derive_ri(&raw);
        Self { raw, ri }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.raw.get(key)
    }

    pub fn value_at(&self, pointer: &str) -> Option<&Value> {
        self.raw.pointer(pointer)
    }

    /// String at a JSON pointer inside the raw record.
    pub fn str_at(&self, pointer: &str) -> Option<&str> {
        self.value_at(pointer).and_then(Value::as_str)
    }

    pub fn uuid(&self) -> Option<&str> {
        self.str_at("/uuid")
    }

    pub fn action_type(&self) -> Option<&str> {
        self.str_at("/actionType")
    }

    pub fn target_entity_id(&self) -> Option<&str> {
        self.str_at("/target/realtimeMarketReference/uuid")
    }

    /// Per-market id of the target, as opposed to [`Action::target_entity_id`].
    pub fn target_uuid(&self) -> Option<&str> {
        self.str_at("/target/uuid")
    }

    pub fn target_entity_type(&self) -> Option<&str> {
        self.str_at("/target/className")
    }

    pub fn target_display_name(&self) -> Option<&str> {
        self.str_at("/target/displayName")
    }

    pub fn ri(&self) -> RiDecision {
        self.ri
    }

    pub fn ri_to_buy(&self) -> bool {
        self.ri.to_buy
    }

    pub fn cost_with_ri(&self) -> f64 {
        self.ri.cost_with_ri
    }

    /// Raw record plus `riToBuy` / `costWithRi`.
    pub fn to_value(&self) -> Value {
        let mut map = match &self.raw {
            Value::Object(m) => m.clone(),
            _ => Map::new(),
        };
        map.insert("riToBuy".to_string(), Value::Bool(self.ri.to_buy));
        map.insert("costWithRi".to_string(), serde_json::json!(self.ri.cost_with_ri));
        Value::Object(map)
    }
}

impl Record for Action {
    fn entity_type(&self) -> Option<&str> {
        self.target_entity_type()
    }

    fn reference_id(&self) -> Option<&str> {
        self.target_entity_id()
    }
}

impl From<Value> for Action {
    fn from(raw: Value) -> Self {
        Self::new(raw)
    }
}

impl Serialize for Action {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Action {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Self::new)
    }
}

impl Collection<Action> {
    pub fn from_raw(raw: Vec<Value>) -> Self {
        raw.into_iter().map(Action::new).collect()
    }

    pub fn iter_action_type<'a>(&'a self, action_type: &'a str) -> impl Iterator<Item = &'a Action> + 'a {
        self.iter().filter(move |a| field_matches(a.action_type(), action_type))
    }

    pub fn by_action_type(&self, action_type: &str) -> Self {
        self.iter_action_type(action_type).cloned().collect()
    }
}

pub type ActionCollection = Collection<Action>;
