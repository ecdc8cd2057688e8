use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::collection::{field_matches, Collection, Record};

/// A service entity (virtual machine, volume, ...) as returned by a market.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    raw: Value,
}

impl Entity {
    pub fn new(raw: Value) -> Self {
        Self { raw }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.raw.get(key)
    }

    pub fn str_at(&self, pointer: &str) -> Option<&str> {
        self.raw.pointer(pointer).and_then(Value::as_str)
    }

    /// Per-market id.
    pub fn uuid(&self) -> Option<&str> {
        self.str_at("/uuid")
    }

    pub fn reference_id(&self) -> Option<&str> {
        self.str_at("/realtimeMarketReference/uuid")
    }

    pub fn class_name(&self) -> Option<&str> {
        self.str_at("/className")
    }

    pub fn state(&self) -> Option<&str> {
        self.str_at("/state")
    }

    pub fn display_name(&self) -> Option<&str> {
        self.str_at("/displayName")
    }
}

impl Record for Entity {
    fn entity_type(&self) -> Option<&str> {
        self.class_name()
    }

    fn reference_id(&self) -> Option<&str> {
        Entity::reference_id(self)
    }
}

impl From<Value> for Entity {
    fn from(raw: Value) -> Self {
        Self::new(raw)
    }
}

impl Serialize for Entity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.raw.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Entity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Self::new)
    }
}

impl Collection<Entity> {
    pub fn from_raw(raw: Vec<Value>) -> Self {
        raw.into_iter().map(Entity::new).collect()
    }

    pub fn iter_state<'a>(&'a self, state: &'a str) -> impl Iterator<Item = &'a Entity> + 'a {
        self.iter().filter(move |e| field_matches(e.state(), state))
    }

    pub fn by_state(&self, state: &str) -> Self {
        self.iter_state(state).cloned().collect()
    }
}

pub type EntityCollection = Collection<Entity>;
