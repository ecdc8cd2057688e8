use serde_json::Value;

/// One entry of a `stats` list on an action or virtual disk.
///
/// Each field is read on its own: a malformed field is dropped without
/// affecting its siblings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stat {
    pub name: Option<String>,
    pub value: Option<f64>,
    pub filters: Vec<StatFilter>,
    pub capacity: Option<Capacity>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatFilter {
    pub kind: Option<String>,
    pub value: Option<Value>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Capacity {
    pub total: Option<f64>,
}

fn str_field(obj: &Value, key: &str) -> Option<String> {
    obj.get(key).and_then(Value::as_str).map(str::to_string)
}

impl Stat {
    /// `None` only when the entry is not a JSON object.
    pub fn from_value(raw: &Value) -> Option<Self> {
        if !raw.is_object() {
            return None;
        }
        let filters = raw
            .get("filters")
            .and_then(Value::as_array)
            .map(|list| list.iter().filter_map(StatFilter::from_value).collect())
            .unwrap_or_default();
        let capacity = raw
            .get("capacity")
            .filter(|c| c.is_object())
            .map(|c| Capacity { total: c.get("total").and_then(Value::as_f64) });

        Some(Self {
            name: str_field(raw, "name"),
            value: raw.get("value").and_then(Value::as_f64),
            filters,
            capacity,
        })
    }

    pub fn is_named(&self, name: &str) -> bool {
        self.name.as_deref() == Some(name)
    }

    pub fn capacity_total(&self) -> Option<f64> {
        self.capacity.and_then(|c| c.total)
    }
}

impl StatFilter {
    pub fn from_value(raw: &Value) -> Option<Self> {
        if !raw.is_object() {
            return None;
        }
        Some(Self {
            kind: str_field(raw, "type"),
            value: raw.get("value").cloned(),
        })
    }

    pub fn matches(&self, kind: &str, value: &str) -> bool {
        self.kind.as_deref() == Some(kind) && self.value.as_ref().and_then(Value::as_str) == Some(value)
    }
}

pub fn parse_stats(stats: Option<&Value>) -> Vec<Stat> {
    stats
        .and_then(Value::as_array)
        .map(|list| list.iter().filter_map(Stat::from_value).collect())
        .unwrap_or_default()
}

/// Storage size and hourly price of one virtual disk.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DiskStats {
    pub size_mb: Option<f64>,
    pub price_per_hour: Option<f64>,
}

impl DiskStats {
    /// Scans the disk's stats; for repeated names the last entry wins.
    pub fn from_disk(disk: &Value) -> Self {
        let mut out = Self::default();
        for stat in parse_stats(disk.get("stats")) {
            if stat.is_named("StorageAmount") {
                out.size_mb = stat.capacity_total();
            }
            if stat.is_named("costPrice") {
                out.price_per_hour = stat.value;
            }
        }
        out
    }
}
