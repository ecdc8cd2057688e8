use indexmap::IndexMap;
use serde_json::Value;

use crate::action::{Action, ActionCollection, RiDecision};
use crate::collection::field_matches;
use crate::stats::DiskStats;

pub const VM_HEADER_BAND: [&str; 12] = [
    "Current",
    " ",
    " ",
    "ALLOCATION PLAN : On-Demand Pricing",
    " ",
    " ",
    "CONSUMPTION PLAN : On-Demand Pricing",
    " ",
    " ",
    " ",
    " ",
    " ",
];

pub const VM_COLUMNS: [&str; 12] = [
    "VM NAME",
    "Platform",
    "Location",
    "Template",
    "Placement",
    "ON-DEMAND COST",
    "Template",
    "Platform",
    "Placement",
    "ON-DEMAND COST",
    "COST WITH RI DISCOUNT",
    "RI TO BUY",
];

pub const VOLUME_HEADER_BAND: [&str; 12] = [
    "Current",
    " ",
    " ",
    " ",
    "ALLOCATION PLAN : On-Demand Pricing",
    " ",
    " ",
    " ",
    "CONSUMPTION PLAN : On-Demand Pricing",
    " ",
    " ",
    " ",
];

pub const VOLUME_COLUMNS: [&str; 12] = [
    "Disk Id",
    "Storage",
    "Size",
    "Linked VM",
    "Tier",
    "Size",
    "Location",
    "Cost",
    "Tier",
    "Size",
    "Location",
    "Cost",
];

const UNKNOWN_LOCATION: &str = "Unknown";

fn text(action: Option<&Action>, pointer: &str) -> Option<String> {
    action.and_then(|a| a.str_at(pointer)).map(str::to_string)
}

fn number(action: Option<&Action>, pointer: &str) -> Option<f64> {
    action.and_then(|a| a.value_at(pointer)).and_then(Value::as_f64)
}

fn money(hourly: Option<f64>, hours_per_month: f64) -> String {
    hourly.map(|v| format!("{:.2}", v * hours_per_month)).unwrap_or_default()
}

fn size(mb: Option<f64>) -> String {
    mb.map(|v| v.to_string()).unwrap_or_default()
}

// ---------- VM template mapping ----------

/// One VM of a migration plan: where the allocation (no-resize) market put it
/// and where the consumption (optimized) market put it. Prices are hourly.
#[derive(Debug, Clone, PartialEq)]
pub struct VmTemplateRow {
    pub reference_id: String,
    pub vm_name: String,
    pub platform: Option<String>,
    pub location: String,
    pub allocation_template: Option<String>,
    pub allocation_placement: Option<String>,
    pub allocation_cost: Option<f64>,
    pub consumption_template: Option<String>,
    pub consumption_platform: Option<String>,
    pub consumption_placement: Option<String>,
    pub consumption_cost: Option<f64>,
    pub ri: RiDecision,
}

impl VmTemplateRow {
    fn from_pair(reference_id: String, with: Option<&Action>, without: Option<&Action>) -> Self {
        let vm_name = text(without, "/target/displayName")
            .or_else(|| text(with, "/target/displayName"))
            .unwrap_or_default();
        let location = text(with, "/currentLocation/displayName")
            .or_else(|| text(without, "/currentLocation/displayName"))
            .unwrap_or_else(|| UNKNOWN_LOCATION.to_string());

        Self {
            reference_id,
            vm_name,
            platform: text(without, "/target/aspects/virtualMachineAspect/os"),
            location,
            allocation_template: text(without, "/template/displayName"),
            allocation_placement: text(without, "/newLocation/displayName"),
            allocation_cost: number(without, "/target/costPrice"),
            consumption_template: text(with, "/template/displayName"),
            consumption_platform: text(with, "/newEntity/aspects/virtualMachineAspect/os"),
            consumption_placement: text(with, "/newLocation/displayName"),
            consumption_cost: number(with, "/target/costPrice"),
            ri: with.map(Action::ri).unwrap_or(RiDecision::NONE),
        }
    }

    /// CSV cells with prices scaled to a month.
    pub fn to_record(&self, hours_per_month: f64) -> Vec<String> {
        let cost_with_ri = if self.ri.cost_with_ri == 0.0 {
            "-".to_string()
        } else {
            money(Some(self.ri.cost_with_ri), hours_per_month)
        };

        vec![
            self.vm_name.clone(),
            self.platform.clone().unwrap_or_default(),
            self.location.clone(),
            self.allocation_template.clone().unwrap_or_default(),
            self.allocation_placement.clone().unwrap_or_default(),
            money(self.allocation_cost, hours_per_month),
            self.consumption_template.clone().unwrap_or_default(),
            self.consumption_platform.clone().unwrap_or_default(),
            self.consumption_placement.clone().unwrap_or_default(),
            money(self.consumption_cost, hours_per_month),
            cost_with_ri,
            if self.ri.to_buy { "Yes" } else { "-" }.to_string(),
        ]
    }
}

fn vm_moves(actions: &ActionCollection) -> impl Iterator<Item = &Action> {
    actions
        .iter_action_type("MOVE")
        .filter(|a| field_matches(a.target_entity_type(), "VirtualMachine"))
}

/// Pairs VM MOVE actions of the consumption market with those of the
/// allocation market by reference id. Every VM seen on either side gets a row.
pub fn vm_template_rows(consumption: &ActionCollection, allocation: &ActionCollection) -> Vec<VmTemplateRow> {
    let mut matched: IndexMap<String, (Option<&Action>, Option<&Action>)> = IndexMap::new();

    for with in vm_moves(consumption) {
        if let Some(id) = with.target_entity_id() {
            matched.insert(id.to_string(), (Some(with), None));
        }
    }

    for without in vm_moves(allocation) {
        if let Some(id) = without.target_entity_id() {
            matched.entry(id.to_string()).or_insert((None, None)).1 = Some(without);
        }
    }

    matched
        .into_iter()
        .map(|(id, (with, without))| VmTemplateRow::from_pair(id, with, without))
        .collect()
}

pub fn vm_template_table(rows: &[VmTemplateRow], hours_per_month: f64) -> Vec<Vec<String>> {
    std::iter::once(VM_COLUMNS.iter().map(|c| c.to_string()).collect())
        .chain(rows.iter().map(|r| r.to_record(hours_per_month)))
        .collect()
}

// ---------- volume tier mapping ----------

/// One virtual disk placed by both markets. Sizes are in MB, prices hourly.
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeTierRow {
    pub disk_id: String,
    pub storage: Option<String>,
    pub linked_vm: Option<String>,
    pub allocation_tier: Option<String>,
    pub allocation_size: Option<f64>,
    pub allocation_location: Option<String>,
    pub allocation_cost: Option<f64>,
    pub consumption_tier: Option<String>,
    pub consumption_size: Option<f64>,
    pub consumption_location: Option<String>,
    pub consumption_cost: Option<f64>,
}

impl VolumeTierRow {
    pub fn to_record(&self, hours_per_month: f64) -> Vec<String> {
        vec![
            self.disk_id.clone(),
            self.storage.clone().unwrap_or_default(),
            // the allocation size stands in for the on-prem size
            size(self.allocation_size),
            self.linked_vm.clone().unwrap_or_default(),
            self.allocation_tier.clone().unwrap_or_default(),
            size(self.allocation_size),
            self.allocation_location.clone().unwrap_or_default(),
            money(self.allocation_cost, hours_per_month),
            self.consumption_tier.clone().unwrap_or_default(),
            size(self.consumption_size),
            self.consumption_location.clone().unwrap_or_default(),
            money(self.consumption_cost, hours_per_month),
        ]
    }
}

fn virtual_disks(action: &Action) -> &[Value] {
    action
        .get("virtualDisks")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

fn disk_str<'a>(disk: &'a Value, key: &str) -> Option<&'a str> {
    disk.get(key).and_then(Value::as_str)
}

/// Pairs virtual disks of actions targeting the same entity in both markets.
/// Entities or disks missing from either side produce no row.
pub fn volume_tier_rows(consumption: &ActionCollection, allocation: &ActionCollection) -> Vec<VolumeTierRow> {
    let mut rows = Vec::new();

    for with in consumption {
        let Some(id) = with.target_entity_id() else { continue };
        for without in allocation.iter().filter(|a| a.target_entity_id() == Some(id)) {
            for with_disk in virtual_disks(with) {
                for without_disk in virtual_disks(without) {
                    let Some(name) = disk_str(without_disk, "displayName") else { continue };
                    if disk_str(with_disk, "displayName") != Some(name) {
                        continue;
                    }

                    let w = DiskStats::from_disk(with_disk);
                    let wo = DiskStats::from_disk(without_disk);
                    let region = "/newEntity/aspects/cloudAspect/region/displayName";
                    rows.push(VolumeTierRow {
                        disk_id: name.to_string(),
                        storage: without.str_at("/currentEntity/displayName").map(str::to_string),
                        linked_vm: without.target_display_name().map(str::to_string),
                        allocation_tier: disk_str(without_disk, "tier").map(str::to_string),
                        allocation_size: wo.size_mb,
                        allocation_location: without.str_at(region).map(str::to_string),
                        allocation_cost: wo.price_per_hour,
                        consumption_tier: disk_str(with_disk, "tier").map(str::to_string),
                        consumption_size: w.size_mb,
                        consumption_location: with.str_at(region).map(str::to_string),
                        consumption_cost: w.price_per_hour,
                    });
                }
            }
        }
    }

    rows
}

pub fn volume_tier_table(rows: &[VolumeTierRow], hours_per_month: f64) -> Vec<Vec<String>> {
    std::iter::once(VOLUME_COLUMNS.iter().map(|c| c.to_string()).collect())
        .chain(rows.iter().map(|r| r.to_record(hours_per_month)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn vm_move(id: &str, name: &str, template: &str, extra: Value) -> Value {
        let mut raw = json!({
            "uuid": format!("act-{id}-{template}"),
            "actionType": "MOVE",
            "target": {
                "className": "VirtualMachine",
                "displayName": name,
                "costPrice": 0.1,
                "realtimeMarketReference": {"uuid": id},
                "aspects": {"virtualMachineAspect": {"os": "LINUX"}}
            },
            "currentLocation": {"displayName": "dc-east"},
            "newLocation": {"displayName": "azure-East US"},
            "template": {"displayName": template},
            "newEntity": {"aspects": {"virtualMachineAspect": {"os": "RHEL"}}}
        });
        if let (Value::Object(base), Value::Object(more)) = (&mut raw, extra) {
            base.extend(more);
        }
        raw
    }

    fn disk(name: &str, tier: &str, size: f64, price: f64) -> Value {
        json!({
            "displayName": name,
            "tier": tier,
            "stats": [
                {"name": "StorageAmount", "capacity": {"total": size}},
                {"name": "costPrice", "value": price}
            ]
        })
    }

    fn volume_change(id: &str, region: &str, disks: Vec<Value>) -> Value {
        json!({
            "uuid": format!("chg-{id}-{region}"),
            "actionType": "CHANGE",
            "target": {
                "className": "VirtualMachine",
                "displayName": format!("{id}-vm"),
                "realtimeMarketReference": {"uuid": id}
            },
            "currentEntity": {"displayName": "datastore-1"},
            "newEntity": {"aspects": {"cloudAspect": {"region": {"displayName": region}}}},
            "virtualDisks": disks
        })
    }

    fn consumption_vms() -> ActionCollection {
        ActionCollection::from_raw(vec![vm_move(
            "vm-1",
            "web-01",
            "D2s_v3",
            json!({"reservedInstance": {"toBuy": true, "effectiveHourlyCost": 0.05}}),
        )])
    }

    fn allocation_vms() -> ActionCollection {
        ActionCollection::from_raw(vec![
            vm_move("vm-1", "web-01", "D4s_v3", json!({})),
            vm_move("vm-2", "db-01", "E8s_v3", json!({})),
        ])
    }

    #[test]
    fn test_vm_rows_are_union_of_both_sides() {
        let rows = vm_template_rows(&consumption_vms(), &allocation_vms());
        let ids: Vec<_> = rows.iter().map(|r| r.reference_id.as_str()).collect();
        assert_eq!(ids, vec!["vm-1", "vm-2"]);
    }

    #[test]
    fn test_vm_row_with_both_sides() {
        let rows = vm_template_rows(&consumption_vms(), &allocation_vms());
        let row = &rows[0];

        assert_eq!(row.vm_name, "web-01");
        assert_eq!(row.platform.as_deref(), Some("LINUX"));
        assert_eq!(row.location, "dc-east");
        assert_eq!(row.allocation_template.as_deref(), Some("D4s_v3"));
        assert_eq!(row.consumption_template.as_deref(), Some("D2s_v3"));
        assert_eq!(row.consumption_platform.as_deref(), Some("RHEL"));
        assert_eq!(row.ri, RiDecision { to_buy: true, cost_with_ri: 0.05 });
    }

    #[test]
    fn test_vm_row_allocation_only_has_empty_consumption_columns() {
        let rows = vm_template_rows(&consumption_vms(), &allocation_vms());
        let row = &rows[1];

        assert_eq!(row.vm_name, "db-01");
        assert_eq!(row.allocation_template.as_deref(), Some("E8s_v3"));
        assert_eq!(row.consumption_template, None);
        assert_eq!(row.ri, RiDecision::NONE);

        let record = row.to_record(730.0);
        assert_eq!(record[6], "");
        assert_eq!(record[7], "");
        assert_eq!(record[8], "");
        assert_eq!(record[9], "");
        assert_eq!(record[10], "-");
        assert_eq!(record[11], "-");
    }

    #[test]
    fn test_vm_row_consumption_only_keeps_name() {
        let rows = vm_template_rows(&consumption_vms(), &ActionCollection::new());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].vm_name, "web-01");
        assert_eq!(rows[0].allocation_template, None);
        assert_eq!(rows[0].platform, None);
    }

    #[test]
    fn test_vm_rows_use_legacy_ri_stats() {
        let consumption = ActionCollection::from_raw(vec![vm_move(
            "vm-3",
            "app-01",
            "B2ms",
            json!({"stats": [{
                "name": "costPrice",
                "value": -0.2,
                "filters": [{"type": "savingsType", "value": "superSavings"}]
            }]}),
        )]);
        let rows = vm_template_rows(&consumption, &ActionCollection::new());
        assert_eq!(rows[0].ri, RiDecision { to_buy: true, cost_with_ri: 0.2 });
    }

    #[test]
    fn test_vm_rows_skip_other_entities_and_action_types() {
        let consumption = ActionCollection::from_raw(vec![
            json!({"actionType": "MOVE", "target": {"className": "Storage", "realtimeMarketReference": {"uuid": "st-1"}}}),
            json!({"actionType": "RESIZE", "target": {"className": "VirtualMachine", "realtimeMarketReference": {"uuid": "vm-9"}}}),
        ]);
        assert!(vm_template_rows(&consumption, &ActionCollection::new()).is_empty());
    }

    #[test]
    fn test_vm_rows_match_move_and_type_case_insensitively() {
        let mut with = vm_move("vm-5", "cache-01", "F4s", json!({}));
        with["actionType"] = json!("move");
        with["target"]["className"] = json!("virtualMachine");
        let mut without = vm_move("vm-5", "cache-01", "F8s", json!({}));
        without["actionType"] = json!("Move");

        let rows = vm_template_rows(&ActionCollection::from_raw(vec![with]), &ActionCollection::from_raw(vec![without]));
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].consumption_template.as_deref(), Some("F4s"));
        assert_eq!(rows[0].allocation_template.as_deref(), Some("F8s"));
    }

    #[test]
    fn test_vm_record_formatting() {
        let rows = vm_template_rows(&consumption_vms(), &allocation_vms());
        let record = rows[0].to_record(730.0);

        assert_eq!(record.len(), VM_COLUMNS.len());
        assert_eq!(record[5], "73.00");
        assert_eq!(record[9], "73.00");
        assert_eq!(record[10], "36.50");
        assert_eq!(record[11], "Yes");

        let table = vm_template_table(&rows, 730.0);
        assert_eq!(table.len(), 3);
        assert_eq!(table[0][0], "VM NAME");
    }

    #[test]
    fn test_volume_rows_are_intersection() {
        let consumption = ActionCollection::from_raw(vec![
            volume_change(
                "vm-1",
                "East US",
                vec![disk("disk-a", "MANAGED_PREMIUM", 128.0, 0.02), disk("disk-only-optimized", "MANAGED_STANDARD", 64.0, 0.01)],
            ),
            volume_change("vm-3", "East US", vec![disk("disk-c", "MANAGED_STANDARD", 32.0, 0.01)]),
        ]);
        let allocation = ActionCollection::from_raw(vec![
            volume_change("vm-1", "West US", vec![disk("disk-a", "MANAGED_STANDARD", 256.0, 0.04)]),
            volume_change("vm-2", "West US", vec![disk("disk-b", "MANAGED_STANDARD", 16.0, 0.01)]),
        ]);

        let rows = volume_tier_rows(&consumption, &allocation);
        assert_eq!(rows.len(), 1);

        let row = &rows[0];
        assert_eq!(row.disk_id, "disk-a");
        assert_eq!(row.storage.as_deref(), Some("datastore-1"));
        assert_eq!(row.linked_vm.as_deref(), Some("vm-1-vm"));
        assert_eq!(row.allocation_tier.as_deref(), Some("MANAGED_STANDARD"));
        assert_eq!(row.allocation_size, Some(256.0));
        assert_eq!(row.allocation_location.as_deref(), Some("West US"));
        assert_eq!(row.consumption_tier.as_deref(), Some("MANAGED_PREMIUM"));
        assert_eq!(row.consumption_size, Some(128.0));
        assert_eq!(row.consumption_location.as_deref(), Some("East US"));
        assert_eq!(row.consumption_cost, Some(0.02));
    }

    #[test]
    fn test_asymmetry_between_vm_and_volume_reports() {
        // vm-2 only has an allocation action; disk-x only exists in consumption
        let consumption_moves = consumption_vms();
        let allocation_moves = allocation_vms();
        let consumption_changes = ActionCollection::from_raw(vec![volume_change(
            "vm-1",
            "East US",
            vec![disk("disk-a", "MANAGED_PREMIUM", 128.0, 0.02), disk("disk-x", "MANAGED_PREMIUM", 8.0, 0.01)],
        )]);
        let allocation_changes = ActionCollection::from_raw(vec![
            volume_change("vm-1", "West US", vec![disk("disk-a", "MANAGED_STANDARD", 128.0, 0.02)]),
            volume_change("vm-2", "West US", vec![disk("disk-b", "MANAGED_STANDARD", 8.0, 0.01)]),
        ]);

        let vm_rows = vm_template_rows(&consumption_moves, &allocation_moves);
        let volume_rows = volume_tier_rows(&consumption_changes, &allocation_changes);

        assert_eq!(vm_rows.len(), 2);
        assert!(vm_rows.iter().any(|r| r.reference_id == "vm-2"));
        assert_eq!(volume_rows.len(), 1);
        assert!(volume_rows.iter().all(|r| r.disk_id != "disk-x" && r.disk_id != "disk-b"));
    }

    #[test]
    fn test_volume_stats_do_not_leak_between_disks() {
        let consumption = ActionCollection::from_raw(vec![volume_change(
            "vm-1",
            "East US",
            vec![disk("disk-a", "T1", 10.0, 0.5), json!({"displayName": "disk-b", "tier": "T2"})],
        )]);
        let allocation = ActionCollection::from_raw(vec![volume_change(
            "vm-1",
            "West US",
            vec![disk("disk-a", "T1", 10.0, 0.5), json!({"displayName": "disk-b", "tier": "T2"})],
        )]);

        let rows = volume_tier_rows(&consumption, &allocation);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].consumption_size, None);
        assert_eq!(rows[1].allocation_cost, None);

        let record = rows[1].to_record(730.0);
        assert_eq!(record[2], "");
        assert_eq!(record[7], "");
    }

    #[test]
    fn test_volume_record_formatting() {
        let row = VolumeTierRow {
            disk_id: "disk-a".to_string(),
            storage: Some("ds".to_string()),
            linked_vm: Some("web-01".to_string()),
            allocation_tier: Some("STANDARD".to_string()),
            allocation_size: Some(1024.0),
            allocation_location: Some("West US".to_string()),
            allocation_cost: Some(0.01),
            consumption_tier: Some("PREMIUM".to_string()),
            consumption_size: Some(512.0),
            consumption_location: Some("East US".to_string()),
            consumption_cost: Some(0.02),
        };
        let record = row.to_record(100.0);
        assert_eq!(
            record,
            vec!["disk-a", "ds", "1024", "web-01", "STANDARD", "1024", "West US", "1.00", "PREMIUM", "512", "East US", "2.00"]
        );
        assert_eq!(volume_tier_table(&[row], 100.0)[0], VOLUME_COLUMNS.to_vec());
    }

    #[test]
    fn test_volume_rows_ignore_unnamed_disks() {
        let consumption = ActionCollection::from_raw(vec![volume_change("vm-1", "E", vec![json!({"tier": "T"})])]);
        let allocation = ActionCollection::from_raw(vec![volume_change("vm-1", "W", vec![json!({"tier": "T"})])]);
        assert!(volume_tier_rows(&consumption, &allocation).is_empty());
    }
}
