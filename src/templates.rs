use serde_json::{json, Value};

// ---------- OS migration settings applied when BYOL is requested ----------
pub const BYOL_OS_MIGRATION_SETTINGS: [(&str, &str); 9] = [
    ("matchToSource", "false"),
    ("linuxTargetOs", "LINUX"),
    ("linuxByol", "true"),
    ("windowsTargetOs", "WINDOWS"),
    ("windowsByol", "true"),
    ("rhelTargetOs", "RHEL"),
    ("rhelByol", "true"),
    ("slesTargetOs", "SUSE"),
    ("slesByol", "true"),
];

fn empty_topology_changes() -> Value {
    json!({
        "addList": [],
        "migrateList": [],
        "removeList": [],
        "replaceList": [],
        "relievePressureList": []
    })
}

fn empty_load_changes() -> Value {
    json!({
        "utilizationList": [],
        "maxUtilizationList": []
    })
}

fn byol_settings() -> Value {
    BYOL_OS_MIGRATION_SETTINGS
        .iter()
        .map(|(uuid, value)| json!({"uuid": uuid, "value": value}))
        .collect()
}

/// Scenario for moving the VMs of `from` onto the hosts of `to`, leaving out
/// the members of `exclude`.
pub fn cloud_migration_scenario(name: &str, from: &Value, to: &Value, exclude: &Value, byol: bool) -> Value {
    let mut topology = empty_topology_changes();
    topology["migrateList"] = json!([{"projectionDay": 0, "source": from, "destination": to}]);
    topology["removeList"] = json!([{"projectionDay": 0, "target": exclude}]);
    let os_migration = if byol { byol_settings() } else { json!([]) };

    json!({
        "configChanges": {
            "addPolicyList": [],
            "automationSettingList": [],
            "removeConstraintList": [],
            "removePolicyList": [],
            "riSettingList": [],
            "osMigrationSettingList": os_migration
        },
        "displayName": name,
        "loadChanges": empty_load_changes(),
        "projectionDays": [0],
        "scope": [from, to],
        "topologyChanges": topology,
        "type": "CLOUD_MIGRATION"
    })
}

fn setting(uuid: &str, display_name: &str, value: &str, entity_type: &str) -> Value {
    json!({"uuid": uuid, "displayName": display_name, "value": value, "entityType": entity_type})
}

/// Scenario for resizing and RI-optimizing the workloads already in `scope`.
pub fn cloud_optimize_scenario(name: &str, scope: &Value) -> Value {
    json!({
        "configChanges": {
            "addPolicyList": [],
            "automationSettingList": [
                setting("resize", "resize for VMS enabled", "true", "VirtualMachine")
            ],
            "removeConstraintList": [],
            "removePolicyList": [],
            "riSettingList": [
                setting("preferredOfferingClass", "Type", "STANDARD", "STANDARD"),
                setting("preferredTerm", "Term", "YEARS_3", "YEARS_3"),
                setting("preferredPaymentOption", "Payment", "ALL_UPFRONT", "ALL_UPFRONT"),
                setting("preferredCoverage", "Coverage", "80", "80"),
                setting("riCoverageOverride", "RI Coverage Override", "false", "false")
            ],
            "osMigrationSettingList": [],
            "subscription": {}
        },
        "displayName": name,
        "loadChanges": empty_load_changes(),
        "projectionDays": [0],
        "scope": [scope],
        "topologyChanges": empty_topology_changes(),
        "type": "OPTIMIZE_CLOUD"
    })
}
