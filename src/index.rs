use indexmap::IndexMap;
use tracing::warn;

use crate::action::{Action, ActionCollection};
use crate::collection::Record;
use crate::entity::Entity;

/// Everything a migration plan produced for one entity: the entity record
/// itself (when the market returned it) and its actions in both markets.
#[derive(Debug, Clone, Default)]
pub struct PlanEntity {
    entity: Option<Entity>,
    allocation_actions: ActionCollection,
    consumption_actions: ActionCollection,
}

impl PlanEntity {
    fn from_entity(entity: Entity) -> Self {
        Self { entity: Some(entity), ..Self::default() }
    }

    pub fn entity(&self) -> Option<&Entity> {
        self.entity.as_ref()
    }

    pub fn allocation_actions(&self) -> &ActionCollection {
        &self.allocation_actions
    }

    pub fn consumption_actions(&self) -> &ActionCollection {
        &self.consumption_actions
    }

    /// True when the entity has no allocation action, or was placed by the
    /// allocation market but not by the consumption market.
    ///
    /// Only meaningful once both action lists hold a single action type.
    pub fn is_unplaced(&self) -> bool {
        self.allocation_actions.is_empty() || self.consumption_actions.is_empty()
    }
}

/// Actions of a migration plan grouped by cross-market reference id.
///
/// Built once; entries keep first-seen order (entities, then consumption
/// actions, then allocation actions).
#[derive(Debug, Clone, Default)]
pub struct EntityActionIndex {
    entries: IndexMap<String, PlanEntity>,
}

impl EntityActionIndex {
    pub fn build<E, A, C>(entities: E, allocation_actions: A, consumption_actions: C) -> Self
    where
        E: IntoIterator<Item = Entity>,
        A: IntoIterator<Item = Action>,
        C: IntoIterator<Item = Action>,
    {
        let mut entries: IndexMap<String, PlanEntity> = IndexMap::new();

        for entity in entities {
            let Some(id) = entity.reference_id().map(str::to_owned) else {
                warn!(uuid = ?entity.uuid(), "entity has no realtime market reference, skipping");
                continue;
            };
            entries.insert(id, PlanEntity::from_entity(entity));
        }

        for action in consumption_actions {
            let Some(id) = action.reference_id().map(str::to_owned) else {
                warn!(uuid = ?action.uuid(), "consumption action target has no realtime market reference, skipping");
                continue;
            };
            entries.entry(id).or_default().consumption_actions.push(action);
        }

        for action in allocation_actions {
            let Some(id) = action.reference_id().map(str::to_owned) else {
                warn!(uuid = ?action.uuid(), "allocation action target has no realtime market reference, skipping");
                continue;
            };
            entries.entry(id).or_default().allocation_actions.push(action);
        }

        Self { entries }
    }

    pub fn get(&self, reference_id: &str) -> Option<&PlanEntity> {
        self.entries.get(reference_id)
    }

    pub fn contains(&self, reference_id: &str) -> bool {
        self.entries.contains_key(reference_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PlanEntity)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn unplaced(&self) -> impl Iterator<Item = (&str, &PlanEntity)> {
        self.iter().filter(|(_, e)| e.is_unplaced())
    }

    pub fn placed(&self) -> impl Iterator<Item = (&str, &PlanEntity)> {
        self.iter().filter(|(_, e)| !e.is_unplaced())
    }
}
