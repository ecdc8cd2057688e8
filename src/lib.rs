//! Cloud migration planning against a Turbonomic-style planning service:
//! run what-if scenarios, wait for the plan markets, and reconcile the
//! allocation and consumption action sets into per-VM and per-volume reports.

pub mod action;
pub mod api;
pub mod collection;
pub mod config;
pub mod entity;
pub mod error;
pub mod index;
pub mod migration;
pub mod models;
pub mod plan;
pub mod poll;
pub mod reports;
pub mod stats;
pub mod table;
pub mod templates;

#[cfg(test)]
mod fake;

pub use action::{Action, ActionCollection, RiDecision};
pub use api::{Client, PlanningApi};
pub use entity::{Entity, EntityCollection};
pub use error::{PlanError, PlanResult};
pub use index::{EntityActionIndex, PlanEntity};
pub use migration::{CloudMigrationPlan, CloudOptimizePlan, MigrationOptions};
pub use plan::{Plan, PlanState};
pub use poll::PollPolicy;
