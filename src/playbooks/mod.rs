//! Playbook execution: load the rule catalog, match rules against an asset,
//! and apply their metadata mutations to a pair of working copies.

pub mod engine;
pub mod loader;
pub mod owners;
pub mod working_copy;

pub use engine::{EngineOutput, RuleEngine};
pub use loader::PlaybookLoader;
pub use owners::{plan_owner_change, OwnerChange};
pub use working_copy::{FieldChange, WorkingCopies};
