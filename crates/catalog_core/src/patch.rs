//! Three-state field change.
//!
//! A field in an update is either left alone, explicitly cleared (sent as
//! `null`), or set to a value. Collapsing this into `Option<T>` loses the
//! difference between "not mentioned" and "cleared", which the owner-set
//! algebra depends on.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Patch<T> {
    #[default]
    Keep,
    Clear,
    Set(T),
}

impl<T> Patch<T> {
    pub fn is_keep(&self) -> bool {
        matches!(self, Patch::Keep)
    }

    /// Apply this change to a current value.
    pub fn apply_to(self, current: Option<T>) -> Option<T> {
        match self {
            Patch::Keep => current,
            Patch::Clear => None,
            Patch::Set(value) => Some(value),
        }
    }

    pub fn as_ref(&self) -> Patch<&T> {
        match self {
            Patch::Keep => Patch::Keep,
            Patch::Clear => Patch::Clear,
            Patch::Set(value) => Patch::Set(value),
        }
    }
}

impl<T: Serialize> Patch<T> {
    /// JSON rendering for an update payload. `None` means "omit the field".
    pub fn to_json(&self) -> Option<serde_json::Value> {
        match self {
            Patch::Keep => None,
            Patch::Clear => Some(serde_json::Value::Null),
            Patch::Set(value) => serde_json::to_value(value).ok(),
        }
    }
}
