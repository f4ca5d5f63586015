//! Change-notification envelope.
//!
//! Events are request-scoped: decoded once per delivery, read, discarded.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::asset::AssetSnapshot;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<EventPayload>,
    /// Milliseconds since the epoch at which the catalog emitted the message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg_creation_time: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg_created_by: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPayload {
    #[serde(default, alias = "entity", skip_serializing_if = "Option::is_none")]
    pub asset: Option<AssetSnapshot>,
    /// e.g. `ENTITY_CREATE`, `ENTITY_UPDATE`, `CLASSIFICATION_ADD`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_time: Option<i64>,
}

impl CatalogEvent {
    pub fn for_asset(asset: AssetSnapshot) -> Self {
        Self {
            payload: Some(EventPayload {
                asset: Some(asset),
                operation_type: None,
                event_time: None,
            }),
            msg_creation_time: None,
            msg_created_by: None,
        }
    }

    /// The embedded snapshot, if the notification carried one.
    pub fn asset(&self) -> Option<&AssetSnapshot> {
        self.payload.as_ref()?.asset.as_ref()
    }

    pub fn operation_type(&self) -> Option<&str> {
        self.payload.as_ref()?.operation_type.as_deref()
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.msg_creation_time
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
    }
}
