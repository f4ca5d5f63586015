//! Event envelope decoding.

use catalog_core::{AssetSnapshot, CatalogEvent};
use tracing::error;

use crate::error::{ReactorError, Result};

/// Parse the transport's opaque bytes into a typed event.
pub fn decode_event(bytes: &[u8]) -> Result<CatalogEvent> {
    serde_json::from_slice::<CatalogEvent>(bytes).map_err(|e| {
        error!(
            error = %e,
            body = %String::from_utf8_lossy(bytes),
            "Unable to deserialize event"
        );
        ReactorError::decode(e.to_string())
    })
}

/// The snapshot embedded in `event`, or a decode error when there is none.
pub fn require_snapshot(event: &CatalogEvent) -> Result<&AssetSnapshot> {
    event.asset().ok_or_else(|| {
        error!(?event, "No asset payload found in event");
        ReactorError::decode("event carries no asset payload")
    })
}
