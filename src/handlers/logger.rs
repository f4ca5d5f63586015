//! Pass-through handler that logs every event it sees.

use std::time::Instant;

use async_trait::async_trait;
use catalog_core::CatalogEvent;
use tracing::info;

use super::{EventHandler, HandlerOutcome};
use crate::error::Result;
use crate::routing::Route;

pub struct EventLogger;

#[async_trait]
impl EventHandler for EventLogger {
    fn name(&self) -> &'static str {
        "logger"
    }

    async fn handle(&self, event: &CatalogEvent, _picked_up_at: Instant) -> Result<HandlerOutcome> {
        info!(
            operation = event.operation_type().unwrap_or("unknown"),
            created_at = ?event.created_at(),
            payload = ?event.payload,
            "Event received"
        );
        Ok(HandlerOutcome::Forwarded)
    }

    fn quiet_route(&self) -> Route {
        Route::Forward
    }

    fn undecodable_route(&self) -> Route {
        Route::Forward
    }
}
