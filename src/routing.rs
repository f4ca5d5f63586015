//! Outcome routing.
//!
//! Turns one inbound message plus the handler's verdict into exactly one
//! outbound message for the hosting transport. Every emitted message
//! carries the inbound keys and bytes unchanged; a dropped message carries
//! neither and is tagged so the transport discards it.

use std::time::Instant;

use tracing::{error, info, warn};

use crate::envelope::decode_event;
use crate::error::Result;
use crate::handlers::{EventHandler, HandlerOutcome};

pub const SUCCESS_TAG: &str = "success";
pub const FAILURE_TAG: &str = "failure";
/// Tag the transport recognises as "emit nothing".
pub const DROP_TAG: &str = "U+005C__DROP__";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Success,
    Failure,
    /// Untagged: delivered to every downstream consumer.
    Forward,
    Drop,
}

impl Route {
    fn tags(self) -> Vec<String> {
        match self {
            Route::Success => vec![SUCCESS_TAG.to_string()],
            Route::Failure => vec![FAILURE_TAG.to_string()],
            Route::Forward => Vec::new(),
            Route::Drop => vec![DROP_TAG.to_string()],
        }
    }

    pub fn message(self, keys: &[String], value: &[u8]) -> RoutedMessage {
        match self {
            Route::Drop => RoutedMessage {
                keys: Vec::new(),
                value: Vec::new(),
                tags: self.tags(),
            },
            _ => RoutedMessage {
                keys: keys.to_vec(),
                value: value.to_vec(),
                tags: self.tags(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutedMessage {
    pub keys: Vec<String>,
    pub value: Vec<u8>,
    pub tags: Vec<String>,
}

/// Pick the route for a finished invocation.
pub fn route_for(handler: &dyn EventHandler, result: &Result<HandlerOutcome>) -> Route {
    match result {
        Ok(HandlerOutcome::Updated) => Route::Success,
        Ok(HandlerOutcome::Unchanged) => handler.quiet_route(),
        Ok(HandlerOutcome::Forwarded) => Route::Forward,
        Err(e) if !e.is_failure() => {
            info!(handler = handler.name(), reason = %e, "Nothing to do for event");
            handler.quiet_route()
        }
        Err(e) => {
            error!(handler = handler.name(), error = %e, "Event handling failed");
            Route::Failure
        }
    }
}

/// Decode, handle and route one inbound message.
pub async fn process(handler: &dyn EventHandler, keys: &[String], value: &[u8]) -> RoutedMessage {
    let picked_up_at = Instant::now();
    let route = match decode_event(value) {
        Ok(event) => {
            let result = handler.handle(&event, picked_up_at).await;
            route_for(handler, &result)
        }
        Err(e) => {
            warn!(handler = handler.name(), error = %e, "Routing undecodable message");
            handler.undecodable_route()
        }
    };
    info!(
        handler = handler.name(),
        ?route,
        elapsed_ms = picked_up_at.elapsed().as_millis() as u64,
        "Routed message"
    );
    route.message(keys, value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReactorError;
    use async_trait::async_trait;
    use catalog_core::{CatalogError, CatalogEvent};

    struct Fixed(fn() -> Result<HandlerOutcome>, Route);

    #[async_trait]
    impl EventHandler for Fixed {
        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn handle(&self, _event: &CatalogEvent, _at: Instant) -> Result<HandlerOutcome> {
            (self.0)()
        }

        fn quiet_route(&self) -> Route {
            self.1
        }
    }

    fn keys() -> Vec<String> {
        vec!["k".to_string()]
    }

    const EVENT: &[u8] = br#"{"payload":{"asset":{"guid":"g","typeName":"Table","attributes":{"qualifiedName":"q"}}}}"#;

    #[tokio::test]
    async fn updated_routes_to_success_with_original_bytes() {
        let handler = Fixed(|| Ok(HandlerOutcome::Updated), Route::Drop);
        let msg = process(&handler, &keys(), EVENT).await;
        assert_eq!(msg.tags, vec![SUCCESS_TAG]);
        assert_eq!(msg.keys, keys());
        assert_eq!(msg.value, EVENT);
    }

    #[tokio::test]
    async fn unchanged_uses_the_quiet_route() {
        let handler = Fixed(|| Ok(HandlerOutcome::Unchanged), Route::Drop);
        let msg = process(&handler, &keys(), EVENT).await;
        assert_eq!(msg.tags, vec![DROP_TAG]);
        assert!(msg.value.is_empty());
    }

    #[tokio::test]
    async fn not_found_is_not_a_failure() {
        let handler = Fixed(|| Err(ReactorError::not_found("g")), Route::Success);
        let msg = process(&handler, &keys(), EVENT).await;
        assert_eq!(msg.tags, vec![SUCCESS_TAG]);
    }

    #[tokio::test]
    async fn api_errors_route_to_failure() {
        let handler = Fixed(
            || Err(CatalogError::Transport("reset".into()).into()),
            Route::Success,
        );
        let msg = process(&handler, &keys(), EVENT).await;
        assert_eq!(msg.tags, vec![FAILURE_TAG]);
        assert_eq!(msg.value, EVENT);
    }

    #[tokio::test]
    async fn malformed_bytes_route_to_failure() {
        let handler = Fixed(|| Ok(HandlerOutcome::Updated), Route::Success);
        let msg = process(&handler, &keys(), b"{oops").await;
        assert_eq!(msg.tags, vec![FAILURE_TAG]);
        assert_eq!(msg.value, b"{oops");
    }

    #[test]
    fn forward_is_untagged() {
        let msg = Route::Forward.message(&keys(), b"x");
        assert!(msg.tags.is_empty());
        assert_eq!(msg.value, b"x");
    }
}
