//! Event handlers and their selection at wiring time.
//!
//! A process runs exactly one handler, picked by [`HandlerKind`] from
//! configuration. Every handler shares the same per-invocation contract:
//! validate the event, re-read the asset, decide, write at most once.

pub mod enforcer;
pub mod logger;
pub mod playbook_runner;
pub mod scorer;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use catalog_client::CatalogClient;
use catalog_core::CatalogEvent;
use tokio::sync::watch;

use crate::config::ReactorConfig;
use crate::error::Result;
use crate::routing::Route;

pub use enforcer::VerificationEnforcer;
pub use logger::EventLogger;
pub use playbook_runner::PlaybookRunner;
pub use scorer::ScoreCalculator;

/// What a handler did with an event it could decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerOutcome {
    /// One update was written and confirmed.
    Updated,
    /// Nothing warranted a write.
    Unchanged,
    /// Passed through without inspection.
    Forwarded,
}

#[async_trait]
pub trait EventHandler: Send + Sync {
    fn name(&self) -> &'static str;

    async fn handle(&self, event: &CatalogEvent, picked_up_at: Instant) -> Result<HandlerOutcome>;

    /// Route for an invocation that had nothing to do.
    fn quiet_route(&self) -> Route {
        Route::Success
    }

    /// Route for bytes that did not decode into an event.
    fn undecodable_route(&self) -> Route {
        Route::Failure
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HandlerKind {
    Scorer,
    Enforcer,
    Playbooks,
    #[default]
    Logger,
}

impl HandlerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            HandlerKind::Scorer => "scorer",
            HandlerKind::Enforcer => "enforcer",
            HandlerKind::Playbooks => "playbooks",
            HandlerKind::Logger => "logger",
        }
    }

    /// Construct the selected handler over a shared client.
    pub fn build(
        self,
        client: Arc<dyn CatalogClient>,
        config: &ReactorConfig,
        shutdown: watch::Receiver<bool>,
    ) -> Arc<dyn EventHandler> {
        match self {
            HandlerKind::Scorer => Arc::new(ScoreCalculator::new(client)),
            HandlerKind::Enforcer => Arc::new(VerificationEnforcer::new(client)),
            HandlerKind::Playbooks => Arc::new(
                PlaybookRunner::new(
                    client,
                    config.consistency_budget(),
                    config.playbook_page_size,
                )
                .with_shutdown(shutdown),
            ),
            HandlerKind::Logger => Arc::new(EventLogger),
        }
    }
}

impl fmt::Display for HandlerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HandlerKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "scorer" | "score" | "daap" => Ok(HandlerKind::Scorer),
            "enforcer" | "verification" => Ok(HandlerKind::Enforcer),
            "playbooks" | "playbook" => Ok(HandlerKind::Playbooks),
            "logger" | "log" => Ok(HandlerKind::Logger),
            other => Err(format!(
                "unknown handler '{other}' (expected scorer, enforcer, playbooks or logger)"
            )),
        }
    }
}
