//! Asset reactor: event-triggered handlers over a metadata catalog.
//!
//! Each inbound change notification names one asset. The configured
//! handler re-reads that asset from the catalog, evaluates its rule, and
//! writes back at most one minimal update:
//!
//! - [`handlers::ScoreCalculator`] - completeness score as custom metadata
//! - [`handlers::VerificationEnforcer`] - downgrades under-enriched verified assets
//! - [`handlers::PlaybookRunner`] - user-defined match-and-mutate rules
//! - [`handlers::EventLogger`] - logs and forwards
//!
//! The outcome of every invocation is routed as one message by
//! [`routing::process`]; [`transport::router`] exposes that over HTTP.

pub mod change;
pub mod config;
pub mod envelope;
pub mod error;
pub mod handlers;
pub mod playbooks;
pub mod predicates;
pub mod resolver;
pub mod routing;
pub mod transport;

pub use config::ReactorConfig;
pub use error::{ReactorError, Result};
pub use handlers::{EventHandler, HandlerKind, HandlerOutcome};
pub use routing::{Route, RoutedMessage};
