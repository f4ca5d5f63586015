//! Error handling for the event handlers.
//!
//! Every failure path ends as a routed "failure" message; `NotFound` and
//! `ConsistencyWaitInterrupted` are not failures and are kept apart so
//! callers can tell "nothing to do" from "something broke".

use catalog_core::CatalogError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReactorError {
    #[error("Undecodable event: {message}")]
    Decode { message: String },

    #[error("Asset not found: {what}")]
    NotFound { what: String },

    #[error("Catalog API error: {0}")]
    Api(#[from] CatalogError),

    #[error("Catalog did not report asset {guid} as updated")]
    UpdateRejected { guid: String },

    #[error("Consistency wait interrupted after {waited_ms}ms")]
    ConsistencyWaitInterrupted { waited_ms: u64 },

    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl ReactorError {
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Whether this error should route the message to failure.
    pub fn is_failure(&self) -> bool {
        !matches!(
            self,
            Self::NotFound { .. } | Self::ConsistencyWaitInterrupted { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, ReactorError>;
