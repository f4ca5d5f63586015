//! Process-wide configuration.
//!
//! Established once at startup from the environment (optionally seeded by a
//! `.env` file) and shared read-only by every invocation.

use std::net::SocketAddr;
use std::time::Duration;

use crate::error::{ReactorError, Result};
use crate::handlers::HandlerKind;

pub const ENV_BASE_URL: &str = "CATALOG_BASE_URL";
pub const ENV_API_TOKEN: &str = "CATALOG_API_TOKEN";
pub const ENV_HANDLER: &str = "REACTOR_HANDLER";
pub const ENV_BIND_ADDR: &str = "REACTOR_BIND_ADDR";
pub const ENV_CONSISTENCY_BUDGET_MS: &str = "REACTOR_CONSISTENCY_BUDGET_MS";
pub const ENV_PLAYBOOK_PAGE_SIZE: &str = "REACTOR_PLAYBOOK_PAGE_SIZE";
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "REACTOR_REQUEST_TIMEOUT_SECS";

#[derive(Debug, Clone)]
pub struct ReactorConfig {
    pub base_url: String,
    pub api_token: String,

    /// Which handler this process runs.
    pub handler: HandlerKind,

    pub bind_addr: SocketAddr,

    /// Time allowed, measured from pickup, for the search index to catch up
    /// with the write that triggered an event before rules are matched.
    pub consistency_budget_ms: u64,

    /// How many playbook definitions to fetch per invocation.
    pub playbook_page_size: usize,

    pub request_timeout_secs: u64,
}

impl Default for ReactorConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_token: String::new(),
            handler: HandlerKind::Logger,
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            consistency_budget_ms: 2000,
            playbook_page_size: 50,
            request_timeout_secs: 30,
        }
    }
}

impl ReactorConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| ReactorError::config(format!("{key} environment variable not set")))
        };
        let parsed = |key: &str| -> Result<Option<u64>> {
            lookup(key)
                .map(|raw| {
                    raw.trim()
                        .parse::<u64>()
                        .map_err(|e| ReactorError::config(format!("{key}: {e}")))
                })
                .transpose()
        };

        let defaults = Self::default();
        let handler = match lookup(ENV_HANDLER) {
            Some(raw) => raw.parse::<HandlerKind>().map_err(ReactorError::config)?,
            None => defaults.handler,
        };
        let bind_addr = match lookup(ENV_BIND_ADDR) {
            Some(raw) => raw
                .parse::<SocketAddr>()
                .map_err(|e| ReactorError::config(format!("{ENV_BIND_ADDR}: {e}")))?,
            None => defaults.bind_addr,
        };

        Ok(Self {
            base_url: required(ENV_BASE_URL)?,
            api_token: required(ENV_API_TOKEN)?,
            handler,
            bind_addr,
            consistency_budget_ms: parsed(ENV_CONSISTENCY_BUDGET_MS)?
                .unwrap_or(defaults.consistency_budget_ms),
            playbook_page_size: parsed(ENV_PLAYBOOK_PAGE_SIZE)?
                .map(|n| n as usize)
                .unwrap_or(defaults.playbook_page_size),
            request_timeout_secs: parsed(ENV_REQUEST_TIMEOUT_SECS)?
                .unwrap_or(defaults.request_timeout_secs),
        })
    }

    pub fn handler(mut self, handler: HandlerKind) -> Self {
        self.handler = handler;
        self
    }

    pub fn consistency_budget_ms(mut self, budget_ms: u64) -> Self {
        self.consistency_budget_ms = budget_ms;
        self
    }

    pub fn playbook_page_size(mut self, size: usize) -> Self {
        self.playbook_page_size = size;
        self
    }

    pub fn consistency_budget(&self) -> Duration {
        Duration::from_millis(self.consistency_budget_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
