//! Sequential identifier allocation configuration.
//!
//! Controls which ledger design backs employee and student ID allocation
//! and how contention is retried.
//!
//! # Environment Variables
//!
//! - `ID_ALLOCATION_STRATEGY`: `counter` or `scan` (default: `counter`)
//! - `ID_ALLOCATION_MAX_ATTEMPTS`: attempts before surfacing a conflict (default: `5`)
//! - `ID_ALLOCATION_LOCK_TIMEOUT_MS`: per-attempt counter lock timeout (default: `2000`)
//! - `ID_ALLOCATION_BACKOFF_MS`: base delay between attempts (default: `25`)

use serde::Serialize;
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Ledger design used to derive the next sequence number.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IdStrategy {
    /// One durable counter row per (entity class, year), advanced atomically.
    #[default]
    Counter,
    /// Highest existing identifier in the entity table plus one.
    Scan,
}

impl IdStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdStrategy::Counter => "counter",
            IdStrategy::Scan => "scan",
        }
    }
}

impl fmt::Display for IdStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown id allocation strategy '{0}', expected 'counter' or 'scan'")]
pub struct ParseStrategyError(pub String);

impl FromStr for IdStrategy {
    type Err = ParseStrategyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "counter" => Ok(IdStrategy::Counter),
            "scan" => Ok(IdStrategy::Scan),
            other => Err(ParseStrategyError(other.to_string())),
        }
    }
}

#[derive(Clone, Debug)]
pub struct IdAllocationConfig {
    pub strategy: IdStrategy,
    pub max_attempts: u32,
    pub lock_timeout: Duration,
    pub backoff: Duration,
}

impl IdAllocationConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            strategy: env::var("ID_ALLOCATION_STRATEGY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.strategy),
            max_attempts: env::var("ID_ALLOCATION_MAX_ATTEMPTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n: &u32| *n > 0)
                .unwrap_or(defaults.max_attempts),
            lock_timeout: positive_millis(env::var("ID_ALLOCATION_LOCK_TIMEOUT_MS").ok())
                .unwrap_or(defaults.lock_timeout),
            backoff: env::var("ID_ALLOCATION_BACKOFF_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.backoff),
        }
    }
}

// Postgres reads a zero lock_timeout as "wait forever".
fn positive_millis(raw: Option<String>) -> Option<Duration> {
    raw.and_then(|s| s.trim().parse().ok())
        .filter(|ms: &u64| *ms > 0)
        .map(Duration::from_millis)
}

impl Default for IdAllocationConfig {
    fn default() -> Self {
        Self {
            strategy: IdStrategy::Counter,
            max_attempts: 5,
            lock_timeout: Duration::from_millis(2000),
            backoff: Duration::from_millis(25),
        }
    }
}
