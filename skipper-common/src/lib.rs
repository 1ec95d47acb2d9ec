//! Common types and utilities shared across Skipper crates.
//!
//! This crate defines the shared error type, the timer policy enum used by the
//! scheduler and the configuration layer, and the observability helpers every
//! binary calls at start-up. It stays dependency-light so that all crates can
//! depend on it.
//!
//! # Overview
//!
//! - [`observability`]: Centralised tracing/logging initialisation
//! - [`SkipperError`] and [`Result`]: Shared error handling
//! - [`TimerPolicy`]: How repeated triggers map onto repeating timers
//!
//! # Examples
//!
//! ```rust
//! use skipper_common::TimerPolicy;
//!
//! assert_eq!(TimerPolicy::default(), TimerPolicy::Single);
//! assert_eq!(TimerPolicy::Accumulate.to_string(), "accumulate");
//! ```
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

pub mod observability;

/// Default period between two processing passes.
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(300);

/// How the scheduler reacts to a trigger while a repeating timer is active.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerPolicy {
    /// Keep at most one repeating timer; further triggers are no-ops.
    #[default]
    Single,
    /// Start a new repeating timer for every trigger. Timers pile up over the
    /// lifetime of the page.
    Accumulate,
}

impl fmt::Display for TimerPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimerPolicy::Single => f.write_str("single"),
            TimerPolicy::Accumulate => f.write_str("accumulate"),
        }
    }
}

/// Error types used across the Skipper system.
#[derive(thiserror::Error, Debug)]
pub enum SkipperError {
    /// A driver (WebDriver session, page script, DOM host) reported an error.
    #[error("Driver error: {0}")]
    Driver(#[from] anyhow::Error),

    /// Configuration was incomplete or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A wait exceeded its deadline.
    #[error("Timed out after {waited:?} waiting for {what}")]
    Timeout { what: &'static str, waited: Duration },
}

/// Convenient alias for results that use [`SkipperError`].
pub type Result<T> = std::result::Result<T, SkipperError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timer_policy_reads_lowercase_names() {
        let single: TimerPolicy = serde_json::from_str("\"single\"").unwrap();
        let accumulate: TimerPolicy = serde_json::from_str("\"accumulate\"").unwrap();
        assert_eq!(single, TimerPolicy::Single);
        assert_eq!(accumulate, TimerPolicy::Accumulate);
        assert!(serde_json::from_str::<TimerPolicy>("\"many\"").is_err());
    }

    #[test]
    fn timeout_message_names_the_wait() {
        let err = SkipperError::Timeout {
            what: "document ready",
            waited: Duration::from_secs(2),
        };
        assert_eq!(err.to_string(), "Timed out after 2s waiting for document ready");
    }
}
