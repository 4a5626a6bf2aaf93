//! Error taxonomy.
//!
//! Transient world-interaction failures ([`WorldError`]) are recovered inside
//! the behavior that hit them. Only connectivity and authentication failures
//! cross component boundaries, and only [`AgentError`] ends the process.

use std::path::PathBuf;
use thiserror::Error;

pub type WorldResult<T> = std::result::Result<T, WorldError>;

pub type Result<T> = std::result::Result<T, AgentError>;

/// A failure reported by the world interface.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum WorldError {
    #[error("avatar has not spawned")]
    NotSpawned,

    #[error("{action} rejected: {reason}")]
    Rejected {
        action: &'static str,
        reason: String,
    },

    #[error("{0} not available")]
    Unavailable(String),

    #[error("connection lost: {0}")]
    Connection(String),

    #[error("authentication failed: {0}")]
    Authentication(String),
}

impl WorldError {
    pub fn rejected(action: &'static str, reason: impl Into<String>) -> Self {
        WorldError::Rejected {
            action,
            reason: reason.into(),
        }
    }

    /// Credential failures end the process without retrying.
    pub fn is_fatal(&self) -> bool {
        matches!(self, WorldError::Authentication(_))
    }

    /// Failures that belong to the reconnection supervisor, not to a behavior.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, WorldError::Connection(_))
    }
}

/// Failures that stop the agent loop.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("failed to reconnect after {attempts} attempts")]
    ReconnectExhausted { attempts: u32 },

    #[error("control arbiter channel closed")]
    ArbiterClosed,

    #[error("invalid configuration")]
    Config(#[source] config::ConfigError),

    #[error("invalid scenario: {0}")]
    Scenario(#[source] serde_json::Error),

    #[error("failed to read {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<config::ConfigError> for AgentError {
    fn from(e: config::ConfigError) -> Self {
        AgentError::Config(e)
    }
}
