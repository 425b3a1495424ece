//! Errors raised at the host-facing edges (intent names, property overrides).
//!
//! The simulation itself never fails: occupancy conflicts and out-of-order
//! transitions are resolved locally and show up as `None`/`false`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SwarmError {
    #[error("unknown animation intent: {0}")]
    UnknownIntent(String),
    #[error("unknown property: {0}")]
    UnknownProperty(String),
    #[error("invalid value for property {name}: {reason}")]
    InvalidProperty { name: String, reason: String },
    #[error("failed to parse properties JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SwarmError>;
