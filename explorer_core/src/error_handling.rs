// error_handling.rs - Error taxonomy for the exploration core
//
// Expected move results (blocked, collision, dead end, ...) are not errors;
// they travel as `MoveStatus` values. Everything here is a caller mistake or
// an I/O / snapshot problem.

use crate::types::Position;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExplorerError {
    #[error("Invalid maze dimensions {width}x{height}: {reason}")]
    InvalidDimensions {
        width: usize,
        height: usize,
        reason: String,
    },

    #[error("Position {0} is outside the maze")]
    OutOfBounds(Position),

    #[error("Exploration not found: {0}")]
    ExplorationNotFound(String),

    #[error("Exploration '{0}' is already complete")]
    ExplorationComplete(String),

    #[error("Exploration '{0}' already exists; lineage is fixed at creation")]
    DuplicateExploration(String),

    #[error("Position {position} is not on the frontier of exploration '{parent}'")]
    NotOnFrontier { parent: String, position: Position },

    #[error("Invalid snapshot: {reason}")]
    InvalidSnapshot { reason: String },

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Lock acquisition failed")]
    LockPoisoned,
}

impl ExplorerError {
    pub(crate) fn invalid_snapshot(reason: impl Into<String>) -> Self {
        ExplorerError::InvalidSnapshot {
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ExplorerError>;
