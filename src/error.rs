use crate::models::Direction;
use thiserror::Error;

/// Rejected arrival input. The queue is never touched when one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntakeError {
    #[error("invalid format `{0}`, use: A,car")]
    Malformed(String),
    #[error("unknown direction `{0}`")]
    UnknownDirection(String),
    #[error("unknown vehicle `{0}`")]
    UnknownVehicle(String),
    #[error("controller state is unavailable")]
    StateUnavailable,
}

/// Invariant violations inside the control loop. These are fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControllerError {
    #[error("pop from empty queue at direction {0}")]
    EmptyQueue(Direction),
    #[error("direction {0} is not part of this intersection")]
    UnknownDirection(Direction),
    #[error("controller state lock poisoned")]
    LockPoisoned,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("at least one direction is required")]
    NoDirections,
    #[error("direction {0} is configured twice")]
    DuplicateDirection(Direction),
}
