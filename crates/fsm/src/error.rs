use std::io;

use thiserror::Error;

use crate::event::Priority;

/// Failure to hand an event to the engine.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SubmitError {
    #[error("{0} priority queue is full")]
    QueueFull(Priority),
    #[error("engine is shut down")]
    Closed,
    #[error("immediate priority is only available inside a transition action")]
    ImmediateOutsideDispatch,
}

/// Inconsistency detected while building a transition table.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TableError {
    #[error("duplicate entry for ({state}, {event})")]
    Duplicate {
        state: &'static str,
        event: &'static str,
    },
    #[error("choice for ({state}, {event}) has no branches")]
    EmptyChoice {
        state: &'static str,
        event: &'static str,
    },
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to spawn dispatch thread: {0}")]
    Spawn(#[source] io::Error),
    #[error(transparent)]
    Table(#[from] TableError),
}
