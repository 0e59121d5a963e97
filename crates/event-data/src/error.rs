//! Error types for the event-data crate.
//!
//! A `DataError` always means the event source and the pipeline
//! configuration disagree about what an event contains. None of these
//! are per-event selection outcomes; callers abort the run on them.

use thiserror::Error;

/// Errors raised while reading events or accessing event content.
#[derive(Error, Debug)]
pub enum DataError {
    /// Event file could not be opened or read
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// One line of a JSON-lines event file is not a valid event
    #[error("Invalid event at line {line}: {source}")]
    Json {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    /// A candidate collection the pipeline is bound to does not exist on the event
    #[error("Missing {kind} collection \"{name}\" on event {event}")]
    MissingCollection {
        kind: String,
        name: String,
        event: String,
    },

    /// A scalar field requested by name does not exist on the event
    #[error("Missing scalar field \"{name}\" on event {event}")]
    MissingScalar { name: String, event: String },

    /// The event carries no trigger information
    #[error("Missing trigger information on event {event}")]
    MissingTrigger { event: String },
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, DataError>;
