//! # Event Data Crate
//!
//! Immutable event records consumed by the analysis pipelines.
//!
//! ## Main Components
//!
//! - **types**: `Event`, candidate types (`Electron`, `Muon`, `Tau`, `Jet`),
//!   `LorentzVector`, trigger paths and event ids
//! - **parser**: JSON-lines reader/writer for event files
//! - **error**: `DataError` for missing collections and malformed input
//!
//! ## Example Usage
//!
//! ```ignore
//! use event_data::read_events;
//! use std::path::Path;
//!
//! let events = read_events(Path::new("events.jsonl"))?;
//! let jets = events[0].jets("jets")?;
//! println!("Leading jet pt: {}", jets[0].p4.pt);
//! ```

pub mod error;
pub mod parser;
pub mod types;

pub use error::{DataError, Result};
pub use parser::{parse_events, read_events, write_events};
pub use types::{
    CandidateKind, Electron, Event, EventId, Jet, LorentzVector, Muon, PhysicsObject, Tau,
    TriggerPath, UNDEFINED_DOUBLE,
};
