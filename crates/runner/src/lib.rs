//! # Runner Crate
//!
//! Builds analysis pipelines from configuration and runs them over an
//! event sample, one rayon task per pipeline.
//!
//! ## Example Usage
//!
//! ```ignore
//! use runner::PipelineRunner;
//!
//! let runner = PipelineRunner::from_config_file(Path::new("config/dimuon.json"))?;
//! let events = event_data::read_events(Path::new("events.jsonl"))?;
//! let report = runner.run(&events, &[])?;
//! for summary in &report.summaries {
//!     println!("{}: {} accepted", summary.pipeline, summary.accepted);
//! }
//! ```

pub mod catalogue;
pub mod runner;

pub use catalogue::{Factory, StageCatalogue};
pub use runner::{PipelineRunner, RunReport};
