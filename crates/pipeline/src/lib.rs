//! Per-event analysis pipelines.
//!
//! This crate provides:
//! - Producer, Filter and Consumer traits for pipeline stages
//! - CutRangeFilter, built from declarative `"selector:threshold"` cuts
//! - ValidObjectsProducer, partitioning candidates into valid/invalid
//! - Pipeline, the executor driving stages event by event
//!
//! ## Architecture
//! Each event passes through one pipeline in three stages:
//! 1. Producers fill a fresh `Product` (valid objects, trigger, quantities)
//! 2. Filters decide; the first failing filter rejects the event
//! 3. Consumers aggregate accepted events
//!
//! ## Example Usage
//! ```ignore
//! use pipeline::filters::*;
//! use pipeline::producers::*;
//! use pipeline::{CutFlowConsumer, Pipeline};
//!
//! let mut pipeline = Pipeline::new("nominal")
//!     .add_producer(ValidMuonsProducer::muons())
//!     .add_producer(ValidJetsProducer::jets())
//!     .add_filter(MinObjectsFilter::new(CandidateKind::Muon))
//!     .add_filter(ObjectCutsFilter::lower_pt(CandidateKind::Jet))
//!     .add_consumer(CutFlowConsumer::new());
//!
//! pipeline.init(Settings::pipeline(tree, "nominal"), global)?;
//! for event in &events {
//!     pipeline.process(event)?;
//! }
//! let summary = pipeline.finalize()?;
//! ```

pub mod consumers;
pub mod cut_range;
pub mod error;
pub mod executor;
pub mod filters;
pub mod metadata;
pub mod producers;
pub mod product;
pub mod quantities;
pub mod traits;

// Re-export main types
pub use consumers::{ConsumerOutput, ConsumerReport, CutFlowConsumer, HistogramConsumer, NtupleConsumer};
pub use cut_range::{CutDirection, CutRange, CutRangeFilter, CutSpec, Selector, parse_cut_specs, parse_vector_to_map};
pub use error::{CutSpecError, PipelineError, Result};
pub use executor::{EventOutcome, FilterStats, Pipeline, PipelineState, PipelineSummary};
pub use metadata::{CollectionNames, GlobalMetadata, LocalMetadata, PipelineContext};
pub use product::{Product, ValidObjectAccessor};
pub use quantities::{QuantityFn, QuantityRegistry};
pub use traits::{Consumer, Filter, Producer};
