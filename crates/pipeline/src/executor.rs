//! The Pipeline drives producers, filters and consumers per event.
//!
//! Lifecycle: `Uninitialized` → `init` → `Initialized` → `process`
//! (repeatedly, `Running`) → `finalize` → `Finalized`. Calls out of
//! order return `PipelineError::InvalidState`. Errors raised by stages are
//! passed through unchanged; the pipeline never skips a failing event.

use crate::consumers::ConsumerReport;
use crate::error::{PipelineError, Result};
use crate::metadata::{GlobalMetadata, LocalMetadata, PipelineContext};
use crate::product::Product;
use crate::quantities::QuantityRegistry;
use crate::traits::{Consumer, Filter, Producer};
use event_data::Event;
use serde::Serialize;
use settings::Settings;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PipelineState {
    Uninitialized,
    Initialized,
    Running,
    Finalized,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PipelineState::Uninitialized => "uninitialized",
            PipelineState::Initialized => "initialized",
            PipelineState::Running => "running",
            PipelineState::Finalized => "finalized",
        })
    }
}

/// Result of processing one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    Accepted,
    Rejected { filter_index: usize, filter_name: String },
}

impl EventOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, EventOutcome::Accepted)
    }
}

impl fmt::Display for EventOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventOutcome::Accepted => f.write_str("accepted"),
            EventOutcome::Rejected {
                filter_index,
                filter_name,
            } => write!(f, "rejected by filter {} ({})", filter_index, filter_name),
        }
    }
}

/// Events rejected by one filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterStats {
    pub filter: String,
    pub rejected: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineSummary {
    pub pipeline: String,
    pub processed: u64,
    pub accepted: u64,
    /// Rejections per filter, in filter order
    pub filters: Vec<FilterStats>,
    pub consumers: Vec<ConsumerReport>,
}

impl PipelineSummary {
    pub fn rejected(&self) -> u64 {
        self.processed - self.accepted
    }

    pub fn consumer(&self, name: &str) -> Option<&ConsumerReport> {
        self.consumers.iter().find(|report| report.consumer == name)
    }
}

/// Ordered producers, filters and consumers for one pipeline.
///
/// ## Usage
/// ```ignore
/// let mut pipeline = Pipeline::new("nominal")
///     .add_producer(ValidMuonsProducer::muons())
///     .add_filter(MinObjectsFilter::new(CandidateKind::Muon))
///     .add_consumer(CutFlowConsumer::new());
///
/// pipeline.init(settings, global)?;
/// for event in &events {
///     pipeline.process(event)?;
/// }
/// let summary = pipeline.finalize()?;
/// ```
pub struct Pipeline {
    name: String,
    producers: Vec<Box<dyn Producer>>,
    filters: Vec<Box<dyn Filter>>,
    consumers: Vec<Box<dyn Consumer>>,
    state: PipelineState,
    context: Option<PipelineContext>,
    quantities: QuantityRegistry,
    processed: u64,
    accepted: u64,
    rejections: Vec<u64>,
}

impl Pipeline {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            producers: Vec::new(),
            filters: Vec::new(),
            consumers: Vec::new(),
            state: PipelineState::Uninitialized,
            context: None,
            quantities: QuantityRegistry::with_builtins(),
            processed: 0,
            accepted: 0,
            rejections: Vec::new(),
        }
    }

    /// Add a producer (builder pattern, before `init`).
    pub fn add_producer(mut self, producer: impl Producer + 'static) -> Self {
        debug_assert_eq!(self.state, PipelineState::Uninitialized);
        self.producers.push(Box::new(producer));
        self
    }

    /// Add a filter (builder pattern, before `init`).
    pub fn add_filter(mut self, filter: impl Filter + 'static) -> Self {
        debug_assert_eq!(self.state, PipelineState::Uninitialized);
        self.filters.push(Box::new(filter));
        self
    }

    /// Add a consumer (builder pattern, before `init`).
    pub fn add_consumer(mut self, consumer: impl Consumer + 'static) -> Self {
        debug_assert_eq!(self.state, PipelineState::Uninitialized);
        self.consumers.push(Box::new(consumer));
        self
    }

    pub fn push_producer(&mut self, producer: Box<dyn Producer>) -> Result<()> {
        self.expect_state("add a producer to", &[PipelineState::Uninitialized])?;
        self.producers.push(producer);
        Ok(())
    }

    pub fn push_filter(&mut self, filter: Box<dyn Filter>) -> Result<()> {
        self.expect_state("add a filter to", &[PipelineState::Uninitialized])?;
        self.filters.push(filter);
        Ok(())
    }

    pub fn push_consumer(&mut self, consumer: Box<dyn Consumer>) -> Result<()> {
        self.expect_state("add a consumer to", &[PipelineState::Uninitialized])?;
        self.consumers.push(consumer);
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn quantities(&self) -> &QuantityRegistry {
        &self.quantities
    }

    /// Set once `init` succeeded.
    pub fn context(&self) -> Option<&PipelineContext> {
        self.context.as_ref()
    }

    fn expect_state(&self, operation: &'static str, allowed: &[PipelineState]) -> Result<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(PipelineError::InvalidState {
                pipeline: self.name.clone(),
                operation,
                state: self.state,
            })
        }
    }

    /// Bind settings and metadata, then initialise every stage once:
    /// producers, filters, consumers. The quantity registry is frozen
    /// afterwards.
    pub fn init(&mut self, settings: Settings, global: Arc<GlobalMetadata>) -> Result<()> {
        self.expect_state("initialise", &[PipelineState::Uninitialized])?;

        let local = LocalMetadata {
            pipeline_name: self.name.clone(),
            producers: self.producers.iter().map(|s| s.name().to_string()).collect(),
            filters: self.filters.iter().map(|s| s.name().to_string()).collect(),
            consumers: self.consumers.iter().map(|s| s.name().to_string()).collect(),
        };
        let ctx = PipelineContext {
            settings,
            global,
            local,
        };

        for producer in &mut self.producers {
            debug!("[{}] init producer {}", self.name, producer.name());
            producer.init(&ctx, &mut self.quantities)?;
        }
        for filter in &mut self.filters {
            debug!("[{}] init filter {}", self.name, filter.name());
            filter.init(&ctx, &mut self.quantities)?;
        }
        for consumer in &mut self.consumers {
            debug!("[{}] init consumer {}", self.name, consumer.name());
            consumer.init(&ctx, &mut self.quantities)?;
        }
        self.quantities.freeze();

        info!(
            "Pipeline {} initialised: {} producers, {} filters, {} consumers, {} quantities",
            self.name,
            self.producers.len(),
            self.filters.len(),
            self.consumers.len(),
            self.quantities.len()
        );

        self.rejections = vec![0; self.filters.len()];
        self.context = Some(ctx);
        self.state = PipelineState::Initialized;
        Ok(())
    }

    /// Run one event through the pipeline.
    ///
    /// ## Algorithm
    /// 1. Create a fresh product
    /// 2. Run every producer in order
    /// 3. Run filters in order; stop at the first rejection
    /// 4. Hand accepted events to every consumer in order
    pub fn process(&mut self, event: &Event) -> Result<EventOutcome> {
        self.expect_state("process events in", &[PipelineState::Initialized, PipelineState::Running])?;
        let Some(ctx) = self.context.as_ref() else {
            return Err(PipelineError::InvalidState {
                pipeline: self.name.clone(),
                operation: "process events in",
                state: self.state,
            });
        };
        self.state = PipelineState::Running;
        self.processed += 1;

        let mut product = Product::new();
        for producer in &self.producers {
            producer.produce(event, &mut product, ctx)?;
        }

        for (index, filter) in self.filters.iter().enumerate() {
            if !filter.passes(event, &product, ctx)? {
                self.rejections[index] += 1;
                trace!("[{}] event {} rejected by {}", self.name, event.id, filter.name());
                return Ok(EventOutcome::Rejected {
                    filter_index: index,
                    filter_name: filter.name().to_string(),
                });
            }
        }

        self.accepted += 1;
        for consumer in &mut self.consumers {
            consumer.process_event(event, &product, ctx)?;
        }
        Ok(EventOutcome::Accepted)
    }

    /// Flush every consumer and report the cut flow.
    pub fn finalize(&mut self) -> Result<PipelineSummary> {
        self.expect_state("finalize", &[PipelineState::Initialized, PipelineState::Running])?;
        let Some(ctx) = self.context.as_ref() else {
            return Err(PipelineError::InvalidState {
                pipeline: self.name.clone(),
                operation: "finalize",
                state: self.state,
            });
        };

        let consumers = self
            .consumers
            .iter_mut()
            .map(|consumer| consumer.finish(ctx))
            .collect::<Result<Vec<_>>>()?;
        self.state = PipelineState::Finalized;

        let filters = self
            .filters
            .iter()
            .zip(&self.rejections)
            .map(|(filter, &rejected)| FilterStats {
                filter: filter.name().to_string(),
                rejected,
            })
            .collect();

        info!(
            "Pipeline {} finalized: {} of {} events accepted",
            self.name, self.accepted, self.processed
        );

        Ok(PipelineSummary {
            pipeline: self.name.clone(),
            processed: self.processed,
            accepted: self.accepted,
            filters,
            consumers,
        })
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("name", &self.name)
            .field("state", &self.state)
            .field("producers", &self.producers.len())
            .field("filters", &self.filters.len())
            .field("consumers", &self.consumers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consumers::{ConsumerOutput, CutFlowConsumer};
    use crate::filters::HltFilter;
    use event_data::EventId;
    use settings::PropertyTree;

    fn create_test_settings() -> (Settings, Arc<GlobalMetadata>) {
        let tree = Arc::new(PropertyTree::from_value(serde_json::json!({ "Pipelines": { "test": {} } })));
        (Settings::pipeline(tree, "test"), Arc::new(GlobalMetadata::default()))
    }

    #[test]
    fn test_empty_pipeline_accepts_everything() {
        let mut pipeline = Pipeline::new("test").add_consumer(CutFlowConsumer::new());
        let (settings, global) = create_test_settings();
        pipeline.init(settings, global).unwrap();
        assert_eq!(pipeline.state(), PipelineState::Initialized);

        let event = Event::new(EventId::default());
        assert_eq!(pipeline.process(&event).unwrap(), EventOutcome::Accepted);
        assert_eq!(pipeline.state(), PipelineState::Running);

        let summary = pipeline.finalize().unwrap();
        assert_eq!(summary.processed, 1);
        assert_eq!(summary.accepted, 1);
        assert!(matches!(
            summary.consumer("CutFlowConsumer").unwrap().output,
            ConsumerOutput::Count { events: 1, .. }
        ));
        assert_eq!(pipeline.state(), PipelineState::Finalized);
    }

    #[test]
    fn test_lifecycle_order_is_enforced() {
        let mut pipeline = Pipeline::new("test").add_filter(HltFilter);
        let event = Event::new(EventId::default());

        assert!(matches!(
            pipeline.process(&event),
            Err(PipelineError::InvalidState { state: PipelineState::Uninitialized, .. })
        ));
        assert!(pipeline.finalize().is_err());

        let (settings, global) = create_test_settings();
        pipeline.init(settings, global).unwrap();
        let (settings, global) = create_test_settings();
        assert!(pipeline.init(settings, global).is_err());
        assert!(pipeline.push_filter(Box::new(HltFilter)).is_err());

        pipeline.finalize().unwrap();
        assert!(matches!(
            pipeline.process(&event),
            Err(PipelineError::InvalidState { state: PipelineState::Finalized, .. })
        ));
        assert!(pipeline.finalize().is_err());
    }

    #[test]
    fn test_rejection_is_counted_per_filter() {
        let mut pipeline = Pipeline::new("test")
            .add_filter(HltFilter)
            .add_consumer(CutFlowConsumer::new());
        let (settings, global) = create_test_settings();
        pipeline.init(settings, global).unwrap();

        let event = Event::new(EventId::default());
        let outcome = pipeline.process(&event).unwrap();
        assert_eq!(outcome.to_string(), "rejected by filter 0 (HltFilter)");

        let summary = pipeline.finalize().unwrap();
        assert_eq!(summary.rejected(), 1);
        assert_eq!(
            summary.filters,
            vec![FilterStats {
                filter: "HltFilter".to_string(),
                rejected: 1
            }]
        );
        assert!(matches!(
            summary.consumers[0].output,
            ConsumerOutput::Count { events: 0, .. }
        ));
    }
}
