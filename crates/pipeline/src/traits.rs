//! Core traits for pipeline stages.
//!
//! A pipeline runs its stages in three ordered groups: producers derive
//! data into the per-event `Product`, filters accept or reject the
//! event, and consumers observe accepted events.
//!
//! ## Design Note
//! - `init` is called exactly once per stage, before any event, and is
//!   the only place to resolve settings and register quantities
//! - Producers and filters are `Send + Sync`; they hold no per-event state
//! - Consumers are `Send` and accumulate through `&mut self`

use crate::consumers::ConsumerReport;
use crate::error::Result;
use crate::metadata::PipelineContext;
use crate::product::Product;
use crate::quantities::QuantityRegistry;
use event_data::Event;

/// Stage deriving new fields into the product.
pub trait Producer: Send + Sync {
    /// Returns the name of this producer (for logging/debugging)
    fn name(&self) -> &str;

    fn init(&mut self, _ctx: &PipelineContext, _quantities: &mut QuantityRegistry) -> Result<()> {
        Ok(())
    }

    /// Read the event and earlier producers' output, write new fields.
    fn produce<'e>(
        &self,
        event: &'e Event,
        product: &mut Product<'e>,
        ctx: &PipelineContext,
    ) -> Result<()>;
}

/// Stage deciding whether an event is kept.
pub trait Filter: Send + Sync {
    /// Returns the name of this filter (for logging/debugging)
    fn name(&self) -> &str;

    fn init(&mut self, _ctx: &PipelineContext, _quantities: &mut QuantityRegistry) -> Result<()> {
        Ok(())
    }

    /// # Returns
    /// * `Ok(true)` - The event passes
    /// * `Ok(false)` - The event is rejected; not an error
    /// * `Err` - Misconfigured pipeline or malformed event
    fn passes(&self, event: &Event, product: &Product<'_>, ctx: &PipelineContext) -> Result<bool>;
}

/// Terminal stage aggregating accepted events.
pub trait Consumer: Send {
    fn name(&self) -> &str;

    fn init(&mut self, _ctx: &PipelineContext, _quantities: &mut QuantityRegistry) -> Result<()> {
        Ok(())
    }

    /// Called once per accepted event, after every filter passed.
    fn process_event(
        &mut self,
        event: &Event,
        product: &Product<'_>,
        ctx: &PipelineContext,
    ) -> Result<()>;

    /// Called once when the pipeline is finalized.
    fn finish(&mut self, ctx: &PipelineContext) -> Result<ConsumerReport>;
}
