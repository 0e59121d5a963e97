//! Copies raw event scalars into product quantities.

use crate::cut_range::parse_vector_to_map;
use crate::error::{Result, StageContext};
use crate::metadata::PipelineContext;
use crate::product::Product;
use crate::quantities::QuantityRegistry;
use crate::traits::Producer;
use event_data::{Event, UNDEFINED_DOUBLE};
use tracing::debug;

/// Maps `source` event scalars to `target` product quantities.
///
/// Configured through `EventScalars` as `"source:target"` entries; an
/// entry without a colon keeps the source name. Every target is also
/// registered as a quantity.
#[derive(Debug, Default)]
pub struct EventScalarProducer {
    mappings: Vec<(String, String)>,
}

impl EventScalarProducer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mapping(mut self, source: impl Into<String>, target: impl Into<String>) -> Self {
        self.mappings.push((source.into(), target.into()));
        self
    }
}

impl Producer for EventScalarProducer {
    fn name(&self) -> &str {
        "EventScalarProducer"
    }

    fn init(&mut self, ctx: &PipelineContext, quantities: &mut QuantityRegistry) -> Result<()> {
        let entries = ctx.settings.get_string_list("EventScalars").in_stage(self.name())?;
        for (key, values) in parse_vector_to_map(&entries) {
            for value in values {
                if key == "default" {
                    self.mappings.push((value.clone(), value));
                } else {
                    self.mappings.push((key.clone(), value));
                }
            }
        }

        for (_, target) in &self.mappings {
            let name = target.clone();
            quantities.register(target, move |_: &Event, product: &Product<'_>| {
                product.quantity(&name).unwrap_or(UNDEFINED_DOUBLE)
            })?;
        }
        debug!("{} initialised with {} mappings", self.name(), self.mappings.len());
        Ok(())
    }

    fn produce<'e>(
        &self,
        event: &'e Event,
        product: &mut Product<'e>,
        _ctx: &PipelineContext,
    ) -> Result<()> {
        for (source, target) in &self.mappings {
            let value = event.scalar(source).in_stage(self.name())?;
            product.set_quantity(target.as_str(), value);
        }
        Ok(())
    }
}
