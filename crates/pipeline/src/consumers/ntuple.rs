//! In-memory table of quantities for accepted events.

use crate::consumers::{ConsumerOutput, ConsumerReport};
use crate::error::{PipelineError, Result, StageContext};
use crate::metadata::PipelineContext;
use crate::product::Product;
use crate::quantities::{QuantityFn, QuantityRegistry};
use crate::traits::Consumer;
use event_data::Event;
use tracing::{debug, warn};

/// One row per accepted event, one column per quantity.
///
/// Columns are `Quantities` from the settings followed by any added
/// with `with_quantity`.
#[derive(Default)]
pub struct NtupleConsumer {
    requested: Vec<String>,
    columns: Vec<(String, QuantityFn)>,
    rows: Vec<Vec<f64>>,
}

impl NtupleConsumer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quantity(mut self, name: impl Into<String>) -> Self {
        self.requested.push(name.into());
        self
    }
}

impl Consumer for NtupleConsumer {
    fn name(&self) -> &str {
        "NtupleConsumer"
    }

    fn init(&mut self, ctx: &PipelineContext, quantities: &mut QuantityRegistry) -> Result<()> {
        let mut names = ctx.settings.get_string_list("Quantities").in_stage(self.name())?;
        names.append(&mut self.requested);
        if names.is_empty() {
            warn!("{}: no Quantities configured, rows will be empty", self.name());
        }

        for name in names {
            let quantity = quantities.get(&name).ok_or_else(|| {
                PipelineError::configuration("NtupleConsumer", format!("unknown quantity \"{}\"", name))
            })?;
            self.columns.push((name, quantity));
        }
        debug!("{} writing {} columns", self.name(), self.columns.len());
        Ok(())
    }

    fn process_event(&mut self, event: &Event, product: &Product<'_>, _ctx: &PipelineContext) -> Result<()> {
        let row = self
            .columns
            .iter()
            .map(|(_, quantity)| quantity(event, product))
            .collect();
        self.rows.push(row);
        Ok(())
    }

    fn finish(&mut self, _ctx: &PipelineContext) -> Result<ConsumerReport> {
        Ok(ConsumerReport {
            consumer: self.name().to_string(),
            output: ConsumerOutput::Table {
                columns: self.columns.iter().map(|(name, _)| name.clone()).collect(),
                rows: std::mem::take(&mut self.rows),
            },
        })
    }
}
