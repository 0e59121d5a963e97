use crate::consumers::{ConsumerOutput, ConsumerReport};
use crate::error::Result;
use crate::metadata::PipelineContext;
use crate::product::Product;
use crate::traits::Consumer;
use event_data::Event;

/// Counts accepted events and their summed weight.
#[derive(Debug, Default)]
pub struct CutFlowConsumer {
    events: u64,
    weighted: f64,
}

impl CutFlowConsumer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> u64 {
        self.events
    }
}

impl Consumer for CutFlowConsumer {
    fn name(&self) -> &str {
        "CutFlowConsumer"
    }

    fn process_event(&mut self, event: &Event, _product: &Product<'_>, _ctx: &PipelineContext) -> Result<()> {
        self.events += 1;
        self.weighted += event.weight;
        Ok(())
    }

    fn finish(&mut self, _ctx: &PipelineContext) -> Result<ConsumerReport> {
        Ok(ConsumerReport {
            consumer: self.name().to_string(),
            output: ConsumerOutput::Count {
                events: self.events,
                weighted: self.weighted,
            },
        })
    }
}
