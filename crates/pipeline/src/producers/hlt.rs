//! Trigger path selection.

use crate::error::{PipelineError, Result, StageContext};
use crate::metadata::PipelineContext;
use crate::product::Product;
use crate::quantities::QuantityRegistry;
use crate::traits::Producer;
use event_data::Event;
use regex::Regex;
use tracing::{debug, warn};

/// Selects the trigger path for the event.
///
/// `HltPaths` lists case-insensitive patterns in priority order. The
/// first pattern with a fired, matching path wins and the path name is
/// stored as `Product::selected_hlt_name`. Prescaled paths are skipped
/// unless `AllowPrescaledTrigger` is set (default true).
pub struct HltProducer {
    patterns: Vec<Regex>,
    allow_prescaled: bool,
}

impl HltProducer {
    pub fn new() -> Self {
        Self {
            patterns: Vec::new(),
            allow_prescaled: true,
        }
    }
}

impl Default for HltProducer {
    fn default() -> Self {
        Self::new()
    }
}

impl Producer for HltProducer {
    fn name(&self) -> &str {
        "HltProducer"
    }

    fn init(&mut self, ctx: &PipelineContext, _quantities: &mut QuantityRegistry) -> Result<()> {
        let paths = ctx.settings.get_string_list("HltPaths").in_stage(self.name())?;
        if paths.is_empty() {
            warn!("{}: no HltPaths configured, no trigger will be selected", self.name());
        }
        self.patterns = paths
            .iter()
            .map(|path| {
                Regex::new(&format!("(?i){}", path.trim())).map_err(|e| {
                    PipelineError::configuration("HltProducer", format!("invalid HLT path \"{}\": {}", path, e))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        self.allow_prescaled = ctx
            .settings
            .get_bool_or("AllowPrescaledTrigger", true)
            .in_stage(self.name())?;
        debug!("{} initialised with {} patterns", self.name(), self.patterns.len());
        Ok(())
    }

    fn produce<'e>(
        &self,
        event: &'e Event,
        product: &mut Product<'e>,
        _ctx: &PipelineContext,
    ) -> Result<()> {
        let paths = event.trigger_paths().in_stage(self.name())?;
        product.selected_hlt_name = self.patterns.iter().find_map(|pattern| {
            paths
                .iter()
                .find(|path| {
                    path.fired && (self.allow_prescaled || path.prescale <= 1) && pattern.is_match(&path.name)
                })
                .map(|path| path.name.clone())
        });
        Ok(())
    }
}
