//! Filter requiring a minimum number of valid objects.

use crate::error::{PipelineError, Result, StageContext};
use crate::metadata::PipelineContext;
use crate::product::Product;
use crate::quantities::QuantityRegistry;
use crate::traits::Filter;
use event_data::{CandidateKind, Event};

/// Passes iff at least `N<Kind>s` valid objects of the kind exist.
pub struct MinObjectsFilter {
    name: String,
    kind: CandidateKind,
    minimum: usize,
}

impl MinObjectsFilter {
    pub fn new(kind: CandidateKind) -> Self {
        Self {
            name: format!("Min{}sFilter", kind.setting_prefix()),
            kind,
            minimum: 0,
        }
    }
}

impl Filter for MinObjectsFilter {
    fn name(&self) -> &str {
        &self.name
    }

    fn init(&mut self, ctx: &PipelineContext, _quantities: &mut QuantityRegistry) -> Result<()> {
        let key = format!("N{}s", self.kind.setting_prefix());
        let minimum = ctx.settings.get_i64(&key).in_stage(&self.name)?;
        self.minimum = usize::try_from(minimum).map_err(|_| {
            PipelineError::configuration(&self.name, format!("{} must not be negative, got {}", key, minimum))
        })?;
        Ok(())
    }

    fn passes(&self, _event: &Event, product: &Product<'_>, _ctx: &PipelineContext) -> Result<bool> {
        Ok(product.valid_count(self.kind) >= self.minimum)
    }
}
