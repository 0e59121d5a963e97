//! Filter requiring a selected trigger path.

use crate::error::Result;
use crate::metadata::PipelineContext;
use crate::product::Product;
use crate::traits::Filter;
use event_data::Event;

/// Rejects events for which `HltProducer` selected no path.
#[derive(Debug, Default)]
pub struct HltFilter;

impl Filter for HltFilter {
    fn name(&self) -> &str {
        "HltFilter"
    }

    fn passes(&self, _event: &Event, product: &Product<'_>, _ctx: &PipelineContext) -> Result<bool> {
        Ok(product.selected_hlt_name.is_some())
    }
}
