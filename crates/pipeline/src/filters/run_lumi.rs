//! Run, luminosity block and event number selection.

use crate::error::{PipelineError, Result, StageContext};
use crate::metadata::PipelineContext;
use crate::product::Product;
use crate::quantities::QuantityRegistry;
use crate::traits::Filter;
use event_data::Event;
use settings::Settings;
use std::collections::HashSet;

/// White- and blacklist for one identifier.
#[derive(Debug, Default)]
struct IdList {
    whitelist: HashSet<u64>,
    blacklist: HashSet<u64>,
}

impl IdList {
    fn from_settings(settings: &Settings, prefix: &str, stage: &str) -> Result<Self> {
        let read = |suffix: &str| -> Result<HashSet<u64>> {
            let key = format!("{}{}", prefix, suffix);
            settings
                .get_int_list(&key)
                .in_stage(stage)?
                .into_iter()
                .map(|id| {
                    u64::try_from(id).map_err(|_| {
                        PipelineError::configuration(stage, format!("negative entry {} in {}", id, key))
                    })
                })
                .collect()
        };
        Ok(Self {
            whitelist: read("Whitelist")?,
            blacklist: read("Blacklist")?,
        })
    }

    fn accepts(&self, id: u64) -> bool {
        (self.whitelist.is_empty() || self.whitelist.contains(&id)) && !self.blacklist.contains(&id)
    }
}

/// Keeps events whose run, lumi and event numbers pass their
/// white/blacklists and whose run lies in `PassRunLow..=PassRunHigh`.
/// An empty whitelist accepts everything; `PassRunHigh` 0 means no
/// upper bound.
#[derive(Debug, Default)]
pub struct RunLumiEventFilter {
    runs: IdList,
    lumis: IdList,
    events: IdList,
    run_low: u64,
    run_high: Option<u64>,
}

impl RunLumiEventFilter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Filter for RunLumiEventFilter {
    fn name(&self) -> &str {
        "RunLumiEventFilter"
    }

    fn init(&mut self, ctx: &PipelineContext, _quantities: &mut QuantityRegistry) -> Result<()> {
        let stage = "RunLumiEventFilter";
        let settings = &ctx.settings;
        self.runs = IdList::from_settings(settings, "Run", stage)?;
        self.lumis = IdList::from_settings(settings, "Lumi", stage)?;
        self.events = IdList::from_settings(settings, "Event", stage)?;

        let low = settings.get_i64_or("PassRunLow", 0).in_stage(stage)?;
        let high = settings.get_i64_or("PassRunHigh", 0).in_stage(stage)?;
        if low < 0 || high < 0 {
            return Err(PipelineError::configuration(
                stage,
                format!("run range {}..={} must not be negative", low, high),
            ));
        }
        self.run_low = low as u64;
        self.run_high = (high > 0).then_some(high as u64);
        Ok(())
    }

    fn passes(&self, event: &Event, _product: &Product<'_>, _ctx: &PipelineContext) -> Result<bool> {
        let id = event.id;
        Ok(self.runs.accepts(id.run)
            && self.lumis.accepts(id.lumi)
            && self.events.accepts(id.event)
            && id.run >= self.run_low
            && self.run_high.is_none_or(|high| id.run <= high))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::GlobalMetadata;
    use event_data::EventId;
    use serde_json::json;
    use settings::PropertyTree;
    use std::sync::Arc;

    fn create_test_context(pipeline: serde_json::Value) -> PipelineContext {
        let tree = PropertyTree::from_value(json!({ "Pipelines": { "test": pipeline } }));
        PipelineContext::new(
            Settings::pipeline(Arc::new(tree), "test"),
            Arc::new(GlobalMetadata::default()),
        )
    }

    fn event(run: u64, lumi: u64, number: u64) -> Event {
        Event::new(EventId {
            run,
            lumi,
            event: number,
        })
    }

    fn passes(filter: &RunLumiEventFilter, ctx: &PipelineContext, event: &Event) -> bool {
        filter.passes(event, &Product::new(), ctx).unwrap()
    }

    #[test]
    fn test_lists() {
        let ctx = create_test_context(json!({
            "RunWhitelist": [1, 2],
            "LumiBlacklist": [7],
            "EventBlacklist": ["13"]
        }));
        let mut filter = RunLumiEventFilter::new();
        filter.init(&ctx, &mut QuantityRegistry::new()).unwrap();

        assert!(passes(&filter, &ctx, &event(1, 1, 1)));
        assert!(!passes(&filter, &ctx, &event(3, 1, 1)));
        assert!(!passes(&filter, &ctx, &event(2, 7, 1)));
        assert!(!passes(&filter, &ctx, &event(2, 1, 13)));
    }

    #[test]
    fn test_run_range() {
        let ctx = create_test_context(json!({ "PassRunLow": 100, "PassRunHigh": 200 }));
        let mut filter = RunLumiEventFilter::new();
        filter.init(&ctx, &mut QuantityRegistry::new()).unwrap();

        assert!(!passes(&filter, &ctx, &event(99, 1, 1)));
        assert!(passes(&filter, &ctx, &event(100, 1, 1)));
        assert!(passes(&filter, &ctx, &event(200, 1, 1)));
        assert!(!passes(&filter, &ctx, &event(201, 1, 1)));
    }

    #[test]
    fn test_defaults_accept_everything() {
        let ctx = create_test_context(json!({}));
        let mut filter = RunLumiEventFilter::new();
        filter.init(&ctx, &mut QuantityRegistry::new()).unwrap();
        assert!(passes(&filter, &ctx, &event(0, 0, 0)));
        assert!(passes(&filter, &ctx, &event(u64::MAX, 5, 5)));
    }

    #[test]
    fn test_negative_ids_are_rejected() {
        let ctx = create_test_context(json!({ "RunBlacklist": [-5] }));
        let mut filter = RunLumiEventFilter::new();
        assert!(matches!(
            filter.init(&ctx, &mut QuantityRegistry::new()),
            Err(PipelineError::Configuration { .. })
        ));
    }
}
