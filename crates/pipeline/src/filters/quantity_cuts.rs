//! Cuts on registered quantities.

use crate::cut_range::{CutDirection, CutRange, CutRangeFilter, parse_vector_to_map};
use crate::error::{PipelineError, Result, StageContext};
use crate::metadata::PipelineContext;
use crate::product::Product;
use crate::quantities::QuantityRegistry;
use crate::traits::Filter;
use event_data::Event;
use tracing::debug;

/// Lower and upper thresholds on named quantities.
///
/// Cuts come from `QuantityLowerCuts` / `QuantityUpperCuts` entries of
/// the form `"quantity:threshold"` plus any added with the builder.
/// Quantity names are resolved against the registry at init, so the
/// producers defining them must come first.
pub struct QuantityCutsFilter {
    name: String,
    requested: Vec<(String, CutRange)>,
    cuts: CutRangeFilter,
}

impl QuantityCutsFilter {
    pub fn new() -> Self {
        Self::named("QuantityCutsFilter")
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            requested: Vec::new(),
            cuts: CutRangeFilter::new(),
        }
    }

    /// Require `quantity > threshold`.
    pub fn with_lower(mut self, quantity: impl Into<String>, threshold: f64) -> Self {
        self.requested.push((quantity.into(), CutRange::Lower(threshold)));
        self
    }

    /// Require `quantity < threshold`.
    pub fn with_upper(mut self, quantity: impl Into<String>, threshold: f64) -> Self {
        self.requested.push((quantity.into(), CutRange::Upper(threshold)));
        self
    }

    fn read_setting(&self, ctx: &PipelineContext, key: &str, direction: CutDirection) -> Result<Vec<(String, CutRange)>> {
        let entries = ctx.settings.get_string_list(key).in_stage(&self.name)?;
        let mut cuts = Vec::new();
        for (quantity, values) in parse_vector_to_map(&entries) {
            if quantity == "default" {
                return Err(PipelineError::configuration(
                    &self.name,
                    format!("{} entries need a quantity name, got {:?}", key, values),
                ));
            }
            for value in values {
                let threshold = value.parse::<f64>().ok().filter(|t| !t.is_nan()).ok_or_else(|| {
                    PipelineError::configuration(
                        &self.name,
                        format!("invalid threshold \"{}\" for quantity \"{}\"", value, quantity),
                    )
                })?;
                cuts.push((quantity.clone(), direction.range(threshold)));
            }
        }
        Ok(cuts)
    }
}

impl Default for QuantityCutsFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl Filter for QuantityCutsFilter {
    fn name(&self) -> &str {
        &self.name
    }

    fn init(&mut self, ctx: &PipelineContext, quantities: &mut QuantityRegistry) -> Result<()> {
        let mut requested = std::mem::take(&mut self.requested);
        requested.extend(self.read_setting(ctx, "QuantityLowerCuts", CutDirection::Lower)?);
        requested.extend(self.read_setting(ctx, "QuantityUpperCuts", CutDirection::Upper)?);

        for (quantity, range) in &requested {
            let extract = quantities.get(quantity).ok_or_else(|| {
                PipelineError::configuration(&self.name, format!("unknown quantity \"{}\"", quantity))
            })?;
            self.cuts
                .add_cut(move |event: &Event, product: &Product<'_>| extract(event, product), *range);
        }
        debug!("{} initialised with {} cuts", self.name, self.cuts.len());
        self.requested = requested;
        Ok(())
    }

    fn passes(&self, event: &Event, product: &Product<'_>, _ctx: &PipelineContext) -> Result<bool> {
        Ok(self.cuts.passes(event, product))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::GlobalMetadata;
    use event_data::EventId;
    use serde_json::json;
    use settings::{PropertyTree, Settings};
    use std::sync::Arc;

    fn create_test_context(pipeline: serde_json::Value) -> PipelineContext {
        let tree = PropertyTree::from_value(json!({ "Pipelines": { "test": pipeline } }));
        PipelineContext::new(
            Settings::pipeline(Arc::new(tree), "test"),
            Arc::new(GlobalMetadata::default()),
        )
    }

    fn create_test_registry() -> QuantityRegistry {
        let mut registry = QuantityRegistry::with_builtins();
        registry
            .register("ptValue", |_: &Event, product: &Product<'_>| {
                product.quantity("ptValue").unwrap_or(-1.0)
            })
            .unwrap();
        registry
    }

    #[test]
    fn test_cuts_from_settings_and_builder() {
        let ctx = create_test_context(json!({
            "QuantityLowerCuts": ["ptValue:20"],
            "QuantityUpperCuts": ["run:1000"]
        }));
        let mut filter = QuantityCutsFilter::new().with_upper("ptValue", 100.0);
        filter.init(&ctx, &mut create_test_registry()).unwrap();

        let event = Event::new(EventId {
            run: 5,
            lumi: 1,
            event: 1,
        });
        let mut product = Product::new();
        product.set_quantity("ptValue", 25.0);
        assert!(filter.passes(&event, &product, &ctx).unwrap());

        product.set_quantity("ptValue", 15.0);
        assert!(!filter.passes(&event, &product, &ctx).unwrap());

        product.set_quantity("ptValue", 150.0);
        assert!(!filter.passes(&event, &product, &ctx).unwrap());
    }

    #[test]
    fn test_unknown_quantity_is_configuration_error() {
        let ctx = create_test_context(json!({ "QuantityLowerCuts": ["mass:50"] }));
        let mut filter = QuantityCutsFilter::new();
        let err = filter.init(&ctx, &mut create_test_registry()).unwrap_err();
        assert!(err.to_string().contains("mass"));
    }

    #[test]
    fn test_unnamed_cut_is_configuration_error() {
        let ctx = create_test_context(json!({ "QuantityLowerCuts": ["50"] }));
        let mut filter = QuantityCutsFilter::new();
        assert!(matches!(
            filter.init(&ctx, &mut create_test_registry()),
            Err(PipelineError::Configuration { .. })
        ));
    }

    #[test]
    fn test_nan_threshold_is_configuration_error() {
        let ctx = create_test_context(json!({ "QuantityUpperCuts": ["ptValue:NaN"] }));
        let mut filter = QuantityCutsFilter::new();
        let err = filter.init(&ctx, &mut create_test_registry()).unwrap_err();
        assert!(matches!(err, PipelineError::Configuration { .. }));
        assert!(err.to_string().contains("NaN"));
    }
}
