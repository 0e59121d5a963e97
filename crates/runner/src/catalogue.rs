//! Stage names to constructors.
//!
//! A pipeline's `Processors` setting lists `"producer:<Name>"` and
//! `"filter:<Name>"` entries and its `Consumers` setting lists consumer
//! names. The catalogue turns those names into boxed stages.

use anyhow::{Context, Result, anyhow, bail};
use event_data::CandidateKind;
use pipeline::consumers::{CutFlowConsumer, HistogramConsumer, NtupleConsumer};
use pipeline::filters::{HltFilter, MinObjectsFilter, ObjectCutsFilter, QuantityCutsFilter, RunLumiEventFilter};
use pipeline::producers::{
    EventScalarProducer, HltProducer, ValidElectronsProducer, ValidJetsProducer, ValidMuonsProducer,
    ValidTausProducer,
};
use pipeline::{Consumer, Filter, Pipeline, Producer};
use settings::Settings;
use std::collections::BTreeMap;
use tracing::debug;

pub type Factory<T> = Box<dyn Fn() -> Box<T> + Send + Sync>;

const ALL_KINDS: [CandidateKind; 4] = [
    CandidateKind::Electron,
    CandidateKind::Muon,
    CandidateKind::Tau,
    CandidateKind::Jet,
];

pub struct StageCatalogue {
    producers: BTreeMap<String, Factory<dyn Producer>>,
    filters: BTreeMap<String, Factory<dyn Filter>>,
    consumers: BTreeMap<String, Factory<dyn Consumer>>,
}

impl StageCatalogue {
    /// Catalogue without any stages.
    pub fn empty() -> Self {
        Self {
            producers: BTreeMap::new(),
            filters: BTreeMap::new(),
            consumers: BTreeMap::new(),
        }
    }

    /// Catalogue with every built-in stage.
    pub fn with_builtins() -> Self {
        let mut catalogue = Self::empty();

        catalogue.register_producer("ValidElectronsProducer", || Box::new(ValidElectronsProducer::electrons()));
        catalogue.register_producer("ValidMuonsProducer", || Box::new(ValidMuonsProducer::muons()));
        catalogue.register_producer("ValidTausProducer", || Box::new(ValidTausProducer::taus()));
        catalogue.register_producer("ValidJetsProducer", || Box::new(ValidJetsProducer::jets()));
        catalogue.register_producer("HltProducer", || Box::new(HltProducer::new()));
        catalogue.register_producer("EventScalarProducer", || Box::new(EventScalarProducer::new()));

        for kind in ALL_KINDS {
            let lower = ObjectCutsFilter::lower_pt(kind);
            catalogue.register_filter(lower.name(), move || Box::new(ObjectCutsFilter::lower_pt(kind)));
            let upper = ObjectCutsFilter::upper_abs_eta(kind);
            catalogue.register_filter(upper.name(), move || Box::new(ObjectCutsFilter::upper_abs_eta(kind)));
            let min = MinObjectsFilter::new(kind);
            catalogue.register_filter(min.name(), move || Box::new(MinObjectsFilter::new(kind)));
        }
        catalogue.register_filter("HltFilter", || Box::new(HltFilter));
        catalogue.register_filter("RunLumiEventFilter", || Box::new(RunLumiEventFilter::new()));
        catalogue.register_filter("QuantityCutsFilter", || Box::new(QuantityCutsFilter::new()));

        catalogue.register_consumer("CutFlowConsumer", || Box::new(CutFlowConsumer::new()));
        catalogue.register_consumer("NtupleConsumer", || Box::new(NtupleConsumer::new()));
        catalogue.register_consumer("HistogramConsumer", || Box::new(HistogramConsumer::new()));

        catalogue
    }

    pub fn register_producer<F>(&mut self, name: &str, factory: F)
    where
        F: Fn() -> Box<dyn Producer> + Send + Sync + 'static,
    {
        self.producers.insert(name.to_string(), Box::new(factory));
    }

    pub fn register_filter<F>(&mut self, name: &str, factory: F)
    where
        F: Fn() -> Box<dyn Filter> + Send + Sync + 'static,
    {
        self.filters.insert(name.to_string(), Box::new(factory));
    }

    pub fn register_consumer<F>(&mut self, name: &str, factory: F)
    where
        F: Fn() -> Box<dyn Consumer> + Send + Sync + 'static,
    {
        self.consumers.insert(name.to_string(), Box::new(factory));
    }

    pub fn producer_names(&self) -> impl Iterator<Item = &str> {
        self.producers.keys().map(String::as_str)
    }

    pub fn filter_names(&self) -> impl Iterator<Item = &str> {
        self.filters.keys().map(String::as_str)
    }

    pub fn consumer_names(&self) -> impl Iterator<Item = &str> {
        self.consumers.keys().map(String::as_str)
    }

    /// Build the (uninitialised) pipeline described by `Processors` and
    /// `Consumers` in the given pipeline settings.
    ///
    /// Producers always run before filters, whatever the order of the
    /// `Processors` entries; relative order within each group is kept.
    pub fn build_pipeline(&self, settings: &Settings) -> Result<Pipeline> {
        let name = settings.name();
        let mut pipeline = Pipeline::new(name);

        let processors = settings
            .get_string_list("Processors")
            .with_context(|| format!("Failed to read processors of pipeline \"{}\"", name))?;
        for entry in &processors {
            let Some((group, stage)) = entry.split_once(':') else {
                bail!(
                    "Pipeline \"{}\": processor \"{}\" must be \"producer:<Name>\" or \"filter:<Name>\"",
                    name,
                    entry
                );
            };
            let stage = stage.trim();
            match group.trim() {
                "producer" => {
                    let factory = self
                        .producers
                        .get(stage)
                        .ok_or_else(|| anyhow!("Pipeline \"{}\": unknown producer \"{}\"", name, stage))?;
                    pipeline.push_producer(factory())?;
                }
                "filter" => {
                    let factory = self
                        .filters
                        .get(stage)
                        .ok_or_else(|| anyhow!("Pipeline \"{}\": unknown filter \"{}\"", name, stage))?;
                    pipeline.push_filter(factory())?;
                }
                other => bail!("Pipeline \"{}\": unknown processor group \"{}\"", name, other),
            }
        }

        let consumers = settings
            .get_string_list("Consumers")
            .with_context(|| format!("Failed to read consumers of pipeline \"{}\"", name))?;
        for consumer in &consumers {
            let factory = self
                .consumers
                .get(consumer.trim())
                .ok_or_else(|| anyhow!("Pipeline \"{}\": unknown consumer \"{}\"", name, consumer))?;
            pipeline.push_consumer(factory())?;
        }

        debug!(
            "Built pipeline {} from {} processors and {} consumers",
            name,
            processors.len(),
            consumers.len()
        );
        Ok(pipeline)
    }
}

impl Default for StageCatalogue {
    fn default() -> Self {
        Self::with_builtins()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use settings::PropertyTree;
    use std::sync::Arc;

    fn create_test_settings(pipeline: serde_json::Value) -> Settings {
        let tree = PropertyTree::from_value(json!({ "Pipelines": { "nominal": pipeline } }));
        Settings::pipeline(Arc::new(tree), "nominal")
    }

    #[test]
    fn test_builtin_names() {
        let catalogue = StageCatalogue::with_builtins();
        let filters: Vec<&str> = catalogue.filter_names().collect();

        assert!(filters.contains(&"JetLowerPtCutsFilter"));
        assert!(filters.contains(&"TauUpperAbsEtaCutsFilter"));
        assert!(filters.contains(&"MinMuonsFilter"));
        assert_eq!(filters.len(), 3 * ALL_KINDS.len() + 3);
        assert_eq!(catalogue.producer_names().count(), 6);
        assert_eq!(catalogue.consumer_names().count(), 3);
    }

    #[test]
    fn test_build_pipeline() {
        let catalogue = StageCatalogue::with_builtins();
        let settings = create_test_settings(json!({
            "Processors": ["producer:ValidMuonsProducer", "filter:MinMuonsFilter"],
            "Consumers": ["CutFlowConsumer"]
        }));
        let pipeline = catalogue.build_pipeline(&settings).unwrap();
        assert_eq!(pipeline.name(), "nominal");
    }

    #[test]
    fn test_unknown_stages_are_errors() {
        let catalogue = StageCatalogue::with_builtins();

        let unknown = create_test_settings(json!({ "Processors": ["producer:MagicProducer"] }));
        let err = catalogue.build_pipeline(&unknown).unwrap_err();
        assert!(err.to_string().contains("MagicProducer"));

        let malformed = create_test_settings(json!({ "Processors": ["ValidJetsProducer"] }));
        assert!(catalogue.build_pipeline(&malformed).is_err());

        let consumer = create_test_settings(json!({ "Consumers": ["RootFileConsumer"] }));
        assert!(catalogue.build_pipeline(&consumer).is_err());
    }

    #[test]
    fn test_custom_registration() {
        let mut catalogue = StageCatalogue::empty();
        catalogue.register_filter("AlwaysHlt", || Box::new(HltFilter));
        let settings = create_test_settings(json!({ "Processors": ["filter:AlwaysHlt"] }));
        assert!(catalogue.build_pipeline(&settings).is_ok());

        let builtin = create_test_settings(json!({ "Processors": ["filter:HltFilter"] }));
        assert!(catalogue.build_pipeline(&builtin).is_err());
    }
}
