//! Run-level and pipeline-level context handed to every stage.

use event_data::CandidateKind;
use settings::{Settings, SettingsError};
use std::sync::Arc;

/// Names of the event collections the run reads for each candidate kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionNames {
    pub electrons: String,
    pub muons: String,
    pub taus: String,
    pub jets: String,
}

impl Default for CollectionNames {
    fn default() -> Self {
        Self {
            electrons: "electrons".to_string(),
            muons: "muons".to_string(),
            taus: "taus".to_string(),
            jets: "jets".to_string(),
        }
    }
}

impl CollectionNames {
    pub fn name(&self, kind: CandidateKind) -> &str {
        match kind {
            CandidateKind::Electron => &self.electrons,
            CandidateKind::Muon => &self.muons,
            CandidateKind::Tau => &self.taus,
            CandidateKind::Jet => &self.jets,
        }
    }
}

/// Process-wide context, built once per run and shared read-only by
/// every pipeline.
#[derive(Debug, Clone, Default)]
pub struct GlobalMetadata {
    pub collections: CollectionNames,
    pub year: Option<i64>,
    pub input_is_data: bool,
    pub pipeline_names: Vec<String>,
}

impl GlobalMetadata {
    /// Resolve the global keys (`Electrons`, `Muons`, `Taus`, `Jets`,
    /// `Year`, `InputIsData`) from root-scoped settings.
    pub fn from_settings(settings: &Settings) -> Result<Self, SettingsError> {
        let defaults = CollectionNames::default();
        let collections = CollectionNames {
            electrons: settings.get_string_or("Electrons", &defaults.electrons)?,
            muons: settings.get_string_or("Muons", &defaults.muons)?,
            taus: settings.get_string_or("Taus", &defaults.taus)?,
            jets: settings.get_string_or("Jets", &defaults.jets)?,
        };
        let year = if settings.contains("Year") {
            Some(settings.get_i64("Year")?)
        } else {
            None
        };

        Ok(Self {
            collections,
            year,
            input_is_data: settings.get_bool_or("InputIsData", false)?,
            pipeline_names: settings.tree().pipeline_names(),
        })
    }

    pub fn collection_name(&self, kind: CandidateKind) -> &str {
        self.collections.name(kind)
    }
}

/// Pipeline-wide context, fixed when the pipeline is initialised.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalMetadata {
    pub pipeline_name: String,
    pub producers: Vec<String>,
    pub filters: Vec<String>,
    pub consumers: Vec<String>,
}

/// Everything a stage may consult besides the event and product.
#[derive(Debug)]
pub struct PipelineContext {
    pub settings: Settings,
    pub global: Arc<GlobalMetadata>,
    pub local: LocalMetadata,
}

impl PipelineContext {
    pub fn new(settings: Settings, global: Arc<GlobalMetadata>) -> Self {
        let local = LocalMetadata {
            pipeline_name: settings.name().to_string(),
            ..Default::default()
        };
        Self {
            settings,
            global,
            local,
        }
    }

    pub fn pipeline_name(&self) -> &str {
        &self.local.pipeline_name
    }
}
