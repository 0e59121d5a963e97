//! Identification and isolation working points.

use crate::error::{PipelineError, Result, StageContext};
use event_data::{Electron, Jet, Muon, Tau};
use settings::Settings;
use std::fmt;
use tracing::warn;

/// Boxed identification predicate, resolved from settings at init.
pub type IdPredicate<T> = Box<dyn Fn(&T) -> bool + Send + Sync>;

/// Ordered quality tier: `None < Loose < Medium < Tight`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IdTier {
    None,
    Loose,
    Medium,
    Tight,
}

impl IdTier {
    pub fn parse(value: &str) -> std::result::Result<Self, String> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "none" => Ok(IdTier::None),
            "loose" => Ok(IdTier::Loose),
            "medium" => Ok(IdTier::Medium),
            "tight" => Ok(IdTier::Tight),
            other => Err(format!("unsupported identification tier \"{}\"", other)),
        }
    }

    /// Upper bound on relative isolation for this tier.
    pub fn max_rel_iso(self) -> Option<f64> {
        match self {
            IdTier::None => None,
            IdTier::Loose => Some(0.30),
            IdTier::Medium => Some(0.20),
            IdTier::Tight => Some(0.15),
        }
    }
}

impl fmt::Display for IdTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            IdTier::None => "none",
            IdTier::Loose => "loose",
            IdTier::Medium => "medium",
            IdTier::Tight => "tight",
        })
    }
}

fn tier_setting(settings: &Settings, key: &str, default: Option<&str>, stage: &str) -> Result<IdTier> {
    let value = match default {
        Some(default) => settings.get_string_or(key, default),
        None => settings.get_string(key),
    }
    .in_stage(stage)?;
    IdTier::parse(&value).map_err(|reason| PipelineError::configuration(stage, format!("{}: {}", key, reason)))
}

fn passes_tier_flags(tier: IdTier, loose: bool, medium: bool, tight: bool) -> bool {
    match tier {
        IdTier::None => true,
        IdTier::Loose => loose,
        IdTier::Medium => medium,
        IdTier::Tight => tight,
    }
}

fn passes_rel_iso(rel_iso: f64, tier: IdTier) -> bool {
    tier.max_rel_iso().is_none_or(|max| rel_iso < max)
}

/// `ElectronID` (required) and `ElectronIso` (default none).
pub fn electron_id(settings: &Settings, stage: &str) -> Result<IdPredicate<Electron>> {
    let id = tier_setting(settings, "ElectronID", None, stage)?;
    let iso = tier_setting(settings, "ElectronIso", Some("none"), stage)?;
    Ok(Box::new(move |e: &Electron| {
        passes_tier_flags(id, e.id_loose, e.id_medium, e.id_tight) && passes_rel_iso(e.rel_iso, iso)
    }))
}

/// `MuonID` (required) and `MuonIso` (default none).
pub fn muon_id(settings: &Settings, stage: &str) -> Result<IdPredicate<Muon>> {
    let id = tier_setting(settings, "MuonID", None, stage)?;
    let iso = tier_setting(settings, "MuonIso", Some("none"), stage)?;
    Ok(Box::new(move |m: &Muon| {
        passes_tier_flags(id, m.id_loose, m.id_medium, m.id_tight) && passes_rel_iso(m.rel_iso, iso)
    }))
}

/// Discriminator value above which a tau passes.
pub const TAU_DISCRIMINATOR_THRESHOLD: f64 = 0.5;

/// Every discriminator in `TauDiscriminators` must be present and pass.
pub fn tau_id(settings: &Settings, stage: &str) -> Result<IdPredicate<Tau>> {
    let discriminators = settings.get_string_list("TauDiscriminators").in_stage(stage)?;
    Ok(Box::new(move |t: &Tau| {
        discriminators.iter().all(|name| {
            t.discriminators
                .get(name)
                .is_some_and(|&value| value > TAU_DISCRIMINATOR_THRESHOLD)
        })
    }))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JetIdVersion {
    V2010,
    V2014,
    V73X,
}

impl JetIdVersion {
    pub fn parse(value: &str) -> std::result::Result<Self, String> {
        match value.trim().to_ascii_lowercase().as_str() {
            "2010" => Ok(JetIdVersion::V2010),
            "2014" => Ok(JetIdVersion::V2014),
            "73x" => Ok(JetIdVersion::V73X),
            other => Err(format!("unsupported jet ID version \"{}\"", other)),
        }
    }
}

/// |eta| up to which the tracker-based predicates apply.
pub const JET_TRACKER_ETA: f64 = 2.4;

/// Particle-flow jet identification.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JetId {
    pub tier: IdTier,
    pub version: JetIdVersion,
}

impl JetId {
    pub fn new(tier: IdTier, version: JetIdVersion) -> Self {
        Self { tier, version }
    }

    /// Largest energy fraction a single component may carry.
    pub fn max_fraction(&self) -> f64 {
        match self.tier {
            IdTier::Tight => 0.90,
            IdTier::Medium => 0.95,
            IdTier::Loose => 0.99,
            IdTier::None => 1.0,
        }
    }

    /// Tier `None` still applies the constituent and tracker-region
    /// requirements; only the fraction bound is relaxed to 1.
    pub fn passes(&self, jet: &Jet) -> bool {
        let max = self.max_fraction();

        let mut valid = jet.neutral_hadron_fraction < max
            && jet.photon_fraction + jet.hf_em_fraction < max
            && jet.n_constituents > 1;

        if matches!(self.version, JetIdVersion::V2010 | JetIdVersion::V2014) {
            valid = valid && jet.neutral_hadron_fraction + jet.hf_hadron_fraction < max;
        }
        if self.version == JetIdVersion::V2014 {
            valid = valid && jet.muon_fraction < 0.8;
        }
        if jet.p4.eta.abs() <= JET_TRACKER_ETA {
            valid = valid
                && jet.charged_hadron_fraction > 0.0
                && jet.n_charged > 0
                && jet.electron_fraction < 0.99;
        }
        valid
    }
}

/// `JetID` (required) and `JetIDVersion` (default 73X).
pub fn jet_id(settings: &Settings, stage: &str) -> Result<IdPredicate<Jet>> {
    let tier = tier_setting(settings, "JetID", None, stage)?;
    let version = settings.get_string_or("JetIDVersion", "73X").in_stage(stage)?;
    let version = JetIdVersion::parse(&version)
        .map_err(|reason| PipelineError::configuration(stage, format!("JetIDVersion: {}", reason)))?;
    if tier == IdTier::Medium && version != JetIdVersion::V2010 {
        warn!("{}: medium jet ID is only defined for the 2010 version", stage);
    }
    let id = JetId::new(tier, version);
    Ok(Box::new(move |jet: &Jet| id.passes(jet)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use event_data::LorentzVector;
    use serde_json::json;
    use settings::PropertyTree;
    use std::sync::Arc;

    fn create_test_settings(pipeline: serde_json::Value) -> Settings {
        let tree = PropertyTree::from_value(json!({ "Pipelines": { "test": pipeline } }));
        Settings::pipeline(Arc::new(tree), "test")
    }

    fn create_good_jet(eta: f64) -> Jet {
        Jet {
            p4: LorentzVector::new(40.0, eta, 0.0, 0.0),
            neutral_hadron_fraction: 0.2,
            charged_hadron_fraction: 0.5,
            photon_fraction: 0.2,
            electron_fraction: 0.05,
            muon_fraction: 0.05,
            hf_em_fraction: 0.0,
            hf_hadron_fraction: 0.0,
            n_constituents: 12,
            n_charged: 6,
        }
    }

    #[test]
    fn test_tier_ordering_and_parsing() {
        assert!(IdTier::None < IdTier::Loose);
        assert!(IdTier::Medium < IdTier::Tight);
        assert_eq!(IdTier::parse("TIGHT").unwrap(), IdTier::Tight);
        assert_eq!(IdTier::parse("").unwrap(), IdTier::None);
        assert!(IdTier::parse("ultra").is_err());
    }

    #[test]
    fn test_unsupported_tier_is_configuration_error() {
        let settings = create_test_settings(json!({ "MuonID": "superb" }));
        let err = muon_id(&settings, "ValidMuonsProducer").err().unwrap();
        assert!(matches!(err, PipelineError::Configuration { .. }));
    }

    #[test]
    fn test_missing_required_id_is_settings_error() {
        let settings = create_test_settings(json!({}));
        let err = electron_id(&settings, "ValidElectronsProducer").err().unwrap();
        assert!(matches!(err, PipelineError::Settings { .. }));
    }

    #[test]
    fn test_lepton_id_and_isolation() {
        let settings = create_test_settings(json!({ "MuonID": "medium", "MuonIso": "tight" }));
        let id = muon_id(&settings, "ValidMuonsProducer").unwrap();

        let mut muon = Muon {
            id_loose: true,
            id_medium: true,
            rel_iso: 0.1,
            ..Default::default()
        };
        assert!(id(&muon));
        muon.rel_iso = 0.16;
        assert!(!id(&muon));
        muon.rel_iso = 0.1;
        muon.id_medium = false;
        assert!(!id(&muon));
    }

    #[test]
    fn test_tau_discriminators() {
        let settings = create_test_settings(json!({
            "TauDiscriminators": ["decayModeFinding", "byLooseIsolation"]
        }));
        let id = tau_id(&settings, "ValidTausProducer").unwrap();

        let mut tau = Tau::default();
        tau.discriminators.insert("decayModeFinding".to_string(), 1.0);
        assert!(!id(&tau));
        tau.discriminators.insert("byLooseIsolation".to_string(), 0.4);
        assert!(!id(&tau));
        tau.discriminators.insert("byLooseIsolation".to_string(), 0.9);
        assert!(id(&tau));
    }

    #[test]
    fn test_jet_id_tiers() {
        let mut jet = create_good_jet(0.5);
        let tight = JetId::new(IdTier::Tight, JetIdVersion::V73X);
        let loose = JetId::new(IdTier::Loose, JetIdVersion::V73X);
        assert!(tight.passes(&jet));

        jet.neutral_hadron_fraction = 0.95;
        assert!(!tight.passes(&jet));
        assert!(loose.passes(&jet));
        assert!(JetId::new(IdTier::None, JetIdVersion::V73X).passes(&jet));
    }

    #[test]
    fn test_jet_id_none_keeps_basic_requirements() {
        let none = JetId::new(IdTier::None, JetIdVersion::V73X);
        assert_eq!(none.max_fraction(), 1.0);

        let mut single = create_good_jet(0.5);
        single.n_constituents = 1;
        assert!(!none.passes(&single));

        let mut no_tracks = create_good_jet(1.0);
        no_tracks.n_charged = 0;
        assert!(!none.passes(&no_tracks));

        let mut all_neutral = create_good_jet(3.5);
        all_neutral.neutral_hadron_fraction = 1.0;
        assert!(!none.passes(&all_neutral));
        all_neutral.neutral_hadron_fraction = 0.999;
        assert!(none.passes(&all_neutral));
    }

    #[test]
    fn test_jet_id_versions_and_tracker_region() {
        let mut jet = create_good_jet(0.5);
        jet.muon_fraction = 0.85;
        assert!(JetId::new(IdTier::Loose, JetIdVersion::V2010).passes(&jet));
        assert!(!JetId::new(IdTier::Loose, JetIdVersion::V2014).passes(&jet));

        let mut forward = create_good_jet(3.0);
        forward.n_charged = 0;
        forward.charged_hadron_fraction = 0.0;
        assert!(JetId::new(IdTier::Tight, JetIdVersion::V73X).passes(&forward));
        forward.p4.eta = 2.0;
        assert!(!JetId::new(IdTier::Tight, JetIdVersion::V73X).passes(&forward));
    }
}
