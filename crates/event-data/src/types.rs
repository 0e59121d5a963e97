//! Core domain types for event records.
//!
//! An `Event` is the immutable raw observation handed to every pipeline.
//! Candidate collections are stored by name so that the same event can
//! feed pipelines bound to different collections (e.g. corrected and
//! uncorrected jets).

use crate::error::{DataError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::f64::consts::PI;
use std::fmt;

/// Value used for quantities that are undefined for an event
/// (e.g. the leading jet pt of an event without jets).
pub const UNDEFINED_DOUBLE: f64 = -999.0;

// =============================================================================
// Kinematics
// =============================================================================

/// Four-momentum in (pt, eta, phi, mass) coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LorentzVector {
    pub pt: f64,
    pub eta: f64,
    pub phi: f64,
    #[serde(default)]
    pub mass: f64,
}

impl LorentzVector {
    pub fn new(pt: f64, eta: f64, phi: f64, mass: f64) -> Self {
        Self { pt, eta, phi, mass }
    }

    /// Azimuthal distance folded into [-pi, pi).
    pub fn delta_phi(&self, other: &LorentzVector) -> f64 {
        (self.phi - other.phi + PI).rem_euclid(2.0 * PI) - PI
    }

    /// Angular distance sqrt(deta^2 + dphi^2).
    pub fn delta_r(&self, other: &LorentzVector) -> f64 {
        let deta = self.eta - other.eta;
        let dphi = self.delta_phi(other);
        (deta * deta + dphi * dphi).sqrt()
    }
}

/// Anything with a four-momentum.
pub trait PhysicsObject {
    fn p4(&self) -> &LorentzVector;
}

// =============================================================================
// Candidate types
// =============================================================================

/// The candidate collection families an event can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CandidateKind {
    Electron,
    Muon,
    Tau,
    Jet,
}

impl CandidateKind {
    /// Capitalised name used as prefix in setting keys ("ElectronLowerPtCuts").
    pub fn setting_prefix(&self) -> &'static str {
        match self {
            CandidateKind::Electron => "Electron",
            CandidateKind::Muon => "Muon",
            CandidateKind::Tau => "Tau",
            CandidateKind::Jet => "Jet",
        }
    }
}

impl fmt::Display for CandidateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CandidateKind::Electron => "electron",
            CandidateKind::Muon => "muon",
            CandidateKind::Tau => "tau",
            CandidateKind::Jet => "jet",
        })
    }
}

/// Reconstructed electron candidate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Electron {
    pub p4: LorentzVector,
    pub charge: i8,
    pub id_loose: bool,
    pub id_medium: bool,
    pub id_tight: bool,
    /// Relative isolation (sum of surrounding pt / pt)
    pub rel_iso: f64,
}

/// Reconstructed muon candidate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Muon {
    pub p4: LorentzVector,
    pub charge: i8,
    pub id_loose: bool,
    pub id_medium: bool,
    pub id_tight: bool,
    pub rel_iso: f64,
}

/// Hadronically decaying tau candidate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Tau {
    pub p4: LorentzVector,
    pub charge: i8,
    /// Discriminator name -> output value
    pub discriminators: HashMap<String, f64>,
}

/// Particle-flow jet candidate with its energy fractions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Jet {
    pub p4: LorentzVector,
    pub neutral_hadron_fraction: f64,
    pub charged_hadron_fraction: f64,
    pub photon_fraction: f64,
    pub electron_fraction: f64,
    pub muon_fraction: f64,
    pub hf_em_fraction: f64,
    pub hf_hadron_fraction: f64,
    pub n_constituents: u32,
    pub n_charged: u32,
}

impl PhysicsObject for Electron {
    fn p4(&self) -> &LorentzVector {
        &self.p4
    }
}

impl PhysicsObject for Muon {
    fn p4(&self) -> &LorentzVector {
        &self.p4
    }
}

impl PhysicsObject for Tau {
    fn p4(&self) -> &LorentzVector {
        &self.p4
    }
}

impl PhysicsObject for Jet {
    fn p4(&self) -> &LorentzVector {
        &self.p4
    }
}

// =============================================================================
// Trigger and bookkeeping
// =============================================================================

/// One trigger path as recorded for an event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerPath {
    pub name: String,
    pub fired: bool,
    #[serde(default = "default_prescale")]
    pub prescale: u32,
}

fn default_prescale() -> u32 {
    1
}

/// Run / luminosity block / event number triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct EventId {
    pub run: u64,
    pub lumi: u64,
    pub event: u64,
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.run, self.lumi, self.event)
    }
}

// =============================================================================
// Event
// =============================================================================

/// One immutable raw observation record.
///
/// All collections are keyed by name; which name a pipeline reads is
/// decided by configuration, not by the event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    #[serde(default = "default_weight")]
    pub weight: f64,
    #[serde(default)]
    pub electrons: HashMap<String, Vec<Electron>>,
    #[serde(default)]
    pub muons: HashMap<String, Vec<Muon>>,
    #[serde(default)]
    pub taus: HashMap<String, Vec<Tau>>,
    #[serde(default)]
    pub jets: HashMap<String, Vec<Jet>>,
    /// `None` when the source carries no trigger information at all
    #[serde(default)]
    pub triggers: Option<Vec<TriggerPath>>,
    #[serde(default)]
    pub scalars: HashMap<String, f64>,
}

fn default_weight() -> f64 {
    1.0
}

impl Event {
    /// Create an empty event with unit weight.
    pub fn new(id: EventId) -> Self {
        Self {
            id,
            weight: 1.0,
            electrons: HashMap::new(),
            muons: HashMap::new(),
            taus: HashMap::new(),
            jets: HashMap::new(),
            triggers: None,
            scalars: HashMap::new(),
        }
    }

    pub fn electrons(&self, name: &str) -> Result<&[Electron]> {
        lookup(&self.electrons, CandidateKind::Electron, name, self.id)
    }

    pub fn muons(&self, name: &str) -> Result<&[Muon]> {
        lookup(&self.muons, CandidateKind::Muon, name, self.id)
    }

    pub fn taus(&self, name: &str) -> Result<&[Tau]> {
        lookup(&self.taus, CandidateKind::Tau, name, self.id)
    }

    pub fn jets(&self, name: &str) -> Result<&[Jet]> {
        lookup(&self.jets, CandidateKind::Jet, name, self.id)
    }

    /// Get a scalar field by name
    pub fn scalar(&self, name: &str) -> Result<f64> {
        self.scalars
            .get(name)
            .copied()
            .ok_or_else(|| DataError::MissingScalar {
                name: name.to_string(),
                event: self.id.to_string(),
            })
    }

    /// Get the trigger paths, failing if the source recorded none
    pub fn trigger_paths(&self) -> Result<&[TriggerPath]> {
        self.triggers
            .as_deref()
            .ok_or_else(|| DataError::MissingTrigger {
                event: self.id.to_string(),
            })
    }
}

fn lookup<'e, T>(
    collections: &'e HashMap<String, Vec<T>>,
    kind: CandidateKind,
    name: &str,
    id: EventId,
) -> Result<&'e [T]> {
    collections
        .get(name)
        .map(|v| v.as_slice())
        .ok_or_else(|| DataError::MissingCollection {
            kind: kind.to_string(),
            name: name.to_string(),
            event: id.to_string(),
        })
}
