//! The mutable per-event product.
//!
//! A `Product<'e>` is created fresh for every event and borrows the
//! candidates of that event, so it can never outlive it. Valid/invalid
//! collections hold references into the event, never copies.

use event_data::{CandidateKind, Electron, Jet, LorentzVector, Muon, Tau};
use std::collections::HashMap;

/// Reads the four-momentum of the `index`-th valid object of one kind.
///
/// Filters and validators are handed one of these instead of knowing
/// which product field they operate on.
pub type ValidObjectAccessor = for<'p, 'e> fn(&'p Product<'e>, usize) -> Option<&'p LorentzVector>;

#[derive(Debug, Default)]
pub struct Product<'e> {
    pub valid_electrons: Vec<&'e Electron>,
    pub invalid_electrons: Vec<&'e Electron>,
    pub valid_muons: Vec<&'e Muon>,
    pub invalid_muons: Vec<&'e Muon>,
    pub valid_taus: Vec<&'e Tau>,
    pub invalid_taus: Vec<&'e Tau>,
    pub valid_jets: Vec<&'e Jet>,
    pub invalid_jets: Vec<&'e Jet>,

    /// Four-momenta of all valid electrons, muons and taus, in the order
    /// their validators ran. Used for jet and tau cleaning.
    pub valid_leptons: Vec<&'e LorentzVector>,

    /// Trigger path chosen for this event; pattern-keyed cuts match on it
    pub selected_hlt_name: Option<String>,

    /// Derived scalar quantities
    pub quantities: HashMap<String, f64>,
}

impl<'e> Product<'e> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn valid_count(&self, kind: CandidateKind) -> usize {
        match kind {
            CandidateKind::Electron => self.valid_electrons.len(),
            CandidateKind::Muon => self.valid_muons.len(),
            CandidateKind::Tau => self.valid_taus.len(),
            CandidateKind::Jet => self.valid_jets.len(),
        }
    }

    pub fn invalid_count(&self, kind: CandidateKind) -> usize {
        match kind {
            CandidateKind::Electron => self.invalid_electrons.len(),
            CandidateKind::Muon => self.invalid_muons.len(),
            CandidateKind::Tau => self.invalid_taus.len(),
            CandidateKind::Jet => self.invalid_jets.len(),
        }
    }

    /// Four-momentum of the `index`-th valid object of `kind`.
    pub fn valid_p4(&self, kind: CandidateKind, index: usize) -> Option<&LorentzVector> {
        accessor_for(kind)(self, index)
    }

    pub fn set_quantity(&mut self, name: impl Into<String>, value: f64) {
        self.quantities.insert(name.into(), value);
    }

    pub fn quantity(&self, name: &str) -> Option<f64> {
        self.quantities.get(name).copied()
    }
}

pub fn valid_electron_p4<'p>(product: &'p Product<'_>, index: usize) -> Option<&'p LorentzVector> {
    product.valid_electrons.get(index).map(|e| &e.p4)
}

pub fn valid_muon_p4<'p>(product: &'p Product<'_>, index: usize) -> Option<&'p LorentzVector> {
    product.valid_muons.get(index).map(|m| &m.p4)
}

pub fn valid_tau_p4<'p>(product: &'p Product<'_>, index: usize) -> Option<&'p LorentzVector> {
    product.valid_taus.get(index).map(|t| &t.p4)
}

pub fn valid_jet_p4<'p>(product: &'p Product<'_>, index: usize) -> Option<&'p LorentzVector> {
    product.valid_jets.get(index).map(|j| &j.p4)
}

/// The accessor reading valid objects of `kind`.
pub fn accessor_for(kind: CandidateKind) -> ValidObjectAccessor {
    match kind {
        CandidateKind::Electron => valid_electron_p4,
        CandidateKind::Muon => valid_muon_p4,
        CandidateKind::Tau => valid_tau_p4,
        CandidateKind::Jet => valid_jet_p4,
    }
}
