//! Valid/invalid partitioning of candidate collections.
//!
//! One generic producer serves all four candidate kinds. What differs
//! per kind lives in an `ObjectCapability`: where the collection is read
//! from, where the partition is stored, how identification is configured
//! and whether the objects are cleaned against leptons.
//!
//! A candidate is valid iff, in this order, it passes
//! 1. the identification predicate,
//! 2. the kinematic cuts for the valid-object index it would take,
//! 3. ΔR isolation against leptons already accepted by earlier validators,
//! 4. the optional additional criteria.

use crate::cut_range::{CandidateCuts, CutDirection, ObjectValue, abs_eta, parse_cut_specs, pt};
use crate::error::{PipelineError, Result, StageContext};
use crate::metadata::PipelineContext;
use crate::producers::identification::{self, IdPredicate};
use crate::product::{Product, accessor_for};
use crate::quantities::QuantityRegistry;
use crate::traits::Producer;
use event_data::{
    CandidateKind, Electron, Event, Jet, LorentzVector, Muon, PhysicsObject, Tau, UNDEFINED_DOUBLE,
};
use settings::Settings;
use tracing::debug;

/// Extra per-candidate predicate for analysis-specific selections.
pub type AdditionalCriteria<T> = Box<dyn Fn(&T, &Event, &Product<'_>) -> bool + Send + Sync>;

/// Minimum ΔR to already-valid leptons, read from `setting_key`.
#[derive(Debug, Clone, Copy)]
pub struct LeptonCleaning {
    pub setting_key: &'static str,
    pub default_delta_r: f64,
}

/// Per-kind wiring of the generic validator.
pub struct ObjectCapability<T: 'static> {
    pub kind: CandidateKind,
    pub collection: for<'e> fn(&'e Event, &str) -> event_data::Result<&'e [T]>,
    pub store: for<'e> fn(&mut Product<'e>, Vec<&'e T>, Vec<&'e T>),
    pub identification: fn(&Settings, &str) -> Result<IdPredicate<T>>,
    pub lepton_cleaning: Option<LeptonCleaning>,
    /// Valid objects are appended to `Product::valid_leptons`
    pub is_lepton: bool,
}

fn store_electrons<'e>(product: &mut Product<'e>, valid: Vec<&'e Electron>, invalid: Vec<&'e Electron>) {
    product.valid_electrons = valid;
    product.invalid_electrons = invalid;
}

fn store_muons<'e>(product: &mut Product<'e>, valid: Vec<&'e Muon>, invalid: Vec<&'e Muon>) {
    product.valid_muons = valid;
    product.invalid_muons = invalid;
}

fn store_taus<'e>(product: &mut Product<'e>, valid: Vec<&'e Tau>, invalid: Vec<&'e Tau>) {
    product.valid_taus = valid;
    product.invalid_taus = invalid;
}

fn store_jets<'e>(product: &mut Product<'e>, valid: Vec<&'e Jet>, invalid: Vec<&'e Jet>) {
    product.valid_jets = valid;
    product.invalid_jets = invalid;
}

pub struct ValidObjectsProducer<T: 'static> {
    name: String,
    capability: ObjectCapability<T>,
    id_predicate: Option<IdPredicate<T>>,
    kinematic_cuts: CandidateCuts,
    min_lepton_delta_r: Option<f64>,
    additional_criteria: Option<AdditionalCriteria<T>>,
}

pub type ValidElectronsProducer = ValidObjectsProducer<Electron>;
pub type ValidMuonsProducer = ValidObjectsProducer<Muon>;
pub type ValidTausProducer = ValidObjectsProducer<Tau>;
pub type ValidJetsProducer = ValidObjectsProducer<Jet>;

impl<T: PhysicsObject + 'static> ValidObjectsProducer<T> {
    pub fn new(name: impl Into<String>, capability: ObjectCapability<T>) -> Self {
        Self {
            name: name.into(),
            capability,
            id_predicate: None,
            kinematic_cuts: CandidateCuts::new(),
            min_lepton_delta_r: None,
            additional_criteria: None,
        }
    }

    /// Add an analysis-specific predicate evaluated after all other checks.
    pub fn with_additional_criteria<F>(mut self, criteria: F) -> Self
    where
        F: Fn(&T, &Event, &Product<'_>) -> bool + Send + Sync + 'static,
    {
        self.additional_criteria = Some(Box::new(criteria));
        self
    }

    pub fn kind(&self) -> CandidateKind {
        self.capability.kind
    }

    fn register_quantities(&self, quantities: &mut QuantityRegistry) -> Result<()> {
        let kind = self.capability.kind;
        let prefix = kind.setting_prefix();
        let accessor = accessor_for(kind);

        quantities.register(&format!("n{}s", prefix), move |_: &Event, product: &Product<'_>| {
            product.valid_count(kind) as f64
        })?;

        let components: [(&str, ObjectValue); 3] = [
            ("Pt", pt),
            ("Eta", |p4: &LorentzVector| p4.eta),
            ("Phi", |p4: &LorentzVector| p4.phi),
        ];
        for (suffix, component) in components {
            quantities.register(
                &format!("leading{}{}", prefix, suffix),
                move |_: &Event, product: &Product<'_>| {
                    accessor(product, 0).map_or(UNDEFINED_DOUBLE, component)
                },
            )?;
            quantities.register(
                &format!("trailing{}{}", prefix, suffix),
                move |_: &Event, product: &Product<'_>| {
                    accessor(product, 1).map_or(UNDEFINED_DOUBLE, component)
                },
            )?;
        }

        if kind == CandidateKind::Jet {
            for threshold in [20.0, 30.0] {
                quantities.register(
                    &format!("nJets{}", threshold),
                    move |_: &Event, product: &Product<'_>| {
                        product.valid_jets.iter().filter(|jet| jet.p4.pt > threshold).count() as f64
                    },
                )?;
            }
        }
        Ok(())
    }
}

impl ValidElectronsProducer {
    pub fn electrons() -> Self {
        Self::new(
            "ValidElectronsProducer",
            ObjectCapability {
                kind: CandidateKind::Electron,
                collection: Event::electrons,
                store: store_electrons,
                identification: identification::electron_id,
                lepton_cleaning: None,
                is_lepton: true,
            },
        )
    }
}

impl ValidMuonsProducer {
    pub fn muons() -> Self {
        Self::new(
            "ValidMuonsProducer",
            ObjectCapability {
                kind: CandidateKind::Muon,
                collection: Event::muons,
                store: store_muons,
                identification: identification::muon_id,
                lepton_cleaning: None,
                is_lepton: true,
            },
        )
    }
}

impl ValidTausProducer {
    pub fn taus() -> Self {
        Self::new(
            "ValidTausProducer",
            ObjectCapability {
                kind: CandidateKind::Tau,
                collection: Event::taus,
                store: store_taus,
                identification: identification::tau_id,
                lepton_cleaning: Some(LeptonCleaning {
                    setting_key: "TauLeptonLowerDeltaRCut",
                    default_delta_r: 0.5,
                }),
                is_lepton: true,
            },
        )
    }
}

impl ValidJetsProducer {
    pub fn jets() -> Self {
        Self::new(
            "ValidJetsProducer",
            ObjectCapability {
                kind: CandidateKind::Jet,
                collection: Event::jets,
                store: store_jets,
                identification: identification::jet_id,
                lepton_cleaning: Some(LeptonCleaning {
                    setting_key: "JetLeptonLowerDeltaRCut",
                    default_delta_r: 0.5,
                }),
                is_lepton: false,
            },
        )
    }
}

impl<T: PhysicsObject + 'static> Producer for ValidObjectsProducer<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn init(&mut self, ctx: &PipelineContext, quantities: &mut QuantityRegistry) -> Result<()> {
        let settings = &ctx.settings;
        let prefix = self.capability.kind.setting_prefix();

        self.id_predicate = Some((self.capability.identification)(settings, &self.name)?);

        let mut cuts = CandidateCuts::new();
        let lower = settings
            .get_string_list(&format!("{}LowerPtCuts", prefix))
            .in_stage(&self.name)?;
        cuts.add(parse_cut_specs(&lower, CutDirection::Lower).in_stage(&self.name)?, pt);
        let upper = settings
            .get_string_list(&format!("{}UpperAbsEtaCuts", prefix))
            .in_stage(&self.name)?;
        cuts.add(parse_cut_specs(&upper, CutDirection::Upper).in_stage(&self.name)?, abs_eta);
        self.kinematic_cuts = cuts;

        self.min_lepton_delta_r = match self.capability.lepton_cleaning {
            Some(cleaning) => Some(
                settings
                    .get_f64_or(cleaning.setting_key, cleaning.default_delta_r)
                    .in_stage(&self.name)?,
            ),
            None => None,
        };

        self.register_quantities(quantities)?;

        debug!(
            "{} initialised: {} kinematic cuts, lepton ΔR {:?}",
            self.name,
            self.kinematic_cuts.len(),
            self.min_lepton_delta_r
        );
        Ok(())
    }

    fn produce<'e>(
        &self,
        event: &'e Event,
        product: &mut Product<'e>,
        ctx: &PipelineContext,
    ) -> Result<()> {
        let id = self
            .id_predicate
            .as_ref()
            .ok_or_else(|| PipelineError::NotInitialized {
                stage: self.name.clone(),
            })?;
        let collection_name = ctx.global.collection_name(self.capability.kind);
        let candidates = (self.capability.collection)(event, collection_name).in_stage(&self.name)?;

        let mut valid: Vec<&'e T> = Vec::new();
        let mut invalid: Vec<&'e T> = Vec::new();
        {
            let current: &Product<'e> = product;
            let selected = current.selected_hlt_name.as_deref();
            for candidate in candidates {
                let p4 = candidate.p4();
                let is_valid = id(candidate)
                    && self.kinematic_cuts.passes(p4, valid.len(), selected)
                    && self.min_lepton_delta_r.is_none_or(|min_delta_r| {
                        current
                            .valid_leptons
                            .iter()
                            .all(|lepton| p4.delta_r(lepton) > min_delta_r)
                    })
                    && self
                        .additional_criteria
                        .as_ref()
                        .is_none_or(|criteria| criteria(candidate, event, current));

                if is_valid {
                    valid.push(candidate);
                } else {
                    invalid.push(candidate);
                }
            }
        }

        if self.capability.is_lepton {
            product.valid_leptons.extend(valid.iter().map(|&candidate| candidate.p4()));
        }
        (self.capability.store)(product, valid, invalid);
        Ok(())
    }
}
