//! Event-level kinematic cuts on valid objects.
//!
//! Removes events whose valid objects fail `<Kind>LowerPtCuts` or
//! `<Kind>UpperAbsEtaCuts`. Must run after the validator for the kind.

use crate::cut_range::{CutDirection, CutRangeFilter, ObjectValue, abs_eta, pt};
use crate::error::{Result, StageContext};
use crate::metadata::PipelineContext;
use crate::product::{Product, accessor_for};
use crate::quantities::QuantityRegistry;
use crate::traits::Filter;
use event_data::{CandidateKind, Event};
use tracing::debug;

/// A `CutRangeFilter` bound to the valid objects of one kind.
pub struct ObjectCutsFilter {
    name: String,
    kind: CandidateKind,
    direction: CutDirection,
    setting_key: String,
    value: ObjectValue,
    cuts: CutRangeFilter,
}

impl ObjectCutsFilter {
    /// `<Kind>LowerPtCutsFilter`: valid-object pt above threshold.
    pub fn lower_pt(kind: CandidateKind) -> Self {
        let prefix = kind.setting_prefix();
        Self {
            name: format!("{}LowerPtCutsFilter", prefix),
            kind,
            direction: CutDirection::Lower,
            setting_key: format!("{}LowerPtCuts", prefix),
            value: pt,
            cuts: CutRangeFilter::new(),
        }
    }

    /// `<Kind>UpperAbsEtaCutsFilter`: valid-object |eta| below threshold.
    pub fn upper_abs_eta(kind: CandidateKind) -> Self {
        let prefix = kind.setting_prefix();
        Self {
            name: format!("{}UpperAbsEtaCutsFilter", prefix),
            kind,
            direction: CutDirection::Upper,
            setting_key: format!("{}UpperAbsEtaCuts", prefix),
            value: abs_eta,
            cuts: CutRangeFilter::new(),
        }
    }
}

impl Filter for ObjectCutsFilter {
    fn name(&self) -> &str {
        &self.name
    }

    fn init(&mut self, ctx: &PipelineContext, _quantities: &mut QuantityRegistry) -> Result<()> {
        let entries = ctx
            .settings
            .get_string_list(&self.setting_key)
            .in_stage(&self.name)?;
        let added = self
            .cuts
            .initialise(&entries, self.direction, accessor_for(self.kind), self.value)
            .in_stage(&self.name)?;
        debug!("{} initialised with {} cuts from {}", self.name, added, self.setting_key);
        Ok(())
    }

    fn passes(&self, event: &Event, product: &Product<'_>, _ctx: &PipelineContext) -> Result<bool> {
        Ok(self.cuts.passes(event, product))
    }
}
