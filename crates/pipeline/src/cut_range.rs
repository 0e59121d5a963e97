//! Declarative threshold cuts.
//!
//! Cuts are configured as `"selector:threshold"` strings. The selector is
//! either a non-negative object index, the literal `default` (indices
//! 0..=20), or a case-insensitive regex matched against the trigger path
//! selected for the event.
//!
//! ## Example
//! ```ignore
//! // leading jet above 30, second jet above 20
//! let mut filter = CutRangeFilter::new();
//! filter.initialise(
//!     &["0:30".to_string(), "1:20".to_string()],
//!     CutDirection::Lower,
//!     valid_jet_p4,
//!     pt,
//! )?;
//! let keep = filter.passes(&event, &product);
//! ```

use crate::error::CutSpecError;
use crate::product::{Product, ValidObjectAccessor};
use event_data::{Event, LorentzVector};
use regex::Regex;
use tracing::warn;

/// Highest object index covered by `default` and pattern selectors.
pub const MAX_DEFAULT_INDEX: usize = 20;

/// Value reported for a missing object under a lower cut.
pub const MISSING_LOWER_SENTINEL: f64 = 0.99 * f64::MAX;

/// Value reported for a missing object under an upper cut.
pub const MISSING_UPPER_SENTINEL: f64 = -1.0;

/// Scalar read from an object's four-momentum.
pub type ObjectValue = fn(&LorentzVector) -> f64;

pub fn pt(p4: &LorentzVector) -> f64 {
    p4.pt
}

pub fn abs_eta(p4: &LorentzVector) -> f64 {
    p4.eta.abs()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CutDirection {
    Lower,
    Upper,
}

impl CutDirection {
    pub fn range(self, threshold: f64) -> CutRange {
        match self {
            CutDirection::Lower => CutRange::Lower(threshold),
            CutDirection::Upper => CutRange::Upper(threshold),
        }
    }

    /// Value an extractor reports when there is nothing to test.
    /// Lies inside every range this direction can produce.
    pub fn missing_sentinel(self) -> f64 {
        match self {
            CutDirection::Lower => MISSING_LOWER_SENTINEL,
            CutDirection::Upper => MISSING_UPPER_SENTINEL,
        }
    }
}

/// Open interval a value must fall into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CutRange {
    /// value > threshold
    Lower(f64),
    /// value < threshold
    Upper(f64),
}

impl CutRange {
    pub fn contains(&self, value: f64) -> bool {
        match *self {
            CutRange::Lower(threshold) => value > threshold,
            CutRange::Upper(threshold) => value < threshold,
        }
    }

    pub fn direction(&self) -> CutDirection {
        match self {
            CutRange::Lower(_) => CutDirection::Lower,
            CutRange::Upper(_) => CutDirection::Upper,
        }
    }
}

/// Which objects a cut applies to.
#[derive(Debug, Clone)]
pub enum Selector {
    Index(usize),
    Default,
    Pattern(Regex),
}

impl Selector {
    /// Integer first; anything that does not parse as an integer is a
    /// pattern. `"3"` is always index 3.
    pub fn parse(key: &str) -> Result<Self, CutSpecError> {
        let key = key.trim();
        if key == "default" {
            return Ok(Selector::Default);
        }
        if let Ok(index) = key.parse::<i64>() {
            return usize::try_from(index)
                .map(Selector::Index)
                .map_err(|_| CutSpecError::NegativeIndex(key.to_string()));
        }
        Regex::new(&format!("(?i){}", key))
            .map(Selector::Pattern)
            .map_err(|source| CutSpecError::InvalidPattern {
                pattern: key.to_string(),
                source,
            })
    }

    /// Object indices a cut with this selector is expanded to.
    pub fn indices(&self) -> Vec<usize> {
        match self {
            Selector::Index(index) => vec![*index],
            Selector::Default | Selector::Pattern(_) => (0..=MAX_DEFAULT_INDEX).collect(),
        }
    }

    /// Whether a cut with this selector applies to the object at `index`,
    /// given the trigger path selected for the event.
    pub fn applies_to(&self, index: usize, selected: Option<&str>) -> bool {
        match self {
            Selector::Index(i) => *i == index,
            Selector::Default => index <= MAX_DEFAULT_INDEX,
            Selector::Pattern(pattern) => {
                index <= MAX_DEFAULT_INDEX && selected.is_some_and(|name| pattern.is_match(name))
            }
        }
    }
}

/// One parsed threshold rule.
#[derive(Debug, Clone)]
pub struct CutSpec {
    pub selector: Selector,
    pub threshold: f64,
    pub direction: CutDirection,
}

impl CutSpec {
    pub fn range(&self) -> CutRange {
        self.direction.range(self.threshold)
    }
}

/// Group `"key:value"` strings by key.
///
/// Splits at the first `:`; strings without one go under `default`.
/// Keys keep first-appearance order and values keep input order.
pub fn parse_vector_to_map(entries: &[String]) -> Vec<(String, Vec<String>)> {
    let mut map: Vec<(String, Vec<String>)> = Vec::new();
    for entry in entries {
        let (key, value) = match entry.split_once(':') {
            Some((key, value)) => (key.trim(), value.trim()),
            None => ("default", entry.trim()),
        };
        match map.iter_mut().find(|(existing, _)| existing == key) {
            Some((_, values)) => values.push(value.to_string()),
            None => map.push((key.to_string(), vec![value.to_string()])),
        }
    }
    map
}

/// Parse cut strings into specs of one direction.
pub fn parse_cut_specs(entries: &[String], direction: CutDirection) -> Result<Vec<CutSpec>, CutSpecError> {
    let mut specs = Vec::new();
    for (key, values) in parse_vector_to_map(entries) {
        let selector = Selector::parse(&key)?;
        if matches!(selector, Selector::Default) {
            warn!(
                "Cut selector \"default\" applies to objects 0..={}",
                MAX_DEFAULT_INDEX
            );
        }
        for value in values {
            let threshold = value
                .parse::<f64>()
                .ok()
                .filter(|t| !t.is_nan())
                .ok_or_else(|| CutSpecError::InvalidThreshold {
                    selector: key.clone(),
                    value: value.clone(),
                })?;
            if direction == CutDirection::Upper && threshold < 0.0 {
                return Err(CutSpecError::NegativeUpperThreshold {
                    selector: key.clone(),
                    threshold,
                });
            }
            specs.push(CutSpec {
                selector: selector.clone(),
                threshold,
                direction,
            });
        }
    }
    Ok(specs)
}

pub type Extractor = Box<dyn Fn(&Event, &Product<'_>) -> f64 + Send + Sync>;

/// Conjunction of (extractor, range) pairs.
///
/// The pair list is only appended to while the owning stage initialises
/// and is read-only afterwards.
#[derive(Default)]
pub struct CutRangeFilter {
    cuts: Vec<(Extractor, CutRange)>,
}

impl CutRangeFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_cut<F>(&mut self, extractor: F, range: CutRange)
    where
        F: Fn(&Event, &Product<'_>) -> f64 + Send + Sync + 'static,
    {
        self.cuts.push((Box::new(extractor), range));
    }

    /// Parse cut strings and bind one extractor per covered object index.
    /// Returns the number of pairs added.
    pub fn initialise(
        &mut self,
        entries: &[String],
        direction: CutDirection,
        accessor: ValidObjectAccessor,
        value: ObjectValue,
    ) -> Result<usize, CutSpecError> {
        let specs = parse_cut_specs(entries, direction)?;
        Ok(self.add_object_cuts(&specs, accessor, value))
    }

    /// Bind already-parsed specs against the objects `accessor` reads.
    pub fn add_object_cuts(&mut self, specs: &[CutSpec], accessor: ValidObjectAccessor, value: ObjectValue) -> usize {
        let before = self.cuts.len();
        for spec in specs {
            let sentinel = spec.direction.missing_sentinel();
            for index in spec.selector.indices() {
                let selector = spec.selector.clone();
                self.add_cut(
                    move |_: &Event, product: &Product<'_>| {
                        if !selector.applies_to(index, product.selected_hlt_name.as_deref()) {
                            return sentinel;
                        }
                        accessor(product, index).map_or(sentinel, value)
                    },
                    spec.range(),
                );
            }
        }
        self.cuts.len() - before
    }

    /// True iff every pair's extracted value lies inside its range.
    pub fn passes(&self, event: &Event, product: &Product<'_>) -> bool {
        self.cuts
            .iter()
            .all(|(extract, range)| range.contains(extract(event, product)))
    }

    pub fn len(&self) -> usize {
        self.cuts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cuts.is_empty()
    }
}

/// The same specs applied to one candidate at a time.
///
/// A candidate that would become the `index`-th valid object is tested
/// against every spec that applies to `index`.
#[derive(Default)]
pub struct CandidateCuts {
    cuts: Vec<(CutSpec, ObjectValue)>,
}

impl CandidateCuts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, specs: Vec<CutSpec>, value: ObjectValue) {
        self.cuts.extend(specs.into_iter().map(|spec| (spec, value)));
    }

    pub fn passes(&self, p4: &LorentzVector, index: usize, selected: Option<&str>) -> bool {
        self.cuts
            .iter()
            .filter(|(spec, _)| spec.selector.applies_to(index, selected))
            .all(|(spec, value)| spec.range().contains(value(p4)))
    }

    pub fn len(&self) -> usize {
        self.cuts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cuts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::product::valid_jet_p4;
    use event_data::{EventId, Jet};

    fn strings(entries: &[&str]) -> Vec<String> {
        entries.iter().map(|s| s.to_string()).collect()
    }

    fn create_test_jets(pts: &[f64]) -> Vec<Jet> {
        pts.iter()
            .map(|&pt| Jet {
                p4: LorentzVector::new(pt, 1.5, 0.0, 0.0),
                ..Default::default()
            })
            .collect()
    }

    fn lower_pt_filter(entries: &[&str]) -> CutRangeFilter {
        let mut filter = CutRangeFilter::new();
        filter
            .initialise(&strings(entries), CutDirection::Lower, valid_jet_p4, pt)
            .unwrap();
        filter
    }

    #[test]
    fn test_parse_vector_to_map_groups_in_order() {
        let map = parse_vector_to_map(&strings(&["1:20", "0:30", "1:25", "15", " HLT_Mu.* : 40 "]));
        assert_eq!(
            map,
            vec![
                ("1".to_string(), vec!["20".to_string(), "25".to_string()]),
                ("0".to_string(), vec!["30".to_string()]),
                ("default".to_string(), vec!["15".to_string()]),
                ("HLT_Mu.*".to_string(), vec!["40".to_string()]),
            ]
        );
    }

    #[test]
    fn test_selector_dispatch() {
        assert!(matches!(Selector::parse("3").unwrap(), Selector::Index(3)));
        assert!(matches!(Selector::parse("default").unwrap(), Selector::Default));
        assert!(matches!(Selector::parse("HLT_Mu.*").unwrap(), Selector::Pattern(_)));
        assert!(matches!(
            Selector::parse("-1"),
            Err(CutSpecError::NegativeIndex(_))
        ));
        assert!(matches!(
            Selector::parse("HLT_(Mu"),
            Err(CutSpecError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_index_selector_ignores_selected_name() {
        let selector = Selector::parse("3").unwrap();
        assert!(selector.applies_to(3, Some("3")));
        assert!(selector.applies_to(3, None));
        assert!(!selector.applies_to(0, Some("3")));
    }

    #[test]
    fn test_pattern_selector_is_case_insensitive_search() {
        let selector = Selector::parse("hlt_mu").unwrap();
        assert!(selector.applies_to(0, Some("HLT_Mu17_v3")));
        assert!(!selector.applies_to(0, Some("HLT_Ele27")));
        assert!(!selector.applies_to(0, None));
        assert!(!selector.applies_to(MAX_DEFAULT_INDEX + 1, Some("HLT_Mu17_v3")));
    }

    #[test]
    fn test_malformed_thresholds_are_errors() {
        assert!(matches!(
            parse_cut_specs(&strings(&["0:abc"]), CutDirection::Lower),
            Err(CutSpecError::InvalidThreshold { .. })
        ));
        assert!(matches!(
            parse_cut_specs(&strings(&["0:-2.5"]), CutDirection::Upper),
            Err(CutSpecError::NegativeUpperThreshold { .. })
        ));
        // negative lower thresholds are meaningful
        assert_eq!(
            parse_cut_specs(&strings(&["0:-2.5"]), CutDirection::Lower).unwrap().len(),
            1
        );
    }

    #[test]
    fn test_default_and_pattern_expand_to_all_indices() {
        let filter = lower_pt_filter(&["default:10", "HLT_Mu.*:20", "2:5"]);
        assert_eq!(filter.len(), 2 * (MAX_DEFAULT_INDEX + 1) + 1);
    }

    #[test]
    fn test_ordering_example() {
        let jets = create_test_jets(&[12.0, 3.0]);
        let mut product = Product::new();
        product.valid_jets = jets.iter().collect();
        let event = Event::new(EventId::default());

        let filter = lower_pt_filter(&["0:10.0", "1:5.0"]);
        assert!(!filter.passes(&event, &product));

        let first_only = lower_pt_filter(&["0:10.0"]);
        assert!(first_only.passes(&event, &product));
    }

    #[test]
    fn test_missing_object_sentinels() {
        let jets = create_test_jets(&[50.0]);
        let mut product = Product::new();
        product.valid_jets = jets.iter().collect();
        let event = Event::new(EventId::default());

        // lower: sentinel 0.99 * MAX beats any practical threshold
        let lower = lower_pt_filter(&["0:30", "5:1e300"]);
        assert!(lower.passes(&event, &product));
        assert!(CutRange::Lower(1e300).contains(MISSING_LOWER_SENTINEL));
        assert!(!CutRange::Lower(f64::MAX).contains(MISSING_LOWER_SENTINEL));

        // upper: sentinel -1 is below every allowed (non-negative) threshold
        let mut upper = CutRangeFilter::new();
        upper
            .initialise(&strings(&["0:2.5", "3:0"]), CutDirection::Upper, valid_jet_p4, abs_eta)
            .unwrap();
        assert!(upper.passes(&event, &product));
        assert!(CutRange::Upper(0.0).contains(MISSING_UPPER_SENTINEL));
    }

    #[test]
    fn test_pattern_cut_only_with_matching_trigger() {
        let jets = create_test_jets(&[25.0]);
        let mut product = Product::new();
        product.valid_jets = jets.iter().collect();
        let event = Event::new(EventId::default());
        let filter = lower_pt_filter(&["HLT_Mu.*:30"]);

        assert!(filter.passes(&event, &product));
        product.selected_hlt_name = Some("HLT_Ele27_v1".to_string());
        assert!(filter.passes(&event, &product));
        product.selected_hlt_name = Some("HLT_MU17_v2".to_string());
        assert!(!filter.passes(&event, &product));
    }

    #[test]
    fn test_passes_is_idempotent() {
        let jets = create_test_jets(&[40.0, 15.0, 8.0]);
        let mut product = Product::new();
        product.valid_jets = jets.iter().collect();
        let event = Event::new(EventId::default());
        let filter = lower_pt_filter(&["0:30", "1:20", "default:5"]);

        let first = filter.passes(&event, &product);
        let second = filter.passes(&event, &product);
        assert_eq!(first, second);
        assert!(!first);
    }

    #[test]
    fn test_custom_extractor() {
        let mut filter = CutRangeFilter::new();
        filter.add_cut(|event: &Event, _: &Product<'_>| event.weight, CutRange::Lower(0.5));
        let product = Product::new();
        let mut event = Event::new(EventId::default());

        assert!(filter.passes(&event, &product));
        event.weight = 0.25;
        assert!(!filter.passes(&event, &product));
    }

    #[test]
    fn test_candidate_cuts_by_index() {
        let mut cuts = CandidateCuts::new();
        cuts.add(
            parse_cut_specs(&strings(&["0:30", "1:20", "default:10"]), CutDirection::Lower).unwrap(),
            pt,
        );
        let p4 = LorentzVector::new(25.0, 0.0, 0.0, 0.0);

        assert!(!cuts.passes(&p4, 0, None));
        assert!(cuts.passes(&p4, 1, None));
        assert!(cuts.passes(&p4, 2, None));
        assert!(cuts.passes(&p4, MAX_DEFAULT_INDEX + 5, None));
    }
}
