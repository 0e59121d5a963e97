//! Fixed-binning weighted 1D histograms of quantities.

use crate::consumers::{ConsumerOutput, ConsumerReport};
use crate::error::{PipelineError, Result, StageContext};
use crate::metadata::PipelineContext;
use crate::product::Product;
use crate::quantities::{QuantityFn, QuantityRegistry};
use crate::traits::Consumer;
use event_data::Event;
use serde::Serialize;
use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Histogram1d {
    pub quantity: String,
    pub low: f64,
    pub high: f64,
    pub bins: Vec<f64>,
    pub underflow: f64,
    pub overflow: f64,
    pub entries: u64,
}

impl Histogram1d {
    /// At least one bin and `low < high`.
    pub fn new(quantity: impl Into<String>, bins: usize, low: f64, high: f64) -> std::result::Result<Self, String> {
        let quantity = quantity.into();
        if bins == 0 || low.partial_cmp(&high) != Some(Ordering::Less) {
            return Err(format!(
                "empty binning for \"{}\": {} bins in [{}, {})",
                quantity, bins, low, high
            ));
        }
        Ok(Self {
            quantity,
            low,
            high,
            bins: vec![0.0; bins],
            underflow: 0.0,
            overflow: 0.0,
            entries: 0,
        })
    }

    /// Bins are half-open `[low, high)`.
    pub fn fill(&mut self, value: f64, weight: f64) {
        self.entries += 1;
        if value < self.low {
            self.underflow += weight;
        } else if value >= self.high || value.is_nan() {
            self.overflow += weight;
        } else {
            let width = (self.high - self.low) / self.bins.len() as f64;
            let index = (((value - self.low) / width) as usize).min(self.bins.len().saturating_sub(1));
            match self.bins.get_mut(index) {
                Some(bin) => *bin += weight,
                None => self.overflow += weight,
            }
        }
    }

    pub fn integral(&self) -> f64 {
        self.bins.iter().sum()
    }
}

/// Parse a `"quantity:bins:low:high"` definition.
fn parse_definition(definition: &str) -> std::result::Result<Histogram1d, String> {
    let parts: Vec<&str> = definition.split(':').map(str::trim).collect();
    let [quantity, bins, low, high] = parts[..] else {
        return Err(format!("expected \"quantity:bins:low:high\", got \"{}\"", definition));
    };
    let bins: usize = bins
        .parse()
        .map_err(|_| format!("invalid bin count \"{}\" in \"{}\"", bins, definition))?;
    let low: f64 = low
        .parse()
        .map_err(|_| format!("invalid lower edge \"{}\" in \"{}\"", low, definition))?;
    let high: f64 = high
        .parse()
        .map_err(|_| format!("invalid upper edge \"{}\" in \"{}\"", high, definition))?;
    Histogram1d::new(quantity, bins, low, high)
}

/// Fills one histogram per `Histograms` entry with the event weight.
#[derive(Default)]
pub struct HistogramConsumer {
    histograms: Vec<(Histogram1d, QuantityFn)>,
}

impl HistogramConsumer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Consumer for HistogramConsumer {
    fn name(&self) -> &str {
        "HistogramConsumer"
    }

    fn init(&mut self, ctx: &PipelineContext, quantities: &mut QuantityRegistry) -> Result<()> {
        let definitions = ctx.settings.get_string_list("Histograms").in_stage(self.name())?;
        for definition in definitions {
            let histogram = parse_definition(&definition)
                .map_err(|reason| PipelineError::configuration("HistogramConsumer", reason))?;
            let quantity = quantities.get(&histogram.quantity).ok_or_else(|| {
                PipelineError::configuration(
                    "HistogramConsumer",
                    format!("unknown quantity \"{}\"", histogram.quantity),
                )
            })?;
            self.histograms.push((histogram, quantity));
        }
        Ok(())
    }

    fn process_event(&mut self, event: &Event, product: &Product<'_>, _ctx: &PipelineContext) -> Result<()> {
        for (histogram, quantity) in &mut self.histograms {
            histogram.fill(quantity(event, product), event.weight);
        }
        Ok(())
    }

    fn finish(&mut self, _ctx: &PipelineContext) -> Result<ConsumerReport> {
        Ok(ConsumerReport {
            consumer: self.name().to_string(),
            output: ConsumerOutput::Histograms {
                histograms: self.histograms.iter().map(|(h, _)| h.clone()).collect(),
            },
        })
    }
}
