//! Consumer implementations and their reports.

pub mod cutflow;
pub mod histogram;
pub mod ntuple;

pub use cutflow::CutFlowConsumer;
pub use histogram::{Histogram1d, HistogramConsumer};
pub use ntuple::NtupleConsumer;

use serde::Serialize;

/// What a consumer hands back when the pipeline is finalized.
#[derive(Debug, Clone, Serialize)]
pub struct ConsumerReport {
    pub consumer: String,
    pub output: ConsumerOutput,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConsumerOutput {
    Count { events: u64, weighted: f64 },
    Table { columns: Vec<String>, rows: Vec<Vec<f64>> },
    Histograms { histograms: Vec<Histogram1d> },
}
