//! # Pipeline Runner
//!
//! Coordinates a whole analysis run:
//! 1. Load the settings tree and resolve global metadata
//! 2. Build every selected pipeline from the stage catalogue
//! 3. Initialise each pipeline with its own settings scope
//! 4. Run all pipelines in parallel over the shared events
//! 5. Collect one summary per pipeline
//!
//! Pipelines share the events and global metadata read-only. Everything
//! mutable (product, settings cache, consumers) belongs to one pipeline,
//! so no locking is needed. The first error aborts the run.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

use event_data::Event;
use pipeline::{GlobalMetadata, Pipeline, PipelineSummary};
use settings::{PropertyTree, Settings};

use crate::catalogue::StageCatalogue;

/// Outcome of a complete run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub events: usize,
    pub elapsed: Duration,
    /// One summary per pipeline, in the order the pipelines were selected
    pub summaries: Vec<PipelineSummary>,
}

impl RunReport {
    pub fn summary(&self, pipeline: &str) -> Option<&PipelineSummary> {
        self.summaries.iter().find(|s| s.pipeline == pipeline)
    }
}

pub struct PipelineRunner {
    tree: Arc<PropertyTree>,
    global: Arc<GlobalMetadata>,
    catalogue: StageCatalogue,
}

impl PipelineRunner {
    /// Create a runner over an already loaded settings tree
    pub fn new(tree: Arc<PropertyTree>, catalogue: StageCatalogue) -> Result<Self> {
        let global = GlobalMetadata::from_settings(&Settings::global(tree.clone()))
            .context("Failed to resolve global settings")?;
        debug!(
            "Global metadata: collections {:?}, year {:?}, data {}",
            global.collections, global.year, global.input_is_data
        );
        Ok(Self {
            tree,
            global: Arc::new(global),
            catalogue,
        })
    }

    /// Load a JSON configuration file and use the built-in stages
    pub fn from_config_file(path: &Path) -> Result<Self> {
        let tree = PropertyTree::from_file(path)
            .with_context(|| format!("Failed to load configuration {}", path.display()))?;
        Self::new(Arc::new(tree), StageCatalogue::with_builtins())
    }

    pub fn global(&self) -> &GlobalMetadata {
        &self.global
    }

    pub fn catalogue(&self) -> &StageCatalogue {
        &self.catalogue
    }

    /// Settings scoped to one pipeline
    pub fn pipeline_settings(&self, name: &str) -> Settings {
        Settings::pipeline(self.tree.clone(), name)
    }

    /// Resolve the requested pipeline names; all configured pipelines
    /// when none are requested.
    pub fn select_pipelines(&self, requested: &[String]) -> Result<Vec<String>> {
        let configured = &self.global.pipeline_names;
        if configured.is_empty() {
            bail!("No pipelines configured");
        }
        if requested.is_empty() {
            return Ok(configured.clone());
        }
        for name in requested {
            if !configured.contains(name) {
                bail!(
                    "Unknown pipeline \"{}\" (configured: {})",
                    name,
                    configured.join(", ")
                );
            }
        }
        Ok(requested.to_vec())
    }

    /// Build and initialise the named pipelines
    pub fn build_pipelines(&self, names: &[String]) -> Result<Vec<Pipeline>> {
        names
            .iter()
            .map(|name| -> Result<Pipeline> {
                let settings = self.pipeline_settings(name);
                let mut pipeline = self.catalogue.build_pipeline(&settings)?;
                pipeline
                    .init(settings, self.global.clone())
                    .with_context(|| format!("Failed to initialise pipeline \"{}\"", name))?;
                Ok(pipeline)
            })
            .collect()
    }

    /// Run the requested pipelines over `events`
    pub fn run(&self, events: &[Event], requested: &[String]) -> Result<RunReport> {
        let start_time = Instant::now();

        let names = self.select_pipelines(requested)?;
        let pipelines = self.build_pipelines(&names)?;
        info!(
            "Running {} pipelines over {} events",
            pipelines.len(),
            events.len()
        );

        let summaries = pipelines
            .into_par_iter()
            .map(|pipeline| run_pipeline(pipeline, events))
            .collect::<Result<Vec<_>>>()?;

        let elapsed = start_time.elapsed();
        info!("Processed {} events in {:.2?}", events.len(), elapsed);

        Ok(RunReport {
            events: events.len(),
            elapsed,
            summaries,
        })
    }
}

fn run_pipeline(mut pipeline: Pipeline, events: &[Event]) -> Result<PipelineSummary> {
    let start_time = Instant::now();
    for event in events {
        pipeline
            .process(event)
            .with_context(|| format!("Pipeline \"{}\" failed on event {}", pipeline.name(), event.id))?;
    }
    let summary = pipeline
        .finalize()
        .with_context(|| format!("Failed to finalize pipeline \"{}\"", pipeline.name()))?;
    info!(
        "Pipeline {}: {} of {} events accepted in {:.2?}",
        summary.pipeline,
        summary.accepted,
        summary.processed,
        start_time.elapsed()
    );
    Ok(summary)
}
