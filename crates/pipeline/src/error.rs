//! Error types for pipeline construction and execution.
//!
//! Configuration and data errors are fatal: the executor never catches
//! them, so a run aborts on the first one. A candidate or event failing
//! a cut is not an error and never shows up here.

use crate::executor::PipelineState;
use event_data::DataError;
use settings::SettingsError;
use thiserror::Error;

/// Problems with a single declarative cut string.
#[derive(Error, Debug)]
pub enum CutSpecError {
    #[error("negative object index \"{0}\"")]
    NegativeIndex(String),

    #[error("invalid selector pattern \"{pattern}\": {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid threshold \"{value}\" for selector \"{selector}\"")]
    InvalidThreshold { selector: String, value: String },

    #[error("negative upper threshold {threshold} for selector \"{selector}\" can never pass")]
    NegativeUpperThreshold { selector: String, threshold: f64 },
}

#[derive(Error, Debug)]
pub enum PipelineError {
    /// Malformed or unsupported configuration, detected at init time
    #[error("Configuration error in {stage}: {reason}")]
    Configuration { stage: String, reason: String },

    /// A cut string could not be parsed
    #[error("Invalid cut in {stage}: {source}")]
    InvalidCut {
        stage: String,
        #[source]
        source: CutSpecError,
    },

    /// A setting was missing or mistyped
    #[error("Settings error in {stage}: {source}")]
    Settings {
        stage: String,
        #[source]
        source: SettingsError,
    },

    /// The event does not carry what the pipeline is bound to
    #[error("Data error in {stage}: {source}")]
    Data {
        stage: String,
        #[source]
        source: DataError,
    },

    /// Lifecycle call not allowed in the current state
    #[error("Cannot {operation} pipeline \"{pipeline}\" while {state}")]
    InvalidState {
        pipeline: String,
        operation: &'static str,
        state: PipelineState,
    },

    /// A stage was used before `init` configured it
    #[error("{stage} used before initialisation")]
    NotInitialized { stage: String },

    /// Quantities can only be registered during the init phase
    #[error("Cannot register quantity \"{name}\": registry is frozen")]
    RegistryFrozen { name: String },
}

impl PipelineError {
    pub fn configuration(stage: &str, reason: impl Into<String>) -> Self {
        PipelineError::Configuration {
            stage: stage.to_string(),
            reason: reason.into(),
        }
    }
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Attach the name of the failing stage to lower-level errors.
pub trait StageContext<T> {
    fn in_stage(self, stage: &str) -> Result<T>;
}

impl<T> StageContext<T> for std::result::Result<T, SettingsError> {
    fn in_stage(self, stage: &str) -> Result<T> {
        self.map_err(|source| PipelineError::Settings {
            stage: stage.to_string(),
            source,
        })
    }
}

impl<T> StageContext<T> for std::result::Result<T, DataError> {
    fn in_stage(self, stage: &str) -> Result<T> {
        self.map_err(|source| PipelineError::Data {
            stage: stage.to_string(),
            source,
        })
    }
}

impl<T> StageContext<T> for std::result::Result<T, CutSpecError> {
    fn in_stage(self, stage: &str) -> Result<T> {
        self.map_err(|source| PipelineError::InvalidCut {
            stage: stage.to_string(),
            source,
        })
    }
}
