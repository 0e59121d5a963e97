//! Error types for settings resolution.

use thiserror::Error;

/// Errors that can occur while loading or resolving settings.
///
/// All of them are configuration errors: a stage cannot run with a
/// missing or mistyped setting, so callers abort at init time.
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("I/O error reading configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON configuration: {0}")]
    Json(#[from] serde_json::Error),

    /// A required key is absent from the property tree
    #[error("Missing required setting \"{key}\" in scope {scope}")]
    MissingSetting { scope: String, key: String },

    /// A key exists but holds a value of the wrong shape
    #[error("Setting \"{key}\" in scope {scope} is not a valid {expected}")]
    WrongType {
        scope: String,
        key: String,
        expected: &'static str,
    },
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, SettingsError>;
