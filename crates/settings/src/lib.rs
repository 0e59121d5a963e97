//! # Settings Crate
//!
//! Lazily cached, hierarchical configuration for analysis pipelines.
//!
//! ## Components
//!
//! - **tree**: `PropertyTree`, the JSON document loaded once per run
//! - **cache**: `SettingsCache`, memoizing every resolved value
//! - **settings**: `Settings`, typed getters scoped to the root or to one
//!   pipeline (`Pipelines.<name>.<Key>`)
//!
//! ## Example Usage
//!
//! ```ignore
//! use settings::{PropertyTree, Settings};
//! use std::sync::Arc;
//!
//! let tree = Arc::new(PropertyTree::from_file(Path::new("config.json"))?);
//! let nominal = Settings::pipeline(tree.clone(), "nominal");
//!
//! let jet_id = nominal.get_string("JetID")?;              // required
//! let delta_r = nominal.get_f64_or("JetLeptonLowerDeltaRCut", 0.5)?;
//! let cuts = nominal.get_string_list("JetLowerPtCuts")?;  // empty if absent
//! ```

pub mod cache;
pub mod error;
pub mod settings;
pub mod tree;

pub use cache::{SettingType, SettingValue, SettingsCache, ValueKind};
pub use error::{Result, SettingsError};
pub use settings::{Scope, Settings};
pub use tree::{PIPELINES_KEY, PropertyTree};
