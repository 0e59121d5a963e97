//! Scoped, typed and memoized access to the property tree.

use crate::cache::{SettingType, SettingsCache};
use crate::error::{Result, SettingsError};
use crate::tree::{PIPELINES_KEY, PropertyTree};
use std::fmt;
use std::sync::Arc;

/// Which part of the tree a `Settings` instance resolves keys against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// Keys at the root of the tree
    Global,
    /// Keys under `Pipelines.<name>`
    Pipeline(String),
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Global => f.write_str("global"),
            Scope::Pipeline(name) => write!(f, "pipeline \"{}\"", name),
        }
    }
}

/// Settings for one scope, with its own cache.
///
/// Each pipeline owns one instance, so cached lookups never contend
/// across pipelines running in parallel.
#[derive(Debug)]
pub struct Settings {
    tree: Arc<PropertyTree>,
    scope: Scope,
    cache: SettingsCache,
}

impl Settings {
    /// Settings resolving root-level keys.
    pub fn global(tree: Arc<PropertyTree>) -> Self {
        Self {
            tree,
            scope: Scope::Global,
            cache: SettingsCache::new(),
        }
    }

    /// Settings resolving keys under `Pipelines.<name>`.
    pub fn pipeline(tree: Arc<PropertyTree>, name: impl Into<String>) -> Self {
        Self {
            tree,
            scope: Scope::Pipeline(name.into()),
            cache: SettingsCache::new(),
        }
    }

    /// Pipeline name, or "global" for the root scope.
    pub fn name(&self) -> &str {
        match &self.scope {
            Scope::Global => "global",
            Scope::Pipeline(name) => name,
        }
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn tree(&self) -> &Arc<PropertyTree> {
        &self.tree
    }

    pub fn cache(&self) -> &SettingsCache {
        &self.cache
    }

    /// Full tree path for a key in this scope.
    pub fn path(&self, key: &str) -> String {
        match &self.scope {
            Scope::Global => key.to_string(),
            Scope::Pipeline(name) => format!("{}.{}.{}", PIPELINES_KEY, name, key),
        }
    }

    /// Whether the key is present in this scope.
    pub fn contains(&self, key: &str) -> bool {
        self.tree.get(&self.path(key)).is_some()
    }

    /// Resolve a required setting. Absence is an error.
    pub fn get<T: SettingType>(&self, key: &str) -> Result<T> {
        self.cache
            .get_or_resolve(key, || self.lookup::<T>(key))?
            .ok_or_else(|| SettingsError::MissingSetting {
                scope: self.scope.to_string(),
                key: key.to_string(),
            })
    }

    /// Resolve an optional setting, falling back to `default`.
    /// Only the tree value is cached, never the default.
    pub fn get_or<T: SettingType>(&self, key: &str, default: T) -> Result<T> {
        Ok(self
            .cache
            .get_or_resolve(key, || self.lookup::<T>(key))?
            .unwrap_or(default))
    }

    fn lookup<T: SettingType>(&self, key: &str) -> Result<Option<T>> {
        match self.tree.get(&self.path(key)) {
            None => Ok(None),
            Some(value) => T::from_json(value)
                .map(Some)
                .ok_or_else(|| SettingsError::WrongType {
                    scope: self.scope.to_string(),
                    key: key.to_string(),
                    expected: T::TYPE_NAME,
                }),
        }
    }

    pub fn get_bool(&self, key: &str) -> Result<bool> {
        self.get(key)
    }

    pub fn get_bool_or(&self, key: &str, default: bool) -> Result<bool> {
        self.get_or(key, default)
    }

    pub fn get_i64(&self, key: &str) -> Result<i64> {
        self.get(key)
    }

    pub fn get_i64_or(&self, key: &str, default: i64) -> Result<i64> {
        self.get_or(key, default)
    }

    pub fn get_f64(&self, key: &str) -> Result<f64> {
        self.get(key)
    }

    pub fn get_f64_or(&self, key: &str, default: f64) -> Result<f64> {
        self.get_or(key, default)
    }

    pub fn get_string(&self, key: &str) -> Result<String> {
        self.get(key)
    }

    pub fn get_string_or(&self, key: &str, default: &str) -> Result<String> {
        self.get_or(key, default.to_string())
    }

    /// String list; empty when the key is absent.
    pub fn get_string_list(&self, key: &str) -> Result<Vec<String>> {
        self.get_or(key, Vec::new())
    }

    /// Integer list; empty when the key is absent.
    pub fn get_int_list(&self, key: &str) -> Result<Vec<i64>> {
        self.get_or(key, Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn create_test_tree() -> Arc<PropertyTree> {
        Arc::new(PropertyTree::from_value(json!({
            "Year": 2012,
            "Jets": "ak5PFJets",
            "Pipelines": {
                "nominal": {
                    "JetID": "tight",
                    "JetLowerPtCuts": ["0:30", "1:20"],
                    "RunWhitelist": [190456, "190459"],
                    "JetLeptonLowerDeltaRCut": "not a number"
                }
            }
        })))
    }

    #[test]
    fn test_scoped_paths() {
        let tree = create_test_tree();
        let global = Settings::global(tree.clone());
        let nominal = Settings::pipeline(tree, "nominal");

        assert_eq!(global.path("Year"), "Year");
        assert_eq!(nominal.path("JetID"), "Pipelines.nominal.JetID");
        assert_eq!(global.name(), "global");
        assert_eq!(nominal.name(), "nominal");
    }

    #[test]
    fn test_typed_getters() {
        let tree = create_test_tree();
        let global = Settings::global(tree.clone());
        let nominal = Settings::pipeline(tree, "nominal");

        assert_eq!(global.get_i64("Year").unwrap(), 2012);
        assert_eq!(global.get_string("Jets").unwrap(), "ak5PFJets");
        assert_eq!(nominal.get_string("JetID").unwrap(), "tight");
        assert_eq!(
            nominal.get_string_list("JetLowerPtCuts").unwrap(),
            vec!["0:30", "1:20"]
        );
        assert_eq!(
            nominal.get_int_list("RunWhitelist").unwrap(),
            vec![190456, 190459]
        );
    }

    #[test]
    fn test_missing_required_setting_fails() {
        let nominal = Settings::pipeline(create_test_tree(), "nominal");
        let err = nominal.get_string("MuonID").unwrap_err();
        assert!(matches!(err, SettingsError::MissingSetting { .. }));
        assert!(err.to_string().contains("nominal"));
    }

    #[test]
    fn test_optional_settings_use_default() {
        let nominal = Settings::pipeline(create_test_tree(), "nominal");

        assert!(nominal.get_bool_or("AllowPrescaledTrigger", true).unwrap());
        assert!(nominal.get_string_list("MuonLowerPtCuts").unwrap().is_empty());
        assert_eq!(nominal.get_i64_or("PassRunLow", 1).unwrap(), 1);
    }

    #[test]
    fn test_wrong_type_is_error_even_with_default() {
        let nominal = Settings::pipeline(create_test_tree(), "nominal");
        let err = nominal.get_f64_or("JetLeptonLowerDeltaRCut", 0.5).unwrap_err();
        assert!(matches!(err, SettingsError::WrongType { expected: "number", .. }));
    }

    #[test]
    fn test_values_are_memoized() {
        let nominal = Settings::pipeline(create_test_tree(), "nominal");

        for _ in 0..5 {
            assert_eq!(nominal.get_string("JetID").unwrap(), "tight");
            assert_eq!(nominal.get_f64_or("TauLeptonLowerDeltaRCut", 0.5).unwrap(), 0.5);
        }
        assert_eq!(nominal.cache().resolutions(), 2);
    }

    #[test]
    fn test_default_does_not_satisfy_required_lookup() {
        let nominal = Settings::pipeline(create_test_tree(), "nominal");

        assert_eq!(nominal.get_string_or("MuonID", "none").unwrap(), "none");
        let err = nominal.get_string("MuonID").unwrap_err();
        assert!(matches!(err, SettingsError::MissingSetting { .. }));
    }

    #[test]
    fn test_each_caller_gets_its_own_default() {
        let nominal = Settings::pipeline(create_test_tree(), "nominal");

        assert_eq!(nominal.get_f64_or("TauLeptonLowerDeltaRCut", 0.5).unwrap(), 0.5);
        assert_eq!(nominal.get_f64_or("TauLeptonLowerDeltaRCut", 0.3).unwrap(), 0.3);
        assert_eq!(nominal.cache().resolutions(), 1);
    }
}
