//! Memoization of resolved setting values.
//!
//! A value is resolved from the property tree on first request and kept
//! for the rest of the process. Settings are read-only after load, so
//! there is no invalidation. Absence is remembered too, but defaults are
//! not: they belong to the caller. Two threads racing on the same key
//! both resolve it to the same value; the second insert is harmless.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};

/// The value shapes a setting can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Bool,
    Int,
    Float,
    Text,
    StringList,
    IntList,
}

/// A resolved setting value.
#[derive(Debug, Clone, PartialEq)]
pub enum SettingValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    StringList(Vec<String>),
    IntList(Vec<i64>),
}

/// Conversion between Rust types, JSON nodes and cached values.
pub trait SettingType: Sized + Clone {
    const KIND: ValueKind;
    const TYPE_NAME: &'static str;

    fn from_json(value: &Value) -> Option<Self>;
    fn from_setting(value: &SettingValue) -> Option<Self>;
    fn into_setting(self) -> SettingValue;
}

impl SettingType for bool {
    const KIND: ValueKind = ValueKind::Bool;
    const TYPE_NAME: &'static str = "bool";

    fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(*b),
            Value::String(s) => s.trim().to_lowercase().parse().ok(),
            _ => None,
        }
    }

    fn from_setting(value: &SettingValue) -> Option<Self> {
        match value {
            SettingValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    fn into_setting(self) -> SettingValue {
        SettingValue::Bool(self)
    }
}

impl SettingType for i64 {
    const KIND: ValueKind = ValueKind::Int;
    const TYPE_NAME: &'static str = "integer";

    fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    fn from_setting(value: &SettingValue) -> Option<Self> {
        match value {
            SettingValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    fn into_setting(self) -> SettingValue {
        SettingValue::Int(self)
    }
}

impl SettingType for f64 {
    const KIND: ValueKind = ValueKind::Float;
    const TYPE_NAME: &'static str = "number";

    fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    fn from_setting(value: &SettingValue) -> Option<Self> {
        match value {
            SettingValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    fn into_setting(self) -> SettingValue {
        SettingValue::Float(self)
    }
}

impl SettingType for String {
    const KIND: ValueKind = ValueKind::Text;
    const TYPE_NAME: &'static str = "string";

    fn from_json(value: &Value) -> Option<Self> {
        scalar_to_string(value)
    }

    fn from_setting(value: &SettingValue) -> Option<Self> {
        match value {
            SettingValue::Text(s) => Some(s.clone()),
            _ => None,
        }
    }

    fn into_setting(self) -> SettingValue {
        SettingValue::Text(self)
    }
}

impl SettingType for Vec<String> {
    const KIND: ValueKind = ValueKind::StringList;
    const TYPE_NAME: &'static str = "string list";

    fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Array(items) => items.iter().map(scalar_to_string).collect(),
            // A single scalar is accepted as a one-element list
            other => scalar_to_string(other).map(|s| vec![s]),
        }
    }

    fn from_setting(value: &SettingValue) -> Option<Self> {
        match value {
            SettingValue::StringList(l) => Some(l.clone()),
            _ => None,
        }
    }

    fn into_setting(self) -> SettingValue {
        SettingValue::StringList(self)
    }
}

impl SettingType for Vec<i64> {
    const KIND: ValueKind = ValueKind::IntList;
    const TYPE_NAME: &'static str = "integer list";

    fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Array(items) => items.iter().map(i64::from_json).collect(),
            other => i64::from_json(other).map(|i| vec![i]),
        }
    }

    fn from_setting(value: &SettingValue) -> Option<Self> {
        match value {
            SettingValue::IntList(l) => Some(l.clone()),
            _ => None,
        }
    }

    fn into_setting(self) -> SettingValue {
        SettingValue::IntList(self)
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Process-lifetime memo of resolved settings, one per `Settings` scope.
#[derive(Debug, Default)]
pub struct SettingsCache {
    entries: RwLock<HashMap<(String, ValueKind), Option<SettingValue>>>,
    resolutions: AtomicUsize,
}

impl SettingsCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return what the tree holds for `key` (`None` when absent), running
    /// `resolve` only on the first request. Errors are not cached.
    pub fn get_or_resolve<T, F, E>(&self, key: &str, resolve: F) -> Result<Option<T>, E>
    where
        T: SettingType,
        F: FnOnce() -> Result<Option<T>, E>,
    {
        let cache_key = (key.to_string(), T::KIND);

        if let Some(cached) = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&cache_key)
        {
            return Ok(cached.as_ref().and_then(T::from_setting));
        }

        let value = resolve()?;
        self.resolutions.fetch_add(1, Ordering::Relaxed);
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(cache_key)
            .or_insert_with(|| value.clone().map(T::into_setting));
        Ok(value)
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// How many times a value was resolved from the tree.
    pub fn resolutions(&self) -> usize {
        self.resolutions.load(Ordering::Relaxed)
    }
}
