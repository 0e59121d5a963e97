//! Named scalar quantities computed from an (event, product) pair.
//!
//! Stages register quantities while the pipeline initialises. The
//! registry is frozen before the first event, so lookups during the
//! event loop never race with registration.

use crate::error::{PipelineError, Result};
use crate::product::Product;
use event_data::Event;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

pub type QuantityFn = Arc<dyn Fn(&Event, &Product<'_>) -> f64 + Send + Sync>;

#[derive(Default)]
pub struct QuantityRegistry {
    entries: BTreeMap<String, QuantityFn>,
    frozen: bool,
}

impl QuantityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-filled with `run`, `lumi`, `event` and `weight`.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.insert("run", |event: &Event, _: &Product<'_>| event.id.run as f64);
        registry.insert("lumi", |event: &Event, _: &Product<'_>| event.id.lumi as f64);
        registry.insert("event", |event: &Event, _: &Product<'_>| event.id.event as f64);
        registry.insert("weight", |event: &Event, _: &Product<'_>| event.weight);
        registry
    }

    /// Register or replace a quantity. Fails once the registry is frozen.
    pub fn register<F>(&mut self, name: &str, quantity: F) -> Result<()>
    where
        F: Fn(&Event, &Product<'_>) -> f64 + Send + Sync + 'static,
    {
        if self.frozen {
            return Err(PipelineError::RegistryFrozen {
                name: name.to_string(),
            });
        }
        if self.entries.contains_key(name) {
            debug!("Replacing quantity \"{}\"", name);
        }
        self.insert(name, quantity);
        Ok(())
    }

    fn insert<F>(&mut self, name: &str, quantity: F)
    where
        F: Fn(&Event, &Product<'_>) -> f64 + Send + Sync + 'static,
    {
        self.entries.insert(name.to_string(), Arc::new(quantity));
    }

    pub fn get(&self, name: &str) -> Option<QuantityFn> {
        self.entries.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }
}

impl fmt::Debug for QuantityRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuantityRegistry")
            .field("names", &self.names())
            .field("frozen", &self.frozen)
            .finish()
    }
}
