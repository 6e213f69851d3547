//! Fallback table: service name to degraded-substitute factory

use crate::descriptor::{FallbackFactory, ServiceInstance};
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use tracing::warn;

#[derive(Default, Clone)]
pub struct FallbackTable {
    entries: HashMap<String, FallbackFactory>,
}

impl FallbackTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, service_name: &str, factory: FallbackFactory) {
        if self.entries.insert(service_name.to_string(), factory).is_some() {
            warn!("Fallback for {} replaced", service_name);
        }
    }

    pub fn get(&self, service_name: &str) -> Option<FallbackFactory> {
        self.entries.get(service_name).cloned()
    }

    pub fn contains(&self, service_name: &str) -> bool {
        self.entries.contains_key(service_name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Run a fallback factory, turning a panic into an error
pub fn invoke(factory: &FallbackFactory) -> anyhow::Result<ServiceInstance> {
    match std::panic::catch_unwind(AssertUnwindSafe(|| factory())) {
        Ok(result) => result,
        Err(_) => Err(anyhow::anyhow!("fallback factory panicked")),
    }
}
