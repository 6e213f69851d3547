//! Small service types registered by the integration tests

use anyhow::{anyhow, Result};
use service_registry::{service, ProbeResult, ServiceInstance};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub name: String,
}

impl AppConfig {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

#[derive(Debug)]
pub struct Foo {
    pub config: Arc<AppConfig>,
}

/// Dependency-free service whose health can be flipped from the test
#[derive(Debug, Default)]
pub struct Flaky {
    pub broken: AtomicBool,
}

impl Flaky {
    pub fn set_broken(&self, broken: bool) {
        self.broken.store(broken, Ordering::SeqCst);
    }

    pub fn probe(&self) -> ProbeResult {
        if self.broken.load(Ordering::SeqCst) {
            ProbeResult::unhealthy("flaky service reports failure")
        } else {
            ProbeResult::healthy()
        }
    }
}

/// Health check usable with `ServiceConfig::with_health_check` for `Flaky`
pub async fn flaky_health_check(instance: ServiceInstance) -> Result<ProbeResult> {
    let flaky = instance
        .downcast::<Flaky>()
        .map_err(|_| anyhow!("instance is not Flaky"))?;
    Ok(flaky.probe())
}

/// Marker produced by fallbacks
#[derive(Debug, PartialEq)]
pub struct Degraded(pub &'static str);

pub fn degraded(tag: &'static str) -> Result<ServiceInstance> {
    Ok(service(Degraded(tag)))
}

/// Counts how many times a factory ran
#[derive(Debug, Default, Clone)]
pub struct BuildCounter(Arc<AtomicU32>);

impl BuildCounter {
    pub fn bump(&self) -> u32 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn count(&self) -> u32 {
        self.0.load(Ordering::SeqCst)
    }
}
