// File: registry/src/health/monitor.rs
use super::types::{HealthRecord, HealthSnapshot, ProbeResult, ServiceStatus, Thresholds};
use crate::constants;
use chrono::Utc;
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::{interval_at, timeout, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Outcome of one probe invocation. `Ok(None)` means there was nothing to
/// probe this cycle (e.g. the service has not been built yet) and leaves
/// the record untouched.
pub type ProbeFuture = BoxFuture<'static, anyhow::Result<Option<ProbeResult>>>;

pub type HealthProbe = Arc<dyn Fn() -> ProbeFuture + Send + Sync>;

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub interval: Duration,
    pub probe_timeout: Duration,
    pub history_limit: usize,
    pub thresholds: Thresholds,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval: constants::health::CHECK_INTERVAL,
            probe_timeout: constants::health::PROBE_TIMEOUT,
            history_limit: constants::health::STATUS_HISTORY_LIMIT,
            thresholds: Thresholds::default(),
        }
    }
}

struct MonitoredService {
    probe: HealthProbe,
    record: HealthRecord,
    cancel: CancellationToken,
}

struct MonitorState {
    services: HashMap<String, MonitoredService>,
    // Parent of every per-service token; replaced on clear()
    root: CancellationToken,
}

/// Tracks rolling health per service name. Each registered check gets its
/// own fixed-interval probe task, stopped through a cancellation token.
/// Probe tasks only hold a weak handle, so they also end on their next tick
/// once every clone of the monitor has been dropped.
#[derive(Clone)]
pub struct HealthMonitor {
    config: MonitorConfig,
    state: Arc<RwLock<MonitorState>>,
}

impl HealthMonitor {
    pub fn new(mut config: MonitorConfig) -> Self {
        if config.interval < constants::health::MIN_CHECK_INTERVAL {
            warn!(
                "Health check interval {:?} is below the minimum, using {:?}",
                config.interval,
                constants::health::MIN_CHECK_INTERVAL
            );
            config.interval = constants::health::MIN_CHECK_INTERVAL;
        }

        Self {
            config,
            state: Arc::new(RwLock::new(MonitorState {
                services: HashMap::with_capacity(16),
                root: CancellationToken::new(),
            })),
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Register (or replace) the probe for `service_name` and start probing
    /// it every `interval`. The first probe fires one interval after
    /// registration. Must be called from within a tokio runtime.
    pub async fn register_health_check(&self, service_name: &str, probe: HealthProbe) {
        let mut state = self.state.write().await;
        let cancel = state.root.child_token();
        let schedule = !state.root.is_cancelled();

        let previous = state.services.insert(
            service_name.to_string(),
            MonitoredService {
                probe,
                record: HealthRecord::new(self.config.history_limit),
                cancel: cancel.clone(),
            },
        );
        drop(state);

        if let Some(previous) = previous {
            debug!("Replacing health check for {}", service_name);
            previous.cancel.cancel();
        }

        if schedule {
            self.start_monitoring(service_name.to_string(), cancel);
        } else {
            warn!(
                "Health monitor is shut down; {} registered without periodic probing",
                service_name
            );
        }
    }

    fn start_monitoring(&self, service_name: String, cancel: CancellationToken) {
        let config = self.config.clone();
        let state: Weak<RwLock<MonitorState>> = Arc::downgrade(&self.state);
        let period = self.config.interval;

        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        debug!("Stopped health monitoring for {}", service_name);
                        break;
                    }
                    _ = ticker.tick() => {
                        let Some(state) = state.upgrade() else {
                            debug!("Health monitor dropped, stopping probes for {}", service_name);
                            break;
                        };
                        let monitor = HealthMonitor { config: config.clone(), state };
                        monitor.perform_health_check(&service_name).await;
                    }
                }
            }
        });
    }

    /// Run one probe cycle for `service_name` and fold the result into its
    /// record. Returns the status after the cycle, or `None` when no check is
    /// registered under that name.
    pub async fn perform_health_check(&self, service_name: &str) -> Option<ServiceStatus> {
        let probe = {
            let state = self.state.read().await;
            state.services.get(service_name)?.probe.clone()
        };

        let result = match timeout(self.config.probe_timeout, probe()).await {
            Ok(Ok(Some(result))) => result,
            Ok(Ok(None)) => {
                debug!("Health check for {} skipped: nothing to probe yet", service_name);
                return self.status_of_registered(service_name).await;
            }
            Ok(Err(e)) => {
                error!("Health check failed for {}: {}", service_name, e);
                ProbeResult::unhealthy(e.to_string())
            }
            Err(_) => {
                warn!(
                    "Health check for {} timed out after {:?}",
                    service_name, self.config.probe_timeout
                );
                ProbeResult::unhealthy(format!(
                    "probe timed out after {}ms",
                    self.config.probe_timeout.as_millis()
                ))
            }
        };

        let mut state = self.state.write().await;
        let service = state.services.get_mut(service_name)?;

        // The check was replaced while the probe was running
        if !Arc::ptr_eq(&service.probe, &probe) {
            return Some(service.record.status);
        }

        let previous = service.record.status;
        service
            .record
            .apply(result, self.config.thresholds, Utc::now());
        let current = service.record.status;

        if previous != current {
            match current {
                ServiceStatus::Failed => warn!(
                    "Service {} transitioned {} -> {} after {} consecutive failures",
                    service_name, previous, current, service.record.consecutive_failures
                ),
                _ => info!(
                    "Service {} transitioned {} -> {}",
                    service_name, previous, current
                ),
            }
        }

        Some(current)
    }

    async fn status_of_registered(&self, service_name: &str) -> Option<ServiceStatus> {
        let state = self.state.read().await;
        state
            .services
            .get(service_name)
            .map(|service| service.record.status)
    }

    /// Full snapshot; UNKNOWN with empty history for unmonitored names
    pub async fn get_service_status(&self, service_name: &str) -> HealthSnapshot {
        let state = self.state.read().await;
        state
            .services
            .get(service_name)
            .map(|service| service.record.snapshot())
            .unwrap_or_else(HealthSnapshot::unknown)
    }

    pub async fn status_of(&self, service_name: &str) -> ServiceStatus {
        self.status_of_registered(service_name)
            .await
            .unwrap_or(ServiceStatus::Unknown)
    }

    pub async fn is_service_healthy(&self, service_name: &str) -> bool {
        self.status_of(service_name).await == ServiceStatus::Healthy
    }

    pub async fn is_monitored(&self, service_name: &str) -> bool {
        self.state.read().await.services.contains_key(service_name)
    }

    /// Reset a record to UNKNOWN with zeroed counters. Probing continues.
    pub async fn reset(&self, service_name: &str) -> bool {
        let mut state = self.state.write().await;
        match state.services.get_mut(service_name) {
            Some(service) => {
                service.record.reset();
                true
            }
            None => false,
        }
    }

    pub async fn monitored_services(&self) -> Vec<String> {
        let state = self.state.read().await;
        let mut names: Vec<String> = state.services.keys().cloned().collect();
        names.sort();
        names
    }

    /// Stop every probe task and forget all records. Checks registered
    /// afterwards are scheduled again.
    pub async fn clear(&self) {
        let mut state = self.state.write().await;
        state.root.cancel();
        state.root = CancellationToken::new();
        let cleared = state.services.len();
        state.services.clear();
        debug!("Health monitor cleared ({} checks cancelled)", cleared);
    }

    /// Stop every probe task. Records stay readable.
    pub async fn shutdown(&self) {
        let state = self.state.read().await;
        state.root.cancel();
        info!(
            "Health monitor shut down, {} probe tasks cancelled",
            state.services.len()
        );
    }
}

impl Default for HealthMonitor {
    fn default() -> Self {
        Self::new(MonitorConfig::default())
    }
}

/// Wrap a plain async closure as a probe that always has something to check
pub fn probe_fn<F, Fut>(f: F) -> HealthProbe
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = anyhow::Result<ProbeResult>> + Send + 'static,
{
    Arc::new(move || {
        let fut = f();
        Box::pin(async move { fut.await.map(Some) }) as ProbeFuture
    })
}
