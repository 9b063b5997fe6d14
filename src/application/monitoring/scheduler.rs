//! Poll scheduler
//!
//! Fires on a fixed interval, snapshots the registry, probes every endpoint
//! concurrently and routes each result to the [`TransitionEngine`] as soon
//! as it arrives.
//!
//! Ticks may overlap by default: probes are independent and the engine
//! suppresses duplicate alerts, so a slow tick does not hold up the next
//! one. With `allow_overlap = false` a tick that comes due while another
//! is still running is skipped.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use metrics::counter;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use super::transition::TransitionEngine;
use crate::domain::{DomainError, HealthProber, Notification, ProbeOutcome, RepositoryProvider};
use crate::notifications::{Event, SharedEventBus, TickCompletedEvent};
use crate::shared::shutdown::ShutdownSignal;

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub interval: Duration,
    pub probe_timeout: Duration,
    pub allow_overlap: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(300),
            probe_timeout: Duration::from_secs(5),
            allow_overlap: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Polling,
}

/// Counters for one tick
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub probed: usize,
    pub reachable: usize,
    pub unreachable: usize,
    pub transitions: usize,
    pub notifications: usize,
    /// Registry errors and crashed probe tasks
    pub failures: usize,
}

#[derive(Clone)]
pub struct PollScheduler {
    repos: Arc<dyn RepositoryProvider>,
    prober: Arc<dyn HealthProber>,
    engine: Arc<TransitionEngine>,
    event_bus: SharedEventBus,
    config: SchedulerConfig,
    in_flight: Arc<AtomicUsize>,
    ticks: Arc<AtomicU64>,
}

/// Marks a tick as running until dropped
pub struct TickGuard {
    in_flight: Arc<AtomicUsize>,
}

impl Drop for TickGuard {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

impl PollScheduler {
    pub fn new(
        repos: Arc<dyn RepositoryProvider>,
        prober: Arc<dyn HealthProber>,
        engine: Arc<TransitionEngine>,
        event_bus: SharedEventBus,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            repos,
            prober,
            engine,
            event_bus,
            config,
            in_flight: Arc::new(AtomicUsize::new(0)),
            ticks: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn state(&self) -> SchedulerState {
        if self.in_flight.load(Ordering::SeqCst) > 0 {
            SchedulerState::Polling
        } else {
            SchedulerState::Idle
        }
    }

    /// Ticks currently running
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn ticks_started(&self) -> u64 {
        self.ticks.load(Ordering::SeqCst)
    }

    /// Claim a tick slot. `None` means a tick is running and overlap is
    /// disabled.
    pub fn try_begin_tick(&self) -> Option<TickGuard> {
        if self.config.allow_overlap {
            self.in_flight.fetch_add(1, Ordering::SeqCst);
        } else {
            self.in_flight
                .compare_exchange(0, 1, Ordering::SeqCst, Ordering::SeqCst)
                .ok()?;
        }
        Some(TickGuard {
            in_flight: self.in_flight.clone(),
        })
    }

    /// Start the scheduling loop. The first tick fires immediately.
    /// On shutdown no new ticks start; running ones are awaited.
    pub fn start(&self, shutdown: ShutdownSignal) -> JoinHandle<()> {
        let this = self.clone();

        tokio::spawn(async move {
            info!(
                interval_secs = this.config.interval.as_secs(),
                probe_timeout_ms = this.config.probe_timeout.as_millis() as u64,
                allow_overlap = this.config.allow_overlap,
                "⏱️ Poll scheduler started"
            );

            let mut timer = tokio::time::interval(this.config.interval);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut running: JoinSet<TickReport> = JoinSet::new();

            loop {
                let notified = shutdown.notified();
                tokio::select! {
                    _ = timer.tick() => {
                        match this.try_begin_tick() {
                            Some(guard) => {
                                let tick = this.clone();
                                running.spawn(async move { tick.run_tick_with(guard).await.0 });
                            }
                            None => warn!("Previous tick still running, skipping this one"),
                        }
                    }
                    Some(finished) = running.join_next(), if !running.is_empty() => {
                        if let Err(e) = finished {
                            error!(error = %e, "Tick task failed");
                        }
                    }
                    _ = notified.wait() => {
                        info!("⏱️ Poll scheduler shutting down");
                        break;
                    }
                }
            }

            while running.join_next().await.is_some() {}
            info!("⏱️ Poll scheduler stopped");
        })
    }

    /// Run one tick now, regardless of the overlap setting.
    pub async fn run_tick(&self) -> TickReport {
        self.run_tick_collecting_alerts().await.0
    }

    /// Like [`run_tick`](Self::run_tick), but also hands back every alert
    /// the tick raised. Used where alerts must be delivered in-line rather
    /// than through the event bus.
    pub async fn run_tick_collecting_alerts(&self) -> (TickReport, Vec<Notification>) {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        let guard = TickGuard {
            in_flight: self.in_flight.clone(),
        };
        self.run_tick_with(guard).await
    }

    async fn run_tick_with(&self, _guard: TickGuard) -> (TickReport, Vec<Notification>) {
        let tick = self.ticks.fetch_add(1, Ordering::SeqCst) + 1;
        let started = Instant::now();
        let mut report = TickReport::default();
        let mut alerts = Vec::new();

        let endpoints = match self.repos.endpoints().list_all().await {
            Ok(endpoints) => endpoints,
            Err(e) => {
                error!(tick, error = %e, "Failed to read endpoint registry, skipping tick");
                report.failures += 1;
                return (report, alerts);
            }
        };

        if endpoints.is_empty() {
            debug!(tick, "No endpoints registered");
            return (report, alerts);
        }

        debug!(tick, count = endpoints.len(), "Probing endpoints");

        let mut probes = JoinSet::new();
        for endpoint in endpoints {
            let prober = self.prober.clone();
            let timeout = self.config.probe_timeout;
            probes.spawn(async move {
                let outcome = tokio::time::timeout(timeout, prober.probe(&endpoint.url, timeout))
                    .await
                    .unwrap_or(ProbeOutcome::Unreachable);
                (endpoint, outcome)
            });
        }

        while let Some(joined) = probes.join_next().await {
            let (endpoint, outcome) = match joined {
                Ok(result) => result,
                Err(e) => {
                    error!(tick, error = %e, "Probe task failed");
                    report.failures += 1;
                    continue;
                }
            };

            report.probed += 1;
            match outcome {
                ProbeOutcome::Reachable => report.reachable += 1,
                ProbeOutcome::Unreachable => report.unreachable += 1,
            }
            counter!("uptime_probes_total", "outcome" => outcome.as_str()).increment(1);

            match self.engine.apply(&endpoint, outcome).await {
                Ok(applied) => {
                    report.transitions += usize::from(applied.changed);
                    if let Some(alert) = applied.alert {
                        report.notifications += 1;
                        alerts.push(alert);
                    }
                }
                Err(DomainError::NotFound { .. }) => {
                    debug!(
                        tick,
                        endpoint_id = endpoint.id,
                        url = %endpoint.url,
                        "Endpoint removed while its probe was in flight"
                    );
                    report.failures += 1;
                }
                Err(e) if e.is_transient() => {
                    warn!(
                        tick,
                        endpoint_id = endpoint.id,
                        url = %endpoint.url,
                        error = %e,
                        "Failed to apply probe result"
                    );
                    report.failures += 1;
                }
                Err(e) => {
                    error!(
                        tick,
                        endpoint_id = endpoint.id,
                        url = %endpoint.url,
                        error = %e,
                        "Probe result rejected by the registry"
                    );
                    report.failures += 1;
                }
            }
        }

        let duration_ms = started.elapsed().as_millis() as u64;
        info!(
            tick,
            probed = report.probed,
            reachable = report.reachable,
            unreachable = report.unreachable,
            transitions = report.transitions,
            notifications = report.notifications,
            failures = report.failures,
            duration_ms,
            "Tick completed"
        );

        self.event_bus.publish(Event::TickCompleted(TickCompletedEvent {
            tick,
            probed: report.probed,
            reachable: report.reachable,
            unreachable: report.unreachable,
            transitions: report.transitions,
            notifications: report.notifications,
            failures: report.failures,
            duration_ms,
        }));

        (report, alerts)
    }
}
