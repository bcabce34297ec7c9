use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, RwLock};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::domain::models::{AgentId, TaskId};
use crate::services::Coordinator;

/// Outcome of one liveness sweep
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepReport {
    /// Running tasks found quiet past the stall threshold and handed to recovery
    pub stalled_tasks: Vec<TaskId>,

    /// Agents silent for three heartbeat intervals
    pub unhealthy_agents: BTreeSet<AgentId>,

    /// When the sweep ran
    pub at: DateTime<Utc>,
}

impl SweepReport {
    pub fn is_clean(&self) -> bool {
        self.stalled_tasks.is_empty() && self.unhealthy_agents.is_empty()
    }
}

/// Sweeper events
#[derive(Debug, Clone)]
pub enum SweepEvent {
    /// A sweep finished
    Report(SweepReport),

    /// Sweeper shutdown
    Shutdown,
}

/// Periodic driver for the coordinator's pull-based checks.
///
/// The coordinator never acts on its own; this ticks on a tokio interval,
/// runs the stall sweep and the heartbeat check, and broadcasts a
/// [`SweepReport`]. Remediation of unhealthy agents stays with subscribers.
pub struct LivenessSweeper {
    coordinator: Arc<Coordinator>,

    interval: Duration,

    /// Most recent report (cached for quick access)
    last_report: Arc<RwLock<Option<SweepReport>>>,

    event_tx: broadcast::Sender<SweepEvent>,

    shutdown_tx: broadcast::Sender<()>,
}

impl LivenessSweeper {
    pub fn new(coordinator: Arc<Coordinator>, interval: Duration) -> Self {
        let (event_tx, _) = broadcast::channel(64);
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            coordinator,
            interval,
            last_report: Arc::new(RwLock::new(None)),
            event_tx,
            shutdown_tx,
        }
    }

    /// Sweeper ticking at the coordinator's configured sweep interval
    pub fn from_coordinator(coordinator: Arc<Coordinator>) -> Self {
        let interval = coordinator.config().sweep_interval();
        Self::new(coordinator, interval)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run a single sweep at `now` without the background loop.
    pub fn sweep_once_at(coordinator: &Coordinator, now: DateTime<Utc>) -> SweepReport {
        let report = SweepReport {
            stalled_tasks: coordinator.sweep_stalled_tasks_at(now),
            unhealthy_agents: coordinator.check_agent_health_at(now),
            at: now,
        };

        if report.is_clean() {
            debug!("Liveness sweep clean");
        } else {
            warn!(
                stalled = report.stalled_tasks.len(),
                unhealthy = report.unhealthy_agents.len(),
                "Liveness sweep found problems"
            );
        }
        report
    }

    /// Start the background sweep task.
    ///
    /// The returned handle completes after [`LivenessSweeper::shutdown`].
    pub fn start(&self) -> tokio::task::JoinHandle<Result<()>> {
        let coordinator = Arc::clone(&self.coordinator);
        let last_report = Arc::clone(&self.last_report);
        let event_tx = self.event_tx.clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let period = self.interval;

        tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            info!(interval_ms = period.as_millis(), "Liveness sweeper started");

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let report = Self::sweep_once_at(&coordinator, Utc::now());
                        *last_report.write().await = Some(report.clone());
                        // No subscribers is fine
                        let _ = event_tx.send(SweepEvent::Report(report));
                    }

                    _ = shutdown_rx.recv() => {
                        info!("Liveness sweeper shutting down");
                        let _ = event_tx.send(SweepEvent::Shutdown);
                        break;
                    }
                }
            }

            info!("Liveness sweeper stopped");
            Ok(())
        })
    }

    /// Most recent report, if a sweep has run
    pub async fn last_report(&self) -> Option<SweepReport> {
        self.last_report.read().await.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SweepEvent> {
        self.event_tx.subscribe()
    }

    /// Signal the background task to stop
    pub fn shutdown(&self) -> Result<()> {
        self.shutdown_tx
            .send(())
            .context("Failed to send shutdown signal")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{CoordinationConfig, Task, TaskStatus};

    fn coordinator_with_stale_state() -> Arc<Coordinator> {
        let coordinator = Arc::new(Coordinator::new(CoordinationConfig::default()));
        let an_hour_ago = Utc::now() - chrono::Duration::hours(1);

        coordinator.update_heartbeat_at("ghost", an_hour_ago);
        coordinator.update_heartbeat("alive");
        coordinator.register_task_at(Task::new("quiet", "ghost"), an_hour_ago);
        coordinator.update_task_status_at("quiet", TaskStatus::Running, an_hour_ago);
        coordinator.register_task_at(Task::new("queued", "alive"), an_hour_ago);
        coordinator.update_task_status("queued", TaskStatus::Running);
        coordinator
    }

    #[test]
    fn test_sweep_once() {
        let coordinator = coordinator_with_stale_state();

        let report = LivenessSweeper::sweep_once_at(&coordinator, Utc::now());

        // "queued" waited an hour in pending but only just started
        assert_eq!(report.stalled_tasks, vec!["quiet"]);
        assert!(report.unhealthy_agents.contains("ghost"));
        assert!(!report.unhealthy_agents.contains("alive"));
        assert_eq!(
            coordinator.get_task("quiet").unwrap().status,
            TaskStatus::Pending
        );
    }

    #[test]
    fn test_interval_from_config() {
        let sweeper = LivenessSweeper::from_coordinator(Arc::new(Coordinator::default()));
        assert_eq!(sweeper.interval(), Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_background_sweep_reports() {
        let sweeper = LivenessSweeper::new(coordinator_with_stale_state(), Duration::from_millis(50));
        let mut events = sweeper.subscribe();
        let handle = sweeper.start();

        let event = tokio::time::timeout(Duration::from_secs(2), events.recv())
            .await
            .expect("Timeout waiting for sweep")
            .expect("Event channel closed");

        match event {
            SweepEvent::Report(report) => {
                assert!(report.unhealthy_agents.contains("ghost"));
            }
            SweepEvent::Shutdown => panic!("Expected a sweep report"),
        }
        assert!(sweeper.last_report().await.is_some());

        sweeper.shutdown().unwrap();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("Timeout waiting for sweeper to stop")
            .expect("Sweeper task panicked")
            .expect("Sweeper returned error");
    }

    #[tokio::test]
    async fn test_shutdown_event() {
        let sweeper = LivenessSweeper::new(Arc::new(Coordinator::default()), Duration::from_secs(60));
        let mut events = sweeper.subscribe();
        let handle = sweeper.start();

        sweeper.shutdown().unwrap();

        let saw_shutdown = tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                match events.recv().await {
                    Ok(SweepEvent::Shutdown) => return true,
                    Ok(SweepEvent::Report(_)) => continue,
                    Err(_) => return false,
                }
            }
        })
        .await
        .unwrap_or(false);

        assert!(saw_shutdown);
        handle.await.unwrap().unwrap();
    }
}
