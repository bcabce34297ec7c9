use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Duration, Utc};

use crate::domain::models::{AgentId, CoordinationConfig};

/// Missed heartbeat periods after which an agent counts as unhealthy.
const MISSED_INTERVALS: i32 = 3;

/// Last-seen table for agents.
///
/// Purely observational: sweeps report unhealthy agents and never touch
/// task state.
#[derive(Debug, Clone)]
pub struct HeartbeatMonitor {
    last_seen: HashMap<AgentId, DateTime<Utc>>,
    heartbeat_interval: Duration,
}

impl HeartbeatMonitor {
    pub fn new(heartbeat_interval: Duration) -> Self {
        Self {
            last_seen: HashMap::new(),
            heartbeat_interval,
        }
    }

    pub fn from_config(config: &CoordinationConfig) -> Self {
        Self::new(config.heartbeat_interval())
    }

    pub fn heartbeat_interval(&self) -> Duration {
        self.heartbeat_interval
    }

    /// Silence after which an agent is reported.
    pub fn unhealthy_after(&self) -> Duration {
        self.heartbeat_interval
            .checked_mul(MISSED_INTERVALS)
            .unwrap_or(Duration::MAX)
    }

    /// Record a heartbeat; the newest write wins. Returns the previous value.
    pub fn record(&mut self, agent_id: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.last_seen.insert(agent_id.to_string(), now)
    }

    pub fn last_seen(&self, agent_id: &str) -> Option<DateTime<Utc>> {
        self.last_seen.get(agent_id).copied()
    }

    pub fn remove(&mut self, agent_id: &str) -> bool {
        self.last_seen.remove(agent_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.last_seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_seen.is_empty()
    }

    /// Agents silent for at least [`Self::unhealthy_after`] as of `now`.
    pub fn unhealthy_at(&self, now: DateTime<Utc>) -> BTreeSet<AgentId> {
        let limit = self.unhealthy_after();
        self.last_seen
            .iter()
            .filter(|&(_, &seen)| now.signed_duration_since(seen) >= limit)
            .map(|(agent_id, _)| agent_id.clone())
            .collect()
    }
}
