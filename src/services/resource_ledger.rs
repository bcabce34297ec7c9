//! Exclusive ownership of named resources.
//!
//! Acquisition is all-or-nothing and never waits. A task either receives its
//! whole resource set at once or nothing, so no task ever holds part of its
//! set while waiting for the rest.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::domain::errors::{CoordinationError, CoordinationResult};
use crate::domain::models::TaskId;

/// Resource ownership table.
#[derive(Debug, Default)]
pub struct ResourceLedger {
    /// Owner by resource.
    owners: HashMap<String, TaskId>,
    /// Resources by owner.
    held: HashMap<TaskId, BTreeSet<String>>,
}

impl ResourceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim every resource in `resources` for `task_id`, or none of them.
    ///
    /// Resources already owned by `task_id` count as available. Returns the
    /// resources that were newly claimed.
    pub fn try_acquire(
        &mut self,
        task_id: &str,
        resources: &BTreeSet<String>,
    ) -> CoordinationResult<Vec<String>> {
        // Check for conflicts before touching anything
        if let Some((resource, holder)) = resources.iter().find_map(|resource| {
            self.owners
                .get(resource)
                .filter(|holder| holder.as_str() != task_id)
                .map(|holder| (resource, holder))
        }) {
            return Err(CoordinationError::ResourceContention {
                resource: resource.clone(),
                holder: holder.clone(),
            });
        }

        let mut claimed = Vec::new();
        for resource in resources {
            if !self.owners.contains_key(resource) {
                self.owners.insert(resource.clone(), task_id.to_string());
                claimed.push(resource.clone());
            }
        }

        if !resources.is_empty() {
            self.held
                .entry(task_id.to_string())
                .or_default()
                .extend(resources.iter().cloned());
        }

        Ok(claimed)
    }

    /// Release everything `task_id` owns. Idempotent.
    pub fn release(&mut self, task_id: &str) -> Vec<String> {
        let Some(resources) = self.held.remove(task_id) else {
            return Vec::new();
        };

        for resource in &resources {
            if self.owners.get(resource).is_some_and(|owner| owner == task_id) {
                self.owners.remove(resource);
            }
        }

        resources.into_iter().collect()
    }

    pub fn owner_of(&self, resource: &str) -> Option<&TaskId> {
        self.owners.get(resource)
    }

    pub fn held_by(&self, task_id: &str) -> BTreeSet<String> {
        self.held.get(task_id).cloned().unwrap_or_default()
    }

    pub fn holds_any(&self, task_id: &str) -> bool {
        self.held.get(task_id).is_some_and(|set| !set.is_empty())
    }

    pub fn owned_count(&self) -> usize {
        self.owners.len()
    }

    /// Ordered copy of the ownership table.
    pub fn ownership(&self) -> BTreeMap<String, TaskId> {
        self.owners
            .iter()
            .map(|(resource, owner)| (resource.clone(), owner.clone()))
            .collect()
    }
}
