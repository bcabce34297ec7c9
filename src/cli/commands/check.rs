use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::cli::output::TableFormatter;
use crate::domain::errors::CoordinationError;
use crate::domain::models::{CoordinationConfig, Task, TaskId};
use crate::services::{Coordinator, CoordinatorSnapshot};

/// Task manifest file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub tasks: Vec<Task>,
}

/// Per-task result of a manifest check
#[derive(Debug, Clone, Serialize)]
pub struct CheckEntry {
    pub task_id: TaskId,
    pub agent_id: String,
    pub registered: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depth: Option<u32>,
    pub resources: Vec<String>,
    /// `None` when the task was never registered
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acquired: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocked_by: Option<TaskId>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    pub entries: Vec<CheckEntry>,
    pub topological_order: Vec<TaskId>,
    pub snapshot: CoordinatorSnapshot,
}

impl CheckReport {
    pub fn rejected(&self) -> usize {
        self.entries.iter().filter(|e| !e.registered).count()
    }

    pub fn blocked(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.acquired == Some(false))
            .count()
    }
}

pub fn load_manifest(path: &Path) -> Result<Manifest> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read manifest {}", path.display()))?;
    serde_yaml::from_str(&raw).with_context(|| format!("Invalid manifest {}", path.display()))
}

/// Register every manifest task in file order, then try to claim resources
/// for the accepted ones in dependency order without releasing any.
///
/// The result shows which tasks would be rejected and which would contend
/// for resources if started together.
pub fn run_check(coordinator: &Coordinator, manifest: Manifest) -> Result<CheckReport> {
    let mut entries: Vec<CheckEntry> = manifest
        .tasks
        .into_iter()
        .map(|task| {
            let mut entry = CheckEntry {
                task_id: task.task_id.clone(),
                agent_id: task.agent_id.clone(),
                registered: false,
                rejection: None,
                depth: None,
                resources: task.resources.iter().cloned().collect(),
                acquired: None,
                blocked_by: None,
            };
            match coordinator.try_register_task(task) {
                Ok(()) => entry.registered = true,
                Err(e) => entry.rejection = Some(e.to_string()),
            }
            entry
        })
        .collect();

    let topological_order = coordinator
        .topological_order()
        .context("Registered tasks do not form a DAG")?;

    for task_id in &topological_order {
        let Some(entry) = entries
            .iter_mut()
            .find(|e| e.registered && &e.task_id == task_id)
        else {
            continue;
        };

        entry.depth = coordinator.dependency_depth(task_id);
        match coordinator.try_acquire_resources(task_id) {
            Ok(_) => entry.acquired = Some(true),
            Err(CoordinationError::ResourceContention { holder, .. }) => {
                entry.acquired = Some(false);
                entry.blocked_by = Some(holder);
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Unexpected failure acquiring for {task_id}"))
            }
        }
    }

    Ok(CheckReport {
        entries,
        topological_order,
        snapshot: coordinator.snapshot(),
    })
}

/// Handle check command
pub fn execute(manifest_path: &Path, config: &CoordinationConfig, json: bool) -> Result<()> {
    let manifest = load_manifest(manifest_path)?;
    let coordinator = Coordinator::new(config.clone());
    let report = run_check(&coordinator, manifest)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        let formatter = TableFormatter::new();
        println!("{}", formatter.format_check(&report.entries));
        if !report.topological_order.is_empty() {
            println!("\nOrder: {}", report.topological_order.join(" -> "));
        }
        println!(
            "\n{} task(s): {} rejected, {} blocked on resources",
            report.entries.len(),
            report.rejected(),
            report.blocked()
        );
    }

    let rejected = report.rejected();
    if rejected > 0 {
        bail!("{rejected} task(s) rejected");
    }
    Ok(())
}
