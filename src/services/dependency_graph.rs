use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use crate::domain::errors::{CoordinationError, CoordinationResult};
use crate::domain::models::TaskId;

/// Directed dependency graph over task ids.
///
/// An edge `a -> b` means task `a` depends on task `b`. The graph never holds
/// a cycle: callers check [`DependencyGraph::cycle_if_inserted`] before
/// calling [`DependencyGraph::insert`].
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    edges: HashMap<TaskId, BTreeSet<TaskId>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, task_id: &str) -> bool {
        self.edges.contains_key(task_id)
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Tasks that list `task_id` as a dependency, in id order.
    pub fn dependents_of(&self, task_id: &str) -> Vec<TaskId> {
        let mut dependents: Vec<TaskId> = self
            .edges
            .iter()
            .filter(|(_, deps)| deps.contains(task_id))
            .map(|(id, _)| id.clone())
            .collect();
        dependents.sort();
        dependents
    }

    /// Find a path `from -> .. -> to` following dependency edges.
    ///
    /// Edges may point at ids that were removed from the graph; such ids are
    /// still valid path endpoints.
    pub fn find_path(&self, from: &str, to: &str) -> Option<Vec<TaskId>> {
        if from == to {
            return Some(vec![from.to_string()]);
        }

        let mut parent: HashMap<&str, &str> = HashMap::new();
        let mut visited: HashSet<&str> = HashSet::new();
        let mut stack: Vec<&str> = vec![from];
        visited.insert(from);

        while let Some(node) = stack.pop() {
            let Some(neighbors) = self.edges.get(node) else {
                continue;
            };
            for neighbor in neighbors {
                let neighbor = neighbor.as_str();
                if !visited.insert(neighbor) {
                    continue;
                }
                parent.insert(neighbor, node);
                if neighbor == to {
                    return Some(reconstruct_path(&parent, from, to));
                }
                stack.push(neighbor);
            }
        }

        None
    }

    /// The cycle that inserting `task_id` with `dependencies` would close.
    ///
    /// Returns the offending path starting and ending at `task_id`.
    pub fn cycle_if_inserted(
        &self,
        task_id: &str,
        dependencies: &BTreeSet<TaskId>,
    ) -> Option<Vec<TaskId>> {
        dependencies.iter().find_map(|dep| {
            self.find_path(dep, task_id).map(|path| {
                let mut cycle = Vec::with_capacity(path.len() + 1);
                cycle.push(task_id.to_string());
                cycle.extend(path);
                cycle
            })
        })
    }

    /// Insert a node with its outgoing edges.
    pub fn insert(&mut self, task_id: TaskId, dependencies: BTreeSet<TaskId>) {
        self.edges.insert(task_id, dependencies);
    }

    /// Remove a node and its outgoing edges.
    ///
    /// Edges held by dependents are left in place, so a later node under the
    /// same id is still checked against them.
    pub fn remove(&mut self, task_id: &str) -> Option<BTreeSet<TaskId>> {
        self.edges.remove(task_id)
    }

    /// Perform topological sort over the nodes in the graph.
    /// Returns ids in dependency order (dependencies before dependents).
    pub fn topological_order(&self) -> CoordinationResult<Vec<TaskId>> {
        let mut in_degree: HashMap<&str, usize> = HashMap::new();
        let mut reverse: HashMap<&str, Vec<&str>> = HashMap::new();

        // Build reverse graph and calculate in-degrees over present nodes only
        for (task_id, deps) in &self.edges {
            in_degree.entry(task_id.as_str()).or_insert(0);
            for dep in deps.iter().filter(|d| self.edges.contains_key(d.as_str())) {
                reverse.entry(dep.as_str()).or_default().push(task_id.as_str());
                *in_degree.entry(task_id.as_str()).or_insert(0) += 1;
            }
        }

        // Kahn's algorithm, seeded in id order for a stable result
        let mut ready: Vec<&str> = in_degree
            .iter()
            .filter(|&(_, &degree)| degree == 0)
            .map(|(&id, _)| id)
            .collect();
        ready.sort_unstable();
        let mut queue: VecDeque<&str> = ready.into();

        let mut sorted = Vec::with_capacity(self.edges.len());
        while let Some(node) = queue.pop_front() {
            sorted.push(node.to_string());

            if let Some(dependents) = reverse.get(node) {
                let mut unlocked = Vec::new();
                for &dependent in dependents {
                    if let Some(degree) = in_degree.get_mut(dependent) {
                        *degree -= 1;
                        if *degree == 0 {
                            unlocked.push(dependent);
                        }
                    }
                }
                unlocked.sort_unstable();
                queue.extend(unlocked);
            }
        }

        if sorted.len() != self.edges.len() {
            let mut remaining: Vec<TaskId> = in_degree
                .into_iter()
                .filter(|&(_, degree)| degree > 0)
                .map(|(id, _)| id.to_string())
                .collect();
            remaining.sort();
            return Err(CoordinationError::DependencyCycle(remaining));
        }

        Ok(sorted)
    }

    /// Length of the longest dependency chain below `task_id`.
    ///
    /// A task without registered dependencies has depth 0.
    pub fn depth(&self, task_id: &str) -> Option<u32> {
        if !self.contains(task_id) {
            return None;
        }

        let order = self.topological_order().ok()?;
        let mut depths: HashMap<&str, u32> = HashMap::with_capacity(order.len());
        for id in &order {
            let depth = self.edges[id.as_str()]
                .iter()
                .filter_map(|dep| depths.get(dep.as_str()))
                .map(|d| d + 1)
                .max()
                .unwrap_or(0);
            depths.insert(id.as_str(), depth);
            if id == task_id {
                return Some(depth);
            }
        }
        None
    }
}

fn reconstruct_path(parent: &HashMap<&str, &str>, from: &str, to: &str) -> Vec<TaskId> {
    let mut path = vec![to.to_string()];
    let mut current = to;
    while current != from {
        match parent.get(current) {
            Some(&prev) => {
                path.push(prev.to_string());
                current = prev;
            }
            None => break,
        }
    }
    path.reverse();
    path
}
