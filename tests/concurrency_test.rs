//! Concurrent access to a shared coordinator.

mod common;

use std::collections::BTreeSet;
use std::sync::{Arc, Barrier};
use std::thread;

use swarmcore::{Coordinator, Task};

const WORKERS: usize = 8;

#[test]
fn test_concurrent_duplicate_registration_admits_one() {
    let coordinator = Arc::new(common::coordinator());
    let barrier = Arc::new(Barrier::new(WORKERS));

    let handles: Vec<_> = (0..WORKERS)
        .map(|i| {
            let coordinator = Arc::clone(&coordinator);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                coordinator.register_task(Task::new("shared", format!("agent-{i}")))
            })
        })
        .collect();

    let wins = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|&ok| ok)
        .count();
    assert_eq!(wins, 1);
}

#[test]
fn test_concurrent_acquisition_never_double_grants() {
    let coordinator = Arc::new(Coordinator::default());
    for i in 0..WORKERS {
        // Neighbours overlap on one resource
        let task = Task::new(format!("task-{i}"), "agent")
            .with_resources([format!("res-{i}"), format!("res-{}", (i + 1) % WORKERS)]);
        assert!(coordinator.register_task(task));
    }

    let barrier = Arc::new(Barrier::new(WORKERS));
    let handles: Vec<_> = (0..WORKERS)
        .map(|i| {
            let coordinator = Arc::clone(&coordinator);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let task_id = format!("task-{i}");
                let mut granted = 0;
                barrier.wait();
                for _ in 0..200 {
                    if coordinator.acquire_resources(&task_id) {
                        granted += 1;
                        let held = coordinator.held_resources(&task_id);
                        for resource in &held {
                            assert_eq!(
                                coordinator.resource_owner(resource).as_deref(),
                                Some(task_id.as_str())
                            );
                        }
                        coordinator.release_resources(&task_id);
                    }
                }
                granted
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert!(coordinator.snapshot().owned_resources.is_empty());
}

#[test]
fn test_readers_and_writers_interleave() {
    let coordinator = Arc::new(Coordinator::default());
    assert!(coordinator.register_task(Task::new("root", "agent")));

    let writers: Vec<_> = (0..WORKERS)
        .map(|i| {
            let coordinator = Arc::clone(&coordinator);
            thread::spawn(move || {
                for j in 0..50 {
                    let task = Task::new(format!("w{i}-{j}"), format!("agent-{i}"))
                        .with_dependency("root");
                    assert!(coordinator.register_task(task));
                    coordinator.update_heartbeat(&format!("agent-{i}"));
                    coordinator.update_task_progress(&format!("w{i}-{j}"), 0.5);
                }
            })
        })
        .collect();

    let reader = {
        let coordinator = Arc::clone(&coordinator);
        thread::spawn(move || {
            for _ in 0..200 {
                let _ = coordinator.get_task("root");
                let _ = coordinator.check_agent_health();
                let _ = coordinator.snapshot();
            }
        })
    };

    for handle in writers {
        handle.join().unwrap();
    }
    reader.join().unwrap();

    let order = coordinator.topological_order().unwrap();
    assert_eq!(order.len(), 1 + WORKERS * 50);
    assert_eq!(order[0], "root");

    let agents: BTreeSet<_> = (0..WORKERS)
        .filter_map(|i| coordinator.last_seen(&format!("agent-{i}")))
        .collect();
    assert!(!agents.is_empty());
    assert_eq!(coordinator.dependents_of("root").len(), WORKERS * 50);
}
