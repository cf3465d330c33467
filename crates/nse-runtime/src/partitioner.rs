//! Runlevel Partitioner (C5, `spec.md` §4.4).

use std::collections::BTreeMap;

use nse_core::Runlevel;

use crate::task::Task;

/// Bucket `tasks` by their declared runlevel, preserving each bucket's
/// construction order (`spec.md` §4.4: "task order is construction
/// order"). `BTreeMap` gives ascending iteration order for free.
pub fn partition_by_runlevel(tasks: Vec<Task>) -> BTreeMap<Runlevel, Vec<Task>> {
    let mut buckets: BTreeMap<Runlevel, Vec<Task>> = BTreeMap::new();
    for task in tasks {
        buckets.entry(task.runlevel()).or_default().push(task);
    }
    buckets
}
