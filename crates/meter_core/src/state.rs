use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::render::MeterHandle;

pub type WorkerId = u64;

/// Read-only snapshot of one worker's progress.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerStatus {
    pub completed_steps: u64,
    pub total_steps: u64,
    pub fraction: f64,
}

/// Per-worker meter state. Invariant: `completed_steps <= total_steps`.
pub struct WorkerMeter {
    completed_steps: u64,
    total_steps: u64,
    description: String,
    handle: Arc<dyn MeterHandle>,
}

impl WorkerMeter {
    pub fn new(total_steps: u64, description: String, handle: Arc<dyn MeterHandle>) -> Self {
        Self {
            completed_steps: 0,
            total_steps,
            description,
            handle,
        }
    }

    pub fn completed_steps(&self) -> u64 {
        self.completed_steps
    }

    pub fn total_steps(&self) -> u64 {
        self.total_steps
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn handle(&self) -> &Arc<dyn MeterHandle> {
        &self.handle
    }

    pub fn remaining_steps(&self) -> u64 {
        self.total_steps - self.completed_steps
    }

    /// Label shown next to the bar: `"{completed}/{total}: {info}"`.
    pub fn progress_label(&self, info: &str) -> String {
        format!("{}/{}: {}", self.completed_steps, self.total_steps, info)
    }

    pub(crate) fn apply_steps(&mut self, amount: u64) {
        debug_assert!(amount <= self.remaining_steps());
        self.completed_steps += amount;
    }

    pub(crate) fn mark_finished(&mut self) {
        self.completed_steps = self.total_steps;
    }

    fn status(&self) -> WorkerStatus {
        WorkerStatus {
            completed_steps: self.completed_steps,
            total_steps: self.total_steps,
            fraction: self.completed_steps as f64 / self.total_steps as f64,
        }
    }
}

/// Worker table: per-worker meters plus the one-shot display-index map.
///
/// Display indices start at 1 (slot 0 belongs to the aggregate meter) and are
/// never reassigned, even when a repeated `Start` replaces the meter itself.
#[derive(Default)]
pub struct MeterTable {
    workers: HashMap<WorkerId, WorkerMeter>,
    display_indices: HashMap<WorkerId, usize>,
}

impl MeterTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed display indices for worker ids known before any message arrives.
    /// Ids are sorted first so statically known workers get low, stable slots.
    pub fn seed_display_indices(&mut self, worker_ids: &[WorkerId]) {
        let mut ids: Vec<WorkerId> = worker_ids.to_vec();
        ids.sort_unstable();
        ids.dedup();
        for id in ids {
            self.display_index(id);
        }
    }

    /// The display index for `worker_id`, assigning the next slot if absent.
    pub fn display_index(&mut self, worker_id: WorkerId) -> usize {
        let next = self.display_indices.len() + 1;
        *self.display_indices.entry(worker_id).or_insert(next)
    }

    pub fn assigned_display_index(&self, worker_id: WorkerId) -> Option<usize> {
        self.display_indices.get(&worker_id).copied()
    }

    /// Replace (not merge) the meter for `worker_id`.
    pub fn insert_worker(&mut self, worker_id: WorkerId, meter: WorkerMeter) {
        self.workers.insert(worker_id, meter);
    }

    pub fn worker(&self, worker_id: WorkerId) -> Option<&WorkerMeter> {
        self.workers.get(&worker_id)
    }

    pub fn worker_mut(&mut self, worker_id: WorkerId) -> Option<&mut WorkerMeter> {
        self.workers.get_mut(&worker_id)
    }

    pub fn worker_status(&self, worker_id: WorkerId) -> Option<WorkerStatus> {
        self.workers.get(&worker_id).map(WorkerMeter::status)
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }
}

/// Top-level completed/total counter tracking finished jobs.
///
/// Shared between the periodic refresher and the completion listener, so the
/// counter is atomic rather than guarded by the worker table's lock.
pub struct AggregateMeter {
    completed: AtomicU64,
    total: u64,
}

impl AggregateMeter {
    /// `total` must be positive; the manager validates before constructing.
    pub fn new(total: u64) -> Self {
        debug_assert!(total > 0);
        Self {
            completed: AtomicU64::new(0),
            total,
        }
    }

    /// Record one finished job, clamped at `total`. Returns whether the
    /// counter actually advanced, so renders can stay in step with it.
    pub fn complete_one(&self) -> bool {
        let mut current = self.completed.load(Ordering::Relaxed);
        loop {
            if current >= self.total {
                return false;
            }
            match self.completed.compare_exchange_weak(
                current,
                current + 1,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return true,
                Err(observed) => current = observed,
            }
        }
    }

    pub fn counts(&self) -> (u64, u64) {
        (self.completed.load(Ordering::Relaxed), self.total)
    }

    pub fn is_complete(&self) -> bool {
        self.completed.load(Ordering::Relaxed) >= self.total
    }

    pub fn fraction(&self) -> f64 {
        self.completed.load(Ordering::Relaxed) as f64 / self.total as f64
    }

    /// Auxiliary label for the aggregate line: `"Jobs: {completed} / {total}"`.
    pub fn jobs_label(&self) -> String {
        let (completed, total) = self.counts();
        format!("Jobs: {completed} / {total}")
    }
}
