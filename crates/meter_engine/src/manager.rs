use std::sync::{Arc, Mutex};

use meter_core::{
    AggregateMeter, DeferredRefresh, MeterHandle, MeterRenderer, MeterTable, OutputSink, WorkerId,
    WorkerMsg, WorkerStatus,
};
use meter_logging::{meter_debug, meter_error};
use tokio::task::JoinHandle;

use crate::listener::{
    run_completion_listener, run_refresher, run_worker_listener, spawn_deferred_refresh,
};
use crate::mailbox::{
    bounded, Mailbox, MailboxListener, COMPLETION_MAILBOX_CAPACITY, WORKER_MAILBOX_CAPACITY,
};
use crate::MeterError;

/// Construction options for [`MeterManager`].
pub struct MeterManagerOptions {
    /// Where renderer output goes.
    pub sink: OutputSink,
    /// Label on the aggregate meter line.
    pub total_label: String,
    /// Worker identities the execution runtime already knows at construction
    /// time. They receive low, stable display indices before any message
    /// arrives.
    pub known_workers: Vec<WorkerId>,
}

impl Default for MeterManagerOptions {
    fn default() -> Self {
        Self {
            sink: OutputSink::default(),
            total_label: "Total Progress:".to_string(),
            known_workers: Vec::new(),
        }
    }
}

/// Join handles for the listener tasks, in shutdown order.
#[derive(Default)]
struct ListenerSet {
    worker: Option<JoinHandle<()>>,
    refresher: Option<JoinHandle<()>>,
    completion: Option<JoinHandle<()>>,
}

impl ListenerSet {
    fn drain(&mut self) -> [(&'static str, Option<JoinHandle<()>>); 3] {
        [
            ("worker listener", self.worker.take()),
            ("aggregate refresher", self.refresher.take()),
            ("completion listener", self.completion.take()),
        ]
    }
}

/// Owns the aggregate meter, the per-worker table and both mailboxes.
///
/// Callers influence state exclusively by sending messages; the mutable
/// fields are touched only by their single consumer task, so the only lock
/// is the one the inspection surface shares with the worker listener.
pub struct MeterManager {
    aggregate: Arc<AggregateMeter>,
    aggregate_handle: Arc<dyn MeterHandle>,
    table: Arc<Mutex<MeterTable>>,
    renderer: Arc<dyn MeterRenderer>,
    sink: OutputSink,
    worker_mailbox: Mailbox<WorkerMsg>,
    completion_mailbox: Mailbox<bool>,
    worker_listener: Option<MailboxListener<WorkerMsg>>,
    completion_listener: Option<MailboxListener<bool>>,
    tasks: ListenerSet,
}

impl MeterManager {
    /// Validates the job count, creates the aggregate meter line and
    /// allocates both mailboxes. Must be called within a Tokio runtime
    /// because it schedules the detached first-frame refresh.
    pub fn new(
        job_count: u64,
        renderer: Arc<dyn MeterRenderer>,
        options: MeterManagerOptions,
    ) -> Result<Self, MeterError> {
        if job_count == 0 {
            return Err(MeterError::InvalidJobCount { job_count });
        }

        let aggregate = Arc::new(AggregateMeter::new(job_count));
        let aggregate_handle = renderer.create(job_count, &options.total_label, options.sink, 0);
        spawn_deferred_refresh(DeferredRefresh {
            handle: aggregate_handle.clone(),
            label: aggregate.jobs_label(),
        });

        let mut table = MeterTable::new();
        table.seed_display_indices(&options.known_workers);

        let (worker_mailbox, worker_listener) = bounded(WORKER_MAILBOX_CAPACITY);
        let (completion_mailbox, completion_listener) = bounded(COMPLETION_MAILBOX_CAPACITY);

        Ok(Self {
            aggregate,
            aggregate_handle,
            table: Arc::new(Mutex::new(table)),
            renderer,
            sink: options.sink,
            worker_mailbox,
            completion_mailbox,
            worker_listener: Some(worker_listener),
            completion_listener: Some(completion_listener),
            tasks: ListenerSet::default(),
        })
    }

    /// Spawn the worker listener, the periodic refresher and the completion
    /// listener. Calling this more than once is a no-op: each mailbox has
    /// exactly one consumer.
    pub fn start(&mut self) {
        if let Some(listener) = self.worker_listener.take() {
            self.tasks.worker = Some(tokio::spawn(run_worker_listener(
                listener,
                self.table.clone(),
                self.renderer.clone(),
                self.sink,
            )));
        }
        if let Some(listener) = self.completion_listener.take() {
            self.tasks.refresher = Some(tokio::spawn(run_refresher(
                self.aggregate.clone(),
                self.aggregate_handle.clone(),
                listener.closed.clone(),
            )));
            self.tasks.completion = Some(tokio::spawn(run_completion_listener(
                listener,
                self.aggregate.clone(),
                self.aggregate_handle.clone(),
            )));
        }
    }

    /// Shutdown protocol. Four independently guarded steps; a failure in one
    /// is logged and never blocks the next. Always returns, provided the
    /// listener tasks uphold their mailbox-closed => clean-exit contract.
    pub async fn shutdown(&mut self) {
        // 1. In-band sentinel so a blocked completion receive unblocks now.
        if let Err(err) = self.completion_mailbox.try_send(false) {
            meter_debug!("completion sentinel not delivered: {err}");
        }
        // 2-3. Close both mailboxes.
        self.completion_mailbox.close();
        self.worker_mailbox.close();
        // 4. Account for every task, started or not.
        for (name, handle) in self.tasks.drain() {
            let Some(handle) = handle else {
                meter_debug!("{name} was never started");
                continue;
            };
            if let Err(err) = handle.await {
                if err.is_cancelled() {
                    meter_debug!("{name} cancelled during shutdown");
                } else {
                    meter_error!("{name} terminated abnormally: {err}");
                }
            }
        }
    }

    /// Submission handle for worker messages.
    pub fn worker_mailbox(&self) -> Mailbox<WorkerMsg> {
        self.worker_mailbox.clone()
    }

    /// Submission handle for completion signals.
    pub fn completion_mailbox(&self) -> Mailbox<bool> {
        self.completion_mailbox.clone()
    }

    pub fn is_complete(&self) -> bool {
        self.aggregate.is_complete()
    }

    pub fn fraction(&self) -> f64 {
        self.aggregate.fraction()
    }

    pub fn aggregate_counts(&self) -> (u64, u64) {
        self.aggregate.counts()
    }

    /// Per-worker status, or `None` for an id never seen via `Start`.
    pub fn worker_status(&self, worker_id: WorkerId) -> Option<WorkerStatus> {
        self.table
            .lock()
            .expect("worker table lock poisoned")
            .worker_status(worker_id)
    }
}
