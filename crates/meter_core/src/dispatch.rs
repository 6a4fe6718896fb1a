use std::sync::Arc;

use crate::render::{MeterHandle, MeterRenderer, OutputSink};
use crate::state::{MeterTable, WorkerMeter};
use crate::{WorkerId, WorkerMsg};

/// A zero-advance redraw the caller should run shortly after a `Start`, so
/// the new line materializes without dispatch blocking on render timing.
/// Purely cosmetic; nobody awaits it and its failure is ignored.
pub struct DeferredRefresh {
    pub handle: Arc<dyn MeterHandle>,
    pub label: String,
}

/// What a single dispatch did, for the caller to log and react to.
/// Dispatch itself never logs; the core stays free of the logging facade.
pub enum DispatchOutcome {
    Started {
        worker_id: WorkerId,
        refresh: DeferredRefresh,
    },
    Advanced {
        worker_id: WorkerId,
        applied: u64,
    },
    /// The delta would have pushed completed past total; the applied amount
    /// was clamped to the remaining steps.
    Clamped {
        worker_id: WorkerId,
        requested: u64,
        applied: u64,
    },
    Finished {
        worker_id: WorkerId,
    },
    /// StepUpdate or Finished for an id with no prior Start. Dropped.
    UnknownWorker {
        worker_id: WorkerId,
    },
    /// Negative step delta. Dropped.
    NegativeDelta {
        worker_id: WorkerId,
        delta: i64,
    },
    /// Stop message: the consumer should close its mailbox and drain out.
    StopRequested,
}

/// Apply one worker message to the table. The single dispatch site for the
/// whole taxonomy; adding a message kind is a compile-checked change here.
pub fn dispatch(
    table: &mut MeterTable,
    renderer: &dyn MeterRenderer,
    sink: OutputSink,
    msg: WorkerMsg,
) -> DispatchOutcome {
    match msg {
        WorkerMsg::Start {
            worker_id,
            total_steps,
            description,
        } => {
            let offset = table.display_index(worker_id);
            let handle = renderer.create(total_steps, &description, sink, offset);
            let refresh = DeferredRefresh {
                handle: handle.clone(),
                label: format!("0/{total_steps}"),
            };
            table.insert_worker(worker_id, WorkerMeter::new(total_steps, description, handle));
            DispatchOutcome::Started { worker_id, refresh }
        }
        WorkerMsg::StepUpdate {
            worker_id,
            step_delta,
            info,
        } => {
            let Some(meter) = table.worker_mut(worker_id) else {
                return DispatchOutcome::UnknownWorker { worker_id };
            };
            if step_delta < 0 {
                return DispatchOutcome::NegativeDelta {
                    worker_id,
                    delta: step_delta,
                };
            }
            let requested = step_delta as u64;
            let applied = requested.min(meter.remaining_steps());
            meter.apply_steps(applied);
            let label = meter.progress_label(&info);
            meter.handle().advance(applied, &label);
            if applied < requested {
                DispatchOutcome::Clamped {
                    worker_id,
                    requested,
                    applied,
                }
            } else {
                DispatchOutcome::Advanced { worker_id, applied }
            }
        }
        WorkerMsg::Finished {
            worker_id,
            description,
        } => {
            let Some(meter) = table.worker_mut(worker_id) else {
                return DispatchOutcome::UnknownWorker { worker_id };
            };
            meter.mark_finished();
            meter.handle().force_complete(&description);
            DispatchOutcome::Finished { worker_id }
        }
        WorkerMsg::Stop => DispatchOutcome::StopRequested,
    }
}
