use std::sync::{Arc, Mutex};
use std::time::Duration;

use meter_core::{
    dispatch, AggregateMeter, DeferredRefresh, DispatchOutcome, MeterHandle, MeterRenderer,
    MeterTable, OutputSink, WorkerMsg,
};
use meter_logging::{meter_debug, meter_trace, meter_warn};
use tokio_util::sync::CancellationToken;

use crate::mailbox::MailboxListener;

/// Delay before the detached zero-advance redraw that follows construction
/// and every `Start`, so the first frame renders without skewing timing.
pub const START_REFRESH_DELAY: Duration = Duration::from_millis(100);

/// Interval at which the periodic refresher re-renders the aggregate meter.
pub const AGGREGATE_REFRESH_INTERVAL: Duration = Duration::from_secs(10);

/// Single consumer of the worker mailbox.
///
/// Exits cleanly once the mailbox is closed and drained; that is the normal
/// termination path, not an error. Anything else that goes wrong (a panic in
/// dispatch or in a renderer) surfaces to whoever awaits the JoinHandle.
pub(crate) async fn run_worker_listener(
    mut listener: MailboxListener<WorkerMsg>,
    table: Arc<Mutex<MeterTable>>,
    renderer: Arc<dyn MeterRenderer>,
    sink: OutputSink,
) {
    loop {
        tokio::select! {
            _ = listener.closed.cancelled() => {
                listener.rx.close();
                while let Some(msg) = listener.rx.recv().await {
                    apply_worker_msg(&table, renderer.as_ref(), sink, &listener.closed, msg);
                }
                break;
            }
            received = listener.rx.recv() => match received {
                Some(msg) => {
                    apply_worker_msg(&table, renderer.as_ref(), sink, &listener.closed, msg);
                }
                None => break,
            },
        }
    }
    meter_debug!("worker listener drained out");
}

fn apply_worker_msg(
    table: &Mutex<MeterTable>,
    renderer: &dyn MeterRenderer,
    sink: OutputSink,
    closed: &CancellationToken,
    msg: WorkerMsg,
) {
    let outcome = {
        let mut table = table.lock().expect("worker table lock poisoned");
        dispatch(&mut table, renderer, sink, msg)
    };
    match outcome {
        DispatchOutcome::Started { worker_id, refresh } => {
            meter_trace!("worker {worker_id} started");
            spawn_deferred_refresh(refresh);
        }
        DispatchOutcome::Advanced { worker_id, applied } => {
            meter_trace!("worker {worker_id} advanced by {applied}");
        }
        DispatchOutcome::Clamped {
            worker_id,
            requested,
            applied,
        } => {
            meter_warn!(
                "worker {worker_id} step overflows total, applying {applied} of {requested}"
            );
        }
        DispatchOutcome::Finished { worker_id } => {
            meter_debug!("worker {worker_id} finished");
        }
        DispatchOutcome::UnknownWorker { worker_id } => {
            meter_warn!("dropping update for unknown worker {worker_id}");
        }
        DispatchOutcome::NegativeDelta { worker_id, delta } => {
            meter_warn!("dropping negative step delta {delta} for worker {worker_id}");
        }
        DispatchOutcome::StopRequested => {
            meter_debug!("stop message received, closing worker mailbox");
            closed.cancel();
        }
    }
}

/// Fire-and-forget redraw. Nobody awaits the task and its result is ignored.
pub(crate) fn spawn_deferred_refresh(refresh: DeferredRefresh) {
    tokio::spawn(async move {
        tokio::time::sleep(START_REFRESH_DELAY).await;
        refresh.handle.advance(0, &refresh.label);
    });
}

/// Re-renders the aggregate meter at its current value on a fixed interval.
/// Never changes the counter; exits cleanly when the completion mailbox
/// closes.
pub(crate) async fn run_refresher(
    aggregate: Arc<AggregateMeter>,
    handle: Arc<dyn MeterHandle>,
    closed: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = closed.cancelled() => break,
            _ = tokio::time::sleep(AGGREGATE_REFRESH_INTERVAL) => {
                handle.advance(0, &aggregate.jobs_label());
            }
        }
    }
    meter_debug!("aggregate refresher stopped");
}

/// Single consumer of the completion mailbox.
///
/// `false` is the in-band shutdown sentinel: it unblocks a pending receive
/// immediately instead of relying on close-detection alone, which a mailbox
/// implementation may deliver asynchronously relative to a pending receive.
pub(crate) async fn run_completion_listener(
    mut listener: MailboxListener<bool>,
    aggregate: Arc<AggregateMeter>,
    handle: Arc<dyn MeterHandle>,
) {
    'outer: loop {
        tokio::select! {
            _ = listener.closed.cancelled() => {
                listener.rx.close();
                while let Some(done) = listener.rx.recv().await {
                    if !apply_completion(&aggregate, handle.as_ref(), done) {
                        break;
                    }
                }
                break 'outer;
            }
            received = listener.rx.recv() => match received {
                Some(done) => {
                    if !apply_completion(&aggregate, handle.as_ref(), done) {
                        break 'outer;
                    }
                }
                None => break 'outer,
            },
        }
    }
    meter_debug!("completion listener drained out");
}

/// Returns false when the shutdown sentinel ends the loop.
fn apply_completion(aggregate: &AggregateMeter, handle: &dyn MeterHandle, done: bool) -> bool {
    if !done {
        return false;
    }
    // A surplus signal clamps at total; advance by 0 so the rendered bar
    // never drifts past the counter.
    let amount = if aggregate.complete_one() { 1 } else { 0 };
    handle.advance(amount, &aggregate.jobs_label());
    true
}
