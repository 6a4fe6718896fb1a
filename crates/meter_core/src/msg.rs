use crate::WorkerId;

/// Messages workers send into the worker mailbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerMsg {
    /// Worker announced itself; replaces any previous state for this id.
    Start {
        worker_id: WorkerId,
        total_steps: u64,
        description: String,
    },
    /// Worker advanced by `step_delta` steps.
    StepUpdate {
        worker_id: WorkerId,
        step_delta: i64,
        info: String,
    },
    /// Worker reached its terminal state.
    Finished {
        worker_id: WorkerId,
        description: String,
    },
    /// Close the worker mailbox and drain out.
    Stop,
}
