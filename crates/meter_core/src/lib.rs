//! Meter core: message taxonomy, worker state table and dispatch.
mod dispatch;
mod msg;
mod render;
mod state;

pub use dispatch::{dispatch, DeferredRefresh, DispatchOutcome};
pub use msg::WorkerMsg;
pub use render::{MeterHandle, MeterRenderer, OutputSink, SilentRenderer};
pub use state::{AggregateMeter, MeterTable, WorkerId, WorkerMeter, WorkerStatus};
