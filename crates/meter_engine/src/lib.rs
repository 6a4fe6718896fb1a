//! Meter engine: bounded mailboxes, listener tasks and the shutdown protocol.
mod error;
mod listener;
mod mailbox;
mod manager;

pub use error::MeterError;
pub use listener::{AGGREGATE_REFRESH_INTERVAL, START_REFRESH_DELAY};
pub use mailbox::{
    bounded, Mailbox, MailboxListener, COMPLETION_MAILBOX_CAPACITY, WORKER_MAILBOX_CAPACITY,
};
pub use manager::{MeterManager, MeterManagerOptions};
