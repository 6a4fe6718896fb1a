/// Errors surfaced by the meter engine.
///
/// Producer protocol violations (unknown worker ids, negative steps) are not
/// errors: they are logged and dropped inside the worker listener and never
/// reach the sender.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MeterError {
    /// Construction was given a non-positive job count.
    #[error("job count must be positive (got {job_count})")]
    InvalidJobCount { job_count: u64 },
    /// A send raced with mailbox closure.
    #[error("mailbox is closed")]
    MailboxClosed,
    /// A non-blocking send found the mailbox at capacity.
    #[error("mailbox is full")]
    MailboxFull,
}
