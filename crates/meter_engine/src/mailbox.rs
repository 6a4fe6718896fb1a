use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;

use crate::MeterError;

/// Capacity of the completion-signal mailbox.
pub const COMPLETION_MAILBOX_CAPACITY: usize = 1024;
/// Capacity of the worker-message mailbox.
pub const WORKER_MAILBOX_CAPACITY: usize = 4096;

/// Sender half of a bounded mailbox.
///
/// A full mailbox blocks the sender; that is the sole flow-control mechanism.
/// Closing is signalled through a cancellation token shared with the listener
/// half, so a pending send observes closure promptly instead of waiting for
/// the receiver to drop.
pub struct Mailbox<T> {
    tx: mpsc::Sender<T>,
    closed: CancellationToken,
}

// Manual impl: `T` itself need not be Clone for the sender to be cloneable.
impl<T> Clone for Mailbox<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            closed: self.closed.clone(),
        }
    }
}

impl<T> Mailbox<T> {
    /// Send a value, suspending while the mailbox is at capacity.
    pub async fn send(&self, value: T) -> Result<(), MeterError> {
        if self.closed.is_cancelled() {
            return Err(MeterError::MailboxClosed);
        }
        tokio::select! {
            _ = self.closed.cancelled() => Err(MeterError::MailboxClosed),
            sent = self.tx.send(value) => sent.map_err(|_| MeterError::MailboxClosed),
        }
    }

    /// Non-blocking send, used by the best-effort shutdown steps.
    pub fn try_send(&self, value: T) -> Result<(), MeterError> {
        if self.closed.is_cancelled() {
            return Err(MeterError::MailboxClosed);
        }
        self.tx.try_send(value).map_err(|err| match err {
            TrySendError::Full(_) => MeterError::MailboxFull,
            TrySendError::Closed(_) => MeterError::MailboxClosed,
        })
    }

    /// Close the mailbox. Safe to call any number of times.
    pub fn close(&self) {
        self.closed.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled() || self.tx.is_closed()
    }
}

/// Receiver half of a bounded mailbox; owned by exactly one consumer task.
pub struct MailboxListener<T> {
    pub(crate) rx: mpsc::Receiver<T>,
    pub(crate) closed: CancellationToken,
}

/// Allocate a bounded mailbox with a fixed positive capacity.
pub fn bounded<T>(capacity: usize) -> (Mailbox<T>, MailboxListener<T>) {
    let (tx, rx) = mpsc::channel(capacity);
    let closed = CancellationToken::new();
    (
        Mailbox {
            tx,
            closed: closed.clone(),
        },
        MailboxListener { rx, closed },
    )
}
