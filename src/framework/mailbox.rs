//! # Mailbox
//!
//! A bounded FIFO queue owned by exactly one actor.
//!
//! The mailbox is split in two halves on top of a Tokio `mpsc` channel:
//!
//! - [`MailboxSender`] is held by the registry and used by any number of writers.
//!   Enqueueing never waits: a full mailbox rejects the message immediately so the caller
//!   can decide how to back off.
//! - [`MailboxReceiver`] is owned by the actor's dispatch loop, the single reader. Dequeueing
//!   waits until a message arrives or the loop's cancellation token fires.
//!
//! Capacity is fixed when the mailbox is created and never grows.

use crate::framework::message::Message;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;

/// Why an enqueue was rejected. The message is handed back to the caller.
#[derive(Debug)]
pub(crate) enum EnqueueError {
    /// The mailbox holds `capacity` unconsumed messages.
    Full(Message),
    /// The owning dispatch loop has exited and dropped its receiver.
    Closed(Message),
}

/// Creates a mailbox with room for `capacity` unconsumed messages.
///
/// `capacity` must be non-zero; callers validate it before getting here.
pub(crate) fn mailbox(capacity: usize) -> (MailboxSender, MailboxReceiver) {
    let (tx, rx) = mpsc::channel(capacity);
    (MailboxSender { tx }, MailboxReceiver { rx })
}

/// Writer half of a mailbox. Cheap to clone.
#[derive(Debug, Clone)]
pub(crate) struct MailboxSender {
    tx: mpsc::Sender<Message>,
}

impl MailboxSender {
    /// Enqueues without waiting.
    pub(crate) fn try_enqueue(&self, message: Message) -> Result<(), EnqueueError> {
        self.tx.try_send(message).map_err(|e| match e {
            TrySendError::Full(m) => EnqueueError::Full(m),
            TrySendError::Closed(m) => EnqueueError::Closed(m),
        })
    }

    /// Number of messages waiting to be dequeued.
    pub(crate) fn len(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }
}

/// Reader half of a mailbox, owned by the dispatch loop.
#[derive(Debug)]
pub(crate) struct MailboxReceiver {
    rx: mpsc::Receiver<Message>,
}

impl MailboxReceiver {
    /// Waits for the next message.
    ///
    /// Returns `None` once `shutdown` is cancelled, even if messages are still queued;
    /// the cancellation branch is polled first so a stopping loop never picks up more work.
    pub(crate) async fn dequeue(&mut self, shutdown: &CancellationToken) -> Option<Message> {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => None,
            msg = self.rx.recv() => msg,
        }
    }

    /// Closes the mailbox and drops everything still queued, returning how many
    /// messages were discarded.
    pub(crate) fn close_and_discard(&mut self) -> usize {
        self.rx.close();
        let mut discarded = 0;
        while self.rx.try_recv().is_ok() {
            discarded += 1;
        }
        discarded
    }
}
