//! Cancellable wait for an interactive user reply.
//!
//! Replaces a poll-a-shared-flag loop with a oneshot channel: the
//! inbound event handler fulfils the gate, the waiting operation
//! suspends on the receiver under a deadline. Dropping the sender
//! cancels the wait instead of letting it run out the clock.

use crate::error::OpError;
use std::time::Duration;
use tokio::sync::oneshot;

/// Default deadline for a user to answer a clarifying question.
pub const DEFAULT_REPLY_TIMEOUT: Duration = Duration::from_secs(100);

/// Fulfilment half of a reply gate. Held by the event handler that
/// receives the user's response.
pub struct ReplySender {
    tx: oneshot::Sender<String>,
}

impl ReplySender {
    /// Deliver the user's reply. Returns the reply back if the waiter
    /// already gave up.
    pub fn fulfil(self, reply: String) -> Result<(), String> {
        self.tx.send(reply)
    }
}

/// Waiting half of a reply gate.
pub struct ReplyWait {
    rx: oneshot::Receiver<String>,
}

impl ReplyWait {
    /// Suspend until the reply arrives or the deadline passes.
    pub async fn wait(self, timeout: Duration) -> Result<String, OpError> {
        match tokio::time::timeout(timeout, self.rx).await {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(_)) => Err(OpError::Cancelled),
            Err(_) => Err(OpError::Timeout(timeout)),
        }
    }
}

/// Create a linked sender/waiter pair for one question.
#[must_use]
pub fn reply_gate() -> (ReplySender, ReplyWait) {
    let (tx, rx) = oneshot::channel();
    (ReplySender { tx }, ReplyWait { rx })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delivered_reply_is_returned() {
        let (sender, waiter) = reply_gate();
        sender.fulfil("yes, S maps to Susceptible".to_string()).unwrap();
        let reply = waiter.wait(DEFAULT_REPLY_TIMEOUT).await.unwrap();
        assert_eq!(reply, "yes, S maps to Susceptible");
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_produces_a_timeout_error() {
        let (sender, waiter) = reply_gate();
        let result = waiter.wait(DEFAULT_REPLY_TIMEOUT).await;
        assert!(matches!(result, Err(OpError::Timeout(d)) if d == DEFAULT_REPLY_TIMEOUT));
        drop(sender);
    }

    #[tokio::test]
    async fn dropped_sender_cancels_the_wait() {
        let (sender, waiter) = reply_gate();
        drop(sender);
        let result = waiter.wait(DEFAULT_REPLY_TIMEOUT).await;
        assert!(matches!(result, Err(OpError::Cancelled)));
    }
}
