use std::collections::VecDeque;
use std::sync::Mutex;

use serde::Serialize;
use tracing::{debug, error, warn};

use super::{EmailMessage, MailTransport, Notifier, NotifyError};

#[derive(Debug, Clone)]
struct QueuedEmail {
    message: EmailMessage,
    attempts: u32,
}

/// Outcome of one [`OutboundQueue::flush`] pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FlushReport {
    pub delivered: usize,
    pub requeued: usize,
    pub dropped: usize,
}

/// Retrying outbox. `notify` only enqueues; `flush` attempts delivery and keeps failed messages
/// until they have been tried `max_attempts` times.
#[derive(Debug)]
pub struct OutboundQueue {
    pending: Mutex<VecDeque<QueuedEmail>>,
    max_attempts: u32,
}

impl OutboundQueue {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            pending: Mutex::new(VecDeque::new()),
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.pending.lock().map(|queue| queue.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copies of the queued messages, oldest first.
    pub fn pending_messages(&self) -> Vec<EmailMessage> {
        self.pending
            .lock()
            .map(|queue| queue.iter().map(|entry| entry.message.clone()).collect())
            .unwrap_or_default()
    }

    pub fn flush(&self, transport: &dyn MailTransport) -> FlushReport {
        let batch: Vec<QueuedEmail> = match self.pending.lock() {
            Ok(mut queue) => queue.drain(..).collect(),
            Err(_) => {
                error!("outbound queue mutex poisoned; skipping flush");
                return FlushReport::default();
            }
        };

        let mut report = FlushReport::default();
        let mut retry = Vec::new();
        for mut entry in batch {
            entry.attempts += 1;
            match transport.deliver(&entry.message) {
                Ok(()) => {
                    debug!(to = %entry.message.to, subject = %entry.message.subject, "email delivered");
                    report.delivered += 1;
                }
                Err(err) if err.is_permanent() => {
                    error!(to = %entry.message.to, error = %err, "email dropped; recipient rejected");
                    report.dropped += 1;
                }
                Err(err) if entry.attempts < self.max_attempts => {
                    warn!(to = %entry.message.to, attempts = entry.attempts, error = %err, "email delivery failed; will retry");
                    report.requeued += 1;
                    retry.push(entry);
                }
                Err(err) => {
                    error!(to = %entry.message.to, attempts = entry.attempts, error = %err, "email dropped after final attempt");
                    report.dropped += 1;
                }
            }
        }

        if !retry.is_empty() {
            if let Ok(mut queue) = self.pending.lock() {
                for entry in retry.into_iter().rev() {
                    queue.push_front(entry);
                }
            }
        }

        report
    }
}

impl Notifier for OutboundQueue {
    fn notify(&self, message: EmailMessage) -> Result<(), NotifyError> {
        let mut queue = self
            .pending
            .lock()
            .map_err(|_| NotifyError::QueueUnavailable)?;
        queue.push_back(QueuedEmail {
            message,
            attempts: 0,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Fails the first `failures` deliveries, then succeeds.
    struct FlakyTransport {
        failures: usize,
        calls: AtomicUsize,
    }

    impl MailTransport for FlakyTransport {
        fn deliver(&self, _message: &EmailMessage) -> Result<(), NotifyError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                Err(NotifyError::Transport("connection reset".to_string()))
            } else {
                Ok(())
            }
        }
    }

    fn message(to: &str) -> EmailMessage {
        EmailMessage {
            to: to.to_string(),
            to_name: None,
            subject: "Maintenance request".to_string(),
            body: "Leaking faucet".to_string(),
        }
    }

    #[test]
    fn failed_delivery_is_retried_on_next_flush() {
        let queue = OutboundQueue::new(3);
        queue.notify(message("vendor@example.com")).expect("enqueue");

        let transport = FlakyTransport {
            failures: 1,
            calls: AtomicUsize::new(0),
        };
        let first = queue.flush(&transport);
        assert_eq!(first.requeued, 1);
        assert_eq!(queue.len(), 1);

        let second = queue.flush(&transport);
        assert_eq!(second.delivered, 1);
        assert!(queue.is_empty());
    }

    #[test]
    fn message_is_dropped_after_max_attempts() {
        let queue = OutboundQueue::new(2);
        queue.notify(message("vendor@example.com")).expect("enqueue");
        let transport = FlakyTransport {
            failures: usize::MAX,
            calls: AtomicUsize::new(0),
        };

        assert_eq!(queue.flush(&transport).requeued, 1);
        let last = queue.flush(&transport);
        assert_eq!(last.dropped, 1);
        assert!(queue.is_empty());
    }

    struct RejectingTransport;

    impl MailTransport for RejectingTransport {
        fn deliver(&self, message: &EmailMessage) -> Result<(), NotifyError> {
            Err(NotifyError::Address(message.to.clone()))
        }
    }

    #[test]
    fn rejected_recipient_is_dropped_without_retrying() {
        let queue = OutboundQueue::new(5);
        queue.notify(message("not an address")).expect("enqueue");

        let report = queue.flush(&RejectingTransport);
        assert_eq!(report.dropped, 1);
        assert_eq!(report.requeued, 0);
        assert!(queue.is_empty());
    }

    #[test]
    fn retried_messages_keep_their_place_ahead_of_new_ones() {
        let queue = OutboundQueue::new(5);
        queue.notify(message("first@example.com")).expect("enqueue");
        let transport = FlakyTransport {
            failures: 1,
            calls: AtomicUsize::new(0),
        };
        queue.flush(&transport);
        queue.notify(message("second@example.com")).expect("enqueue");

        let order: Vec<String> = queue
            .pending_messages()
            .into_iter()
            .map(|message| message.to)
            .collect();
        assert_eq!(order, vec!["first@example.com", "second@example.com"]);
    }
}
