//! Broadcast channel for membership change notifications.
//!
//! Mutations publish into the bus; any number of observers (audit trails,
//! cache invalidation, replication glue) can listen. Emission never blocks a
//! mutation: with no receivers attached the notification is dropped, and a
//! receiver that falls behind skips past the overwritten backlog instead of
//! stalling the writer.

use tokio::sync::broadcast;

use crate::events::MembershipChangeEvent;

/// Notifications buffered per receiver before the oldest are overwritten.
const EVENT_BUFFER: usize = 1024;

/// Fan-out channel carrying [`MembershipChangeEvent`]s.
///
/// Cloning yields another publishing handle onto the same channel.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<MembershipChangeEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(EVENT_BUFFER)
    }

    /// Bus with a custom per-receiver buffer size.
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Attach an observer; it sees only events emitted after this call.
    pub fn subscribe(&self) -> EventSubscriber {
        EventSubscriber {
            rx: self.tx.subscribe(),
        }
    }

    /// Publish a change notification.
    pub fn emit(&self, event: MembershipChangeEvent) {
        let _ = self.tx.send(event);
    }

    /// Number of currently attached observers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiving side of the bus.
pub struct EventSubscriber {
    rx: broadcast::Receiver<MembershipChangeEvent>,
}

impl EventSubscriber {
    /// Wait for the next notification; `None` once every bus handle is gone.
    ///
    /// A receiver that lagged logs how many events it skipped and resumes
    /// with the oldest one still buffered.
    pub async fn recv(&mut self) -> Option<MembershipChangeEvent> {
        use broadcast::error::RecvError;
        loop {
            match self.rx.recv().await {
                Ok(event) => break Some(event),
                Err(RecvError::Closed) => break None,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "membership event subscriber fell behind");
                }
            }
        }
    }

    /// Poll for a pending notification without waiting.
    pub fn try_recv(&mut self) -> Option<MembershipChangeEvent> {
        self.rx.try_recv().ok()
    }
}
