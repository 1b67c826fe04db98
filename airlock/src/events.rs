//! Event notifications for external observers.
//!
//! Lifecycle transitions and successful writes are broadcast on a bounded
//! channel. [`Database::subscribe`](crate::Database::subscribe) returns an
//! [`EventSubscriber`]; dropping it unsubscribes. A subscriber that falls
//! behind skips the missed events and keeps receiving.

use tokio::sync::broadcast;

use crate::encoding::Datum;
use crate::error::Error;
use crate::model::BatchEntry;

/// A notification emitted by a database handle.
#[derive(Debug, Clone)]
pub enum Event {
    /// The open transition has started.
    Opening,
    /// The engine opened successfully.
    Open,
    /// The handle is installed and deferred operations have replayed.
    Ready,
    /// The close transition has started.
    Closing,
    /// The engine closed and the handle was released.
    Closed,
    /// A put committed; carries the original, pre-encoding key and value.
    Put { key: Datum, value: Datum },
    /// A delete committed; carries the original key.
    Del { key: Datum },
    /// A batch committed; carries its operation log.
    Batch(Vec<BatchEntry>),
    /// An error was dispatched with no live completion receiver.
    Error(Error),
}

/// Error type for event subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventError {
    /// The database handle was dropped; no more events will arrive.
    Closed,
}

impl std::fmt::Display for EventError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventError::Closed => write!(f, "event channel closed"),
        }
    }
}

impl std::error::Error for EventError {}

/// Broadcast sender shared by all components of one handle.
#[derive(Clone)]
pub(crate) struct EventBus {
    tx: broadcast::Sender<Event>,
}

impl EventBus {
    pub(crate) fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Emits an event. Having no subscribers is not an error.
    pub(crate) fn emit(&self, event: Event) {
        let _ = self.tx.send(event);
    }

    pub(crate) fn subscribe(&self) -> EventSubscriber {
        EventSubscriber {
            rx: self.tx.subscribe(),
        }
    }
}

/// Receives [`Event`] broadcasts from a database handle.
pub struct EventSubscriber {
    rx: broadcast::Receiver<Event>,
}

impl EventSubscriber {
    /// Receives the next event.
    ///
    /// A lagged subscriber skips the events it missed and resumes with the
    /// oldest retained one.
    pub async fn recv(&mut self) -> Result<Event, EventError> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Ok(event),
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return Err(EventError::Closed),
            }
        }
    }
}
