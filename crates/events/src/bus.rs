//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] carries [`DeliveryNotice`]s -- committed offer events
//! addressed to one technician -- from the dispatch/claim/reconciliation
//! paths to the push delivery task. Publishing never blocks and never
//! fails: the database delivery log is the source of truth, the bus only
//! feeds the best-effort push channel.

use fieldline_core::types::DbId;
use tokio::sync::broadcast;

use crate::types::OfferEvent;

/// A committed event addressed to one technician's delivery channels.
#[derive(Debug, Clone)]
pub struct DeliveryNotice {
    pub technician_id: DbId,
    pub event: OfferEvent,
}

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// Wraps a [`broadcast::Sender`] so any number of subscribers can
/// independently receive every published notice. Designed to be shared via
/// `Arc<EventBus>` across the application.
pub struct EventBus {
    sender: broadcast::Sender<DeliveryNotice>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full the oldest un-consumed notices are dropped
    /// and slow receivers observe `RecvError::Lagged`. A lagged push task
    /// loses nothing durable -- polling replays from the delivery log.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish a notice to all current subscribers.
    ///
    /// If there are no active subscribers the notice is silently dropped;
    /// the event is already persisted for polling by the time it is
    /// published here.
    pub fn publish(&self, technician_id: DbId, event: OfferEvent) {
        // Ignore the SendError -- it only means there are zero receivers.
        let _ = self.sender.send(DeliveryNotice {
            technician_id,
            event,
        });
    }

    /// Subscribe to all notices published on this bus.
    pub fn subscribe(&self) -> broadcast::Receiver<DeliveryNotice> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
