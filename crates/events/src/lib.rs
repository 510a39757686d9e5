//! Fieldline event types and in-process bus.
//!
//! [`OfferEvent`] is the single wire format for both push (WebSocket) and
//! poll delivery; [`EventBus`] fans committed events out to the push task.

pub mod bus;
pub mod types;

pub use bus::{DeliveryNotice, EventBus};
pub use types::{OfferEvent, OfferPayload};
