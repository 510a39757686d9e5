//! The offer event wire format.
//!
//! A closed tagged union: every consumer matches exhaustively on the event
//! kind instead of duck-typing on optional fields. The same JSON shape is
//! used for WebSocket push and for the poll endpoint, and `event_id` is the
//! cross-channel dedup key -- a client that receives an event on both
//! channels drops the second copy.

use fieldline_core::types::{DbId, MinorUnits, Timestamp};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Job details carried by a `job_offer` event so the technician's client
/// can render the invitation without a follow-up fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfferPayload {
    pub appliance: String,
    pub address: String,
    pub amount_minor: MinorUnits,
    pub technician_net_minor: MinorUnits,
    pub commission_percent: u8,
}

/// A delivery event about one offer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OfferEvent {
    /// A new time-bounded invitation to claim a job.
    JobOffer {
        event_id: Uuid,
        offer_id: DbId,
        job_id: DbId,
        deadline: Timestamp,
        payload: OfferPayload,
    },
    /// Another technician claimed the job; retract the in-flight alert.
    JobSuperseded {
        event_id: Uuid,
        offer_id: DbId,
        job_id: DbId,
    },
    /// The job was cancelled while the offer was pending.
    JobCancelled {
        event_id: Uuid,
        offer_id: DbId,
        job_id: DbId,
    },
    /// The offer's deadline passed without a response.
    JobExpired {
        event_id: Uuid,
        offer_id: DbId,
        job_id: DbId,
    },
}

impl OfferEvent {
    /// A fresh `job_offer` event with a generated dedup id.
    pub fn offer(
        offer_id: DbId,
        job_id: DbId,
        deadline: Timestamp,
        payload: OfferPayload,
    ) -> Self {
        Self::JobOffer {
            event_id: Uuid::new_v4(),
            offer_id,
            job_id,
            deadline,
            payload,
        }
    }

    /// A fresh `job_superseded` event.
    pub fn superseded(offer_id: DbId, job_id: DbId) -> Self {
        Self::JobSuperseded {
            event_id: Uuid::new_v4(),
            offer_id,
            job_id,
        }
    }

    /// A fresh `job_cancelled` event.
    pub fn cancelled(offer_id: DbId, job_id: DbId) -> Self {
        Self::JobCancelled {
            event_id: Uuid::new_v4(),
            offer_id,
            job_id,
        }
    }

    /// A fresh `job_expired` event.
    pub fn expired(offer_id: DbId, job_id: DbId) -> Self {
        Self::JobExpired {
            event_id: Uuid::new_v4(),
            offer_id,
            job_id,
        }
    }

    /// The cross-channel dedup key.
    pub fn event_id(&self) -> Uuid {
        match self {
            Self::JobOffer { event_id, .. }
            | Self::JobSuperseded { event_id, .. }
            | Self::JobCancelled { event_id, .. }
            | Self::JobExpired { event_id, .. } => *event_id,
        }
    }

    /// The offer this event is about.
    pub fn offer_id(&self) -> DbId {
        match self {
            Self::JobOffer { offer_id, .. }
            | Self::JobSuperseded { offer_id, .. }
            | Self::JobCancelled { offer_id, .. }
            | Self::JobExpired { offer_id, .. } => *offer_id,
        }
    }

    /// The job this event is about.
    pub fn job_id(&self) -> DbId {
        match self {
            Self::JobOffer { job_id, .. }
            | Self::JobSuperseded { job_id, .. }
            | Self::JobCancelled { job_id, .. }
            | Self::JobExpired { job_id, .. } => *job_id,
        }
    }
}
