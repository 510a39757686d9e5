//! The dispatch engine: offer fan-out, exclusive claim, job lifecycle.
//!
//! Everything that mutates job or offer state lives here; HTTP routes are
//! thin adapters over these services. Each mutation commits its delivery
//! log rows in the same transaction, then publishes to the bus for push.

mod claim;
mod dispatcher;
pub mod lifecycle;

pub use claim::{ClaimArbiter, ClaimError, ClaimOutcome};
pub use dispatcher::{CandidateRanking, DispatchError, DispatchOutcome, IdOrderRanking, OfferDispatcher};
