//! The claim arbiter: the exclusive accept/reject protocol for offers.
//!
//! Exactly one technician can win a job. The whole decision is a single
//! conditional `UPDATE` on the offer row; everything that follows (job
//! transition, busy-lock, earnings snapshot, sibling supersede, delivery
//! log) rides the same transaction so a crash can never leave a half
//! claimed job. Losing the race is a normal outcome, not an error.

use std::sync::Arc;

use fieldline_core::earnings;
use fieldline_core::error::CoreError;
use fieldline_core::types::DbId;
use fieldline_db::models::job::Job;
use fieldline_db::models::offer::Offer;
use fieldline_db::repositories::{EarningsRepo, JobRepo, OfferRepo, TechnicianRepo};
use fieldline_db::DbPool;
use fieldline_events::{EventBus, OfferEvent};

use crate::delivery;

/// The resolution of an accept or reject attempt.
#[derive(Debug)]
pub enum ClaimOutcome {
    /// This technician won the job.
    Accepted { offer: Offer, job: Job },
    /// The offer was rejected by its technician.
    Rejected { offer: Offer },
    /// The offer was already accepted by someone else, expired,
    /// superseded, or otherwise resolved before this attempt landed.
    AlreadyResolved,
}

/// Failures of the claim protocol that are genuine errors (unlike a lost
/// race, which is [`ClaimOutcome::AlreadyResolved`]).
#[derive(Debug, thiserror::Error)]
pub enum ClaimError {
    /// The offer does not exist.
    #[error("Offer {0} not found")]
    OfferNotFound(DbId),

    /// The offer belongs to a different technician.
    #[error("Offer {0} belongs to another technician")]
    NotOfferOwner(DbId),

    /// The technician already holds an accepted offer. The candidate
    /// filter makes this unreachable in normal operation; it is kept as a
    /// hard stop against double booking.
    #[error("Technician {0} is already busy with another job")]
    AlreadyBusy(DbId),

    #[error(transparent)]
    Earnings(#[from] CoreError),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Serializes claim decisions for all offers.
pub struct ClaimArbiter {
    pool: DbPool,
    bus: Arc<EventBus>,
    commission_percent: u8,
}

impl ClaimArbiter {
    pub fn new(pool: DbPool, bus: Arc<EventBus>, commission_percent: u8) -> Self {
        Self {
            pool,
            bus,
            commission_percent,
        }
    }

    /// Attempt to accept an offer on behalf of its technician.
    pub async fn accept(
        &self,
        technician_id: DbId,
        offer_id: DbId,
    ) -> Result<ClaimOutcome, ClaimError> {
        let offer = OfferRepo::find_by_id(&self.pool, offer_id)
            .await?
            .ok_or(ClaimError::OfferNotFound(offer_id))?;
        if offer.technician_id != technician_id {
            return Err(ClaimError::NotOfferOwner(offer_id));
        }

        let mut tx = self.pool.begin().await?;

        // Lock order is jobs before offers, matching the cancellation
        // path. Without this, two sibling accepts lock their own offer
        // rows first and then cycle on the job row and each other's
        // siblings, and Postgres aborts one of them.
        if !JobRepo::lock_row(&mut *tx, offer.job_id).await? {
            return Ok(ClaimOutcome::AlreadyResolved);
        }

        // The decisive step. Zero rows matched means the offer is no
        // longer pending (or its deadline passed) -- the caller lost.
        let Some(offer) = OfferRepo::try_accept(&mut *tx, offer_id).await? else {
            return Ok(ClaimOutcome::AlreadyResolved);
        };

        // The job must still be `offered`; a cancellation that landed
        // between dispatch and this accept wins over the accept.
        let Some(job) = JobRepo::mark_claimed(&mut *tx, offer.job_id).await? else {
            tracing::warn!(
                offer_id,
                job_id = offer.job_id,
                "Offer accepted but job left offered state, rolling back"
            );
            return Ok(ClaimOutcome::AlreadyResolved);
        };

        if !TechnicianRepo::lock_busy(&mut *tx, technician_id, offer_id).await? {
            return Err(ClaimError::AlreadyBusy(technician_id));
        }

        // Earnings are snapshotted here, with the percent in force at
        // claim time; later configuration changes never touch this job.
        let split = earnings::split(job.amount_minor, self.commission_percent)?;
        EarningsRepo::snapshot(
            &mut *tx,
            job.id,
            technician_id,
            job.amount_minor,
            self.commission_percent,
            split,
        )
        .await?;

        // Retract every losing sibling and log the retraction for poll.
        let losers = OfferRepo::supersede_siblings(&mut *tx, job.id, offer_id).await?;
        let mut published = Vec::with_capacity(losers.len());
        for loser in &losers {
            let event = OfferEvent::superseded(loser.id, job.id);
            delivery::record(&mut *tx, loser.technician_id, &event).await?;
            published.push((loser.technician_id, event));
        }

        tx.commit().await?;

        for (loser_technician_id, event) in published {
            self.bus.publish(loser_technician_id, event);
        }
        tracing::info!(
            offer_id,
            job_id = job.id,
            technician_id,
            superseded = losers.len(),
            "Offer accepted, job claimed"
        );

        Ok(ClaimOutcome::Accepted { offer, job })
    }

    /// Reject an offer on behalf of its technician.
    ///
    /// Only touches the one offer row; the reconciliation sweep requeues
    /// the job once every offer of the round has resolved.
    pub async fn reject(
        &self,
        technician_id: DbId,
        offer_id: DbId,
        reason: Option<&str>,
    ) -> Result<ClaimOutcome, ClaimError> {
        let offer = OfferRepo::find_by_id(&self.pool, offer_id)
            .await?
            .ok_or(ClaimError::OfferNotFound(offer_id))?;
        if offer.technician_id != technician_id {
            return Err(ClaimError::NotOfferOwner(offer_id));
        }

        match OfferRepo::reject(&self.pool, offer_id, reason).await? {
            Some(offer) => {
                tracing::info!(offer_id, job_id = offer.job_id, technician_id, "Offer rejected");
                Ok(ClaimOutcome::Rejected { offer })
            }
            None => Ok(ClaimOutcome::AlreadyResolved),
        }
    }
}
