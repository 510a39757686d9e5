//! The offer dispatcher: turns a `pending_assignment` job into a round of
//! pending offers.
//!
//! Each round fans out to `fan_out + (round - 1)` candidates, so an
//! unanswered job reaches a wider audience on every retry instead of
//! hammering the same technician. Offer creation, the job transition, and
//! the delivery-log rows commit in one transaction; push happens after.

use std::sync::Arc;

use fieldline_core::earnings;
use fieldline_core::error::CoreError;
use fieldline_core::types::DbId;
use fieldline_db::models::status::JobState;
use fieldline_db::models::technician::Technician;
use fieldline_db::repositories::{JobRepo, OfferRepo, TechnicianRepo};
use fieldline_db::DbPool;
use fieldline_events::{EventBus, OfferEvent, OfferPayload};

use crate::config::DispatchConfig;
use crate::delivery;

/// Strategy for ordering the candidate set before the fan-out cut.
///
/// The repository returns candidates in id order; a ranking reorders them
/// (e.g. by proximity or rating) without touching eligibility. The
/// default keeps id order, which gives stable round-robin-ish behavior
/// across rounds because answered technicians are excluded.
pub trait CandidateRanking: Send + Sync {
    fn rank(&self, candidates: Vec<Technician>) -> Vec<Technician>;
}

/// The default ranking: keep the repository's id order.
pub struct IdOrderRanking;

impl CandidateRanking for IdOrderRanking {
    fn rank(&self, candidates: Vec<Technician>) -> Vec<Technician> {
        candidates
    }
}

/// Why a dispatch attempt produced no offers.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// No eligible technician right now; the job stays queued and the
    /// reconciliation sweep retries.
    #[error("No eligible candidates for job {0}")]
    NoCandidates(DbId),

    /// The job is not in `pending_assignment` (already offered, claimed,
    /// or terminal).
    #[error("Job {0} is not awaiting dispatch")]
    NotEligible(DbId),

    /// The job does not exist.
    #[error("Job {0} not found")]
    JobNotFound(DbId),

    /// The job's amount fails the earnings precondition.
    #[error(transparent)]
    Earnings(#[from] CoreError),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// A successful dispatch round.
#[derive(Debug)]
pub struct DispatchOutcome {
    pub job_id: DbId,
    pub round: i32,
    pub offers_created: usize,
}

/// Creates offer rounds for jobs awaiting assignment.
pub struct OfferDispatcher {
    pool: DbPool,
    bus: Arc<EventBus>,
    config: DispatchConfig,
    ranking: Box<dyn CandidateRanking>,
}

impl OfferDispatcher {
    pub fn new(pool: DbPool, bus: Arc<EventBus>, config: DispatchConfig) -> Self {
        Self {
            pool,
            bus,
            config,
            ranking: Box::new(IdOrderRanking),
        }
    }

    /// Replace the candidate ranking strategy.
    pub fn with_ranking(mut self, ranking: Box<dyn CandidateRanking>) -> Self {
        self.ranking = ranking;
        self
    }

    /// Run one dispatch round for a job in `pending_assignment`.
    ///
    /// On success the job is `offered` and each selected technician has a
    /// pending offer, a delivery-log row, and (for connected clients) a
    /// push notification in flight.
    pub async fn dispatch(&self, job_id: DbId) -> Result<DispatchOutcome, DispatchError> {
        let job = JobRepo::find_by_id(&self.pool, job_id)
            .await?
            .ok_or(DispatchError::JobNotFound(job_id))?;
        if job.status_id != JobState::PendingAssignment.id() {
            return Err(DispatchError::NotEligible(job_id));
        }

        // Earnings preview for the offer payload; a job that cannot be
        // split must never be offered.
        let split = earnings::split(job.amount_minor, self.config.commission_percent)?;

        let candidates = self.ranking.rank(
            TechnicianRepo::candidates(&self.pool, job_id).await?,
        );
        if candidates.is_empty() {
            return Err(DispatchError::NoCandidates(job_id));
        }

        let mut tx = self.pool.begin().await?;

        // Conditional transition; a concurrent dispatcher loses here and
        // the round is abandoned without side effects.
        let Some(job) = JobRepo::mark_offered(&mut *tx, job_id).await? else {
            return Err(DispatchError::NotEligible(job_id));
        };
        let width = self.config.fan_out + (job.dispatch_round.max(1) as usize - 1);
        let deadline = chrono::Utc::now() + self.config.offer_timeout();

        let mut published = Vec::new();
        for technician in candidates.iter().take(width) {
            let offer =
                OfferRepo::create(&mut *tx, job_id, technician.id, deadline).await?;
            let event = OfferEvent::offer(
                offer.id,
                job_id,
                deadline,
                OfferPayload {
                    appliance: job.appliance.clone(),
                    address: job.address.clone(),
                    amount_minor: job.amount_minor,
                    technician_net_minor: split.net_minor,
                    commission_percent: self.config.commission_percent,
                },
            );
            delivery::record(&mut *tx, technician.id, &event).await?;
            published.push((technician.id, event));
        }

        tx.commit().await?;

        let offers_created = published.len();
        for (technician_id, event) in published {
            self.bus.publish(technician_id, event);
        }
        tracing::info!(
            job_id,
            round = job.dispatch_round,
            offers_created,
            "Dispatched offer round"
        );

        Ok(DispatchOutcome {
            job_id,
            round: job.dispatch_round,
            offers_created,
        })
    }
}
