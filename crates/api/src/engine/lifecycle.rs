//! Post-claim job lifecycle: start, complete, cancel.
//!
//! These transitions are simpler than the claim protocol but follow the
//! same shape: a conditional `UPDATE` guards the edge, and any dependent
//! writes (busy-lock release, earnings finalization, retraction events)
//! share the transaction.

use std::sync::Arc;

use fieldline_core::error::CoreError;
use fieldline_core::types::DbId;
use fieldline_db::models::job::Job;
use fieldline_db::repositories::{EarningsRepo, JobRepo, OfferRepo, TechnicianRepo};
use fieldline_db::DbPool;
use fieldline_events::{EventBus, OfferEvent};

use crate::delivery;
use crate::error::{AppError, AppResult};

/// `claimed -> in_progress`, driven by the assigned technician.
pub async fn start(pool: &DbPool, job_id: DbId, technician_id: DbId) -> AppResult<Job> {
    ensure_assigned(pool, job_id, technician_id).await?;

    if !JobRepo::mark_started(pool, job_id).await? {
        return Err(CoreError::Conflict(format!("Job {job_id} is not in claimed state")).into());
    }
    tracing::info!(job_id, technician_id, "Job started");
    fetch_job(pool, job_id).await
}

/// `in_progress -> completed`, driven by the assigned technician.
///
/// Finalizes the earnings snapshot and releases the busy-lock in the same
/// transaction, so the technician is eligible for new offers the moment
/// the completion commits.
pub async fn complete(pool: &DbPool, job_id: DbId, technician_id: DbId) -> AppResult<Job> {
    ensure_assigned(pool, job_id, technician_id).await?;

    let accepted = OfferRepo::find_accepted_for_job(pool, job_id)
        .await?
        .ok_or_else(|| CoreError::Internal(format!("Job {job_id} has no accepted offer")))?;

    let mut tx = pool.begin().await?;
    if !JobRepo::mark_completed(&mut *tx, job_id).await? {
        return Err(CoreError::Conflict(format!("Job {job_id} is not in progress")).into());
    }
    EarningsRepo::finalize(&mut *tx, job_id).await?;
    TechnicianRepo::release_busy_by_offer(&mut *tx, accepted.id).await?;
    tx.commit().await?;

    tracing::info!(job_id, technician_id, "Job completed, earnings finalized");
    fetch_job(pool, job_id).await
}

/// `any non-terminal -> cancelled`, triggered by the booking side.
///
/// Pending offers are superseded with a `job_cancelled` retraction, and a
/// busy-lock held through an accepted offer is released. The earnings
/// snapshot (if any) stays unfinalized as an audit record.
pub async fn cancel(pool: &DbPool, bus: &Arc<EventBus>, job_id: DbId) -> AppResult<Job> {
    let mut tx = pool.begin().await?;
    if !JobRepo::mark_cancelled(&mut *tx, job_id).await? {
        // Either missing or already terminal; tell the caller which.
        return match JobRepo::find_by_id(pool, job_id).await? {
            Some(_) => Err(CoreError::Conflict(format!("Job {job_id} is already terminal")).into()),
            None => Err(CoreError::NotFound {
                entity: "Job",
                id: job_id,
            }
            .into()),
        };
    }

    let retracted = OfferRepo::supersede_pending_for_job(&mut *tx, job_id).await?;
    let mut published = Vec::with_capacity(retracted.len());
    for offer in &retracted {
        let event = OfferEvent::cancelled(offer.id, job_id);
        delivery::record(&mut *tx, offer.technician_id, &event).await?;
        published.push((offer.technician_id, event));
    }

    if let Some(accepted) = OfferRepo::find_accepted_for_job(pool, job_id).await? {
        TechnicianRepo::release_busy_by_offer(&mut *tx, accepted.id).await?;
    }

    tx.commit().await?;

    for (technician_id, event) in published {
        bus.publish(technician_id, event);
    }
    tracing::info!(job_id, retracted = retracted.len(), "Job cancelled");
    fetch_job(pool, job_id).await
}

/// Verify the caller holds the job's accepted offer.
async fn ensure_assigned(pool: &DbPool, job_id: DbId, technician_id: DbId) -> AppResult<()> {
    match TechnicianRepo::find_assigned_to_job(pool, job_id).await? {
        Some(assigned) if assigned == technician_id => Ok(()),
        Some(_) => Err(CoreError::Forbidden(format!(
            "Job {job_id} is assigned to another technician"
        ))
        .into()),
        None => Err(CoreError::Conflict(format!("Job {job_id} has no assigned technician")).into()),
    }
}

async fn fetch_job(pool: &DbPool, job_id: DbId) -> AppResult<Job> {
    JobRepo::find_by_id(pool, job_id)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::NotFound {
                entity: "Job",
                id: job_id,
            })
        })
}
