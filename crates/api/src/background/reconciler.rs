//! The reconciliation sweep.
//!
//! Timers are not trusted to fire and pushes are not trusted to arrive;
//! this poller re-derives everything from committed state on a fixed
//! interval. Each pass is idempotent, so overlapping or skipped passes
//! converge to the same result:
//!
//!   1. Expire pending offers whose deadline has passed.
//!   2. Requeue offered jobs whose entire round has resolved.
//!   3. Dispatch every job awaiting assignment.
//!   4. Mark silently-dead push sessions so delivery degrades to poll.

use std::sync::Arc;

use fieldline_db::repositories::{JobRepo, OfferRepo, TechnicianRepo};
use fieldline_db::DbPool;
use fieldline_events::{EventBus, OfferEvent};
use tokio_util::sync::CancellationToken;

use crate::config::DispatchConfig;
use crate::delivery;
use crate::engine::{DispatchError, OfferDispatcher};

/// Run the reconciliation sweep until cancelled.
pub async fn run_reconciler(
    pool: DbPool,
    bus: Arc<EventBus>,
    dispatcher: Arc<OfferDispatcher>,
    config: DispatchConfig,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval(config.reconcile_interval());
    // A pass that outlasts the interval should not cause a burst of
    // catch-up passes.
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    tracing::info!(
        interval_secs = config.reconcile_interval_secs,
        "Reconciliation sweep started"
    );

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Reconciliation sweep shutting down");
                break;
            }
            _ = interval.tick() => {
                if let Err(e) = sweep_once(&pool, &bus, &dispatcher, &config).await {
                    tracing::error!(error = %e, "Reconciliation pass failed");
                }
            }
        }
    }
}

/// One reconciliation pass. Public so tests can drive it directly.
pub async fn sweep_once(
    pool: &DbPool,
    bus: &Arc<EventBus>,
    dispatcher: &Arc<OfferDispatcher>,
    config: &DispatchConfig,
) -> Result<(), sqlx::Error> {
    expire_overdue_offers(pool, bus).await?;

    // Requeue fully-resolved rounds, then dispatch everything pending
    // (covers both freshly requeued jobs and jobs whose earlier dispatch
    // found no candidates).
    let requeued = JobRepo::requeue_orphaned(pool).await?;
    if !requeued.is_empty() {
        tracing::info!(count = requeued.len(), "Requeued jobs with no live offers");
    }
    for job_id in JobRepo::list_pending_assignment(pool).await? {
        match dispatcher.dispatch(job_id).await {
            Ok(outcome) => {
                tracing::debug!(job_id, round = outcome.round, "Reconciler dispatched job");
            }
            Err(DispatchError::NoCandidates(_)) => {
                tracing::debug!(job_id, "No candidates yet, job stays queued");
            }
            Err(DispatchError::NotEligible(_)) => {
                // A concurrent dispatch got there first.
            }
            Err(e) => tracing::error!(job_id, error = %e, "Reconciler dispatch failed"),
        }
    }

    let stale = TechnicianRepo::mark_stale_sessions_dead(pool, config.heartbeat_grace_secs).await?;
    if !stale.is_empty() {
        tracing::info!(count = stale.len(), "Marked stale push sessions dead");
    }

    Ok(())
}

/// Expire every overdue pending offer, logging one `job_expired` event per
/// offer in the same transaction as the expiry.
async fn expire_overdue_offers(pool: &DbPool, bus: &Arc<EventBus>) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    let expired = OfferRepo::expire_due(&mut *tx).await?;
    if expired.is_empty() {
        return tx.commit().await;
    }

    let mut published = Vec::with_capacity(expired.len());
    for offer in &expired {
        let event = OfferEvent::expired(offer.id, offer.job_id);
        delivery::record(&mut *tx, offer.technician_id, &event).await?;
        published.push((offer.technician_id, event));
    }
    tx.commit().await?;

    for (technician_id, event) in published {
        bus.publish(technician_id, event);
    }
    tracing::info!(count = expired.len(), "Expired overdue offers");
    Ok(())
}
