//! Integration tests for the exclusive claim protocol at the repository
//! level: conditional accept, deadline enforcement, sibling supersede, the
//! availability busy-lock, and the single earnings snapshot.

use chrono::{Duration, Utc};
use fieldline_core::earnings;
use fieldline_db::models::job::NewJob;
use fieldline_db::models::status::{JobState, OfferStatus};
use fieldline_db::repositories::{EarningsRepo, JobRepo, OfferRepo, TechnicianRepo};
use sqlx::PgPool;

async fn seed_technician(pool: &PgPool, name: &str) -> i64 {
    let tech = TechnicianRepo::register(pool, name).await.unwrap();
    TechnicianRepo::set_availability(pool, tech.id, true)
        .await
        .unwrap();
    tech.id
}

async fn seed_offered_job(pool: &PgPool) -> i64 {
    let job = JobRepo::create(
        pool,
        &NewJob {
            appliance: "washing machine".into(),
            address: "4 Mill Lane".into(),
            amount_minor: 12_000,
        },
    )
    .await
    .unwrap();
    JobRepo::mark_offered(pool, job.id).await.unwrap().unwrap();
    job.id
}

// ---------------------------------------------------------------------------
// Test: the conditional accept admits exactly one winner
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn accept_is_exclusive(pool: PgPool) {
    let tech = seed_technician(&pool, "Avery").await;
    let job_id = seed_offered_job(&pool).await;
    let deadline = Utc::now() + Duration::seconds(30);
    let offer = OfferRepo::create(&pool, job_id, tech, deadline).await.unwrap();

    let first = OfferRepo::try_accept(&pool, offer.id).await.unwrap();
    assert!(first.is_some(), "first accept should win");
    assert_eq!(first.unwrap().status_id, OfferStatus::Accepted.id());

    // Replay of the same accept matches zero rows.
    let second = OfferRepo::try_accept(&pool, offer.id).await.unwrap();
    assert!(second.is_none(), "second accept must lose");
}

// ---------------------------------------------------------------------------
// Test: an offer at or past its deadline cannot be accepted
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn accept_after_deadline_loses(pool: PgPool) {
    let tech = seed_technician(&pool, "Blake").await;
    let job_id = seed_offered_job(&pool).await;
    let past = Utc::now() - Duration::seconds(1);
    let offer = OfferRepo::create(&pool, job_id, tech, past).await.unwrap();

    let result = OfferRepo::try_accept(&pool, offer.id).await.unwrap();
    assert!(result.is_none(), "stale offer must not be acceptable");

    // The reject path applies the same guard.
    let result = OfferRepo::reject(&pool, offer.id, Some("too far")).await.unwrap();
    assert!(result.is_none());
}

// ---------------------------------------------------------------------------
// Test: expire_due resolves overdue offers and only those
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn expire_due_targets_only_overdue_offers(pool: PgPool) {
    let tech_a = seed_technician(&pool, "Avery").await;
    let tech_b = seed_technician(&pool, "Blake").await;
    let job_id = seed_offered_job(&pool).await;

    let overdue = OfferRepo::create(&pool, job_id, tech_a, Utc::now() - Duration::seconds(5))
        .await
        .unwrap();
    let live = OfferRepo::create(&pool, job_id, tech_b, Utc::now() + Duration::seconds(60))
        .await
        .unwrap();

    let expired = OfferRepo::expire_due(&pool).await.unwrap();
    assert_eq!(expired.len(), 1);
    assert_eq!(expired[0].id, overdue.id);

    let live = OfferRepo::find_by_id(&pool, live.id).await.unwrap().unwrap();
    assert_eq!(live.status_id, OfferStatus::Pending.id());

    // A second sweep finds nothing; expiry is idempotent.
    assert!(OfferRepo::expire_due(&pool).await.unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Test: supersede_siblings retracts every other pending offer
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn supersede_siblings_spares_the_winner(pool: PgPool) {
    let winner_tech = seed_technician(&pool, "Avery").await;
    let loser_tech = seed_technician(&pool, "Blake").await;
    let job_id = seed_offered_job(&pool).await;
    let deadline = Utc::now() + Duration::seconds(30);

    let winner = OfferRepo::create(&pool, job_id, winner_tech, deadline).await.unwrap();
    let loser = OfferRepo::create(&pool, job_id, loser_tech, deadline).await.unwrap();

    OfferRepo::try_accept(&pool, winner.id).await.unwrap().unwrap();
    let superseded = OfferRepo::supersede_siblings(&pool, job_id, winner.id)
        .await
        .unwrap();

    assert_eq!(superseded.len(), 1);
    assert_eq!(superseded[0].id, loser.id);
    assert_eq!(superseded[0].status_id, OfferStatus::Superseded.id());

    let winner = OfferRepo::find_by_id(&pool, winner.id).await.unwrap().unwrap();
    assert_eq!(winner.status_id, OfferStatus::Accepted.id());
}

// ---------------------------------------------------------------------------
// Test: at most one accepted offer per job (partial unique index)
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn second_accepted_offer_violates_unique_index(pool: PgPool) {
    let tech_a = seed_technician(&pool, "Avery").await;
    let tech_b = seed_technician(&pool, "Blake").await;
    let job_id = seed_offered_job(&pool).await;
    let deadline = Utc::now() + Duration::seconds(30);

    let first = OfferRepo::create(&pool, job_id, tech_a, deadline).await.unwrap();
    let second = OfferRepo::create(&pool, job_id, tech_b, deadline).await.unwrap();
    OfferRepo::try_accept(&pool, first.id).await.unwrap().unwrap();

    // Force the second offer to accepted, bypassing the protocol; the
    // index is the last line of defense.
    let result = sqlx::query("UPDATE offers SET status_id = $2 WHERE id = $1")
        .bind(second.id)
        .bind(OfferStatus::Accepted.id())
        .execute(&pool)
        .await;
    assert!(result.is_err(), "partial unique index must refuse a second accept");
}

// ---------------------------------------------------------------------------
// Test: busy-lock is compare-and-swap and blocks availability toggles
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn busy_lock_blocks_second_lock_and_toggle(pool: PgPool) {
    let tech = seed_technician(&pool, "Avery").await;
    let job_id = seed_offered_job(&pool).await;
    let deadline = Utc::now() + Duration::seconds(30);
    let offer = OfferRepo::create(&pool, job_id, tech, deadline).await.unwrap();
    let other = OfferRepo::create(&pool, job_id, tech, deadline).await.unwrap();

    assert!(TechnicianRepo::lock_busy(&pool, tech, offer.id).await.unwrap());
    assert!(
        !TechnicianRepo::lock_busy(&pool, tech, other.id).await.unwrap(),
        "second lock must fail"
    );
    assert!(
        !TechnicianRepo::set_availability(&pool, tech, false).await.unwrap(),
        "toggle must be refused while locked"
    );

    assert!(TechnicianRepo::release_busy_by_offer(&pool, offer.id).await.unwrap());
    assert!(TechnicianRepo::set_availability(&pool, tech, false).await.unwrap());
}

// ---------------------------------------------------------------------------
// Test: one earnings snapshot per job, finalized once
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn earnings_snapshot_is_unique_per_job(pool: PgPool) {
    let tech = seed_technician(&pool, "Avery").await;
    let job_id = seed_offered_job(&pool).await;
    let split = earnings::split(12_000, 30).unwrap();

    let record = EarningsRepo::snapshot(&pool, job_id, tech, 12_000, 30, split)
        .await
        .unwrap();
    assert_eq!(record.commission_minor, 3_600);
    assert_eq!(record.net_minor, 8_400);
    assert!(!record.finalized);

    let split = earnings::split(12_000, 30).unwrap();
    let duplicate = EarningsRepo::snapshot(&pool, job_id, tech, 12_000, 30, split).await;
    assert!(duplicate.is_err(), "second snapshot must hit uq_earnings_records_job");

    assert!(EarningsRepo::finalize(&pool, job_id).await.unwrap());
    assert!(!EarningsRepo::finalize(&pool, job_id).await.unwrap());

    let record = EarningsRepo::find_by_job(&pool, job_id).await.unwrap().unwrap();
    assert!(record.finalized);
}

// ---------------------------------------------------------------------------
// Test: mark_claimed only fires from offered
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn mark_claimed_requires_offered_state(pool: PgPool) {
    let job = JobRepo::create(
        &pool,
        &NewJob {
            appliance: "oven".into(),
            address: "9 Dock Rd".into(),
            amount_minor: 5_000,
        },
    )
    .await
    .unwrap();

    // Still pending_assignment: no transition.
    assert!(JobRepo::mark_claimed(&pool, job.id).await.unwrap().is_none());

    JobRepo::mark_offered(&pool, job.id).await.unwrap().unwrap();
    let claimed = JobRepo::mark_claimed(&pool, job.id).await.unwrap().unwrap();
    assert_eq!(claimed.status_id, JobState::Claimed.id());
    assert!(claimed.claimed_at.is_some());

    // Replay: no longer offered.
    assert!(JobRepo::mark_claimed(&pool, job.id).await.unwrap().is_none());
}

// ---------------------------------------------------------------------------
// Test: concurrent accepts on the same offer admit exactly one winner
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn concurrent_accepts_admit_one_winner(pool: PgPool) {
    let tech = seed_technician(&pool, "Avery").await;
    let job_id = seed_offered_job(&pool).await;
    let deadline = Utc::now() + Duration::seconds(30);
    let offer = OfferRepo::create(&pool, job_id, tech, deadline).await.unwrap();

    let (a, b) = tokio::join!(
        OfferRepo::try_accept(&pool, offer.id),
        OfferRepo::try_accept(&pool, offer.id),
    );
    let a = a.unwrap();
    let b = b.unwrap();

    let winners = [a.is_some(), b.is_some()].iter().filter(|w| **w).count();
    assert_eq!(winners, 1, "exactly one concurrent accept must win");
}

// ---------------------------------------------------------------------------
// Test: sibling accepts serialize on the job lock instead of deadlocking
// ---------------------------------------------------------------------------

/// The full claim statement order: job row lock, conditional accept,
/// job transition, sibling supersede, commit.
async fn run_claim_transaction(
    pool: PgPool,
    job_id: i64,
    offer_id: i64,
) -> Result<bool, sqlx::Error> {
    let mut tx = pool.begin().await?;
    JobRepo::lock_row(&mut *tx, job_id).await?;
    let Some(offer) = OfferRepo::try_accept(&mut *tx, offer_id).await? else {
        return Ok(false);
    };
    JobRepo::mark_claimed(&mut *tx, job_id).await?;
    OfferRepo::supersede_siblings(&mut *tx, job_id, offer.id).await?;
    tx.commit().await?;
    Ok(true)
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn sibling_accepts_serialize_on_the_job_lock(pool: PgPool) {
    let tech_a = seed_technician(&pool, "Avery").await;
    let tech_b = seed_technician(&pool, "Blake").await;
    let job_id = seed_offered_job(&pool).await;
    let deadline = Utc::now() + Duration::seconds(30);

    let offer_a = OfferRepo::create(&pool, job_id, tech_a, deadline).await.unwrap();
    let offer_b = OfferRepo::create(&pool, job_id, tech_b, deadline).await.unwrap();

    // Without the up-front job lock this ordering cycles: each side locks
    // its own offer row, then blocks on the job row or the sibling's row,
    // and Postgres aborts one transaction. With it, both must complete.
    let (a, b) = tokio::join!(
        run_claim_transaction(pool.clone(), job_id, offer_a.id),
        run_claim_transaction(pool.clone(), job_id, offer_b.id),
    );
    let a = a.expect("claim transaction must not abort");
    let b = b.expect("claim transaction must not abort");
    assert!(a ^ b, "exactly one sibling accept must win");

    let job = JobRepo::find_by_id(&pool, job_id).await.unwrap().unwrap();
    assert_eq!(job.status_id, JobState::Claimed.id());

    let (winner_id, loser_id) = if a { (offer_a.id, offer_b.id) } else { (offer_b.id, offer_a.id) };
    let winner = OfferRepo::find_by_id(&pool, winner_id).await.unwrap().unwrap();
    assert_eq!(winner.status_id, OfferStatus::Accepted.id());
    let loser = OfferRepo::find_by_id(&pool, loser_id).await.unwrap().unwrap();
    assert_eq!(loser.status_id, OfferStatus::Superseded.id());
}
