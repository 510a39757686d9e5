//! Integration tests for the claim arbiter over a real Postgres pool.
//!
//! These drive `ClaimArbiter::accept` end to end and assert the whole
//! claim composition commits together: job transition, sibling
//! supersede, loser delivery-log row, busy-lock, and the un-finalized
//! earnings snapshot -- plus clean resolution of concurrent sibling
//! accepts.

use std::sync::Arc;

use chrono::{Duration, Utc};
use fieldline_api::engine::{ClaimArbiter, ClaimOutcome};
use fieldline_db::models::job::NewJob;
use fieldline_db::models::status::{JobState, OfferStatus};
use fieldline_db::repositories::{
    EarningsRepo, JobRepo, OfferEventRepo, OfferRepo, TechnicianRepo,
};
use fieldline_events::EventBus;
use sqlx::PgPool;

const COMMISSION_PERCENT: u8 = 30;

fn arbiter(pool: &PgPool) -> ClaimArbiter {
    ClaimArbiter::new(
        pool.clone(),
        Arc::new(EventBus::default()),
        COMMISSION_PERCENT,
    )
}

async fn seed_technician(pool: &PgPool, name: &str) -> i64 {
    let tech = TechnicianRepo::register(pool, name).await.unwrap();
    TechnicianRepo::set_availability(pool, tech.id, true)
        .await
        .unwrap();
    tech.id
}

async fn seed_offered_job(pool: &PgPool, amount_minor: i64) -> i64 {
    let job = JobRepo::create(
        pool,
        &NewJob {
            appliance: "boiler".into(),
            address: "7 Harbour Walk".into(),
            amount_minor,
        },
    )
    .await
    .unwrap();
    JobRepo::mark_offered(pool, job.id).await.unwrap().unwrap();
    job.id
}

// ---------------------------------------------------------------------------
// Test: a single accept commits every claim effect together
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn accept_commits_the_full_claim_composition(pool: PgPool) {
    let winner_tech = seed_technician(&pool, "Avery").await;
    let loser_tech = seed_technician(&pool, "Blake").await;
    let job_id = seed_offered_job(&pool, 10_000).await;
    let deadline = Utc::now() + Duration::seconds(30);

    let winner_offer = OfferRepo::create(&pool, job_id, winner_tech, deadline)
        .await
        .unwrap();
    let loser_offer = OfferRepo::create(&pool, job_id, loser_tech, deadline)
        .await
        .unwrap();

    let arbiter = arbiter(&pool);
    let outcome = arbiter.accept(winner_tech, winner_offer.id).await.unwrap();
    let ClaimOutcome::Accepted { offer, job } = outcome else {
        panic!("winner's accept must succeed");
    };
    assert_eq!(offer.status_id, OfferStatus::Accepted.id());
    assert_eq!(job.status_id, JobState::Claimed.id());
    assert!(job.claimed_at.is_some());

    // The sibling flipped to superseded.
    let loser = OfferRepo::find_by_id(&pool, loser_offer.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(loser.status_id, OfferStatus::Superseded.id());

    // The loser's delivery log gained the retraction.
    let rows = OfferEventRepo::list_since(&pool, loser_tech, 0).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].body["type"], "job_superseded");
    assert_eq!(rows[0].body["offer_id"], loser_offer.id);
    assert_eq!(rows[0].body["job_id"], job_id);

    // The winner's delivery log is untouched by their own accept.
    assert!(OfferEventRepo::list_since(&pool, winner_tech, 0)
        .await
        .unwrap()
        .is_empty());

    // Busy-lock engaged on the accepted offer.
    let technician = TechnicianRepo::find_by_id(&pool, winner_tech)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(technician.busy_offer_id, Some(winner_offer.id));

    // Earnings snapshot written, not yet finalized.
    let record = EarningsRepo::find_by_job(&pool, job_id).await.unwrap().unwrap();
    assert_eq!(record.technician_id, winner_tech);
    assert_eq!(record.amount_minor, 10_000);
    assert_eq!(record.commission_percent, COMMISSION_PERCENT as i16);
    assert_eq!(record.commission_minor, 3_000);
    assert_eq!(record.net_minor, 7_000);
    assert!(!record.finalized);
}

// ---------------------------------------------------------------------------
// Test: a replayed accept and a late sibling accept both lose cleanly
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn late_accepts_resolve_as_already_resolved(pool: PgPool) {
    let winner_tech = seed_technician(&pool, "Avery").await;
    let loser_tech = seed_technician(&pool, "Blake").await;
    let job_id = seed_offered_job(&pool, 5_000).await;
    let deadline = Utc::now() + Duration::seconds(30);

    let winner_offer = OfferRepo::create(&pool, job_id, winner_tech, deadline)
        .await
        .unwrap();
    let loser_offer = OfferRepo::create(&pool, job_id, loser_tech, deadline)
        .await
        .unwrap();

    let arbiter = arbiter(&pool);
    assert!(matches!(
        arbiter.accept(winner_tech, winner_offer.id).await.unwrap(),
        ClaimOutcome::Accepted { .. }
    ));

    // Replay by the winner and a late accept by the loser are both
    // normal outcomes, never errors.
    assert!(matches!(
        arbiter.accept(winner_tech, winner_offer.id).await.unwrap(),
        ClaimOutcome::AlreadyResolved
    ));
    assert!(matches!(
        arbiter.accept(loser_tech, loser_offer.id).await.unwrap(),
        ClaimOutcome::AlreadyResolved
    ));
}

// ---------------------------------------------------------------------------
// Test: concurrent sibling accepts yield one winner and no errors
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn concurrent_sibling_accepts_yield_one_winner(pool: PgPool) {
    let tech_a = seed_technician(&pool, "Avery").await;
    let tech_b = seed_technician(&pool, "Blake").await;
    let job_id = seed_offered_job(&pool, 8_000).await;
    let deadline = Utc::now() + Duration::seconds(30);

    let offer_a = OfferRepo::create(&pool, job_id, tech_a, deadline).await.unwrap();
    let offer_b = OfferRepo::create(&pool, job_id, tech_b, deadline).await.unwrap();

    let arbiter = arbiter(&pool);
    let (a, b) = tokio::join!(
        arbiter.accept(tech_a, offer_a.id),
        arbiter.accept(tech_b, offer_b.id),
    );

    // Neither side may surface an error; the race loser gets the same
    // already-resolved outcome as a late poll-driven accept.
    let a = a.expect("concurrent accept must not error");
    let b = b.expect("concurrent accept must not error");

    let a_won = matches!(a, ClaimOutcome::Accepted { .. });
    let b_won = matches!(b, ClaimOutcome::Accepted { .. });
    assert!(a_won ^ b_won, "exactly one sibling accept must win");
    assert!(matches!(a, ClaimOutcome::Accepted { .. } | ClaimOutcome::AlreadyResolved));
    assert!(matches!(b, ClaimOutcome::Accepted { .. } | ClaimOutcome::AlreadyResolved));

    let job = JobRepo::find_by_id(&pool, job_id).await.unwrap().unwrap();
    assert_eq!(job.status_id, JobState::Claimed.id());

    // The loser's offer is superseded and their log carries the retraction.
    let (loser_tech, loser_offer) = if a_won {
        (tech_b, offer_b.id)
    } else {
        (tech_a, offer_a.id)
    };
    let loser = OfferRepo::find_by_id(&pool, loser_offer).await.unwrap().unwrap();
    assert_eq!(loser.status_id, OfferStatus::Superseded.id());
    let rows = OfferEventRepo::list_since(&pool, loser_tech, 0).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].body["type"], "job_superseded");
}
