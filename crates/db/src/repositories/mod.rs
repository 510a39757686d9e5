//! Repository modules, one per table.

mod earnings_repo;
mod job_repo;
mod offer_event_repo;
mod offer_repo;
mod technician_repo;

pub use earnings_repo::EarningsRepo;
pub use job_repo::JobRepo;
pub use offer_event_repo::OfferEventRepo;
pub use offer_repo::OfferRepo;
pub use technician_repo::TechnicianRepo;
