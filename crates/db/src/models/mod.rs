//! Row structs and request DTOs for the dispatch core tables.

pub mod earnings;
pub mod job;
pub mod offer;
pub mod offer_event;
pub mod status;
pub mod technician;
