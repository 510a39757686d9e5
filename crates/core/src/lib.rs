//! Fieldline domain core.
//!
//! Pure domain logic shared by the db and api crates: common type aliases,
//! the domain error taxonomy, the job lifecycle state machine, the earnings
//! split, and the client reconnect policy. No I/O lives here.

pub mod earnings;
pub mod error;
pub mod job_state;
pub mod reconnect;
pub mod types;
