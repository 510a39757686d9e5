//! Fieldline API server library.
//!
//! Exposes the building blocks (config, state, error handling, the dispatch
//! engine, delivery, routes, WebSocket infrastructure) so integration tests
//! and the binary entrypoint can both access them.

pub mod auth;
pub mod background;
pub mod config;
pub mod delivery;
pub mod engine;
pub mod error;
pub mod middleware;
pub mod response;
pub mod router;
pub mod routes;
pub mod state;
pub mod ws;
