//! Bearer-credential handling for technician identity.
//!
//! The platform's real identity provider is an external collaborator; this
//! module validates the HS256 tokens it issues and offers a provisioning
//! mint endpoint for development and tests.

pub mod jwt;
