//! Shared types and HTTP clients for the Outpost APIs.
//!
//! The `objects` module holds the request/response DTOs exchanged with the
//! Admin and Service APIs. The `client` module (behind the `client` cargo
//! feature) provides typed HTTP clients over them.

pub mod objects;

#[cfg(feature = "client")]
pub mod client;
