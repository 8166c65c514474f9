//! Parties read models (clients shown in the client listing).
//!
//! Clients are read-only on the storefront: no registration or update
//! lifecycle lives here, only the shape received from the API and the
//! listing rules (no IO, no HTTP, no storage).

pub mod client;

pub use client::{CLIENT_SEARCH_FIELDS, Client};
