//! `storefront-core`: shared building blocks.
//!
//! This crate contains **pure** primitives (no IO): identifiers, the domain
//! error type and the free-text search used by every listing.

pub mod error;
pub mod id;
pub mod search;

pub use error::{DomainError, DomainResult};
pub use id::{ClientId, ProductId, UserId};
pub use search::{FieldAccessor, search};
