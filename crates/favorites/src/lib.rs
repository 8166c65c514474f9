//! `storefront-favorites`
//!
//! **Responsibility:** the favorite-products set of the signed-in user.
//!
//! This crate provides:
//! - An in-memory favorites set with optimistic toggling and revert on failure
//! - One in-flight toggle per product id
//! - Offline fallback to the last known set
//! - The HTTP client for the favorites endpoints
//!
//! The remote API remains the authority; the store only mirrors it.

pub mod api;
pub mod config;
pub mod connectivity;
pub mod error;
pub mod set;
pub mod store;
pub mod types;

pub use api::{FavoritesApi, HttpFavoritesApi};
pub use config::{FavoritesConfig, RetryPolicy};
pub use connectivity::{Connectivity, ConnectivityState};
pub use error::{ApiError, FavoritesError};
pub use set::{FavoriteFilter, FavoriteSet, Favoritable};
pub use store::FavoritesStore;
pub use types::{FavoriteRecord, FavoriteRequest};
