//! Products read models.
//!
//! The catalog is owned by the remote API; this crate only models what the
//! client receives and the pure listing rules applied before rendering
//! (no IO, no HTTP, no storage).

pub mod catalog;
pub mod product;

pub use catalog::{CatalogQuery, ProductSort};
pub use product::{PRODUCT_SEARCH_FIELDS, Product};
