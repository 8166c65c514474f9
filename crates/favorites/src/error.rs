//! Error taxonomy of the favorites subsystem.
//!
//! Transport failures are `ApiError`s. The store never hands those to the
//! presentation layer directly; it translates them into a `FavoritesError`.

use std::time::Duration;

use storefront_core::ProductId;
use thiserror::Error;

/// Failure talking to the remote favorites API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("invalid API URL: {0}")]
    InvalidUrl(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("API error ({0}): {1}")]
    Api(u16, String),
    #[error("parse error: {0}")]
    Parse(String),
}

impl ApiError {
    /// Whether retrying the same request may succeed.
    ///
    /// Client errors (4xx) are final; transport errors and 5xx are not.
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Network(_) | ApiError::Timeout(_) => true,
            ApiError::Api(status, _) => *status >= 500,
            ApiError::InvalidUrl(_) | ApiError::Parse(_) => false,
        }
    }
}

/// Errors surfaced by `FavoritesStore`.
#[derive(Debug, Error)]
pub enum FavoritesError {
    /// Network failure, timeout or non-2xx answer from the favorites API.
    #[error("favorites API unavailable: {0}")]
    RemoteUnavailable(#[source] ApiError),

    /// An optimistic toggle could not be confirmed and was reverted.
    #[error("favorite change for product {product_id} was not confirmed and has been reverted")]
    SyncFailed {
        product_id: ProductId,
        #[source]
        source: ApiError,
    },

    /// A toggle for the same product is still in flight.
    #[error("a favorite change for product {0} is already in progress")]
    ToggleInProgress(ProductId),

    /// No user is bound to the store yet.
    #[error("no user session; load favorites for a user first")]
    NoSession,
}

impl FavoritesError {
    /// The transport error behind this failure, if any.
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            FavoritesError::RemoteUnavailable(e) => Some(e),
            FavoritesError::SyncFailed { source, .. } => Some(source),
            FavoritesError::ToggleInProgress(_) | FavoritesError::NoSession => None,
        }
    }
}
