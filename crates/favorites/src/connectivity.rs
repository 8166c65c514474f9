//! Connectivity tracking for the favorites client.
//!
//! The store never blocks the UI on the network: when the API cannot be
//! reached it keeps serving the last known favorites and flips to `Offline`
//! so the presentation layer can show a hint.

use chrono::{DateTime, Utc};

use crate::error::ApiError;

// Re-export from shared types module
pub use crate::types::ConnectivityState;

/// Connectivity state plus what caused the last transition.
#[derive(Debug, Clone)]
pub struct Connectivity {
    state: ConnectivityState,
    last_success: Option<DateTime<Utc>>,
    last_error: Option<ApiError>,
}

impl Connectivity {
    pub fn new() -> Self {
        Self {
            state: ConnectivityState::Online,
            last_success: None,
            last_error: None,
        }
    }

    pub fn state(&self) -> ConnectivityState {
        self.state
    }

    pub fn is_offline(&self) -> bool {
        self.state == ConnectivityState::Offline
    }

    /// Time of the last confirmed remote call.
    pub fn last_success(&self) -> Option<DateTime<Utc>> {
        self.last_success
    }

    pub fn last_error(&self) -> Option<&ApiError> {
        self.last_error.as_ref()
    }

    /// Record a confirmed remote call and mark the client online.
    pub fn record_success(&mut self) {
        if self.is_offline() {
            tracing::info!("favorites API reachable again");
        }
        self.state = ConnectivityState::Online;
        self.last_success = Some(Utc::now());
        self.last_error = None;
    }

    /// Record a failed remote call.
    ///
    /// Only transient failures (network, timeout, 5xx) mean the API is
    /// unreachable; a 4xx answer proves it is up.
    pub fn record_failure(&mut self, error: &ApiError) {
        if error.is_transient() {
            if !self.is_offline() {
                tracing::warn!(%error, "favorites API unreachable; serving last known favorites");
            }
            self.state = ConnectivityState::Offline;
        }
        self.last_error = Some(error.clone());
    }
}

impl Default for Connectivity {
    fn default() -> Self {
        Self::new()
    }
}
