//! Session-scoped favorites store.
//!
//! `FavoritesStore` owns the favorite-product set of the current user and
//! mediates between optimistic local updates and the remote API:
//!
//! - `toggle` flips membership locally before the remote call resolves and
//!   reverts it if the call fails (`SyncFailed`).
//! - At most one toggle per product id is in flight; a second one is rejected
//!   with `ToggleInProgress`. Toggles of distinct ids run concurrently.
//! - `load` replaces the set with the server's view and re-applies the deltas
//!   of toggles still in flight or confirmed after the load started, so a
//!   just-issued action is not lost to an older listing.
//! - A failed `load` keeps the last known set.
//!
//! State lives behind a `std::sync::Mutex` that is never held across an await.
//! Every change is published on a `watch` channel (`subscribe`).

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use anyhow::Context;
use storefront_core::{ProductId, UserId};
use tokio::sync::watch;
use uuid::Uuid;

use crate::api::{FavoritesApi, HttpFavoritesApi};
use crate::config::FavoritesConfig;
use crate::connectivity::{Connectivity, ConnectivityState};
use crate::error::{ApiError, FavoritesError};
use crate::set::{FavoriteFilter, FavoriteSet, Favoritable};
use crate::types::{FavoriteRecord, FavoriteRequest};

/// A toggle whose remote call has not resolved yet.
#[derive(Debug, Clone, Copy)]
struct PendingToggle {
    op: Uuid,
    /// Membership the toggle is driving towards.
    add: bool,
}

#[derive(Debug, Default)]
struct StoreState {
    user: Option<UserId>,
    favorites: FavoriteSet,
    pending: HashMap<ProductId, PendingToggle>,
    /// Toggles the server confirmed since the latest load started. The load's
    /// listing may predate them, so they are re-applied on top of it.
    confirmed_since_load: HashMap<ProductId, bool>,
    connectivity: Connectivity,
    /// Incremented on every load so that a slow, superseded load is discarded.
    load_generation: u64,
}

impl StoreState {
    /// Start a new load and return its generation.
    fn begin_load(&mut self) -> u64 {
        self.load_generation += 1;
        self.confirmed_since_load.clear();
        self.load_generation
    }
}

pub struct FavoritesStore {
    api: Arc<dyn FavoritesApi>,
    request_timeout: Duration,
    state: Mutex<StoreState>,
    changes: watch::Sender<FavoriteSet>,
}

impl std::fmt::Debug for FavoritesStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FavoritesStore")
            .field("request_timeout", &self.request_timeout)
            .field("state", &self.lock())
            .finish_non_exhaustive()
    }
}

impl FavoritesStore {
    /// Create an empty store over `api`. Every remote call is bounded by `request_timeout`.
    pub fn new(api: Arc<dyn FavoritesApi>, request_timeout: Duration) -> Self {
        let (changes, _) = watch::channel(FavoriteSet::new());
        Self {
            api,
            request_timeout,
            state: Mutex::new(StoreState::default()),
            changes,
        }
    }

    /// Create a store over the HTTP API described by `config`.
    pub fn connect(config: &FavoritesConfig) -> anyhow::Result<Self> {
        let api = HttpFavoritesApi::new(config)
            .with_context(|| format!("failed to create favorites client for {}", config.api_url))?;
        tracing::info!(base_url = %api.base_url(), "favorites store connected");
        Ok(Self::new(Arc::new(api), config.request_timeout))
    }

    /// Bind the session user without fetching (toggles need a user id).
    pub fn with_user(self, user_id: UserId) -> Self {
        self.lock().user = Some(user_id);
        self
    }

    pub fn user(&self) -> Option<UserId> {
        self.lock().user.clone()
    }

    /// Fetch the favorites of `user_id` and make them the current set.
    ///
    /// On failure the last known set stays in place and `RemoteUnavailable` is
    /// returned; the presentation layer keeps rendering what it had.
    pub async fn load(&self, user_id: UserId) -> Result<FavoriteSet, FavoritesError> {
        let generation = {
            let mut state = self.lock();
            if state.user.as_ref() != Some(&user_id) {
                // A different user: nothing of the previous session carries over.
                state.favorites = FavoriteSet::new();
                state.pending.clear();
                self.publish(&state.favorites);
            }
            state.user = Some(user_id.clone());
            state.begin_load()
        };

        tracing::debug!(user_id = %user_id, "loading favorites");
        let result = self.bounded(self.api.favorites_for_user(&user_id)).await;
        self.finish_load(generation, result)
    }

    /// Fetch the favorites of the user the server associates with this session.
    ///
    /// The bound user is kept as is: the session endpoint does not say who the
    /// user is, so toggles after a `load_current` need a user bound through
    /// `with_user` (or an earlier `load`), otherwise they fail with `NoSession`.
    pub async fn load_current(&self) -> Result<FavoriteSet, FavoritesError> {
        let generation = self.lock().begin_load();

        tracing::debug!("loading favorites of the current session");
        let result = self.bounded(self.api.current_favorites()).await;
        self.finish_load(generation, result)
    }

    fn finish_load(
        &self,
        generation: u64,
        result: Result<Vec<FavoriteRecord>, ApiError>,
    ) -> Result<FavoriteSet, FavoritesError> {
        let mut state = self.lock();

        let records = match result {
            Ok(records) => records,
            Err(err) if generation != state.load_generation => {
                tracing::debug!(generation, error = %err, "ignoring failure of superseded favorites load");
                return Err(FavoritesError::RemoteUnavailable(err));
            }
            Err(err) => {
                state.connectivity.record_failure(&err);
                tracing::warn!(
                    error = %err,
                    kept = state.favorites.len(),
                    "failed to load favorites; keeping last known set"
                );
                return Err(FavoritesError::RemoteUnavailable(err));
            }
        };

        state.connectivity.record_success();

        if generation != state.load_generation {
            tracing::debug!(generation, latest = state.load_generation, "discarding superseded favorites load");
            return Ok(state.favorites.clone());
        }

        let mut loaded = FavoriteSet::from_records(records);
        for (product_id, &member) in &state.confirmed_since_load {
            loaded.set(product_id, member);
        }
        for (product_id, pending) in &state.pending {
            loaded.set(product_id, pending.add);
        }

        tracing::info!(
            favorites = loaded.len(),
            confirmed = state.confirmed_since_load.len(),
            pending = state.pending.len(),
            "favorites loaded"
        );

        state.confirmed_since_load.clear();
        state.favorites = loaded;
        self.publish(&state.favorites);
        Ok(state.favorites.clone())
    }

    /// Pure membership lookup against the in-memory set.
    pub fn is_favorite(&self, product_id: &ProductId) -> bool {
        self.lock().favorites.contains(product_id)
    }

    /// Whether a toggle for `product_id` is waiting for the server.
    pub fn is_pending(&self, product_id: &ProductId) -> bool {
        self.lock().pending.contains_key(product_id)
    }

    /// Copy of the current set.
    pub fn snapshot(&self) -> FavoriteSet {
        self.lock().favorites.clone()
    }

    pub fn connectivity(&self) -> ConnectivityState {
        self.lock().connectivity.state()
    }

    /// Receive every new version of the set (load, optimistic change, revert, clear).
    pub fn subscribe(&self) -> watch::Receiver<FavoriteSet> {
        self.changes.subscribe()
    }

    /// Lazily filter `items` against a snapshot of the current set.
    pub fn filter_by_favorite<I>(&self, items: I, favorites_only: bool) -> FavoriteFilter<I::IntoIter>
    where
        I: IntoIterator,
        I::Item: Favoritable,
    {
        self.snapshot().filter_by_favorite(items, favorites_only)
    }

    /// Add `product_id` to the favorites if absent, remove it otherwise.
    ///
    /// The change is visible immediately. If the server does not confirm it,
    /// it is reverted and `SyncFailed` is returned.
    pub async fn toggle(&self, product_id: ProductId) -> Result<FavoriteSet, FavoritesError> {
        let (request, add, op) = {
            let mut state = self.lock();
            let user_id = state.user.clone().ok_or(FavoritesError::NoSession)?;

            if state.pending.contains_key(&product_id) {
                tracing::debug!(product_id = %product_id, "toggle rejected; another one is in flight");
                return Err(FavoritesError::ToggleInProgress(product_id));
            }

            let add = !state.favorites.contains(&product_id);
            let op = Uuid::now_v7();
            state.pending.insert(product_id.clone(), PendingToggle { op, add });
            state.favorites.set(&product_id, add);
            self.publish(&state.favorites);

            let request = FavoriteRequest {
                user_id,
                product_id: product_id.clone(),
            };
            (request, add, op)
        };

        tracing::debug!(%op, product_id = %product_id, add, "favorite toggle sent");

        let mut guard = InFlight {
            store: self,
            product_id: &product_id,
            op,
            add,
            armed: true,
        };

        let result = if add {
            self.bounded(self.api.add_favorite(&request)).await
        } else {
            self.bounded(self.api.remove_favorite(&request)).await
        };

        guard.armed = false;
        drop(guard);

        let mut state = self.lock();
        // A `clear` while in flight invalidates this toggle.
        let ours = state.pending.get(&product_id).is_some_and(|p| p.op == op);
        if ours {
            state.pending.remove(&product_id);
        }

        match result {
            Ok(_) => {
                state.connectivity.record_success();
                if ours {
                    state.confirmed_since_load.insert(product_id.clone(), add);
                }
                tracing::info!(%op, product_id = %product_id, add, "favorite toggle confirmed");
                Ok(state.favorites.clone())
            }
            Err(err) => {
                state.connectivity.record_failure(&err);
                if ours {
                    state.favorites.set(&product_id, !add);
                    self.publish(&state.favorites);
                }
                tracing::error!(
                    %op,
                    product_id = %product_id,
                    add,
                    error = %err,
                    "favorite toggle failed; reverted"
                );
                Err(FavoritesError::SyncFailed {
                    product_id,
                    source: err,
                })
            }
        }
    }

    /// End of session: forget the user and every favorite.
    ///
    /// Toggles still in flight resolve normally but no longer touch the
    /// cleared state.
    pub fn clear(&self) {
        let mut state = self.lock();
        state.user = None;
        state.favorites = FavoriteSet::new();
        state.pending.clear();
        state.confirmed_since_load.clear();
        state.load_generation += 1;
        self.publish(&state.favorites);
        tracing::info!("favorites session cleared");
    }

    async fn bounded<T, F>(&self, call: F) -> Result<T, ApiError>
    where
        F: Future<Output = Result<T, ApiError>>,
    {
        match tokio::time::timeout(self.request_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(ApiError::Timeout(self.request_timeout)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        // State is only mutated in short critical sections; a panic in one
        // leaves it consistent enough to keep serving reads.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, favorites: &FavoriteSet) {
        self.changes.send_replace(favorites.clone());
    }
}

/// Reverts an optimistic toggle whose future is dropped before the server answers.
struct InFlight<'a> {
    store: &'a FavoritesStore,
    product_id: &'a ProductId,
    op: Uuid,
    add: bool,
    armed: bool,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut state = self.store.lock();
        let ours = state
            .pending
            .get(self.product_id)
            .is_some_and(|p| p.op == self.op);
        if ours {
            state.pending.remove(self.product_id);
            state.favorites.set(self.product_id, !self.add);
            self.store.publish(&state.favorites);
            tracing::warn!(op = %self.op, product_id = %self.product_id, "favorite toggle cancelled; reverted");
        }
    }
}
