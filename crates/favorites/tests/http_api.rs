use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use storefront_core::{ProductId, UserId};
use storefront_favorites::{
    ApiError, ConnectivityState, FavoriteRequest, FavoritesApi, FavoritesConfig, FavoritesError,
    FavoritesStore, HttpFavoritesApi, RetryPolicy,
};
use storefront_products::Product;

/// The user the fake server associates with the session cookie.
const SESSION_USER: &str = "u-1";

#[derive(Default)]
struct FakeBackend {
    favorites: Mutex<HashMap<String, BTreeSet<String>>>,
    hits: AtomicUsize,
    fail_with: Mutex<Option<StatusCode>>,
    delay: Mutex<Option<Duration>>,
}

impl FakeBackend {
    async fn enter(&self) -> Option<Response> {
        self.hits.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let status = *self.fail_with.lock().unwrap();
        status.map(|status| (status, "backend failure").into_response())
    }

    fn listing(&self, user: &str) -> Response {
        let favorites = self.favorites.lock().unwrap();
        let records: Vec<_> = favorites
            .get(user)
            .into_iter()
            .flatten()
            .map(|id| json!({ "id": 1000, "idUsuario": user, "idProducto": id }))
            .collect();
        Json(records).into_response()
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChangeBody {
    user_id: String,
    product_id: String,
}

async fn add(State(backend): State<Arc<FakeBackend>>, Json(body): Json<ChangeBody>) -> Response {
    if let Some(failure) = backend.enter().await {
        return failure;
    }
    let mut favorites = backend.favorites.lock().unwrap();
    let set = favorites.entry(body.user_id).or_default();
    set.insert(body.product_id);
    Json(json!({ "mensaje": "agregado", "total": set.len() })).into_response()
}

async fn remove(State(backend): State<Arc<FakeBackend>>, Json(body): Json<ChangeBody>) -> Response {
    if let Some(failure) = backend.enter().await {
        return failure;
    }
    if let Some(set) = backend.favorites.lock().unwrap().get_mut(&body.user_id) {
        set.remove(&body.product_id);
    }
    // Remove answers with an empty body.
    StatusCode::OK.into_response()
}

async fn list_for_user(State(backend): State<Arc<FakeBackend>>, Path(user_id): Path<String>) -> Response {
    if let Some(failure) = backend.enter().await {
        return failure;
    }
    backend.listing(&user_id)
}

async fn list_current(State(backend): State<Arc<FakeBackend>>) -> Response {
    if let Some(failure) = backend.enter().await {
        return failure;
    }
    backend.listing(SESSION_USER)
}

struct TestServer {
    base_url: String,
    backend: Arc<FakeBackend>,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        storefront_observability::init();

        let backend = Arc::new(FakeBackend::default());
        let app = Router::new()
            .route("/api/favoritos/agregar-favorito", post(add))
            .route("/api/favoritos/eliminar-favorito", post(remove))
            .route("/api/favoritos/obtener-favoritos", get(list_current))
            .route("/api/favoritos/obtener-favoritos/:user_id", get(list_for_user))
            .with_state(backend.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{addr}/api/");

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            backend,
            handle,
        }
    }

    fn config(&self) -> FavoritesConfig {
        FavoritesConfig::new(&self.base_url).with_retry(RetryPolicy {
            max_retries: 2,
            initial_backoff: Duration::from_millis(1),
        })
    }

    fn client(&self) -> HttpFavoritesApi {
        HttpFavoritesApi::new(&self.config()).unwrap()
    }

    fn seed(&self, user: &str, ids: &[&str]) {
        self.backend
            .favorites
            .lock()
            .unwrap()
            .insert(user.to_string(), ids.iter().map(|id| id.to_string()).collect());
    }

    fn remote(&self, user: &str) -> Vec<String> {
        self.backend
            .favorites
            .lock()
            .unwrap()
            .get(user)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn fail_with(&self, status: Option<StatusCode>) {
        *self.backend.fail_with.lock().unwrap() = status;
    }

    fn hits(&self) -> usize {
        self.backend.hits.load(Ordering::SeqCst)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn request(user: &str, product: &str) -> FavoriteRequest {
    FavoriteRequest {
        user_id: UserId::from(user),
        product_id: ProductId::from(product),
    }
}

fn ids(records: &[storefront_favorites::FavoriteRecord]) -> Vec<&str> {
    records.iter().map(|r| r.product_id.as_str()).collect()
}

#[tokio::test]
async fn add_then_list_for_user() {
    let server = TestServer::spawn().await;
    let api = server.client();

    let payload = api.add_favorite(&request("u-7", "12")).await.unwrap();
    assert_eq!(payload["total"], 1);
    api.add_favorite(&request("u-7", "30")).await.unwrap();

    let records = api.favorites_for_user(&UserId::from("u-7")).await.unwrap();
    assert_eq!(ids(&records), vec!["12", "30"]);
}

#[tokio::test]
async fn remove_accepts_empty_answer() {
    let server = TestServer::spawn().await;
    server.seed("u-7", &["12", "30"]);
    let api = server.client();

    let payload = api.remove_favorite(&request("u-7", "12")).await.unwrap();
    assert!(payload.is_null());
    assert_eq!(server.remote("u-7"), vec!["30"]);
}

#[tokio::test]
async fn current_session_listing() {
    let server = TestServer::spawn().await;
    server.seed(SESSION_USER, &["4"]);

    let records = server.client().current_favorites().await.unwrap();
    assert_eq!(ids(&records), vec!["4"]);
}

#[tokio::test]
async fn server_errors_are_retried() {
    let server = TestServer::spawn().await;
    server.fail_with(Some(StatusCode::SERVICE_UNAVAILABLE));

    let err = server.client().add_favorite(&request("u-1", "1")).await.unwrap_err();

    assert_eq!(err, ApiError::Api(503, "backend failure".to_string()));
    // First attempt plus two retries.
    assert_eq!(server.hits(), 3);
}

#[tokio::test]
async fn client_errors_are_not_retried() {
    let server = TestServer::spawn().await;
    server.fail_with(Some(StatusCode::BAD_REQUEST));

    let err = server.client().add_favorite(&request("u-1", "1")).await.unwrap_err();

    assert!(matches!(err, ApiError::Api(400, _)));
    assert_eq!(server.hits(), 1);
}

#[tokio::test]
async fn unreachable_server_is_a_network_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let config = FavoritesConfig::new(format!("http://{addr}")).with_retry(RetryPolicy::none());
    let err = HttpFavoritesApi::new(&config)
        .unwrap()
        .current_favorites()
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Network(_)), "got {err:?}");
    assert!(err.is_transient());
}

#[tokio::test]
async fn slow_server_times_out() {
    let server = TestServer::spawn().await;
    *server.backend.delay.lock().unwrap() = Some(Duration::from_millis(500));

    let config = server
        .config()
        .with_request_timeout(Duration::from_millis(50))
        .with_retry(RetryPolicy::none());
    let err = HttpFavoritesApi::new(&config)
        .unwrap()
        .current_favorites()
        .await
        .unwrap_err();

    assert_eq!(err, ApiError::Timeout(Duration::from_millis(50)));
}

#[tokio::test]
async fn store_round_trip_over_http() {
    let server = TestServer::spawn().await;
    server.seed(SESSION_USER, &["2", "5"]);

    let store = FavoritesStore::connect(&server.config()).unwrap();
    let loaded = store.load(UserId::from(SESSION_USER)).await.unwrap();
    assert_eq!(loaded.len(), 2);

    store.toggle(ProductId::from("9")).await.unwrap();
    store.toggle(ProductId::from("2")).await.unwrap();
    assert_eq!(server.remote(SESSION_USER), vec!["5", "9"]);

    let catalog = vec![
        Product::new(ProductId::from("2"), "IPA Dorada", Decimal::new(4500, 2), 3, "Lupulada").unwrap(),
        Product::new(ProductId::from("5"), "Stout", Decimal::new(5200, 2), 0, "Tostada").unwrap(),
        Product::new(ProductId::from("9"), "Bock", Decimal::new(4800, 2), 8, "Maltosa").unwrap(),
    ];
    let names: Vec<&str> = store
        .filter_by_favorite(&catalog, true)
        .map(|p| p.name())
        .collect();
    assert_eq!(names, vec!["Stout", "Bock"]);

    // A reload agrees with what the server persisted.
    let reloaded = store.load(UserId::from(SESSION_USER)).await.unwrap();
    assert_eq!(reloaded.sorted(), vec![ProductId::from("5"), ProductId::from("9")]);
}

#[tokio::test]
async fn store_survives_backend_outage() {
    let server = TestServer::spawn().await;
    server.seed(SESSION_USER, &["2", "5"]);
    let store = FavoritesStore::connect(&server.config()).unwrap();
    store.load(UserId::from(SESSION_USER)).await.unwrap();

    server.fail_with(Some(StatusCode::INTERNAL_SERVER_ERROR));

    let err = store.toggle(ProductId::from("2")).await.unwrap_err();
    assert!(matches!(err, FavoritesError::SyncFailed { .. }));
    assert!(store.is_favorite(&ProductId::from("2")));

    assert!(store.load_current().await.is_err());
    assert_eq!(store.snapshot().len(), 2);
    assert_eq!(store.connectivity(), ConnectivityState::Offline);

    server.fail_with(None);
    store.load_current().await.unwrap();
    assert_eq!(store.connectivity(), ConnectivityState::Online);
}
