//! HTTP server for ranking lookups.
//!
//! # API Endpoints
//!
//! | Method | Path                                  | Description                        |
//! |--------|---------------------------------------|------------------------------------|
//! | GET    | `/health`                             | Health check                       |
//! | GET    | `/api/collections`                    | Ranked collections and counters    |
//! | GET    | `/api/collections/{id}`               | Full ranking of one collection     |
//! | GET    | `/api/collections/{id}/items/{item}`  | Rank of one item                   |
//! | POST   | `/api/events`                         | Library change notification        |
//! | GET    | `/api/logs`                           | SSE stream for real-time logs      |

use axum::{
    extract::{Path, State},
    http::{header, Method, StatusCode},
    response::{sse::Event, Json, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::{convert::Infallible, net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use super::logs::{log_error, LOG_BROADCASTER};
use super::types::{error_response, CacheOverview, CollectionRankingResponse, ItemRankResponse};
use crate::cache::{RankLookup, RankingCache};
use crate::config::RankingConfig;
use crate::coordinator::{ChangeCoordinator, ChangeEvent, CoordinatorHandle};
use crate::error::{ServerError, ServerResult};
use crate::host::{FileStore, FsStore};
use crate::models::{CollectionId, ItemId};
use crate::snapshot::SnapshotLibrary;

type ApiError = (StatusCode, Json<Value>);

/// Shared handler state.
pub struct AppState<F> {
    cache: Arc<RankingCache<SnapshotLibrary, F>>,
    coordinator: CoordinatorHandle,
}

impl<F> AppState<F> {
    pub fn new(cache: Arc<RankingCache<SnapshotLibrary, F>>, coordinator: CoordinatorHandle) -> Self {
        Self { cache, coordinator }
    }
}

impl<F> Clone for AppState<F> {
    fn clone(&self) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
            coordinator: self.coordinator.clone(),
        }
    }
}

/// Build the API router.
pub fn router<F: FileStore + 'static>(state: AppState<F>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/collections", get(overview::<F>))
        .route("/api/collections/{id}", get(collection_ranking::<F>))
        .route("/api/collections/{id}/items/{item}", get(item_rank::<F>))
        .route("/api/events", post(notify_event::<F>))
        .route("/api/logs", get(sse_logs))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Load the library snapshot, start the startup scan and the change
/// coordinator, and serve until the process exits.
pub async fn start_server(library: PathBuf, port: u16, config: RankingConfig) -> ServerResult<()> {
    let library = Arc::new(SnapshotLibrary::open(&library).await?);
    let cache = Arc::new(RankingCache::new(library, Arc::new(FsStore), config));
    let (coordinator, _worker) = ChangeCoordinator::new(Arc::clone(&cache)).spawn();

    // Lookups answer "pending" until this finishes
    tokio::spawn({
        let cache = Arc::clone(&cache);
        async move { cache.initialize().await }
    });

    let app = router(AppState::new(cache, coordinator));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;

    info!("Ranking server running on http://localhost:{}", port);
    info!("   GET  /api/collections/{{id}}/items/{{item}} - Item rank");
    info!("   POST /api/events                       - Change notification");
    info!("   GET  /api/logs                         - SSE log stream");

    if let Err(e) = axum::serve(listener, app).await {
        log_error(format!("Server stopped: {}", e));
        return Err(e.into());
    }

    Ok(())
}

/// Health check endpoint
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "asreview-rank",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn overview<F: FileStore + 'static>(State(state): State<AppState<F>>) -> Json<CacheOverview> {
    Json(CacheOverview {
        ready: state.cache.is_ready(),
        collections: state.cache.collections(),
        stats: state.cache.stats(),
    })
}

async fn collection_ranking<F: FileStore + 'static>(
    State(state): State<AppState<F>>,
    Path(id): Path<u64>,
) -> Result<Json<CollectionRankingResponse>, ApiError> {
    if !state.cache.is_ready() {
        return Err((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(error_response("Ranking cache is still loading")),
        ));
    }

    let collection = CollectionId(id);
    let ranking = state.cache.ranking(collection).ok_or_else(|| {
        (
            StatusCode::NOT_FOUND,
            Json(error_response(&format!("Collection {} has no ranking", collection))),
        )
    })?;

    Ok(Json(CollectionRankingResponse::new(collection, &ranking)))
}

async fn item_rank<F: FileStore + 'static>(
    State(state): State<AppState<F>>,
    Path((id, item)): Path<(u64, u64)>,
) -> Json<ItemRankResponse> {
    let (collection, item) = (CollectionId(id), ItemId(item));
    Json(ItemRankResponse::new(collection, item, state.cache.lookup(collection, item)))
}

/// Reload the snapshot so the refresh sees the change, then queue the event
async fn notify_event<F: FileStore + 'static>(
    State(state): State<AppState<F>>,
    Json(event): Json<ChangeEvent>,
) -> Result<StatusCode, ApiError> {
    state.cache.library().reload().await.map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(error_response(&e.to_string())),
        )
    })?;

    state.coordinator.notify(event).map_err(|e| {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(error_response(&e.to_string())),
        )
    })?;

    Ok(StatusCode::ACCEPTED)
}

/// SSE endpoint for real-time log streaming
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(entry) => {
            let json = serde_json::to_string(&entry).ok()?;
            Some(Ok(Event::default().data(json)))
        }
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
