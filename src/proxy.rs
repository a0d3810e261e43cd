//! HTTP proxy that puts the offline worker in front of the backend.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::extract::{Path, Request, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use chrono::Utc;
use reqwest::Url;
use tower_http::cors::{Any, CorsLayer};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::error::{Error, Result};
use crate::worker::snapshot::Snapshot;
use crate::worker::{
    CacheStorage, Fetcher, OfflineWorker, PushPayload, ReqwestFetcher, WorkerMessage,
    WorkerRequest, WorkerResponse,
};

/// Largest request body the proxy buffers.
const MAX_BODY: usize = 1024 * 1024;

fn into_response(response: WorkerResponse) -> Response {
    let mut out = Response::new(Body::from(response.body));
    *out.status_mut() = response.status;
    *out.headers_mut() = response.headers;
    out
}

async fn forward<F: Fetcher + 'static>(
    State(worker): State<Arc<OfflineWorker<F>>>,
    request: Request,
) -> Response {
    let (parts, body) = request.into_parts();
    let body = match axum::body::to_bytes(body, MAX_BODY).await {
        Ok(body) => body,
        Err(e) => return (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
    };

    // Only the worker's own origin is reachable through the proxy.
    let url = if parts.uri.scheme().is_some() {
        match Url::parse(&parts.uri.to_string()) {
            Ok(url) if url.origin() == worker.origin().origin() => url,
            _ => {
                log::warn!("refusing cross-origin target {}", parts.uri);
                return (StatusCode::BAD_REQUEST, "cross-origin target refused").into_response();
            }
        }
    } else {
        worker.local_url(parts.uri.path(), parts.uri.query())
    };

    let mut request = WorkerRequest::new(parts.method, url).with_body(body);
    request.headers = parts.headers;

    match worker.handle_fetch(&request).await {
        Ok(response) => into_response(response),
        Err(e) => {
            log::warn!("{} {} failed: {e}", request.method, request.url);
            (StatusCode::GATEWAY_TIMEOUT, e.user_message()).into_response()
        }
    }
}

async fn message<F: Fetcher + 'static>(
    State(worker): State<Arc<OfflineWorker<F>>>,
    axum::Json(message): axum::Json<WorkerMessage>,
) -> Response {
    match worker.handle_message(message).await {
        Some(reply) => axum::Json(reply).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

async fn push<F: Fetcher + 'static>(
    State(worker): State<Arc<OfflineWorker<F>>>,
    body: axum::body::Bytes,
) -> Response {
    let payload = if body.is_empty() {
        None
    } else {
        match serde_json::from_slice::<PushPayload>(&body) {
            Ok(payload) => Some(payload),
            Err(e) => return (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
        }
    };
    match worker.push(payload, Utc::now()) {
        Some(notification) => axum::Json(notification).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

async fn register<F: Fetcher + 'static>(State(worker): State<Arc<OfflineWorker<F>>>) -> Response {
    let id = worker.register_client().await;
    let controlled = worker.controls(id).await;
    log::debug!("registered client {id} (controlled: {controlled})");
    axum::Json(serde_json::json!({ "id": id.to_string(), "controlled": controlled }))
        .into_response()
}

async fn client<F: Fetcher + 'static>(
    State(worker): State<Arc<OfflineWorker<F>>>,
    Path(id): Path<String>,
) -> Response {
    let Ok(id) = Uuid::parse_str(&id) else {
        return (StatusCode::BAD_REQUEST, "invalid client id").into_response();
    };
    let controlled = worker.controls(id).await;
    axum::Json(serde_json::json!({ "id": id.to_string(), "controlled": controlled }))
        .into_response()
}

async fn sync<F: Fetcher + 'static>(
    State(worker): State<Arc<OfflineWorker<F>>>,
    Path(tag): Path<String>,
) -> Response {
    let success = worker.sync(&tag).await;
    axum::Json(serde_json::json!({ "tag": tag, "success": success })).into_response()
}

/// Routes for the worker's control endpoints (messages, push, sync and
/// client registration) plus a catch-all that sends
/// every other request through [`OfflineWorker::handle_fetch`].
pub fn router<F: Fetcher + 'static>(worker: Arc<OfflineWorker<F>>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/__sw/message", post(message::<F>))
        .route("/__sw/push", post(push::<F>))
        .route("/__sw/sync/{tag}", post(sync::<F>))
        .route("/__sw/clients", post(register::<F>))
        .route("/__sw/clients/{id}", get(client::<F>))
        .fallback(forward::<F>)
        .layer(cors)
        .with_state(worker)
}

/// Resolves on SIGINT or SIGTERM.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => tokio::select! {
                _ = tokio::signal::ctrl_c() => log::info!("Received SIGINT"),
                _ = sigterm.recv() => log::info!("Received SIGTERM"),
            },
            Err(e) => {
                log::warn!("cannot listen for SIGTERM: {e}");
                tokio::signal::ctrl_c().await.ok();
                log::info!("Received SIGINT");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await.ok();
        log::info!("Received SIGINT");
    }
}

/// Restores the last snapshot into `storage`, if there is one.
async fn restore_snapshot(config: &AppConfig, storage: &CacheStorage) {
    let Some(path) = &config.proxy.snapshot_path else {
        return;
    };
    match Snapshot::load(path) {
        Ok(Some(snapshot)) => match snapshot.restore(storage).await {
            Ok(count) => log::info!("restored {count} cached responses from {}", path.display()),
            Err(e) => log::warn!("ignoring snapshot {}: {e}", path.display()),
        },
        Ok(None) => log::debug!("no snapshot at {}", path.display()),
        Err(e) => log::warn!("cannot read snapshot {}: {e}", path.display()),
    }
}

/// Runs the proxy until SIGINT or SIGTERM, then saves a cache snapshot.
///
/// # Errors
///
/// Returns an error if the address is invalid, the port cannot be bound
/// or the snapshot cannot be written.
pub async fn run_proxy(config: &AppConfig) -> Result<()> {
    let storage = Arc::new(CacheStorage::new());
    restore_snapshot(config, &storage).await;

    let http = reqwest::Client::builder()
        .timeout(config.client.predict_timeout)
        .build()?;
    let worker = Arc::new(OfflineWorker::with_storage(
        config.worker.clone(),
        ReqwestFetcher::new(http),
        Arc::clone(&storage),
    )?);
    worker.prune_api_cache(Utc::now()).await;
    if let Err(e) = worker.install().await {
        log::warn!("worker is waiting, requests bypass the cache: {e}");
    }

    let addr: SocketAddr = format!("{}:{}", config.proxy.host, config.proxy.port)
        .parse()
        .map_err(|e| Error::Config(format!("invalid proxy address: {e}")))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!(
        "proxy for {} listening on http://{addr}",
        config.worker.origin
    );

    axum::serve(listener, router(Arc::clone(&worker)))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(path) = &config.proxy.snapshot_path {
        worker.prune_api_cache(Utc::now()).await;
        let snapshot = Snapshot::capture(&storage, Utc::now()).await;
        snapshot.save(path)?;
        log::info!("saved {} cached responses to {}", snapshot.len(), path.display());
    }
    Ok(())
}
