//! HTTP/JSON surface.
//!
//! Handlers are thin: they extract request data, run the blocking service
//! call on the blocking pool and serialize the result. Every
//! [`TrackerError`] is turned into a JSON body by the [`IntoResponse`]
//! impl below, using the status from [`StructuredError::http_status`].

mod attachments;
mod extract;
mod issues;

use crate::error::{Result, ResultExt, StructuredError, TrackerError};
use crate::service::Services;
use axum::http::{Method, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

/// Build the application router with CORS and request tracing.
#[must_use]
pub fn router(services: Services) -> Router {
    Router::new()
        .route("/issue/all", get(issues::all))
        .route("/issue/id/{id}", get(issues::by_id).delete(issues::delete))
        .route("/issue/id/{id}/history", get(issues::history))
        .route("/issue/id/{id}/attachments", get(attachments::list))
        .route("/issue/title/{title}", get(issues::by_title))
        .route("/issue/type/{value}", get(issues::by_type))
        .route("/issue/severity/{value}", get(issues::by_severity))
        .route("/issue/status/{value}", get(issues::by_status))
        .route("/issue/project/{value}", get(issues::by_project))
        .route("/issue/filter", post(issues::filter))
        .route("/issue/search", get(issues::search))
        .route("/issue/create", post(issues::create))
        .route("/issue/update", put(issues::update_properties))
        .route("/issue/update-description", post(issues::update_description))
        .route("/issue/attachments/upload", post(attachments::upload))
        .route("/issue/attachments/{id}", delete(attachments::delete))
        .route("/issue/attachments/{id}/{filename}", get(attachments::download))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
        .with_state(services)
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::POST,
            Method::PUT,
            Method::GET,
            Method::OPTIONS,
            Method::DELETE,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .max_age(Duration::from_secs(3600))
}

/// Bind `addr` and serve until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails.
pub async fn serve(services: Services, addr: SocketAddr) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    let local = listener.local_addr()?;
    info!(address = %local, "Issue tracker listening");

    let cache = services.issues.clone();
    axum::serve(listener, router(services))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let stats = cache.cache().stats();
    info!(hits = stats.hits, misses = stats.misses, "Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}

/// Run a synchronous service call on the blocking pool.
pub(crate) async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|err| TrackerError::Other(anyhow::anyhow!("service task failed: {err}")))?
}

impl IntoResponse for TrackerError {
    fn into_response(self) -> Response {
        let structured = StructuredError::from_error(&self);
        let status = StatusCode::from_u16(structured.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if self.is_user_recoverable() {
            debug!(code = structured.code.as_str(), error = %self, "Request rejected");
        } else {
            error!(code = structured.code.as_str(), error = %self, "Request failed");
        }

        (status, Json(structured.to_json())).into_response()
    }
}
