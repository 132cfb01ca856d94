use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{Path, Query as QueryString, State},
    http::{header::CONTENT_TYPE, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use thiserror::Error;
use tokio::{net::TcpListener, signal};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::catalog::{Catalog, CatalogError, Lookup};
use crate::output::{self, pages, ApiListing, SiteOptions};
use crate::pipeline::{Query, QueryParams};

pub struct AppState {
    pub catalog: Arc<Catalog>,
    pub site: SiteOptions,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("not found")]
    NotFound,

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Carries the site settings so error pages share the layout.
pub struct PageError {
    site: SiteOptions,
    error: AppError,
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        match self.error {
            AppError::NotFound => (
                StatusCode::NOT_FOUND,
                Html(pages::render_not_found(&self.site)),
            )
                .into_response(),
            AppError::Catalog(e) => {
                error!(error = %e, "render failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Html(pages::render_error(&self.site)),
                )
                    .into_response()
            }
        }
    }
}

impl AppState {
    fn page_error(&self, error: impl Into<AppError>) -> PageError {
        PageError {
            site: self.site.clone(),
            error: error.into(),
        }
    }
}

async fn listing_handler(
    State(state): State<Arc<AppState>>,
    QueryString(params): QueryString<QueryParams>,
) -> Result<Html<String>, PageError> {
    let snapshot = state
        .catalog
        .snapshot()
        .await
        .map_err(|e| state.page_error(e))?;
    let query = Query::from_params(&params);
    Ok(Html(pages::render_listing(
        &state.site,
        snapshot.costumes(),
        &query,
        pages::ListingMode::Interactive,
    )))
}

async fn detail_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Html<String>, PageError> {
    match state
        .catalog
        .lookup(&id)
        .await
        .map_err(|e| state.page_error(e))?
    {
        Lookup::Found(costume) => Ok(Html(pages::render_detail(&state.site, &costume))),
        Lookup::NotFound => Err(state.page_error(AppError::NotFound)),
    }
}

async fn api_handler(
    State(state): State<Arc<AppState>>,
    QueryString(params): QueryString<QueryParams>,
) -> Response {
    let snapshot = match state.catalog.snapshot().await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            error!(error = %e, "api listing failed");
            return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
        }
    };
    let listing = ApiListing::build(snapshot.costumes(), &Query::from_params(&params));
    match output::render_json(&listing) {
        Ok(body) => (StatusCode::OK, [(CONTENT_TYPE, "application/json")], body).into_response(),
        Err(e) => {
            error!(error = %e, "api listing serialization failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "serialization failed").into_response()
        }
    }
}

async fn health_handler() -> &'static str {
    "ok"
}

async fn fallback_handler(State(state): State<Arc<AppState>>) -> PageError {
    state.page_error(AppError::NotFound)
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(listing_handler))
        .route("/costumes/:id", get(detail_handler))
        .route("/api/costumes", get(api_handler))
        .route("/healthz", get(health_handler))
        .fallback(fallback_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(address: SocketAddr, state: Arc<AppState>) -> Result<(), std::io::Error> {
    // Warm the snapshot so the first visitor does not pay for the fetch.
    if let Err(e) = state.catalog.snapshot().await {
        warn!(error = %e, "initial catalog fetch failed; will retry on first request");
    }

    let app = router(state);
    let listener = TcpListener::bind(address).await?;
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                warn!(error = %e, "failed to install Ctrl+C handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                warn!(error = %e, "failed to install terminate handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    use crate::catalog::CatalogOptions;
    use crate::sheets::RecordSource;

    fn app() -> Router {
        let catalog = Catalog::new(
            RecordSource::inline([
                vec!["1", "Rose Gown", "A", "M", "Red", "", "Silk", "TRUE"],
                vec!["2", "Blue Cape", "B", "S"],
                vec!["3", "Amber Veil", "A", "L"],
            ]),
            CatalogOptions::default(),
        );
        router(Arc::new(AppState {
            catalog,
            site: SiteOptions::default(),
        }))
    }

    async fn get(uri: &str) -> (StatusCode, String) {
        let resp = app()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn listing_applies_query_string() {
        let (status, body) = get("/?category=A&sort=name&order=asc").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("2点の衣装が見つかりました"));
        assert!(body.find("Amber Veil").unwrap() < body.find("Rose Gown").unwrap());
        assert!(!body.contains("Blue Cape"));
    }

    #[tokio::test]
    async fn listing_ignores_unknown_sort() {
        let (status, body) = get("/?sort=price&order=up").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("3点の衣装が見つかりました"));
    }

    #[tokio::test]
    async fn detail_found_and_missing() {
        let (status, body) = get("/costumes/1").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Rose Gown"));
        assert!(body.contains("利用可能"));

        let (status, body) = get("/costumes/999").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.contains("404"));
    }

    #[tokio::test]
    async fn api_returns_filtered_json() {
        let (status, body) = get("/api/costumes?q=cape").await;
        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["count"], 1);
        assert_eq!(json["total"], 3);
        assert_eq!(json["costumes"][0]["name"], "Blue Cape");
        assert_eq!(json["categories"], serde_json::json!(["all", "A", "B"]));
    }

    #[tokio::test]
    async fn unknown_route_is_not_found_page() {
        let (status, body) = get("/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.contains("一覧に戻る"));
        let (status, body) = get("/healthz").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "ok");
    }
}
