use crate::api::api_error::APIError;
use crate::api::model::StoreHostsResult;
use crate::api::server::AppState;
use crate::error::Error;
use crate::host::Host;
use crate::host_store::HostStore;
use crate::nodeset::NodeSet;
use axum::extract::{ConnectInfo, Path, State};
use axum::http::{Request, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use axum_extra::extract::WithRejection;
use serde_json::json;
use std::net::SocketAddr;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::instrument::WithSubscriber;

pub(super) fn new(state: AppState) -> Router {
    Router::new()
        .route("/healthcheck", get(health_check))
        .route("/hosts", get(list_hosts).post(add_hosts))
        .route("/hosts/:nodeset", get(find_hosts))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            with_diagnostics,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(state.config.api_timeout))
        .with_state(state)
}

async fn with_diagnostics<B>(
    State(state): State<AppState>,
    request: Request<B>,
    next: Next<B>,
) -> Response {
    next.run(request)
        .with_subscriber(state.diagnostics.clone())
        .await
}

#[allow(clippy::unused_async)]
async fn health_check() -> impl IntoResponse {
    Json(json!({"ok":"healthy"}))
}

async fn add_hosts(
    State(state): State<AppState>,
    ConnectInfo(client_addr): ConnectInfo<SocketAddr>,
    WithRejection(Json(hosts), _): WithRejection<Json<Vec<Host>>, APIError>,
) -> Result<(StatusCode, Json<StoreHostsResult>), APIError> {
    let client_addr = client_addr.ip();
    let count = hosts.len();
    tracing::info!("attempting to add {count} hosts from {client_addr}");

    match state.host_store.write().await.store_hosts(hosts).await {
        Ok(()) => {
            tracing::info!("added {count} hosts from {client_addr}");
            Ok((StatusCode::CREATED, Json(StoreHostsResult { hosts: count })))
        }
        Err(err @ Error::InvalidHost { .. }) => {
            tracing::warn!(ip = %client_addr, %err, "rejected invalid host");
            Err(err.into())
        }
        Err(err) => {
            tracing::error!(ip = %client_addr, %err, "failed to save hosts");
            Err(err.into())
        }
    }
}

async fn list_hosts(State(state): State<AppState>) -> Result<Json<Vec<Host>>, APIError> {
    match state.host_store.read().await.hosts().await {
        Ok(hosts) => Ok(Json(hosts)),
        Err(err) => {
            tracing::error!(%err, "failed to fetch host list");
            Err(err.into())
        }
    }
}

async fn find_hosts(
    State(state): State<AppState>,
    Path(expr): Path<String>,
) -> Result<Json<Vec<Host>>, APIError> {
    let nodes = match NodeSet::parse(&expr) {
        Ok(nodes) => nodes,
        Err(err) => {
            tracing::warn!(nodeset = %expr, %err, "invalid nodeset");
            return Err(Error::from(err).into());
        }
    };
    tracing::debug!("got nodeset {nodes}");

    match state.host_store.read().await.find_hosts(&nodes).await {
        Ok(hosts) => Ok(Json(hosts)),
        Err(err) => {
            tracing::error!(nodeset = %nodes, %err, "failed to find hosts");
            Err(err.into())
        }
    }
}
