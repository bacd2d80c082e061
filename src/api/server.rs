use crate::api::routes;
use crate::config::Shared;
use crate::host_store::DynHostStore;
use std::future::Future;
use std::net::SocketAddr;
use tracing::Dispatch;

#[derive(Clone)]
pub(super) struct AppState {
    pub config: Shared,
    pub host_store: DynHostStore,
    pub diagnostics: Dispatch,
}

/// Serve the HTTP API on [`Config::api_bind_addr`][crate::config::Config::api_bind_addr].
/// Everything logged while handling requests goes to `diagnostics`.
pub fn new(
    config: Shared,
    host_store: DynHostStore,
    diagnostics: Dispatch,
) -> impl Future<Output = hyper::Result<()>> {
    axum::Server::bind(&config.api_bind_addr).serve(
        routes::new(AppState {
            config,
            host_store,
            diagnostics,
        })
        .into_make_service_with_connect_info::<SocketAddr>(),
    )
}
