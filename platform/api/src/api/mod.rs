use std::sync::Arc;

use hyper::{Body, StatusCode};
use routerify::{Router, RouterService};
use serde_json::json;

use self::error::ApiError;
use self::macros::make_response;
use crate::global::GlobalState;

pub mod error;
pub mod ext;
pub mod macros;
pub mod middleware;
pub mod request_context;
pub mod v1;

pub fn routes(global: &Arc<GlobalState>) -> Router<Body, ApiError> {
    // A weak reference keeps open keep-alive connections from pinning the
    // global state past shutdown.
    let weak = Arc::downgrade(global);
    Router::builder()
        .data(weak)
        .middleware(middleware::auth::context_middleware())
        .middleware(middleware::auth::device_auth_middleware())
        .middleware(middleware::auth::manager_auth_middleware())
        .middleware(middleware::cors::cors_middleware())
        .scope("/v1", v1::routes())
        .err_handler_with_info(error::error_handler)
        // Catch-all for everything the scopes above did not match.
        .any(|_| async move {
            Ok(make_response!(
                StatusCode::NOT_FOUND,
                json!({
                    "status": false,
                    "result": "not found",
                })
            ))
        })
        .build()
        .expect("failed to build router")
}

pub async fn run(global: Arc<GlobalState>) -> anyhow::Result<()> {
    let bind_address = global.config.api.bind_address;

    let service = RouterService::new(routes(&global))
        .map_err(|e| anyhow::anyhow!("failed to build router service: {e}"))?;

    tracing::info!("listening on {}", bind_address);

    hyper::Server::bind(&bind_address).serve(service).await?;

    Ok(())
}
