use hyper::{Body, Request, Response, StatusCode};
use serde_json::json;

use crate::api::error::Result;
use crate::api::macros::make_response;

async fn health(_: Request<Body>) -> Result<Response<Body>> {
    Ok(make_response!(
        StatusCode::OK,
        json!({
            "status": "ok"
        })
    ))
}

pub fn routes() -> routerify::Router<Body, crate::api::error::ApiError> {
    routerify::Router::builder()
        .get("/", health)
        .build()
        .expect("failed to build router")
}
