use hyper::{Body, Request, Response, StatusCode};
use uuid::Uuid;

use crate::api::error::{ApiError, Result};
use crate::api::ext::RequestExt;
use crate::database::WarningImage;

/// Raw image bytes with the stored mime type.
async fn get(req: Request<Body>) -> Result<Response<Body>> {
    let global = req.get_global()?;
    let params = req.query_params();

    let id: Uuid = params
        .get("id")
        .and_then(|id| id.parse().ok())
        .ok_or(ApiError::InvalidQuery)?;

    let image = WarningImage::get(&global.db, id)
        .await?
        .ok_or(ApiError::NotFound("image"))?;

    Ok(hyper::Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", image.mime_type)
        .body(Body::from(image.data))
        .expect("failed to build response"))
}

pub fn routes() -> routerify::Router<Body, ApiError> {
    routerify::Router::builder()
        .get("/", get)
        .build()
        .expect("failed to build router")
}
