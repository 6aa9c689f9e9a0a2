use hyper::{Body, Request, Response, StatusCode};
use serde_json::json;

use crate::api::error::{ApiError, Result};
use crate::api::ext::{parse_json_body, RequestExt};
use crate::api::macros::make_response;
use crate::database::Device;

#[derive(serde::Deserialize)]
struct RegisterRequest {
    #[serde(default)]
    os: String,
    push_token: Option<String>,
    /// When present, replaces the followed-project set.
    followed_projects: Option<Vec<i64>>,
}

/// Registers or updates the calling device. The identity comes from the
/// encrypted device header, never from the body.
async fn register(req: Request<Body>) -> Result<Response<Body>> {
    let global = req.get_global()?;
    let device = req.request_context().require_device().await?;

    let body: RegisterRequest = parse_json_body(req).await?;

    Device::register(&global.db, &device.id, &body.os, body.push_token.as_deref()).await?;

    if let Some(projects) = &body.followed_projects {
        Device::set_followed_projects(&global.db, &device.id, projects).await?;
    }

    let registered = Device::get(&global.db, &device.id)
        .await?
        .ok_or(ApiError::NotFound("device"))?;
    let followed = Device::followed_projects(&global.db, &device.id).await?;

    Ok(make_response!(
        StatusCode::OK,
        json!({
            "status": true,
            "result": {
                "device": registered,
                "followed_projects": followed,
            }
        })
    ))
}

pub fn routes() -> routerify::Router<Body, ApiError> {
    routerify::Router::builder()
        .post("/register", register)
        .build()
        .expect("failed to build router")
}
