use std::collections::HashSet;

use hyper::{Body, Request, Response, StatusCode};
use serde_json::json;

use crate::api::error::{ApiError, Result};
use crate::api::ext::{parse_json_body, RequestExt};
use crate::api::macros::make_response;
use crate::database::{Device, Project, WarningMessage};

/// Active projects only. When the caller presents a device identity each
/// entry carries a `followed` flag.
async fn list(req: Request<Body>) -> Result<Response<Body>> {
    let global = req.get_global()?;

    let projects = Project::list_active(&global.db).await?;

    let followed: HashSet<i64> = match req.request_context().device().await {
        Some(device) => Device::followed_projects(&global.db, &device.id)
            .await?
            .into_iter()
            .collect(),
        None => HashSet::new(),
    };

    let result: Vec<_> = projects
        .into_iter()
        .map(|project| {
            let mut entry = serde_json::to_value(&project).unwrap_or_default();
            entry["followed"] = json!(followed.contains(&project.foreign_id));
            entry
        })
        .collect();

    Ok(make_response!(
        StatusCode::OK,
        json!({ "status": true, "result": result })
    ))
}

/// A single project by its foreign id, active or not, with its warnings.
async fn details(req: Request<Body>) -> Result<Response<Body>> {
    let global = req.get_global()?;
    let params = req.query_params();

    let foreign_id: i64 = params
        .get("foreign_id")
        .and_then(|id| id.parse().ok())
        .ok_or(ApiError::InvalidQuery)?;

    let project = Project::get(&global.db, foreign_id)
        .await?
        .ok_or(ApiError::NotFound("project"))?;

    let warnings = WarningMessage::list_for_project(&global.db, foreign_id).await?;

    let followed = match req.request_context().device().await {
        Some(device) => Device::followed_projects(&global.db, &device.id)
            .await?
            .contains(&foreign_id),
        None => false,
    };

    Ok(make_response!(
        StatusCode::OK,
        json!({
            "status": true,
            "result": {
                "project": project,
                "warnings": warnings,
                "followed": followed,
            }
        })
    ))
}

#[derive(serde::Deserialize)]
struct FollowRequest {
    foreign_id: i64,
}

async fn follow(req: Request<Body>) -> Result<Response<Body>> {
    let global = req.get_global()?;
    let device = req.request_context().require_device().await?;

    let body: FollowRequest = parse_json_body(req).await?;

    Project::get(&global.db, body.foreign_id)
        .await?
        .ok_or(ApiError::NotFound("project"))?;

    Device::follow_project(&global.db, &device.id, body.foreign_id).await?;

    Ok(make_response!(
        StatusCode::OK,
        json!({ "status": true, "result": "subscription added" })
    ))
}

async fn unfollow(req: Request<Body>) -> Result<Response<Body>> {
    let global = req.get_global()?;
    let device = req.request_context().require_device().await?;

    let body: FollowRequest = parse_json_body(req).await?;

    Device::unfollow_project(&global.db, &device.id, body.foreign_id).await?;

    Ok(make_response!(
        StatusCode::OK,
        json!({ "status": true, "result": "subscription removed" })
    ))
}

pub fn routes() -> routerify::Router<Body, ApiError> {
    routerify::Router::builder()
        .get("/", list)
        .get("/details", details)
        .post("/follow", follow)
        .delete("/follow", unfollow)
        .build()
        .expect("failed to build router")
}
