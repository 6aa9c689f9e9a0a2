use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use hyper::{Body, Request, Response, StatusCode};
use serde_json::json;
use uuid::Uuid;

use crate::api::error::{ApiError, Result};
use crate::api::ext::{parse_json_body, RequestExt};
use crate::api::macros::make_response;
use crate::api::request_context::ManagerIdentity;
use crate::database::{Project, ProjectManager, WarningMessage};
use crate::global::GlobalState;

/// Image formats the redaction tool may attach.
const ACCEPTED_IMAGE_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp"];

async fn list(req: Request<Body>) -> Result<Response<Body>> {
    let global = req.get_global()?;
    let params = req.query_params();

    let project_foreign_id: i64 = params
        .get("project_foreign_id")
        .and_then(|id| id.parse().ok())
        .ok_or(ApiError::InvalidQuery)?;

    let warnings = WarningMessage::list_for_project(&global.db, project_foreign_id).await?;

    Ok(make_response!(
        StatusCode::OK,
        json!({ "status": true, "result": warnings })
    ))
}

async fn single(req: Request<Body>) -> Result<Response<Body>> {
    let global = req.get_global()?;
    let params = req.query_params();

    let id: Uuid = params
        .get("id")
        .and_then(|id| id.parse().ok())
        .ok_or(ApiError::InvalidQuery)?;

    let warning = WarningMessage::get(&global.db, id)
        .await?
        .ok_or(ApiError::NotFound("warning message"))?;

    let images = WarningMessage::images(&global.db, id).await?;

    Ok(make_response!(
        StatusCode::OK,
        json!({
            "status": true,
            "result": {
                "warning": warning,
                "images": images,
            }
        })
    ))
}

#[derive(serde::Deserialize)]
struct CreateRequest {
    project_foreign_id: i64,
    title: String,
    body: String,
}

async fn create(req: Request<Body>) -> Result<Response<Body>> {
    let global = req.get_global()?;
    let identity = req.request_context().require_manager().await?;

    let body: CreateRequest = parse_json_body(req).await?;
    if body.title.is_empty() {
        return Err(ApiError::InvalidQuery);
    }

    Project::get(&global.db, body.project_foreign_id)
        .await?
        .ok_or(ApiError::NotFound("project"))?;

    require_assignment(&global, &identity, body.project_foreign_id).await?;

    // The author's e-mail is snapshotted so deleting the manager later does
    // not lose attribution.
    let warning = WarningMessage::create(
        &global.db,
        body.project_foreign_id,
        identity.manager.id,
        &identity.manager.email,
        &body.title,
        &body.body,
    )
    .await?;

    Ok(make_response!(
        StatusCode::OK,
        json!({ "status": true, "result": warning })
    ))
}

#[derive(serde::Deserialize)]
struct UpdateRequest {
    id: Uuid,
    title: String,
    body: String,
}

async fn update(req: Request<Body>) -> Result<Response<Body>> {
    let global = req.get_global()?;
    let identity = req.request_context().require_manager().await?;

    let body: UpdateRequest = parse_json_body(req).await?;

    let warning = WarningMessage::get(&global.db, body.id)
        .await?
        .ok_or(ApiError::NotFound("warning message"))?;

    require_assignment(&global, &identity, warning.project_foreign_id).await?;

    let warning = WarningMessage::update(&global.db, body.id, &body.title, &body.body)
        .await?
        .ok_or(ApiError::NotFound("warning message"))?;

    Ok(make_response!(
        StatusCode::OK,
        json!({ "status": true, "result": warning })
    ))
}

async fn delete(req: Request<Body>) -> Result<Response<Body>> {
    let global = req.get_global()?;
    let identity = req.request_context().require_manager().await?;
    let params = req.query_params();

    let id: Uuid = params
        .get("id")
        .and_then(|id| id.parse().ok())
        .ok_or(ApiError::InvalidQuery)?;

    let warning = WarningMessage::get(&global.db, id)
        .await?
        .ok_or(ApiError::NotFound("warning message"))?;

    require_assignment(&global, &identity, warning.project_foreign_id).await?;

    WarningMessage::delete(&global.db, id).await?;

    Ok(make_response!(
        StatusCode::OK,
        json!({ "status": true, "result": "warning message deleted" })
    ))
}

#[derive(serde::Deserialize)]
struct AttachImageRequest {
    warning_id: Uuid,
    mime_type: String,
    #[serde(default)]
    description: String,
    /// Base64-encoded image bytes.
    data: String,
}

async fn attach_image(req: Request<Body>) -> Result<Response<Body>> {
    let global = req.get_global()?;
    let identity = req.request_context().require_manager().await?;

    let body: AttachImageRequest = parse_json_body(req).await?;

    if !ACCEPTED_IMAGE_TYPES.contains(&body.mime_type.as_str()) {
        return Err(ApiError::InvalidQuery);
    }

    let data = BASE64
        .decode(&body.data)
        .map_err(|_| ApiError::InvalidQuery)?;

    let warning = WarningMessage::get(&global.db, body.warning_id)
        .await?
        .ok_or(ApiError::NotFound("warning message"))?;

    require_assignment(&global, &identity, warning.project_foreign_id).await?;

    let image = WarningMessage::add_image(
        &global.db,
        body.warning_id,
        &body.mime_type,
        &body.description,
        &data,
    )
    .await?;

    Ok(make_response!(
        StatusCode::OK,
        json!({ "status": true, "result": image })
    ))
}

/// A manager may only touch warnings of projects they are assigned to.
async fn require_assignment(
    global: &GlobalState,
    identity: &ManagerIdentity,
    project_foreign_id: i64,
) -> Result<()> {
    if ProjectManager::is_assigned(&global.db, identity.manager.id, project_foreign_id).await? {
        Ok(())
    } else {
        Err(ApiError::Forbidden("manager is not assigned to this project"))
    }
}

pub fn routes() -> routerify::Router<Body, ApiError> {
    routerify::Router::builder()
        .get("/", list)
        .get("/single", single)
        .post("/", create)
        .patch("/", update)
        .delete("/", delete)
        .post("/image", attach_image)
        .build()
        .expect("failed to build router")
}
