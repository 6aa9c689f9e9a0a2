use chrono::{Duration, Utc};
use hyper::{Body, Request, Response, StatusCode};
use serde_json::json;
use uuid::Uuid;

use crate::api::error::{ApiError, Result};
use crate::api::ext::{parse_json_body, RequestExt};
use crate::api::macros::make_response;
use crate::api::middleware;
use crate::database::ProjectManager;
use crate::jwt::{JwtState, ManagerJwtPayload};

/// Issued manager tokens stay valid this long.
const TOKEN_VALIDITY_HOURS: i64 = 24;

async fn list(req: Request<Body>) -> Result<Response<Body>> {
    let global = req.get_global()?;

    let managers = ProjectManager::list(&global.db).await?;

    Ok(make_response!(
        StatusCode::OK,
        json!({ "status": true, "result": managers })
    ))
}

async fn single(req: Request<Body>) -> Result<Response<Body>> {
    let global = req.get_global()?;
    let params = req.query_params();

    let id: Uuid = params
        .get("id")
        .and_then(|id| id.parse().ok())
        .ok_or(ApiError::InvalidQuery)?;

    let manager = ProjectManager::get(&global.db, id)
        .await?
        .ok_or(ApiError::NotFound("project manager"))?;

    let projects = ProjectManager::assigned_projects(&global.db, id).await?;

    Ok(make_response!(
        StatusCode::OK,
        json!({
            "status": true,
            "result": {
                "manager": manager,
                "projects": projects,
            }
        })
    ))
}

#[derive(serde::Deserialize)]
struct CreateRequest {
    email: String,
    #[serde(default)]
    projects: Vec<i64>,
}

async fn create(req: Request<Body>) -> Result<Response<Body>> {
    let global = req.get_global()?;

    let body: CreateRequest = parse_json_body(req).await?;

    if let Err(reason) =
        ProjectManager::validate_email(&body.email, &global.config.ingest.manager_email_domain)
    {
        tracing::debug!(email = body.email, reason, "rejected manager e-mail");
        return Err(ApiError::InvalidQuery);
    }

    let manager = ProjectManager::create(&global.db, &body.email).await?;
    ProjectManager::assign_projects(&global.db, manager.id, &body.projects).await?;

    Ok(make_response!(
        StatusCode::OK,
        json!({ "status": true, "result": manager })
    ))
}

#[derive(serde::Deserialize)]
struct UpdateRequest {
    id: Uuid,
    projects: Vec<i64>,
}

async fn update(req: Request<Body>) -> Result<Response<Body>> {
    let global = req.get_global()?;

    let body: UpdateRequest = parse_json_body(req).await?;

    ProjectManager::get(&global.db, body.id)
        .await?
        .ok_or(ApiError::NotFound("project manager"))?;

    ProjectManager::assign_projects(&global.db, body.id, &body.projects).await?;

    Ok(make_response!(
        StatusCode::OK,
        json!({ "status": true, "result": "assignments updated" })
    ))
}

/// Deleting a manager keeps their warnings; attribution survives through the
/// author-email snapshot.
async fn delete(req: Request<Body>) -> Result<Response<Body>> {
    let global = req.get_global()?;
    let params = req.query_params();

    let id: Uuid = params
        .get("id")
        .and_then(|id| id.parse().ok())
        .ok_or(ApiError::InvalidQuery)?;

    if !ProjectManager::delete(&global.db, id).await? {
        return Err(ApiError::NotFound("project manager"));
    }

    Ok(make_response!(
        StatusCode::OK,
        json!({ "status": true, "result": "project manager deleted" })
    ))
}

/// Mints a bearer token for the redaction tool.
async fn token(req: Request<Body>) -> Result<Response<Body>> {
    let global = req.get_global()?;
    let params = req.query_params();

    let id: Uuid = params
        .get("id")
        .and_then(|id| id.parse().ok())
        .ok_or(ApiError::InvalidQuery)?;

    let manager = ProjectManager::get(&global.db, id)
        .await?
        .ok_or(ApiError::NotFound("project manager"))?;

    let token = ManagerJwtPayload {
        manager_id: manager.id,
        expiration: Some(Utc::now() + Duration::hours(TOKEN_VALIDITY_HOURS)),
        issued_at: Utc::now(),
    }
    .serialize(&global.config.jwt)
    .ok_or(ApiError::Internal("failed to sign manager token"))?;

    Ok(make_response!(
        StatusCode::OK,
        json!({ "status": true, "result": { "token": token } })
    ))
}

pub fn routes() -> routerify::Router<Body, ApiError> {
    routerify::Router::builder()
        // The whole manager surface is admin plane.
        .middleware(middleware::auth::ingest_auth_middleware())
        .get("/", list)
        .get("/single", single)
        .post("/", create)
        .patch("/", update)
        .delete("/", delete)
        .get("/token", token)
        .build()
        .expect("failed to build router")
}
