use chrono::{DateTime, Utc};
use hyper::{Body, Request, Response, StatusCode};
use serde_json::json;

use crate::api::error::{ApiError, Result};
use crate::api::ext::{parse_json_body, RequestExt};
use crate::api::macros::make_response;
use crate::api::middleware;
use crate::database::{Article, ArticleIngest, Project, ProjectIngest};
use crate::gc;

/// Batch upsert from the scraper. Every delivered row is marked seen now;
/// the garbage-collect sweep afterwards reconciles everything else.
async fn projects(req: Request<Body>) -> Result<Response<Body>> {
    let global = req.get_global()?;

    let batch: Vec<ProjectIngest> = parse_json_body(req).await?;

    for ingest in &batch {
        Project::upsert(&global.db, ingest).await?;
    }

    Ok(make_response!(
        StatusCode::OK,
        json!({ "status": true, "result": { "upserted": batch.len() } })
    ))
}

async fn articles(req: Request<Body>) -> Result<Response<Body>> {
    let global = req.get_global()?;

    let batch: Vec<ArticleIngest> = parse_json_body(req).await?;

    for ingest in &batch {
        Article::upsert(&global.db, ingest).await?;
    }

    Ok(make_response!(
        StatusCode::OK,
        json!({ "status": true, "result": { "upserted": batch.len() } })
    ))
}

/// Runs the three-way reconciliation sweep. An unparsable cutoff is a caller
/// error rejected before the sweep starts.
async fn garbage_collect(req: Request<Body>) -> Result<Response<Body>> {
    let global = req.get_global()?;
    let params = req.query_params();

    let last_scrape_time: DateTime<Utc> = params
        .get("last_scrape_time")
        .and_then(|raw| raw.parse().ok())
        .ok_or(ApiError::InvalidQuery)?;

    let report = gc::sweep(&global.db, last_scrape_time).await?;

    Ok(make_response!(
        StatusCode::OK,
        json!({ "status": true, "result": report })
    ))
}

#[derive(serde::Deserialize)]
struct MintTokenRequest {
    identity: String,
}

/// Mints an encrypted device token for the given identity. Admin tooling
/// uses this to provision test devices for the redaction tool and QA.
async fn mint_device_token(req: Request<Body>) -> Result<Response<Body>> {
    let global = req.get_global()?;

    let body: MintTokenRequest = parse_json_body(req).await?;
    if body.identity.is_empty() {
        return Err(ApiError::InvalidQuery);
    }

    let token = global.device_cipher.encrypt(&body.identity);

    Ok(make_response!(
        StatusCode::OK,
        json!({ "status": true, "result": { "device_token": token } })
    ))
}

pub fn routes() -> routerify::Router<Body, ApiError> {
    routerify::Router::builder()
        .middleware(middleware::auth::ingest_auth_middleware())
        .post("/projects", projects)
        .post("/articles", articles)
        .post("/garbagecollect", garbage_collect)
        .post("/devicetoken", mint_device_token)
        .build()
        .expect("failed to build router")
}
