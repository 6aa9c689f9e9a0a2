use hyper::{Body, Request, Response, StatusCode};
use serde_json::json;
use uuid::Uuid;

use super::articles::parse_id_list;
use crate::api::error::{ApiError, Result};
use crate::api::ext::{parse_json_body, RequestExt};
use crate::api::macros::make_response;
use crate::database::Notification;
use crate::notifier::NotificationDispatcher;

#[derive(serde::Deserialize)]
struct CreateRequest {
    title: String,
    body: String,
    warning_id: Option<Uuid>,
    article_foreign_id: Option<i64>,
}

/// Stores the notification and dispatches it in the background. The record
/// must reference at least one content item; the dispatcher sorts out
/// whether the reference actually resolves.
async fn create(req: Request<Body>) -> Result<Response<Body>> {
    let global = req.get_global()?;
    req.request_context().require_manager().await?;

    let body: CreateRequest = parse_json_body(req).await?;

    if body.title.is_empty() || (body.warning_id.is_none() && body.article_foreign_id.is_none()) {
        return Err(ApiError::InvalidQuery);
    }

    let notification = Notification::create(
        &global.db,
        &body.title,
        &body.body,
        body.warning_id,
        body.article_foreign_id,
    )
    .await?;

    let notification_id = notification.id;
    tokio::spawn(async move {
        let dispatcher = match NotificationDispatcher::resolve(
            &global.db,
            global.push.clone(),
            global.config.push.batch_size,
            notification_id,
        )
        .await
        {
            Ok(dispatcher) => dispatcher,
            Err(err) => {
                tracing::error!(%notification_id, "failed to resolve notification: {}", err);
                return;
            }
        };

        if dispatcher.is_valid() {
            let report = dispatcher.send().await;
            tracing::info!(
                %notification_id,
                batches = report.batches_sent,
                failed = report.failed_tokens.len(),
                "notification dispatched"
            );
        }
    });

    Ok(make_response!(
        StatusCode::OK,
        json!({ "status": true, "result": notification })
    ))
}

async fn list(req: Request<Body>) -> Result<Response<Body>> {
    let global = req.get_global()?;
    let params = req.query_params();

    let project_ids = parse_id_list(params.get("project_ids").ok_or(ApiError::InvalidQuery)?)?;

    let notifications = Notification::list_for_projects(&global.db, &project_ids).await?;

    Ok(make_response!(
        StatusCode::OK,
        json!({ "status": true, "result": notifications })
    ))
}

pub fn routes() -> routerify::Router<Body, ApiError> {
    routerify::Router::builder()
        .get("/", list)
        .post("/", create)
        .build()
        .expect("failed to build router")
}
