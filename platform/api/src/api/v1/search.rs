use std::collections::HashSet;

use hyper::{Body, Request, Response, StatusCode};
use serde_json::json;

use crate::api::error::{ApiError, Result};
use crate::api::ext::RequestExt;
use crate::api::macros::make_response;
use crate::database::{Article, Project, SearchResult};
use crate::search;

const DEFAULT_LIMIT: i64 = 20;

/// Weighted trigram search over projects or articles
/// (`?text=...&entity=projects&fields=title,subtitle`).
async fn query(req: Request<Body>) -> Result<Response<Body>> {
    let global = req.get_global()?;
    let params = req.query_params();

    let text = params.get("text").ok_or(ApiError::InvalidQuery)?;

    let fields: Vec<String> = params
        .get("fields")
        .map(|raw| {
            raw.split(',')
                .filter(|field| !field.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let limit = match params.get("limit") {
        Some(limit) => limit.parse().map_err(|_| ApiError::InvalidQuery)?,
        None => DEFAULT_LIMIT,
    };

    let result = match params.get("entity").map(String::as_str) {
        Some("projects") | None => {
            let rows: Vec<SearchResult<Project>> =
                search::search(&global.db, search::PROJECTS, &fields, text, limit)
                    .await
                    .map_err(map_search_error)?;
            ranked(rows, |project| project.foreign_id)
        }
        Some("articles") => {
            let rows: Vec<SearchResult<Article>> =
                search::search(&global.db, search::ARTICLES, &fields, text, limit)
                    .await
                    .map_err(map_search_error)?;
            ranked(rows, |article| article.foreign_id)
        }
        Some(_) => return Err(ApiError::InvalidQuery),
    };

    Ok(make_response!(
        StatusCode::OK,
        json!({ "status": true, "result": result })
    ))
}

/// Serializes the ranked rows, de-duplicated by identity preserving the
/// first (highest-ranked) occurrence.
fn ranked<T: serde::Serialize>(
    rows: Vec<SearchResult<T>>,
    identity: impl Fn(&T) -> i64,
) -> Vec<serde_json::Value> {
    let mut seen = HashSet::new();
    rows.into_iter()
        .filter(|row| seen.insert(identity(&row.object)))
        .map(|row| {
            let mut entry = serde_json::to_value(&row.object).unwrap_or_default();
            entry["score"] = json!(row.score);
            entry
        })
        .collect()
}

fn map_search_error(err: search::SearchError) -> ApiError {
    match err {
        search::SearchError::UnknownField(_) => ApiError::InvalidQuery,
        search::SearchError::Database(err) => ApiError::Database(err),
    }
}

pub fn routes() -> routerify::Router<Body, ApiError> {
    routerify::Router::builder()
        .get("/", query)
        .build()
        .expect("failed to build router")
}
