use hyper::{Body, Request, Response, StatusCode};
use serde_json::json;

use crate::api::error::{ApiError, Result};
use crate::api::ext::RequestExt;
use crate::api::macros::make_response;
use crate::database::Article;

const DEFAULT_LIMIT: i64 = 100;

/// Active articles, newest first, optionally restricted to a set of
/// projects (`project_ids=1,2,3`).
async fn list(req: Request<Body>) -> Result<Response<Body>> {
    let global = req.get_global()?;
    let params = req.query_params();

    let limit = match params.get("limit") {
        Some(limit) => limit.parse().map_err(|_| ApiError::InvalidQuery)?,
        None => DEFAULT_LIMIT,
    };

    let articles = match params.get("project_ids") {
        Some(ids) => {
            let project_ids = parse_id_list(ids)?;
            Article::list_for_projects(&global.db, &project_ids, limit).await?
        }
        None => Article::list_active(&global.db, limit).await?,
    };

    Ok(make_response!(
        StatusCode::OK,
        json!({ "status": true, "result": articles })
    ))
}

async fn single(req: Request<Body>) -> Result<Response<Body>> {
    let global = req.get_global()?;
    let params = req.query_params();

    let foreign_id: i64 = params
        .get("foreign_id")
        .and_then(|id| id.parse().ok())
        .ok_or(ApiError::InvalidQuery)?;

    let article = Article::get(&global.db, foreign_id)
        .await?
        .ok_or(ApiError::NotFound("article"))?;

    let project_ids = Article::project_ids(&global.db, foreign_id).await?;

    Ok(make_response!(
        StatusCode::OK,
        json!({
            "status": true,
            "result": {
                "article": article,
                "project_ids": project_ids,
            }
        })
    ))
}

/// Comma-separated foreign ids; any unparsable entry invalidates the query.
pub fn parse_id_list(raw: &str) -> Result<Vec<i64>> {
    raw.split(',')
        .filter(|part| !part.is_empty())
        .map(|part| part.trim().parse().map_err(|_| ApiError::InvalidQuery))
        .collect()
}

pub fn routes() -> routerify::Router<Body, ApiError> {
    routerify::Router::builder()
        .get("/", list)
        .get("/single", single)
        .build()
        .expect("failed to build router")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_list_parsing() {
        assert_eq!(parse_id_list("1,2,3").unwrap(), vec![1, 2, 3]);
        assert_eq!(parse_id_list("42").unwrap(), vec![42]);
        assert!(parse_id_list("").unwrap().is_empty());
        assert!(parse_id_list("1,x").is_err());
    }
}
