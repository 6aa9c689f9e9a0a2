use hyper::{Body, Request, Response, StatusCode};
use serde_json::json;

use crate::api::error::{ApiError, Result};
use crate::api::ext::RequestExt;
use crate::api::macros::make_response;
use crate::database::Project;
use crate::geo;

/// Distance from a point to every active project with known coordinates.
///
/// The origin is either `lat`/`lon` or an `address` resolved through the
/// geocoder; an address with zero or multiple matches has undefined
/// coordinates and is reported as not found.
async fn query(req: Request<Body>) -> Result<Response<Body>> {
    let global = req.get_global()?;
    let params = req.query_params();

    let origin = match (params.get("lat"), params.get("lon"), params.get("address")) {
        (Some(lat), Some(lon), _) => {
            let lat = lat.parse().map_err(|_| ApiError::InvalidQuery)?;
            let lon = lon.parse().map_err(|_| ApiError::InvalidQuery)?;
            (lat, lon)
        }
        (_, _, Some(address)) => global
            .geocoder
            .lookup(address)
            .await
            .map_err(|err| {
                tracing::error!("geocoder lookup failed: {}", err);
                ApiError::Internal("geocoder unavailable")
            })?
            .ok_or(ApiError::NotFound("address"))?,
        _ => return Err(ApiError::InvalidQuery),
    };

    let projects = Project::list_active(&global.db).await?;

    let mut result: Vec<_> = projects
        .into_iter()
        .map(|project| {
            let distance = geo::distance(
                (Some(origin.0), Some(origin.1)),
                (project.latitude, project.longitude),
            );

            json!({
                "foreign_id": project.foreign_id,
                "title": project.title,
                "meters": distance.map(|d| d.meters),
                "strides": distance.map(|d| d.strides),
            })
        })
        .collect();

    // Nearest first; projects without coordinates go last.
    result.sort_by_key(|entry| entry["meters"].as_u64().unwrap_or(u64::MAX));

    Ok(make_response!(
        StatusCode::OK,
        json!({ "status": true, "result": result })
    ))
}

pub fn routes() -> routerify::Router<Body, ApiError> {
    routerify::Router::builder()
        .get("/", query)
        .build()
        .expect("failed to build router")
}
