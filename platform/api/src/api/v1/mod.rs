use hyper::Body;
use routerify::Router;

use super::error::ApiError;

pub mod articles;
pub mod devices;
pub mod distance;
pub mod health;
pub mod images;
pub mod ingest;
pub mod managers;
pub mod notifications;
pub mod projects;
pub mod search;
pub mod warnings;

pub fn routes() -> Router<Body, ApiError> {
    Router::builder()
        .scope("/health", health::routes())
        .scope("/projects", projects::routes())
        .scope("/articles", articles::routes())
        .scope("/warnings", warnings::routes())
        .scope("/devices", devices::routes())
        .scope("/managers", managers::routes())
        .scope("/notifications", notifications::routes())
        .scope("/image", images::routes())
        .scope("/search", search::routes())
        .scope("/distance", distance::routes())
        .scope("/ingest", ingest::routes())
        .build()
        .expect("failed to build router")
}
