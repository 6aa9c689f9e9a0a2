use std::collections::HashMap;
use std::sync::{Arc, Weak};

use hyper::{Body, Request};
use routerify::prelude::RequestExt as _;
use serde::de::DeserializeOwned;

use super::error::{ApiError, Result};
use super::request_context::RequestContext;
use crate::global::GlobalState;

pub trait RequestExt {
    fn get_global(&self) -> Result<Arc<GlobalState>>;

    fn request_context(&self) -> RequestContext;

    /// Decoded query-string pairs; later duplicates win.
    fn query_params(&self) -> HashMap<String, String>;
}

impl RequestExt for Request<Body> {
    fn get_global(&self) -> Result<Arc<GlobalState>> {
        let state = self
            .data::<Weak<GlobalState>>()
            .expect("global state not set")
            .upgrade()
            .ok_or(ApiError::Internal("failed to upgrade global state"))?;
        Ok(state)
    }

    fn request_context(&self) -> RequestContext {
        self.context::<RequestContext>()
            .expect("request context not set")
    }

    fn query_params(&self) -> HashMap<String, String> {
        self.uri()
            .query()
            .map(|query| {
                url::form_urlencoded::parse(query.as_bytes())
                    .into_owned()
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Reads and deserializes a JSON request body. A body that does not parse
/// into `T` is a validation error, reported with the fixed indicator.
pub async fn parse_json_body<T: DeserializeOwned>(req: Request<Body>) -> Result<T> {
    let body = hyper::body::to_bytes(req.into_body()).await?;
    serde_json::from_slice(&body).map_err(|_| ApiError::InvalidQuery)
}
