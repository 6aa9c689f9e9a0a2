use hyper::http::header;
use hyper::Body;
use routerify::prelude::RequestExt as _;
use routerify::Middleware;

use crate::api::error::ApiError;
use crate::api::ext::RequestExt as _;
use crate::api::request_context::{DeviceIdentity, ManagerIdentity, RequestContext};
use crate::database::{Device, ProjectManager};
use crate::jwt::{JwtState, ManagerJwtPayload};

/// Encrypted device-identity header set by the mobile app.
pub const DEVICE_HEADER: &str = "DeviceAuthorization";
/// Encrypted shared-secret header set by the ingestion pipeline and the
/// admin tooling.
pub const INGEST_HEADER: &str = "IngestAuthorization";

/// Installs a fresh request context. Runs before every other middleware.
pub fn context_middleware() -> Middleware<Body, ApiError> {
    Middleware::pre(|req| async move {
        req.set_context(RequestContext::default());
        Ok(req)
    })
}

/// Decodes the device header when present. A present-but-invalid token is a
/// terminal rejection; an absent header just leaves the request anonymous.
/// Devices are created on first contact and their `last_access` bumped on
/// every authenticated one.
pub fn device_auth_middleware() -> Middleware<Body, ApiError> {
    Middleware::pre(|req| async move {
        let Some(token) = req.headers().get(DEVICE_HEADER) else {
            return Ok(req);
        };

        let global = req.get_global()?;

        let device_id = token
            .to_str()
            .ok()
            .and_then(|token| global.device_cipher.decrypt(token).ok())
            .ok_or(ApiError::Unauthorized)?;

        Device::touch(&global.db, &device_id).await?;

        req.request_context()
            .set_device(DeviceIdentity { id: device_id })
            .await;

        Ok(req)
    })
}

/// Verifies a bearer token when present and resolves the manager behind it.
/// The token is rejected when the manager has been deleted since issuance.
pub fn manager_auth_middleware() -> Middleware<Body, ApiError> {
    Middleware::pre(|req| async move {
        let Some(token) = req.headers().get(header::AUTHORIZATION) else {
            return Ok(req);
        };

        let global = req.get_global()?;

        let payload = token
            .to_str()
            .ok()
            .and_then(|token| token.strip_prefix("Bearer "))
            .and_then(|token| ManagerJwtPayload::verify(&global.config.jwt, token))
            .ok_or(ApiError::Unauthorized)?;

        let manager = ProjectManager::get(&global.db, payload.manager_id)
            .await?
            .ok_or(ApiError::Unauthorized)?;

        req.request_context()
            .set_manager(ManagerIdentity { manager })
            .await;

        Ok(req)
    })
}

/// Scoped to the ingest and admin surface: the encrypted shared-secret
/// header is mandatory there and anything else is a terminal rejection.
pub fn ingest_auth_middleware() -> Middleware<Body, ApiError> {
    Middleware::pre(|req| async move {
        let global = req.get_global()?;

        req.headers()
            .get(INGEST_HEADER)
            .and_then(|token| token.to_str().ok())
            .and_then(|token| global.ingest_cipher.decrypt(token).ok())
            .ok_or(ApiError::Unauthorized)?;

        Ok(req)
    })
}
