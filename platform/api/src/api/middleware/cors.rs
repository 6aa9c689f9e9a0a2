use hyper::http::header;
use hyper::Body;
use routerify::Middleware;

use crate::api::error::ApiError;

pub fn cors_middleware() -> Middleware<Body, ApiError> {
    Middleware::post(|mut resp| async move {
        resp.headers_mut()
            .insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*".parse().unwrap());
        resp.headers_mut().insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            "GET, POST, PATCH, DELETE, OPTIONS".parse().unwrap(),
        );
        resp.headers_mut().insert(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            "Content-Type, Authorization, DeviceAuthorization, IngestAuthorization"
                .parse()
                .unwrap(),
        );

        Ok(resp)
    })
}
