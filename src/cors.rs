use crate::CONFIG;
use axum::{
    body::Body,
    extract::Request,
    http::{header, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::Response,
};
use std::env::var;
use tower_http::cors::{AllowOrigin, CorsLayer};

/// Which browser origins may call the dialer endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorsPolicy {
    /// `Access-Control-Allow-Origin: *`
    Any,
    /// Echo whatever origin the browser declares.
    Mirror,
    /// Echo the origin only on an exact match.
    AllowList(Vec<String>),
}

impl CorsPolicy {
    /// Reads `CORS_MODE` and `CORS_ALLOWED_ORIGINS`, falling back to `Config.toml`.
    pub fn from_env() -> Self {
        let mode = var("CORS_MODE").unwrap_or_else(|_| CONFIG.cors.mode.to_owned());
        let origins =
            var("CORS_ALLOWED_ORIGINS").unwrap_or_else(|_| CONFIG.cors.allowed_origins.to_owned());

        Self::parse(&mode, &origins)
    }

    pub fn parse(mode: &str, origins: &str) -> Self {
        let list = || {
            origins
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty() && *o != "*")
                .map(str::to_owned)
                .collect()
        };

        match mode.trim().to_ascii_lowercase().as_str() {
            "any" | "*" => CorsPolicy::Any,
            "mirror" | "reflect" => CorsPolicy::Mirror,
            "allow-list" | "allowlist" => CorsPolicy::AllowList(list()),
            other => {
                log::warn!("Unknown CORS mode {other:?}, using the allow-list");
                CorsPolicy::AllowList(list())
            }
        }
    }

    pub fn layer(&self) -> CorsLayer {
        let allow_origin = match self {
            CorsPolicy::Any => AllowOrigin::any(),
            CorsPolicy::Mirror => AllowOrigin::mirror_request(),
            CorsPolicy::AllowList(origins) => AllowOrigin::list(
                origins
                    .iter()
                    .filter_map(|o| HeaderValue::from_str(o).ok()),
            ),
        };

        CorsLayer::new()
            .allow_origin(allow_origin)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE])
            .allow_credentials(false)
    }
}

/// Answers preflight requests with an empty 204 once the CORS layer has
/// attached its headers.
pub async fn preflight_no_content(request: Request, next: Next) -> Response {
    let preflight = request.method() == Method::OPTIONS;
    let mut response = next.run(request).await;

    if preflight {
        *response.status_mut() = StatusCode::NO_CONTENT;
        *response.body_mut() = Body::empty();
        response.headers_mut().remove(header::CONTENT_LENGTH);
    }

    response
}
