use crate::CONFIG;
use axum::{
    body::Body,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Extension,
};
use reqwest::{redirect::Policy, Client as ReqwestClient, Url};
use std::env::var;
use thiserror::Error;

/// Relays the client SDK script through this backend for browsers that
/// cannot reach the CDN directly.
#[derive(Debug, Clone)]
pub struct SdkProxy {
    client: ReqwestClient,
    url: String,
    max_redirects: usize,
}

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("Failed to fetch the SDK: {0}")]
    Fetch(#[from] reqwest::Error),
    #[error("Redirect without a usable location")]
    MissingLocation,
    #[error("SDK upstream answered {0}")]
    Upstream(reqwest::StatusCode),
    #[error("Too many redirects ({0})")]
    TooManyRedirects(usize),
}

impl IntoResponse for SdkError {
    fn into_response(self) -> Response {
        let status = match self {
            SdkError::TooManyRedirects(_) => StatusCode::LOOP_DETECTED,
            _ => StatusCode::BAD_GATEWAY,
        };
        (status, self.to_string()).into_response()
    }
}

impl SdkProxy {
    pub fn new(url: impl Into<String>, max_redirects: usize) -> Result<Self, SdkError> {
        // Redirects are followed by hand so the hop count stays bounded
        let client = ReqwestClient::builder().redirect(Policy::none()).build()?;

        Ok(Self {
            client,
            url: url.into(),
            max_redirects,
        })
    }

    pub fn from_env() -> Result<Self, SdkError> {
        let url = var("TWILIO_SDK_URL").unwrap_or_else(|_| CONFIG.sdk.url.to_owned());
        Self::new(url, CONFIG.sdk.max_redirects as usize)
    }

    /// Fetch the SDK, following at most `max_redirects` redirects.
    pub async fn fetch(&self) -> Result<reqwest::Response, SdkError> {
        let mut url = self.url.clone();

        for _ in 0..=self.max_redirects {
            let response = self.client.get(&url).send().await?;
            let status = response.status();

            if status.is_success() {
                return Ok(response);
            }
            if !status.is_redirection() {
                return Err(SdkError::Upstream(status));
            }

            let location = response
                .headers()
                .get(header::LOCATION)
                .and_then(|l| l.to_str().ok())
                .ok_or(SdkError::MissingLocation)?;
            let next = Url::parse(&url)
                .and_then(|base| base.join(location))
                .map_err(|_| SdkError::MissingLocation)?;

            log::debug!("SDK redirected from {url} to {next}");
            url = next.into();
        }

        Err(SdkError::TooManyRedirects(self.max_redirects))
    }
}

pub async fn sdk_handler(sdk: Extension<SdkProxy>) -> Result<Response, SdkError> {
    let upstream = sdk.fetch().await.map_err(|e| {
        log::error!("SDK proxy failed: {e}");
        e
    })?;

    Ok((
        [(header::CONTENT_TYPE, "application/javascript; charset=utf-8")],
        Body::from_stream(upstream.bytes_stream()),
    )
        .into_response())
}
