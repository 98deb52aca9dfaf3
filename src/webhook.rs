use crate::secrets::Secrets;
use axum::{
    body::{to_bytes, Body},
    extract::Request,
    http::{header, request::Parts, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Extension,
};
use base64::prelude::*;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use std::collections::BTreeMap;
use thiserror::Error;

const SIGNATURE_HEADER: &str = "X-Twilio-Signature";
const MAX_WEBHOOK_BODY: usize = 64 * 1024;

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("Missing `X-Twilio-Signature` header in request")]
    MissingSignature,
    #[error("Signature does not match the request")]
    InvalidSignature,
    #[error("Bad request")]
    BadRequest,
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let status = match self {
            WebhookError::MissingSignature | WebhookError::InvalidSignature => {
                StatusCode::FORBIDDEN
            }
            WebhookError::BadRequest => StatusCode::BAD_REQUEST,
        };
        (status, self.to_string()).into_response()
    }
}

/// Rejects webhook calls that were not signed with the account's auth
/// token. Passes everything through when no auth token is configured.
pub async fn verify_signature(
    secrets: Extension<Secrets>,
    request: Request,
    next: Next,
) -> Result<Response, WebhookError> {
    let Some(auth_token) = secrets.twilio_auth_token.as_deref() else {
        return Ok(next.run(request).await);
    };

    let (parts, body) = request.into_parts();
    let body = to_bytes(body, MAX_WEBHOOK_BODY)
        .await
        .map_err(|_| WebhookError::BadRequest)?;

    if let Err(e) = check_signature(auth_token, &parts, &body) {
        log::warn!("Rejecting webhook to {}: {e}", parts.uri);
        return Err(e);
    }

    Ok(next.run(Request::from_parts(parts, Body::from(body))).await)
}

fn check_signature(auth_token: &str, parts: &Parts, body: &[u8]) -> Result<(), WebhookError> {
    let expected = parts
        .headers
        .get(SIGNATURE_HEADER)
        .ok_or(WebhookError::MissingSignature)
        .and_then(|d| {
            BASE64_STANDARD
                .decode(d.as_bytes())
                .map_err(|_| WebhookError::BadRequest)
        })?;

    let host = parts
        .headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .ok_or(WebhookError::BadRequest)?;
    let path = parts
        .uri
        .path_and_query()
        .map(|p| p.as_str())
        .unwrap_or("/");

    let params: BTreeMap<String, String> = match parts.method {
        Method::POST => url::form_urlencoded::parse(body).into_owned().collect(),
        _ => BTreeMap::new(),
    };

    signer(auth_token, &format!("https://{host}{path}"), &params)?
        .verify_slice(&expected)
        .map_err(|_| WebhookError::InvalidSignature)
}

/// HMAC over the public URL followed by every POST parameter as `key + value`
/// in sorted key order.
fn signer(
    auth_token: &str,
    url: &str,
    params: &BTreeMap<String, String>,
) -> Result<Hmac<Sha1>, WebhookError> {
    let mut hasher = Hmac::<Sha1>::new_from_slice(auth_token.as_bytes())
        .map_err(|_| WebhookError::BadRequest)?;
    hasher.update(url.as_bytes());
    for (key, value) in params {
        hasher.update(key.as_bytes());
        hasher.update(value.as_bytes());
    }
    Ok(hasher)
}

/// Computes the base64 signature the platform would send for this request.
#[cfg(test)]
pub(crate) fn sign(auth_token: &str, url: &str, params: &[(&str, &str)]) -> String {
    let params: BTreeMap<String, String> = params
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    let hasher = signer(auth_token, url, &params).expect("hmac accepts any key");
    BASE64_STANDARD.encode(hasher.finalize().into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request as HttpRequest;

    fn parts(signature: Option<&str>) -> Parts {
        let mut builder = HttpRequest::builder()
            .method(Method::POST)
            .uri("/voice")
            .header(header::HOST, "dialer.example.com");
        if let Some(signature) = signature {
            builder = builder.header(SIGNATURE_HEADER, signature);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn accepts_valid_signature() {
        let signature = sign(
            "auth",
            "https://dialer.example.com/voice",
            &[("From", "client:agent"), ("To", "+15551234567")],
        );

        let body = b"To=%2B15551234567&From=client%3Aagent";
        assert!(check_signature("auth", &parts(Some(&signature)), body).is_ok());
    }

    #[test]
    fn rejects_tampered_body() {
        let signature = sign(
            "auth",
            "https://dialer.example.com/voice",
            &[("To", "+15551234567")],
        );

        let err = check_signature("auth", &parts(Some(&signature)), b"To=%2B19990000000")
            .unwrap_err();
        assert!(matches!(err, WebhookError::InvalidSignature));
    }

    #[test]
    fn rejects_missing_signature() {
        let err = check_signature("auth", &parts(None), b"").unwrap_err();
        assert!(matches!(err, WebhookError::MissingSignature));
        assert_eq!(err.into_response().status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn rejects_malformed_signature() {
        let err = check_signature("auth", &parts(Some("%%%")), b"").unwrap_err();
        assert!(matches!(err, WebhookError::BadRequest));
    }
}
