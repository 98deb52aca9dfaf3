use crate::{secrets::Secrets, CONFIG};
use anyhow::{bail, Context, Result};
use axum::{http::StatusCode, Extension, Json};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::Serialize;

#[derive(Serialize)]
struct Grants {
    identity: String,
    voice: VoiceGrant,
}

#[derive(Serialize)]
struct VoiceGrant {
    incoming: IncomingVoiceGrant,
    outgoing: OutgoingVoiceGrant,
}

#[derive(Serialize)]
struct IncomingVoiceGrant {
    allow: bool,
}

#[derive(Serialize)]
struct OutgoingVoiceGrant {
    application_sid: String,
}

#[derive(Serialize)]
struct Claims {
    jti: String,
    iss: String,
    sub: String,
    iat: i64,
    nbf: i64,
    exp: i64,
    grants: Grants,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub identity: String,
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct TokenError {
    pub error: String,
    pub details: String,
}

pub async fn token_handler(
    secrets: Extension<Secrets>,
) -> Result<Json<TokenResponse>, (StatusCode, Json<TokenError>)> {
    let identity = CONFIG.dialer.identity;
    let ttl = Duration::seconds(CONFIG.dialer.token_ttl);

    match generate_jwt(&secrets, identity, ttl, Utc::now()) {
        Ok(token) => {
            log::info!("Issued voice token for {identity}");
            Ok(Json(TokenResponse {
                identity: identity.to_owned(),
                token,
            }))
        }
        Err(e) => {
            log::error!("Token generation failed: {e:#}");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(TokenError {
                    error: "Token generation failed".to_owned(),
                    details: format!("{e:#}"),
                }),
            ))
        }
    }
}

/// Signs a voice access token for `identity`, valid from `now` for `ttl`.
/// The grant allows outgoing calls through the configured TwiML application
/// and incoming calls addressed to the identity.
pub fn generate_jwt(
    secrets: &Secrets,
    identity: &str,
    ttl: Duration,
    now: DateTime<Utc>,
) -> Result<String> {
    for (name, value) in [
        ("TWILIO_ACCOUNT_SID", &secrets.twilio_account_sid),
        ("TWILIO_API_KEY", &secrets.twilio_api_key),
        ("TWILIO_API_SECRET", &secrets.twilio_api_secret),
        ("TWIML_APP_SID", &secrets.twilio_app_sid),
    ] {
        if value.is_empty() {
            bail!("{name} is not configured");
        }
    }

    // Set current time and expiration
    let iat = now.timestamp();
    let nbf = iat;
    let exp = (now + ttl).timestamp();

    let grants = Grants {
        identity: identity.to_owned(),
        voice: VoiceGrant {
            incoming: IncomingVoiceGrant { allow: true },
            outgoing: OutgoingVoiceGrant {
                application_sid: secrets.twilio_app_sid.clone(),
            },
        },
    };

    let claims = Claims {
        jti: format!("{}-{}", secrets.twilio_api_key, iat),
        iss: secrets.twilio_api_key.clone(),
        sub: secrets.twilio_account_sid.clone(),
        iat,
        nbf,
        exp,
        grants,
    };

    let header = Header {
        cty: Some("twilio-fpa;v=1".to_string()),
        ..Default::default()
    };

    encode(
        &header,
        &claims,
        &EncodingKey::from_secret(secrets.twilio_api_secret.as_bytes()),
    )
    .context("Encoding the access token")
}
