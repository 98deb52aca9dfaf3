use anyhow::{Context, Result};
use axum::{
    http::StatusCode, middleware, response::IntoResponse, routing::get, Extension, Json, Router,
};
use cors::CorsPolicy;
use secrets::Secrets;
use static_toml::static_toml;
use std::env::var;
use tokio::net::TcpListener;
use webcall::sdk::SdkProxy;

static_toml! { static CONFIG = include_toml!("Config.toml"); }

mod cors;
mod secrets;
mod status;
mod twiml;
mod webcall;
mod webhook;


#[tokio::main]
async fn main() -> Result<()> {
    // Initialize the environment and logger
    dotenv::dotenv().ok();
    env_logger::init();

    // Load the secrets
    let secrets = Secrets::from_env();
    if secrets.twilio_auth_token.is_none() {
        log::info!("TWILIO_AUTH_TOKEN not set, webhook signatures are not checked");
    }

    let cors = CorsPolicy::from_env();
    log::info!("Using CORS policy {cors:?}");

    // Initialize the SDK proxy and its reqwest client
    log::info!("Initializing the SDK proxy");
    let sdk = SdkProxy::from_env().context("Building the SDK proxy client")?;

    let port = match var("PORT") {
        Ok(port) => port.parse().context("PORT must be a valid port number")?,
        Err(_) => CONFIG.settings.port as u16,
    };
    let address = format!("{}:{}", CONFIG.settings.host, port);

    log::info!("Connecting to the server at {address}");
    let tcp = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {address}"))?;

    log::info!("FleetFlow token & voice server running on port {port}");
    axum::serve(tcp, app(secrets, &cors, sdk).into_make_service())
        .await
        .context("Failed to start the server")
}

/// Builds the webserver routes with every layer applied.
pub fn app(secrets: Secrets, cors: &CorsPolicy, sdk: SdkProxy) -> Router {
    Router::new()
        .route("/", get(status::status_page))
        .route("/health_check", get(health_check))
        .merge(webcall::router())
        .fallback(error_handler)
        .layer(Extension(secrets))
        .layer(Extension(sdk))
        .layer(cors.layer())
        .layer(middleware::from_fn(cors::preflight_no_content))
}

pub async fn health_check() -> impl IntoResponse {
    StatusCode::OK
}

async fn error_handler() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "error": "Not Found" })),
    )
}
