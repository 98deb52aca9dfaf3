use crate::webhook;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};

pub mod sdk;
pub mod token;
pub mod voice;

pub fn router() -> Router {
    Router::new()
        .route("/token", get(token::token_handler))
        .route(
            "/voice",
            post(voice::voice_handler)
                .route_layer(middleware::from_fn(webhook::verify_signature)),
        )
        .route("/twilio-sdk.js", get(sdk::sdk_handler))
}
