//! Axum Router Configuration
//!
//! This module defines the complete HTTP routing for the service: the
//! call-trigger and TwiML endpoints, the media-stream WebSocket endpoint,
//! and the OpenAPI documentation.

use crate::{
    handlers,
    models::{CallResponse, DialPayload, ErrorResponse},
    state::AppState,
    ws::ws_handler,
};

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(handlers::start_call, handlers::twiml, handlers::healthz),
    components(schemas(DialPayload, CallResponse, ErrorResponse)),
    tags(
        (name = "Callbridge Relay", description = "Outbound call triggering and Twilio/OpenAI audio relay")
    )
)]
pub struct ApiDoc;

/// Creates the main Axum router for the application.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    // Group all routes that require AppState into their own router.
    let api_router = Router::new()
        .route("/call", post(handlers::start_call))
        .route("/twiml", get(handlers::twiml).post(handlers::twiml))
        .route("/healthz", get(handlers::healthz))
        .route("/media-stream", get(ws_handler))
        .with_state(app_state);

    // Merge the stateful routes with the stateless Swagger UI routes.
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(api_router)
}
