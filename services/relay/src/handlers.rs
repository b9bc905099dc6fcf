//! Axum Handlers for the REST Surface
//!
//! `/call` triggers an outbound phone call through the Twilio REST API,
//! `/twiml` serves the call-control markup that tells Twilio to open a
//! media stream back to this service, and `/healthz` is a liveness probe.
//! `utoipa` doc comments generate the OpenAPI documentation.

use axum::{
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info};

use crate::{
    models::{CallResponse, DialPayload, ErrorResponse},
    state::AppState,
};

pub enum ApiError {
    BadRequest(String),
    /// Twilio accepted the request transport but rejected the call.
    BadGateway(serde_json::Value),
    InternalServerError(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(ErrorResponse { message })).into_response()
            }
            ApiError::BadGateway(body) => {
                error!(response = %body, "Twilio rejected the call request");
                (StatusCode::BAD_GATEWAY, Json(json!({ "error": body }))).into_response()
            }
            ApiError::InternalServerError(err) => {
                error!("Internal Server Error: {:?}", err);
                let message = "An internal server error occurred.".to_string();
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse { message }),
                )
                    .into_response()
            }
        }
    }
}

impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::InternalServerError(err.into())
    }
}

/// Trigger an outbound phone call that connects the callee to the AI assistant.
#[utoipa::path(
    post,
    path = "/call",
    request_body = DialPayload,
    responses(
        (status = 201, description = "Call initiated", body = CallResponse),
        (status = 400, description = "No destination number available", body = ErrorResponse),
        (status = 502, description = "Twilio rejected the call request"),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn start_call(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<DialPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let config = &state.config;
    let to = payload
        .to
        .or_else(|| config.default_call_to.clone())
        .ok_or_else(|| {
            ApiError::BadRequest(
                "`to` is required when DEFAULT_CALL_TO is not configured".to_string(),
            )
        })?;

    let response = state
        .http
        .post(format!(
            "https://api.twilio.com/2010-04-01/Accounts/{}/Calls.json",
            config.twilio_account_sid
        ))
        .basic_auth(&config.twilio_account_sid, Some(&config.twilio_auth_token))
        .form(&[
            ("To", to.as_str()),
            ("From", config.twilio_phone_number.as_str()),
            ("Url", config.twiml_url().as_str()),
            ("Method", "POST"),
        ])
        .send()
        .await?;

    let status = response.status();
    let body: serde_json::Value = response.json().await.unwrap_or_else(|_| json!({}));
    if !status.is_success() {
        return Err(ApiError::BadGateway(body));
    }

    let call_sid = body["sid"].as_str().unwrap_or("unknown").to_string();
    info!(%call_sid, %to, "Outbound call initiated");
    Ok((StatusCode::CREATED, Json(CallResponse { call_sid, to })))
}

/// Call-control markup fetched by Twilio when a call is answered.
#[utoipa::path(
    post,
    path = "/twiml",
    responses(
        (status = 200, description = "TwiML connecting the call to the media stream", body = String, content_type = "text/xml")
    )
)]
pub async fn twiml(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/xml")],
        connect_stream_twiml(&state.config.stream_url()),
    )
}

/// Liveness probe.
#[utoipa::path(
    get,
    path = "/healthz",
    responses(
        (status = 200, description = "Service is up")
    )
)]
pub async fn healthz() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// Builds the TwiML document: a short spoken greeting, then a
/// bidirectional media stream to our WebSocket endpoint.
fn connect_stream_twiml(ws_url: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<Response>
  <Say>Please wait while we connect your call to the AI assistant.</Say>
  <Pause length="1"/>
  <Connect>
    <Stream url="{ws_url}"/>
  </Connect>
</Response>"#
    )
}
