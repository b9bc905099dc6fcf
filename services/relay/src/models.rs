//! REST API Models
//!
//! Request and response payloads for the call-trigger endpoint, with
//! `utoipa` schemas for the generated OpenAPI documentation.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema, Debug, Default)]
pub struct DialPayload {
    /// Destination number in E.164 form. Falls back to `DEFAULT_CALL_TO`
    /// when omitted.
    #[schema(example = "+15551234567")]
    #[serde(default)]
    pub to: Option<String>,
}

#[derive(Serialize, ToSchema, Debug)]
pub struct CallResponse {
    #[schema(example = "CAe1f66cbb4ef4f2a0a12f2c8d0a9e7b31")]
    pub call_sid: String,
    #[schema(example = "+15551234567")]
    pub to: String,
}

#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    pub message: String,
}
