//! Connection setup for the OpenAI Realtime voice channel.

use crate::config::Config;
use anyhow::{Context, Result};
use async_openai::types::realtime::{self as oai_realtime, ClientEvent};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async, tungstenite::client::IntoClientRequest,
};
use tracing::{info, warn};

const REALTIME_URL: &str =
    "wss://api.openai.com/v1/realtime?model=gpt-4o-realtime-preview-2024-10-01";

pub type RealtimeStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Opens the authenticated WebSocket to the realtime endpoint. Called once
/// per call session; a failure here is terminal for the session.
pub async fn connect(config: &Config) -> Result<RealtimeStream> {
    let mut request = REALTIME_URL.into_client_request()?;
    request.headers_mut().insert(
        "Authorization",
        format!("Bearer {}", config.openai_api_key).parse()?,
    );
    request
        .headers_mut()
        .insert("OpenAI-Beta", "realtime=v1".parse()?);

    let (ws_stream, _) = connect_async(request)
        .await
        .context("Failed to connect to OpenAI Realtime WebSocket")?;
    info!("Connected to OpenAI Realtime API");
    Ok(ws_stream)
}

/// Format string the realtime endpoint expects for 8 kHz telephony audio.
const G711_ULAW: &str = "g711_ulaw";

/// Builds the one-time session configuration: server VAD turn detection,
/// telephony µ-law audio in both directions, the configured voice and
/// persona.
///
/// Returns the wire JSON rather than a typed event: async-openai 0.29
/// serializes `AudioFormat::G711ULAW` as `"g711_law"`, which the realtime
/// endpoint does not accept, so the two format fields are written as
/// literal strings instead of going through that enum. The voice field is
/// written the same way: the endpoint accepts `sage`, but 0.29's
/// `RealtimeVoice` enum has no variant for it.
pub fn session_update(config: &Config) -> Result<serde_json::Value> {
    let session = oai_realtime::SessionResource {
        modalities: Some(vec!["text".to_string(), "audio".to_string()]),
        instructions: Some(config.system_instructions.clone()),
        turn_detection: Some(oai_realtime::TurnDetection::ServerVAD {
            threshold: 0.5,
            prefix_padding_ms: 300,
            silence_duration_ms: 500,
            interrupt_response: Some(true),
            create_response: Some(true),
        }),
        temperature: Some(0.8),
        ..Default::default()
    };
    let event = ClientEvent::SessionUpdate(oai_realtime::SessionUpdateEvent {
        session,
        event_id: None,
    });

    let mut json = serde_json::to_value(&event)?;
    json["session"]["input_audio_format"] = G711_ULAW.into();
    json["session"]["output_audio_format"] = G711_ULAW.into();
    json["session"]["voice"] = voice_from_name(&config.voice).into();
    // SessionResource.temperature is f32; overwrite it so the wire value
    // is an exact 0.8 rather than the widened 0.800000011920929.
    json["session"]["temperature"] = 0.8.into();
    Ok(json)
}

fn voice_from_name(name: &str) -> &'static str {
    match name.to_ascii_lowercase().as_str() {
        "alloy" => "alloy",
        "ash" => "ash",
        "ballad" => "ballad",
        "coral" => "coral",
        "echo" => "echo",
        "sage" => "sage",
        "shimmer" => "shimmer",
        "verse" => "verse",
        other => {
            warn!(voice = other, "Unknown voice, falling back to alloy");
            "alloy"
        }
    }
}
