//! The per-call relay state machine.
//!
//! [`RelaySession`] translates events between the Twilio media stream and
//! the OpenAI realtime channel. It is deliberately free of any I/O: each
//! handler takes one parsed inbound event and returns the frames to send,
//! which keeps the whole protocol contract unit-testable. The surrounding
//! socket loop lives in [`super::session`].

use async_openai::types::realtime::{self as oai_realtime, ClientEvent, ServerEvent};
use tracing::{debug, error, info};
use twilio_media::{OutboundFrame, StreamEvent};

/// A frame the relay wants sent to one of its two peers.
#[derive(Debug)]
pub enum Action {
    ToTwilio(OutboundFrame),
    ToOpenAi(ClientEvent),
}

/// Mutable per-call state. One instance per media-stream connection;
/// never shared across sessions.
#[derive(Debug, Default)]
pub struct RelaySession {
    /// Set by the `start` event; required on every frame sent to Twilio.
    stream_sid: Option<String>,
    /// Timestamp (ms) of the last caller audio frame.
    latest_media_timestamp: u64,
    /// Caller-side timestamp at which the current AI response began
    /// playing; `None` when no response is in flight.
    response_start_timestamp: Option<u64>,
    /// Item id of the most recent AI response, kept for truncation on
    /// barge-in.
    last_assistant_item: Option<String>,
}

impl RelaySession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handles one event from the Twilio media stream.
    pub fn on_twilio_event(&mut self, event: StreamEvent) -> Vec<Action> {
        match event {
            StreamEvent::Start { start } => {
                info!(stream_sid = %start.stream_sid, call_sid = ?start.call_sid, "Media stream started");
                self.stream_sid = Some(start.stream_sid);
                self.latest_media_timestamp = 0;
                self.response_start_timestamp = None;
                self.last_assistant_item = None;
                Vec::new()
            }
            StreamEvent::Media { media } => {
                self.latest_media_timestamp = media.timestamp;
                if self.stream_sid.is_none() {
                    debug!("Dropping caller audio received before stream start");
                    return Vec::new();
                }
                vec![Action::ToOpenAi(ClientEvent::InputAudioBufferAppend(
                    oai_realtime::InputAudioBufferAppendEvent {
                        event_id: None,
                        audio: media.payload,
                    },
                ))]
            }
            StreamEvent::Mark { mark } => {
                debug!(name = %mark.name, "Playback mark acknowledged");
                Vec::new()
            }
            StreamEvent::Connected => {
                debug!("Twilio media stream protocol preamble received");
                Vec::new()
            }
            StreamEvent::Stop => {
                info!("Media stream stopped");
                Vec::new()
            }
            StreamEvent::Other => {
                debug!("Ignoring unrecognized media stream event");
                Vec::new()
            }
        }
    }

    /// Handles one event from the OpenAI realtime channel.
    pub fn on_openai_event(&mut self, event: ServerEvent) -> Vec<Action> {
        match event {
            ServerEvent::ResponseAudioDelta(delta) => {
                if delta.delta.is_empty() {
                    return Vec::new();
                }
                let Some(stream_sid) = self.stream_sid.clone() else {
                    debug!("Dropping AI audio received before stream start");
                    return Vec::new();
                };
                if self.response_start_timestamp.is_none() {
                    self.response_start_timestamp = Some(self.latest_media_timestamp);
                }
                self.last_assistant_item = Some(delta.item_id);
                vec![
                    Action::ToTwilio(OutboundFrame::media(stream_sid.clone(), delta.delta)),
                    Action::ToTwilio(OutboundFrame::mark(stream_sid)),
                ]
            }
            ServerEvent::InputAudioBufferSpeechStarted(_) => self.handle_barge_in(),
            ServerEvent::ResponseDone(_) => {
                // The next response burst re-anchors its start timestamp.
                self.response_start_timestamp = None;
                Vec::new()
            }
            ServerEvent::SessionCreated(_) => {
                info!("Realtime session created");
                Vec::new()
            }
            ServerEvent::SessionUpdated(_) => {
                debug!("Realtime session configuration acknowledged");
                Vec::new()
            }
            ServerEvent::Error(e) => {
                error!(message = %e.error.message, "Realtime API error event");
                Vec::new()
            }
            _ => Vec::new(),
        }
    }

    /// The caller started speaking while an AI response is playing:
    /// truncate the in-flight response at the already-played position and
    /// flush Twilio's playback buffer.
    fn handle_barge_in(&mut self) -> Vec<Action> {
        let (Some(stream_sid), Some(item_id), Some(started_at)) = (
            self.stream_sid.clone(),
            self.last_assistant_item.take(),
            self.response_start_timestamp.take(),
        ) else {
            debug!("Caller speech started with no response in flight");
            return Vec::new();
        };

        let audio_end_ms = self.latest_media_timestamp.saturating_sub(started_at);
        info!(%item_id, audio_end_ms, "Caller barge-in, truncating AI response");
        vec![
            Action::ToOpenAi(ClientEvent::ConversationItemTruncate(
                oai_realtime::ConversationItemTruncateEvent {
                    event_id: None,
                    item_id,
                    content_index: 0,
                    audio_end_ms: audio_end_ms as u32,
                },
            )),
            Action::ToTwilio(OutboundFrame::clear(stream_sid)),
        ]
    }
}
