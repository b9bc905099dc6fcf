//! Wire types for the Twilio Media Streams WebSocket protocol.
//!
//! Twilio delivers call audio as JSON envelopes discriminated by an `event`
//! field. Audio payloads are base64-encoded 8 kHz G.711 µ-law and pass
//! through this crate untouched. The inbound enum is deliberately open:
//! event types this relay does not know about deserialize into
//! [`StreamEvent::Other`] instead of failing, since Twilio adds envelope
//! types over time.

use serde::{Deserialize, Serialize};

/// Messages received from Twilio over a media stream connection.
#[derive(Deserialize, Debug, Clone)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Protocol preamble, sent once right after the WebSocket opens.
    Connected,
    /// Beginning of a stream; carries the stream identifier that every
    /// outbound frame must be correlated with.
    Start { start: StartMeta },
    /// One frame of caller audio.
    Media { media: MediaMeta },
    /// Playback-position acknowledgment for a mark we sent earlier.
    Mark { mark: MarkMeta },
    /// End of the stream.
    Stop,
    /// Any event type this relay does not recognize.
    #[serde(other)]
    Other,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct StartMeta {
    pub stream_sid: String,
    #[serde(default)]
    pub call_sid: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct MediaMeta {
    /// Provider-assigned timestamp in milliseconds since stream start.
    pub timestamp: u64,
    /// Base64 µ-law audio.
    pub payload: String,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct MarkMeta {
    pub name: String,
}

/// Messages sent back to Twilio.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum OutboundFrame {
    /// A frame of AI audio to play to the caller.
    Media {
        #[serde(rename = "streamSid")]
        stream_sid: String,
        media: OutboundMedia,
    },
    /// A synchronization marker; Twilio echoes it back once the audio
    /// queued before it has been played.
    Mark {
        #[serde(rename = "streamSid")]
        stream_sid: String,
        mark: MarkMeta,
    },
    /// Flush any buffered, not-yet-played audio (barge-in).
    Clear {
        #[serde(rename = "streamSid")]
        stream_sid: String,
    },
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct OutboundMedia {
    pub payload: String,
}

/// Mark name attached to every synchronization marker this relay emits.
pub const RESPONSE_MARK: &str = "responsePart";

impl OutboundFrame {
    pub fn media(stream_sid: String, payload: String) -> Self {
        OutboundFrame::Media {
            stream_sid,
            media: OutboundMedia { payload },
        }
    }

    pub fn mark(stream_sid: String) -> Self {
        OutboundFrame::Mark {
            stream_sid,
            mark: MarkMeta {
                name: RESPONSE_MARK.to_string(),
            },
        }
    }

    pub fn clear(stream_sid: String) -> Self {
        OutboundFrame::Clear { stream_sid }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_event_deserialization() {
        let json = r#"{"event":"start","start":{"streamSid":"CA123","callSid":"CS456","accountSid":"AC789"}}"#;
        let event: StreamEvent = serde_json::from_str(json).unwrap();
        match event {
            StreamEvent::Start { start } => {
                assert_eq!(start.stream_sid, "CA123");
                assert_eq!(start.call_sid.as_deref(), Some("CS456"));
            }
            other => panic!("Expected Start, got {:?}", other),
        }
    }

    #[test]
    fn test_start_event_without_call_sid() {
        let json = r#"{"event":"start","start":{"streamSid":"SID123"}}"#;
        let event: StreamEvent = serde_json::from_str(json).unwrap();
        match event {
            StreamEvent::Start { start } => {
                assert_eq!(start.stream_sid, "SID123");
                assert_eq!(start.call_sid, None);
            }
            other => panic!("Expected Start, got {:?}", other),
        }
    }

    #[test]
    fn test_media_event_deserialization() {
        let json = r#"{"event":"media","media":{"timestamp":10,"payload":"AAAA","track":"inbound","chunk":1}}"#;
        let event: StreamEvent = serde_json::from_str(json).unwrap();
        match event {
            StreamEvent::Media { media } => {
                assert_eq!(media.timestamp, 10);
                assert_eq!(media.payload, "AAAA");
            }
            other => panic!("Expected Media, got {:?}", other),
        }
    }

    #[test]
    fn test_media_event_missing_payload_is_an_error() {
        let json = r#"{"event":"media","media":{"timestamp":10}}"#;
        assert!(serde_json::from_str::<StreamEvent>(json).is_err());
    }

    #[test]
    fn test_connected_and_stop_tolerate_extra_fields() {
        let connected = r#"{"event":"connected","protocol":"Call","version":"1.0.0"}"#;
        assert!(matches!(
            serde_json::from_str::<StreamEvent>(connected).unwrap(),
            StreamEvent::Connected
        ));

        let stop = r#"{"event":"stop","stop":{"accountSid":"AC1","callSid":"CS1"}}"#;
        assert!(matches!(
            serde_json::from_str::<StreamEvent>(stop).unwrap(),
            StreamEvent::Stop
        ));
    }

    #[test]
    fn test_unknown_event_falls_through_to_other() {
        let json = r#"{"event":"dtmf","dtmf":{"digit":"5"}}"#;
        assert!(matches!(
            serde_json::from_str::<StreamEvent>(json).unwrap(),
            StreamEvent::Other
        ));
    }

    #[test]
    fn test_malformed_json_is_an_error_not_a_panic() {
        assert!(serde_json::from_str::<StreamEvent>("{not json").is_err());
        assert!(serde_json::from_str::<StreamEvent>(r#"{"no_event":true}"#).is_err());
    }

    #[test]
    fn test_outbound_media_serialization() {
        let frame = OutboundFrame::media("CA123".to_string(), "BBBB".to_string());
        let json: serde_json::Value = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["event"], "media");
        assert_eq!(json["streamSid"], "CA123");
        assert_eq!(json["media"]["payload"], "BBBB");
    }

    #[test]
    fn test_outbound_mark_serialization() {
        let frame = OutboundFrame::mark("CA123".to_string());
        let json: serde_json::Value = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["event"], "mark");
        assert_eq!(json["streamSid"], "CA123");
        assert_eq!(json["mark"]["name"], RESPONSE_MARK);
    }

    #[test]
    fn test_outbound_clear_serialization() {
        let frame = OutboundFrame::clear("CA123".to_string());
        let json: serde_json::Value = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["event"], "clear");
        assert_eq!(json["streamSid"], "CA123");
    }
}
