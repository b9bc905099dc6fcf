//! WebSocket Call Relay
//!
//! This module contains the per-call audio relay between Twilio Media
//! Streams and the OpenAI Realtime API. It is structured into submodules:
//!
//! - `relay`: the I/O-free session state machine translating events
//!   between the two protocols.
//! - `openai`: connection setup and session configuration for the
//!   realtime voice channel.
//! - `session`: the WebSocket lifecycle, from upgrade to teardown.

mod openai;
mod relay;
pub mod session;

pub use session::ws_handler;
