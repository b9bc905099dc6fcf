//! Callbridge Relay Library Crate
//!
//! This library contains all the logic for the call relay service: the
//! configuration and application state, the REST handlers that trigger
//! outbound calls and serve TwiML, the routing, and the per-call WebSocket
//! relay between Twilio Media Streams and the OpenAI Realtime API. The
//! `relay` binary is a thin wrapper around this library.

pub mod config;
pub mod handlers;
pub mod models;
pub mod router;
pub mod state;
pub mod ws;
