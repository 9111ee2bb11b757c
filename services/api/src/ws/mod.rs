//! WebSocket Session Management
//!
//! This module bridges a browser connection to a realtime assistant session:
//!
//! - `protocol`: Defines the JSON-based message format for browser-server communication.
//! - `session`: Manages the browser connection and drives the tool panel.
//! - `provider`: Handles the upstream connection to the OpenAI Realtime API.

pub mod protocol;
mod provider;
pub mod session;

pub use session::ws_handler;
