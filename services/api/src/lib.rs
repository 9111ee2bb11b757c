//! Career Tools API Library Crate
//!
//! This library contains the web service around the career tool panel:
//! configuration, application state, the browser WebSocket bridge to the
//! realtime session, and routing. The `api` binary is a thin wrapper around it.

pub mod config;
pub mod router;
pub mod state;
pub mod ws;
