//! Core logic for the career tool panel: the realtime wire types, the tool
//! schemas registered with the session, the panel state machine and the
//! renderer for function-call output.

pub mod events;
pub mod panel;
pub mod protocol;
pub mod render;
pub mod sink;
pub mod tools;

pub use events::EventLog;
pub use panel::{PanelView, ToolPanel};
pub use protocol::{ClientEvent, FunctionCall, ServerEvent};
pub use sink::{ChannelSink, EventSink};
