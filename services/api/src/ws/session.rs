//! Manages the browser WebSocket connection and the tool panel it drives.

use super::{
    protocol::{ClientMessage, ServerMessage},
    provider::{self, RealtimeConnection},
};
use crate::state::AppState;
use anyhow::{Context, Result};
use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use career_tools_core::{
    ChannelSink, ClientEvent, EventLog, PanelView, ServerEvent, ToolPanel,
    protocol::ResponseCreate,
};
use futures_util::{SinkExt, StreamExt, stream::SplitSink};
use serde_json::Value;
use std::sync::Arc;
use tracing::{Instrument, debug, error, info, warn};
use uuid::Uuid;

/// Axum handler to upgrade an HTTP connection to a WebSocket.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Runs one browser connection inside its own span.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let connection_id = Uuid::new_v4();
    let span = tracing::info_span!("ws_connection", %connection_id);
    async move {
        info!("New WebSocket connection.");
        if let Err(e) = run_connection(socket, state).await {
            error!(error = ?e, "WebSocket connection terminated with error.");
        }
        info!("WebSocket connection closed.");
    }
    .instrument(span)
    .await
}

/// Events kept per session; the first event always survives.
pub(crate) const SESSION_EVENT_WINDOW: usize = 64;

/// A realtime session in progress: the upstream connection and the panel it feeds.
pub(crate) struct ActiveSession {
    pub(crate) connection: RealtimeConnection,
    pub(crate) events: EventLog,
    pub(crate) panel: ToolPanel,
}

/// Tracks what the browser has been told about the panel.
pub(crate) struct PanelPublisher {
    last_view: Option<PanelView>,
}

impl PanelPublisher {
    pub(crate) fn new() -> Self {
        Self { last_view: None }
    }

    /// Returns a `Panel` message if `view` differs from the last one published.
    pub(crate) fn publish(&mut self, view: PanelView) -> Option<ServerMessage> {
        if self.last_view.as_ref() == Some(&view) {
            return None;
        }
        self.last_view = Some(view.clone());
        Some(ServerMessage::Panel { view })
    }
}

/// The main event loop for a browser connection.
async fn run_connection(socket: WebSocket, state: Arc<AppState>) -> Result<()> {
    let (mut socket_tx, mut socket_rx) = socket.split();
    let mut session: Option<ActiveSession> = None;
    let mut publisher = PanelPublisher::new();

    send_msg(&mut socket_tx, ServerMessage::SessionState { active: false }).await?;
    if let Some(msg) = publisher.publish(PanelView::Inactive) {
        send_msg(&mut socket_tx, msg).await?;
    }

    loop {
        tokio::select! {
            // Messages from the browser.
            msg_result = socket_rx.next() => {
                let Some(msg_result) = msg_result else {
                    info!("Client disconnected.");
                    break;
                };
                match msg_result.context("Error receiving from client WebSocket")? {
                    Message::Text(text) => match serde_json::from_str::<ClientMessage>(&text) {
                        Ok(msg) => {
                            handle_client_message(msg, &state, &mut session, &mut publisher, &mut socket_tx).await?;
                        }
                        Err(e) => {
                            warn!(error = %e, "Ignoring malformed client message.");
                            send_msg(&mut socket_tx, ServerMessage::Error { message: format!("Invalid message: {}", e) }).await?;
                        }
                    },
                    Message::Close(_) => {
                        info!("Client sent close frame. Shutting down session.");
                        break;
                    }
                    Message::Binary(_) => warn!("Ignoring binary message; audio is not handled by this service."),
                    Message::Ping(_) | Message::Pong(_) => {}
                }
            },
            // Frames from the realtime session, if one is running.
            frame = next_upstream_frame(&mut session) => {
                match frame {
                    Some(text) => {
                        let Some(active) = session.as_mut() else { continue };
                        let outgoing = handle_upstream_text(active, &mut publisher, &text).await;
                        for msg in outgoing {
                            send_msg(&mut socket_tx, msg).await?;
                        }
                    }
                    None => {
                        warn!("Realtime session ended unexpectedly.");
                        stop_session(&mut session, &mut publisher, &mut socket_tx).await?;
                        send_msg(&mut socket_tx, ServerMessage::Error { message: "Realtime session closed".to_string() }).await?;
                    }
                }
            },
        }
    }

    if let Some(mut active) = session.take() {
        active.panel.set_active(false);
    }
    Ok(())
}

async fn handle_client_message(
    msg: ClientMessage,
    state: &Arc<AppState>,
    session: &mut Option<ActiveSession>,
    publisher: &mut PanelPublisher,
    socket_tx: &mut SplitSink<WebSocket, Message>,
) -> Result<()> {
    match msg {
        ClientMessage::StartSession => {
            if session.is_some() {
                warn!("Session already active; ignoring start request.");
                return Ok(());
            }
            match provider::start_realtime_provider(&state.config).await {
                Ok(connection) => {
                    let sink = Arc::new(ChannelSink::new(connection.events_tx.clone()));
                    let mut panel =
                        ToolPanel::new(sink).with_feedback_delay(state.config.feedback_delay);
                    panel.set_active(true);
                    let view = panel.view();
                    *session = Some(ActiveSession {
                        connection,
                        events: EventLog::with_capacity(SESSION_EVENT_WINDOW),
                        panel,
                    });
                    info!("Realtime session started.");
                    send_msg(socket_tx, ServerMessage::SessionState { active: true }).await?;
                    if let Some(msg) = publisher.publish(view) {
                        send_msg(socket_tx, msg).await?;
                    }
                }
                Err(e) => {
                    error!(error = ?e, "Failed to start realtime session");
                    send_msg(
                        socket_tx,
                        ServerMessage::Error {
                            message: format!("Realtime connection failed: {}", e),
                        },
                    )
                    .await?;
                }
            }
        }
        ClientMessage::StopSession => {
            stop_session(session, publisher, socket_tx).await?;
        }
        ClientMessage::SendText { text } => {
            let Some(active) = session.as_ref() else {
                send_msg(
                    socket_tx,
                    ServerMessage::Error {
                        message: "Start the session before sending messages".to_string(),
                    },
                )
                .await?;
                return Ok(());
            };
            for event in text_message_events(text) {
                active
                    .connection
                    .events_tx
                    .send(event)
                    .await
                    .context("Realtime session channel closed")?;
            }
        }
    }
    Ok(())
}

/// Ends the current session, if any, and tells the browser.
async fn stop_session(
    session: &mut Option<ActiveSession>,
    publisher: &mut PanelPublisher,
    socket_tx: &mut SplitSink<WebSocket, Message>,
) -> Result<()> {
    let Some(mut active) = session.take() else {
        return Ok(());
    };
    active.panel.set_active(false);
    let view = active.panel.view();
    drop(active);
    info!("Realtime session stopped.");

    send_msg(socket_tx, ServerMessage::SessionState { active: false }).await?;
    if let Some(msg) = publisher.publish(view) {
        send_msg(socket_tx, msg).await?;
    }
    Ok(())
}

/// Waits for the next upstream frame, or forever when no session is running.
async fn next_upstream_frame(session: &mut Option<ActiveSession>) -> Option<String> {
    match session {
        Some(active) => active.connection.server_rx.recv().await,
        None => std::future::pending().await,
    }
}

/// The client events that deliver a typed user message and request a reply.
pub(crate) fn text_message_events(text: String) -> [ClientEvent; 2] {
    [
        ClientEvent::user_text(text),
        ClientEvent::ResponseCreate {
            response: ResponseCreate::default(),
        },
    ]
}

/// Records one upstream frame, updates the panel and returns the messages for the browser.
pub(crate) async fn handle_upstream_text(
    session: &mut ActiveSession,
    publisher: &mut PanelPublisher,
    text: &str,
) -> Vec<ServerMessage> {
    let raw: Value = match serde_json::from_str(text) {
        Ok(raw) => raw,
        Err(e) => {
            warn!(error = %e, "Dropping non-JSON realtime frame");
            return Vec::new();
        }
    };
    let event = match serde_json::from_value::<ServerEvent>(raw.clone()) {
        Ok(event) => event,
        Err(e) => {
            debug!(error = %e, "Unrecognised realtime event shape");
            ServerEvent::Other
        }
    };

    let mut outgoing = vec![ServerMessage::Event { event: raw }];

    session.events.push(event);
    if let Err(e) = session.panel.on_events_updated(&session.events).await {
        error!(error = ?e, "Tool panel failed to process realtime events");
        outgoing.push(ServerMessage::Error {
            message: e.to_string(),
        });
    }
    if let Some(msg) = publisher.publish(session.panel.view()) {
        outgoing.push(msg);
    }
    outgoing
}

/// A helper function to serialize and send a `ServerMessage` to the client.
pub(crate) async fn send_msg(
    socket_tx: &mut SplitSink<WebSocket, Message>,
    msg: ServerMessage,
) -> Result<()> {
    let serialized = serde_json::to_string(&msg)?;
    socket_tx.send(Message::Text(serialized.into())).await?;
    Ok(())
}
