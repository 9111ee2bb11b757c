//! Handles the real-time WebSocket connection to the OpenAI Realtime API.

use crate::config::Config;
use anyhow::{Context, Result};
use career_tools_core::ClientEvent;
use futures_util::{SinkExt, StreamExt};
use secrecy::ExposeSecret;
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_tungstenite::{
    connect_async,
    tungstenite::{client::IntoClientRequest, protocol::Message as WsMessage},
};
use tracing::{debug, error, info};

/// A running upstream connection.
///
/// Client events go out through `events_tx`; every text frame received from
/// the session arrives on `server_rx`. The channel closes when the upstream
/// connection ends. Dropping the connection aborts its task.
pub struct RealtimeConnection {
    pub events_tx: mpsc::Sender<ClientEvent>,
    pub server_rx: mpsc::Receiver<String>,
    handle: JoinHandle<()>,
}

impl RealtimeConnection {
    /// A connection backed by plain channels, with no upstream socket.
    #[cfg(test)]
    pub(crate) fn detached(
        events_tx: mpsc::Sender<ClientEvent>,
        server_rx: mpsc::Receiver<String>,
    ) -> Self {
        Self {
            events_tx,
            server_rx,
            handle: tokio::spawn(async {}),
        }
    }
}

impl Drop for RealtimeConnection {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Connects to the realtime endpoint and spawns the task that proxies frames.
pub async fn start_realtime_provider(config: &Config) -> Result<RealtimeConnection> {
    let mut request = config.realtime_endpoint().into_client_request()?;
    request.headers_mut().insert(
        "Authorization",
        format!("Bearer {}", config.openai_api_key.expose_secret()).parse()?,
    );
    request
        .headers_mut()
        .insert("OpenAI-Beta", "realtime=v1".parse()?);

    let (ws_stream, _) = connect_async(request)
        .await
        .context("Failed to connect to OpenAI Realtime WebSocket")?;
    info!(model = %config.realtime_model, "Connected to OpenAI Realtime API.");

    let (events_tx, events_rx) = mpsc::channel(32);
    let (server_tx, server_rx) = mpsc::channel(128);

    let handle = tokio::spawn(async move {
        if let Err(e) = run(ws_stream, events_rx, server_tx).await {
            error!(error = ?e, "Realtime provider task failed");
        }
        info!("Realtime provider task finished.");
    });

    Ok(RealtimeConnection {
        events_tx,
        server_rx,
        handle,
    })
}

/// Proxies client events to the session and session frames back to the caller.
///
/// A frame waiting for room in `server_tx` is held aside and the socket is not
/// read until it is delivered, while `events_rx` keeps being drained. The
/// caller may therefore block on `events_tx` without stalling this task.
async fn run<S>(
    ws_stream: S,
    mut events_rx: mpsc::Receiver<ClientEvent>,
    server_tx: mpsc::Sender<String>,
) -> Result<()>
where
    S: futures_util::Stream<Item = Result<WsMessage, tokio_tungstenite::tungstenite::Error>>
        + futures_util::Sink<WsMessage, Error = tokio_tungstenite::tungstenite::Error>
        + Unpin,
{
    let (mut openai_tx, mut openai_rx) = ws_stream.split();
    let mut pending: Option<String> = None;

    loop {
        tokio::select! {
            biased;
            // Events produced by the tool panel or the browser.
            event = events_rx.recv() => {
                let Some(event) = event else { break };
                let text = serde_json::to_string(&event)?;
                debug!(%text, "Sending client event");
                openai_tx.send(WsMessage::Text(text.into())).await?;
            },
            // Delivery of the frame held back by a full channel.
            permit = server_tx.reserve(), if pending.is_some() => {
                let Ok(permit) = permit else { break };
                if let Some(text) = pending.take() {
                    permit.send(text);
                }
            },
            // Frames from the realtime session.
            msg = openai_rx.next(), if pending.is_none() => {
                match msg {
                    Some(Ok(WsMessage::Text(text))) => pending = Some(text.to_string()),
                    Some(Ok(WsMessage::Close(frame))) => {
                        info!(?frame, "Realtime session closed by server");
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(e).context("Realtime WebSocket error"),
                    None => break,
                }
            },
        }
    }

    if let Err(e) = openai_tx.close().await {
        debug!(error = %e, "Realtime WebSocket did not close cleanly");
    }
    Ok(())
}
