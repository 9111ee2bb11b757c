//! Outbound seam between the tool panel and the realtime session.

use crate::protocol::ClientEvent;
use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Errors raised by the channel-backed sink.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("Realtime session channel is closed")]
    Closed,
}

/// Anything that can deliver client events to the realtime session.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn send(&self, event: ClientEvent) -> Result<()>;
}

/// An `EventSink` that forwards events into an mpsc channel, typically read by
/// the task owning the upstream WebSocket.
#[derive(Clone, Debug)]
pub struct ChannelSink {
    tx: mpsc::Sender<ClientEvent>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<ClientEvent>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl EventSink for ChannelSink {
    async fn send(&self, event: ClientEvent) -> Result<()> {
        self.tx.send(event).await.map_err(|_| SinkError::Closed)?;
        Ok(())
    }
}
