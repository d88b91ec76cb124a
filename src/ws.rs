//! Websocket transport built on `tokio-tungstenite`.
//!
//! LIFECYCLE
//! =========
//! [`WsConnector::open`] spawns one task per connect attempt and returns a
//! [`WsLink`] right away. The task connects, reports
//! [`TransportEvent::Opened`], then pumps frames both ways until the peer
//! closes, the socket errors, or the link is closed. Every event it emits
//! carries the attempt's [`ConnectionId`], so the manager can tell events of
//! a torn-down attempt from the current one.
//!
//! Closing the link (or dropping it) signals the task through a oneshot. A
//! task still handshaking just stops; an open socket gets a close frame,
//! bounded by the configured shutdown timeout. No event is emitted for a
//! close the manager asked for.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use crate::clock::now_ms;
use crate::config::ClientConfig;
use crate::connection::{ConnectTarget, ConnectionError, ConnectionId, Connector, Link, TransportEvent};

/// Opens websocket links and funnels their events into one channel.
#[derive(Debug, Clone)]
pub struct WsConnector {
    config: ClientConfig,
    events: mpsc::UnboundedSender<TransportEvent>,
}

impl WsConnector {
    /// Create a connector and the receiver its links report into.
    #[must_use]
    pub fn channel(config: &ClientConfig) -> (Self, mpsc::UnboundedReceiver<TransportEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        (Self { config: config.clone(), events }, rx)
    }
}

impl Connector for WsConnector {
    type Link = WsLink;

    fn open(&mut self, id: ConnectionId, target: &ConnectTarget) -> Result<WsLink, ConnectionError> {
        let url = self.config.connect_url(target);
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| ConnectionError::Open { url: url.clone(), message: e.to_string() })?;

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        runtime.spawn(drive_socket(
            id,
            url,
            self.events.clone(),
            outbound_rx,
            shutdown_rx,
            self.config.shutdown_timeout,
        ));

        Ok(WsLink { outbound: outbound_tx, shutdown: Some(shutdown_tx) })
    }
}

/// Handle to one socket task.
#[derive(Debug)]
pub struct WsLink {
    outbound: mpsc::UnboundedSender<String>,
    shutdown: Option<oneshot::Sender<()>>,
}

impl Link for WsLink {
    fn send_text(&mut self, text: String) -> Result<(), ConnectionError> {
        self.outbound
            .send(text)
            .map_err(|_| ConnectionError::Transport("socket writer stopped".to_owned()))
    }

    fn close(&mut self) {
        if let Some(shutdown) = self.shutdown.take()
            && shutdown.send(()).is_err()
        {
            tracing::debug!("ws: socket task already finished");
        }
    }
}

impl Drop for WsLink {
    fn drop(&mut self) {
        self.close();
    }
}

async fn drive_socket(
    id: ConnectionId,
    url: String,
    events: mpsc::UnboundedSender<TransportEvent>,
    mut outbound: mpsc::UnboundedReceiver<String>,
    mut shutdown: oneshot::Receiver<()>,
    close_timeout: Duration,
) {
    let connected = tokio::select! {
        result = connect_async(url.as_str()) => result,
        _ = &mut shutdown => {
            tracing::debug!(%id, "ws: cancelled before open");
            return;
        }
    };
    let stream = match connected {
        Ok((stream, _)) => stream,
        Err(e) => {
            tracing::warn!(%id, %url, error = %e, "ws: connect failed");
            emit(&events, TransportEvent::Failed { id, error: e.to_string() });
            return;
        }
    };
    tracing::info!(%id, %url, "ws: open");
    emit(&events, TransportEvent::Opened { id });

    let (mut write, mut read) = stream.split();
    let ended = loop {
        tokio::select! {
            _ = &mut shutdown => {
                if tokio::time::timeout(close_timeout, write.send(Message::Close(None))).await.is_err() {
                    tracing::debug!(%id, "ws: close frame timed out");
                }
                break None;
            }
            Some(text) = outbound.recv() => {
                if let Err(e) = write.send(Message::text(text)).await {
                    break Some(TransportEvent::Failed { id, error: e.to_string() });
                }
            }
            incoming = read.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    emit(&events, TransportEvent::Frame { id, text: text.as_str().to_owned(), received_at_ms: now_ms() });
                }
                Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes.to_vec()) {
                    Ok(text) => {
                        emit(&events, TransportEvent::Frame { id, text, received_at_ms: now_ms() });
                    }
                    Err(_) => tracing::warn!(%id, len = bytes.len(), "ws: dropping non-UTF-8 binary frame"),
                },
                Some(Ok(Message::Close(frame))) => {
                    let reason = frame
                        .map(|f| f.reason.as_str().to_owned())
                        .filter(|reason| !reason.is_empty());
                    break Some(TransportEvent::Closed { id, reason });
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => break Some(TransportEvent::Failed { id, error: e.to_string() }),
                None => break Some(TransportEvent::Closed { id, reason: None }),
            },
        }
    };

    if let Some(event) = ended {
        emit(&events, event);
    }
    tracing::debug!(%id, "ws: task finished");
}

fn emit(events: &mpsc::UnboundedSender<TransportEvent>, event: TransportEvent) {
    if events.send(event).is_err() {
        tracing::debug!("ws: event receiver dropped");
    }
}
