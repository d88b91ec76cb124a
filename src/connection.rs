//! Connection lifecycle for one room/player pair.
//!
//! SYSTEM CONTEXT
//! ==============
//! [`ConnectionManager`] owns at most one live transport link. The transport
//! itself runs elsewhere (see `ws.rs`) and reports back through
//! [`TransportEvent`]s, which the session feeds into
//! [`ConnectionManager::handle_event`] one at a time, in arrival order.
//!
//! DESIGN
//! ======
//! The manager is a plain state machine:
//!
//! ```text
//! DISCONNECTED --connect--> CONNECTING --Opened--> CONNECTED
//!      ^                         |                     |
//!      +----- Closed / Failed / disconnect ------------+
//! ```
//!
//! Every connect attempt gets a fresh [`ConnectionId`] and every transport
//! event carries the id of the link that produced it. Events whose id is not
//! the current link are stale (they belong to a link already torn down) and
//! are dropped without touching state.
//!
//! Sends are only accepted while CONNECTED. Nothing is buffered or retried.
//! There is no automatic reconnect: after DISCONNECTED the caller must call
//! [`ConnectionManager::connect`] again.

#[cfg(test)]
#[path = "connection_test.rs"]
mod connection_test;

use std::fmt;

use frames::{Outbound, encode_outbound};
use tokio::sync::watch;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl ConnectionState {
    /// Short status label for display.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Connected => "ONLINE",
            Self::Connecting => "CONNECTING...",
            Self::Disconnected => "OFFLINE",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
        };
        f.write_str(name)
    }
}

/// Identifies one connect attempt. Never reused within a manager.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Where to connect: both values go into the connect URL.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectTarget {
    pub room_id: String,
    pub player_id: String,
}

/// Something the transport observed, tagged with the link that saw it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportEvent {
    Opened { id: ConnectionId },
    Frame { id: ConnectionId, text: String, received_at_ms: i64 },
    Closed { id: ConnectionId, reason: Option<String> },
    Failed { id: ConnectionId, error: String },
}

impl TransportEvent {
    #[must_use]
    pub fn id(&self) -> ConnectionId {
        match self {
            Self::Opened { id } | Self::Frame { id, .. } | Self::Closed { id, .. } | Self::Failed { id, .. } => *id,
        }
    }
}

// =============================================================================
// ERRORS
// =============================================================================

/// Transport-level failure. Leaves the manager DISCONNECTED.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConnectionError {
    #[error("failed to open {url}: {message}")]
    Open { url: String, message: String },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("connection closed: {0}")]
    Closed(String),
}

/// A send that was dropped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SendError {
    #[error("cannot send {tag} while {state}")]
    NotConnected { tag: &'static str, state: ConnectionState },
    #[error("cannot send {tag}: transport is gone")]
    LinkGone { tag: &'static str },
}

// =============================================================================
// TRANSPORT SEAM
// =============================================================================

/// Outbound half of one open transport.
pub trait Link: Send {
    /// Queue one text frame.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError`] when the transport has already gone away.
    fn send_text(&mut self, text: String) -> Result<(), ConnectionError>;

    /// Release the transport. Must be safe to call more than once.
    fn close(&mut self);
}

/// Opens transports. Results of the open arrive later as [`TransportEvent`]s
/// tagged with `id`.
pub trait Connector {
    type Link: Link;

    /// # Errors
    ///
    /// Returns [`ConnectionError::Open`] when the attempt cannot even start.
    fn open(&mut self, id: ConnectionId, target: &ConnectTarget) -> Result<Self::Link, ConnectionError>;
}

// =============================================================================
// MANAGER
// =============================================================================

/// What a transport event means for the session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Delivery {
    /// The link finished opening.
    Opened,
    /// An inbound frame for the current link.
    Frame { text: String, received_at_ms: i64 },
    /// The current link is gone.
    Lost(ConnectionError),
    /// The event belonged to a link that is no longer current.
    Stale,
}

struct Live<L> {
    id: ConnectionId,
    target: ConnectTarget,
    link: L,
}

pub struct ConnectionManager<C: Connector> {
    connector: C,
    live: Option<Live<C::Link>>,
    state_tx: watch::Sender<ConnectionState>,
    next_id: u64,
}

impl<C: Connector> ConnectionManager<C> {
    #[must_use]
    pub fn new(connector: C) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        Self { connector, live: None, state_tx, next_id: 0 }
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    /// Observe state transitions.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    #[must_use]
    pub fn current_id(&self) -> Option<ConnectionId> {
        self.live.as_ref().map(|live| live.id)
    }

    #[must_use]
    pub fn target(&self) -> Option<&ConnectTarget> {
        self.live.as_ref().map(|live| &live.target)
    }

    #[must_use]
    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Start connecting to `target`.
    ///
    /// If a link to the same target is already live this is a no-op that
    /// returns its id. A live link to any other target is torn down first.
    ///
    /// # Errors
    ///
    /// Returns the connector's [`ConnectionError`]; the manager is then
    /// DISCONNECTED with no link.
    pub fn connect(&mut self, target: ConnectTarget) -> Result<ConnectionId, ConnectionError> {
        if let Some(live) = &self.live
            && live.target == target
            && self.state() != ConnectionState::Disconnected
        {
            return Ok(live.id);
        }
        self.release("replaced");

        self.next_id += 1;
        let id = ConnectionId(self.next_id);
        self.set_state(ConnectionState::Connecting);

        match self.connector.open(id, &target) {
            Ok(link) => {
                tracing::info!(%id, room_id = %target.room_id, player_id = %target.player_id, "connection: connecting");
                self.live = Some(Live { id, target, link });
                Ok(id)
            }
            Err(e) => {
                tracing::warn!(%id, room_id = %target.room_id, error = %e, "connection: open failed");
                self.set_state(ConnectionState::Disconnected);
                Err(e)
            }
        }
    }

    /// Send one message. Only succeeds while CONNECTED; dropped otherwise.
    ///
    /// # Errors
    ///
    /// [`SendError::NotConnected`] outside CONNECTED, [`SendError::LinkGone`]
    /// if the transport has already shut down.
    pub fn send(&mut self, message: &Outbound) -> Result<(), SendError> {
        let tag = message.tag();
        let state = self.state();
        let live = match &mut self.live {
            Some(live) if state == ConnectionState::Connected => live,
            _ => {
                tracing::warn!(tag, %state, "connection: send dropped; not connected");
                return Err(SendError::NotConnected { tag, state });
            }
        };
        live.link.send_text(encode_outbound(message)).map_err(|e| {
            tracing::warn!(id = %live.id, tag, error = %e, "connection: send dropped; transport gone");
            SendError::LinkGone { tag }
        })
    }

    /// Close the current link, if any. Always ends DISCONNECTED.
    pub fn disconnect(&mut self) {
        self.release("disconnect");
        self.set_state(ConnectionState::Disconnected);
    }

    /// Apply one transport event.
    pub fn handle_event(&mut self, event: TransportEvent) -> Delivery {
        let id = event.id();
        if self.current_id() != Some(id) {
            tracing::debug!(%id, current = ?self.current_id(), "connection: stale transport event dropped");
            return Delivery::Stale;
        }

        match event {
            TransportEvent::Opened { .. } => {
                self.set_state(ConnectionState::Connected);
                tracing::info!(%id, "connection: connected");
                Delivery::Opened
            }
            TransportEvent::Frame { text, received_at_ms, .. } => Delivery::Frame { text, received_at_ms },
            TransportEvent::Closed { reason, .. } => {
                let reason = reason.unwrap_or_else(|| "closed by peer".to_owned());
                tracing::warn!(%id, reason = %reason, "connection: closed");
                self.disconnect();
                Delivery::Lost(ConnectionError::Closed(reason))
            }
            TransportEvent::Failed { error, .. } => {
                tracing::warn!(%id, error = %error, "connection: transport failed");
                self.disconnect();
                Delivery::Lost(ConnectionError::Transport(error))
            }
        }
    }

    /// Tear down the live link. Subscribers see DISCONNECTED before the link
    /// closes, even when a new attempt follows immediately.
    fn release(&mut self, why: &'static str) {
        if let Some(mut live) = self.live.take() {
            self.set_state(ConnectionState::Disconnected);
            live.link.close();
            tracing::info!(id = %live.id, room_id = %live.target.room_id, why, "connection: released");
        }
    }

    fn set_state(&self, next: ConnectionState) {
        self.state_tx.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            *current = next;
            true
        });
    }
}

impl<C: Connector> Drop for ConnectionManager<C> {
    fn drop(&mut self) {
        self.release("dropped");
    }
}
