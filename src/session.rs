//! Room-scoped client session: connection, router, store and clock.
//!
//! SYSTEM CONTEXT
//! ==============
//! A [`RoomSession`] is what the presentation layer holds. It owns every
//! piece of mutable client state for one player, so nothing is global:
//!
//! ```text
//! TransportEvent -> handle_event -> ConnectionManager -> MessageRouter -> GameStore
//!                                                                      -> ClockSync
//! user intent    -> fire / place_ships -> intent checks -> ConnectionManager::send
//! ```
//!
//! Events must be fed in arrival order from a single task. Each event is
//! fully applied before `handle_event` returns, so no locking is needed.
//!
//! ERRORS
//! ======
//! Nothing that arrives from the network is fatal. Every recovered problem
//! comes back as a [`Notice`] for the UI and is already logged. Only a lost
//! connection needs the user to act (call [`RoomSession::join`] again).

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use frames::{Coord, MessageKind, Outbound, ProtocolError};
use serde_json::Value;
use tokio::sync::watch;

use crate::clock::{Clock, ClockSync};
use crate::config::ClientConfig;
use crate::connection::{
    ConnectTarget, ConnectionError, ConnectionId, ConnectionManager, ConnectionState, Connector, Delivery,
    TransportEvent,
};
use crate::intent::{IntentError, validate_fleet, validate_shot};
use crate::lobby::{RoomIdError, normalize_room_id};
use crate::router::{Dispatch, MessageRouter, RouteError, RouterStats};
use crate::store::{GameSession, GameStore, Outcome, PreconditionError, StoreError};
use crate::timer::TurnTimer;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum JoinError {
    #[error("invalid room id: {0}")]
    RoomId(#[from] RoomIdError),
    #[error(transparent)]
    Connection(#[from] ConnectionError),
}

/// Something the presentation layer should show.
#[derive(Debug)]
pub enum Notice {
    Connected,
    /// The link is gone; reconnecting is up to the user.
    ConnectionLost(ConnectionError),
    /// A frame could not be decoded and was discarded.
    Protocol(ProtocolError),
    /// A frame arrived before the first snapshot and was discarded.
    Precondition(PreconditionError),
    /// A reducer refused a frame.
    Rejected { kind: MessageKind, error: StoreError },
    ServerError(String),
    Chat(Value),
    GameOver { winner: Option<String>, outcome: Outcome, message: Option<String> },
}

// =============================================================================
// SESSION
// =============================================================================

pub struct RoomSession<C: Connector> {
    config: ClientConfig,
    connection: ConnectionManager<C>,
    router: MessageRouter,
    store: GameStore,
    clock: ClockSync,
    room_id: Option<String>,
}

impl<C: Connector> RoomSession<C> {
    #[must_use]
    pub fn new(config: ClientConfig, connector: C, player_id: impl Into<String>) -> Self {
        Self {
            config,
            connection: ConnectionManager::new(connector),
            router: MessageRouter::new(),
            store: GameStore::new(player_id),
            clock: ClockSync::new(),
            room_id: None,
        }
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    /// Connect to a room. Joining a different room than the current one
    /// clears the game session first; rejoining the same room keeps it until
    /// the server's next snapshot.
    ///
    /// # Errors
    ///
    /// [`JoinError::RoomId`] for a malformed room code,
    /// [`JoinError::Connection`] if the transport cannot be started.
    pub fn join(&mut self, raw_room: &str) -> Result<ConnectionId, JoinError> {
        let room_id = normalize_room_id(raw_room)?;
        if self.room_id.as_deref() != Some(room_id.as_str()) {
            self.store.reset();
        }

        let target = ConnectTarget { room_id: room_id.clone(), player_id: self.store.local_player().to_owned() };
        let id = self.connection.connect(target)?;
        tracing::info!(%id, room_id = %room_id, "session: joining room");
        self.room_id = Some(room_id);
        Ok(id)
    }

    /// Leave the room: close the connection and drop the game session. The
    /// clock offset is kept.
    pub fn leave(&mut self) {
        if let Some(room_id) = self.room_id.take() {
            tracing::info!(room_id = %room_id, "session: leaving room");
        }
        self.connection.disconnect();
        self.store.reset();
    }

    /// Drop the finished game and wait for the server's next snapshot on the
    /// same connection.
    pub fn new_game(&mut self) {
        self.store.reset();
    }

    /// Apply one transport event.
    pub fn handle_event(&mut self, event: TransportEvent) -> Option<Notice> {
        match self.connection.handle_event(event) {
            Delivery::Stale => None,
            Delivery::Opened => Some(Notice::Connected),
            Delivery::Lost(error) => Some(Notice::ConnectionLost(error)),
            Delivery::Frame { text, received_at_ms } => self.route_frame(&text, received_at_ms),
        }
    }

    fn route_frame(&mut self, text: &str, received_at_ms: i64) -> Option<Notice> {
        let routed = self.router.route(text, received_at_ms, &mut self.store, &mut self.clock);
        match routed {
            Ok(Dispatch::GameOver { winner, message }) => {
                let outcome = self
                    .store
                    .session()
                    .map_or(Outcome::Undecided, |s| s.outcome_for(self.store.local_player()));
                Some(Notice::GameOver { winner, outcome, message })
            }
            Ok(Dispatch::ServerError(message)) => Some(Notice::ServerError(message)),
            Ok(Dispatch::Chat(payload)) => Some(Notice::Chat(payload)),
            Ok(_) => None,
            Err(RouteError::Protocol(error)) => Some(Notice::Protocol(error)),
            Err(RouteError::Store { source: StoreError::Precondition(error), .. }) => {
                Some(Notice::Precondition(error))
            }
            Err(RouteError::Store { kind, source }) => Some(Notice::Rejected { kind, error: source }),
        }
    }

    // -------------------------------------------------------------------------
    // Intents
    // -------------------------------------------------------------------------

    /// Fire at the opponent board.
    ///
    /// # Errors
    ///
    /// [`IntentError`] if the shot cannot be valid now or could not be sent.
    pub fn fire(&mut self, x: usize, y: usize) -> Result<(), IntentError> {
        let target = Coord::new(x, y);
        validate_shot(self.store.session(), self.store.local_player(), target)?;
        self.connection.send(&Outbound::Move(target))?;
        tracing::info!(%target, "session: fired");
        Ok(())
    }

    /// Submit the fleet.
    ///
    /// # Errors
    ///
    /// [`IntentError`] if the placement is not acceptable now or could not be
    /// sent.
    pub fn place_ships(&mut self, cells: &[Coord]) -> Result<(), IntentError> {
        let ships = validate_fleet(self.store.session(), cells)?;
        self.connection.send(&Outbound::PlaceShip { ships })?;
        tracing::info!(count = cells.len(), "session: fleet submitted");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Read side
    // -------------------------------------------------------------------------

    /// Start the countdown task for this session. Must be called from within
    /// a Tokio runtime; the task stops when the returned handle is dropped.
    pub fn spawn_turn_timer<K: Clock>(&self, clock: K) -> TurnTimer {
        TurnTimer::spawn(self.store.subscribe(), self.clock.subscribe(), clock, self.config.countdown_poll)
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    #[must_use]
    pub fn room_id(&self) -> Option<&str> {
        self.room_id.as_deref()
    }

    #[must_use]
    pub fn local_player(&self) -> &str {
        self.store.local_player()
    }

    #[must_use]
    pub fn session(&self) -> Option<&GameSession> {
        self.store.session()
    }

    #[must_use]
    pub fn is_my_turn(&self) -> bool {
        self.store.is_my_turn()
    }

    #[must_use]
    pub fn connection_state(&self) -> ConnectionState {
        self.connection.state()
    }

    #[must_use]
    pub fn connection(&self) -> &ConnectionManager<C> {
        &self.connection
    }

    #[must_use]
    pub fn clock(&self) -> &ClockSync {
        &self.clock
    }

    #[must_use]
    pub fn router_stats(&self) -> RouterStats {
        self.router.stats()
    }

    #[must_use]
    pub fn subscribe_session(&self) -> watch::Receiver<Option<GameSession>> {
        self.store.subscribe()
    }

    #[must_use]
    pub fn subscribe_connection(&self) -> watch::Receiver<ConnectionState> {
        self.connection.subscribe()
    }
}
