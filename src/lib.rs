//! Client-side synchronization core for Space Striker.
//!
//! SYSTEM CONTEXT
//! ==============
//! The game server is authoritative. This crate keeps one local copy of the
//! game in step with it: `connection` owns the socket lifecycle, `router`
//! decodes inbound frames and dispatches them into `store`, `clock` tracks
//! server clock skew, and `timer` derives the turn countdown. `session` ties
//! them together for one joined room; renderers only read from it and send
//! user intents back through it.
//!
//! Frames are processed one at a time in arrival order by a single owner, so
//! no state here is shared across threads except through `watch` channels.

pub mod clock;
pub mod config;
pub mod connection;
pub mod intent;
pub mod lobby;
pub mod router;
pub mod session;
pub mod store;
pub mod timer;
pub mod ws;

pub use clock::{Clock, ClockSync, SystemClock, now_ms};
pub use config::{ClientConfig, ConfigError};
pub use connection::{
    ConnectTarget, ConnectionError, ConnectionId, ConnectionManager, ConnectionState, Connector, Delivery,
    Link, SendError, TransportEvent,
};
pub use intent::{IntentError, Placement, validate_fleet, validate_shot};
pub use lobby::{RoomIdError, generate_room_id, new_player_id, normalize_room_id, validate_player_id};
pub use router::{Dispatch, MessageRouter, RouteError, RouterStats};
pub use session::{JoinError, Notice, RoomSession};
pub use store::{Board, BoardSide, GameSession, GameStore, MoveOutcome, Outcome, PreconditionError, StoreError};
pub use timer::{TurnTimer, Urgency, progress_percent, remaining_secs};
pub use ws::{WsConnector, WsLink};

pub use frames::{BOARD_SIZE, CellState, Coord, GameStatus, REQUIRED_SHIPS};
