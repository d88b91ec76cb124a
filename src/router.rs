//! Inbound frame decode and dispatch.
//!
//! Each frame is decoded into a typed [`Inbound`] and handed to exactly one
//! store reducer or to the clock. A frame that fails to decode, or whose
//! reducer rejects it, is counted and reported; the next frame is routed as
//! if nothing happened.

#[cfg(test)]
#[path = "router_test.rs"]
mod router_test;

use frames::{Coord, Inbound, MessageKind, ProtocolError, decode_inbound};
use serde_json::Value;

use crate::clock::ClockSync;
use crate::store::{GameStore, MoveOutcome, StoreError};

/// What a routed frame did.
#[derive(Clone, Debug, PartialEq)]
pub enum Dispatch {
    SessionReplaced { id: String },
    StatusPatched,
    MoveApplied(MoveOutcome),
    TurnTimedOut { next_turn: String },
    GameOver { winner: Option<String>, message: Option<String> },
    ClockCalibrated { offset_ms: i64 },
    /// The server reported an error; shown to the user, nothing else changes.
    ServerError(String),
    /// Chat payload, untouched.
    Chat(Value),
}

#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error("{kind} rejected: {source}")]
    Store {
        kind: MessageKind,
        #[source]
        source: StoreError,
    },
}

/// Frame counters since construction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RouterStats {
    pub routed: u64,
    pub rejected: u64,
}

#[derive(Debug, Default)]
pub struct MessageRouter {
    stats: RouterStats,
}

impl MessageRouter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn stats(&self) -> RouterStats {
        self.stats
    }

    /// Decode `text` and apply it.
    ///
    /// `received_at_ms` is the local clock reading taken when the frame
    /// arrived; clock calibration uses it.
    ///
    /// # Errors
    ///
    /// [`RouteError::Protocol`] if the frame cannot be decoded,
    /// [`RouteError::Store`] if the target reducer rejected it. Either way
    /// the store is unchanged.
    pub fn route(
        &mut self,
        text: &str,
        received_at_ms: i64,
        store: &mut GameStore,
        clock: &mut ClockSync,
    ) -> Result<Dispatch, RouteError> {
        let result = decode_inbound(text)
            .map_err(RouteError::from)
            .and_then(|inbound| dispatch(inbound, received_at_ms, store, clock));

        match &result {
            Ok(dispatch) => {
                self.stats.routed += 1;
                tracing::debug!(?dispatch, "router: frame applied");
            }
            Err(e) => {
                self.stats.rejected += 1;
                tracing::warn!(error = %e, "router: frame rejected");
            }
        }
        result
    }
}

fn dispatch(
    inbound: Inbound,
    received_at_ms: i64,
    store: &mut GameStore,
    clock: &mut ClockSync,
) -> Result<Dispatch, RouteError> {
    let kind = inbound.kind();
    let rejected = |source: StoreError| RouteError::Store { kind, source };

    let dispatch = match inbound {
        Inbound::GameState(snapshot) => {
            let id = snapshot.id.clone();
            store.replace_full(snapshot);
            Dispatch::SessionReplaced { id }
        }
        Inbound::GameUpdate(update) => {
            store.patch_status(update.status).map_err(rejected)?;
            Dispatch::StatusPatched
        }
        Inbound::Move(shot) => {
            let outcome = store
                .apply_move(Coord::new(shot.x, shot.y), shot.result, &shot.next_turn, &shot.by, shot.end_at)
                .map_err(rejected)?;
            Dispatch::MoveApplied(outcome)
        }
        Inbound::GameOver(over) => {
            store.apply_game_over(over.winner.clone()).map_err(rejected)?;
            Dispatch::GameOver { winner: over.winner, message: over.message }
        }
        Inbound::TimeOut(timeout) => {
            store.apply_turn_timeout(&timeout.next_turn, timeout.end_at).map_err(rejected)?;
            Dispatch::TurnTimedOut { next_turn: timeout.next_turn }
        }
        Inbound::SyncTime(sync) => Dispatch::ClockCalibrated {
            offset_ms: clock.calibrate(sync.server_time, received_at_ms),
        },
        Inbound::Error(error) => Dispatch::ServerError(error.message),
        Inbound::Chat(payload) => Dispatch::Chat(payload),
    };
    Ok(dispatch)
}
