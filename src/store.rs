//! Canonical game session state and the reducers that mutate it.
//!
//! SYSTEM CONTEXT
//! ==============
//! The store is the only writer of [`GameSession`]. The router calls one
//! reducer per inbound frame; the turn timer and the presentation layer only
//! read, through [`GameStore::subscribe`].
//!
//! DESIGN
//! ======
//! Board rows are `Arc`-shared arrays. Every publish hands subscribers a
//! clone of the session, which shares rows with the store; a later move goes
//! through `Arc::make_mut`, so the touched row is copied and any snapshot a
//! subscriber still holds keeps its old contents.
//!
//! Every reducer except [`GameStore::replace_full`] and [`GameStore::reset`]
//! requires a session. Frames can arrive before the first snapshot (for
//! example right after a reconnect); those reducers return a
//! [`PreconditionError`] and leave the store untouched.

#[cfg(test)]
#[path = "store_test.rs"]
mod store_test;

use std::sync::Arc;

use frames::{BOARD_SIZE, CellState, Coord, GameStatePayload, GameStatus, Grid};
use tokio::sync::watch;

type Row = Arc<[CellState; BOARD_SIZE]>;

// =============================================================================
// ERRORS
// =============================================================================

/// A reducer ran before any session existed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{reducer}: no active game session")]
pub struct PreconditionError {
    pub reducer: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Precondition(#[from] PreconditionError),
    #[error("status cannot move backward from {from} to {to}")]
    StatusRegression { from: GameStatus, to: GameStatus },
    #[error("coordinate {0} is outside the board")]
    OutOfBounds(Coord),
    #[error("move result must be HIT or MISS, got {0}")]
    IllegalResult(CellState),
}

// =============================================================================
// BOARD
// =============================================================================

/// One 5x5 board, indexed `[x][y]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Board {
    rows: [Row; BOARD_SIZE],
}

impl Board {
    #[must_use]
    pub fn empty() -> Self {
        Self::from_grid(&[[CellState::Empty; BOARD_SIZE]; BOARD_SIZE])
    }

    #[must_use]
    pub fn from_grid(grid: &Grid) -> Self {
        Self { rows: std::array::from_fn(|x| Arc::new(grid[x])) }
    }

    /// Cell at `coord`, or `None` off the board.
    #[must_use]
    pub fn cell(&self, coord: Coord) -> Option<CellState> {
        self.rows.get(coord.x).and_then(|row| row.get(coord.y)).copied()
    }

    /// Shared handle to row `x`.
    #[must_use]
    pub fn row(&self, x: usize) -> Option<&Row> {
        self.rows.get(x)
    }

    #[must_use]
    pub fn to_grid(&self) -> Grid {
        std::array::from_fn(|x| *self.rows[x])
    }

    /// Number of cells in `state`.
    #[must_use]
    pub fn count(&self, state: CellState) -> usize {
        self.rows.iter().flat_map(|row| row.iter()).filter(|cell| **cell == state).count()
    }

    /// Write one cell, copying the row if anyone else still holds it.
    fn set(&mut self, coord: Coord, state: CellState) {
        if let Some(row) = self.rows.get_mut(coord.x)
            && let Some(cell) = Arc::make_mut(row).get_mut(coord.y)
        {
            *cell = state;
        }
    }

    /// Replace every SHIP with EMPTY. Returns how many were masked.
    fn mask_ships(&mut self) -> usize {
        let mut masked = 0;
        for row in &mut self.rows {
            if !row.contains(&CellState::Ship) {
                continue;
            }
            for cell in Arc::make_mut(row).iter_mut() {
                if *cell == CellState::Ship {
                    *cell = CellState::Empty;
                    masked += 1;
                }
            }
        }
        masked
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::empty()
    }
}

/// Which board a move landed on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BoardSide {
    /// The local player's own board.
    Player,
    /// The masked enemy board.
    Opponent,
}

// =============================================================================
// SESSION
// =============================================================================

/// How a finished game ended for one player.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Victory,
    Defeat,
    Undecided,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GameSession {
    pub id: String,
    pub status: GameStatus,
    pub active_player: Option<String>,
    pub winner: Option<String>,
    /// Deadline of the current turn or phase, server epoch milliseconds.
    pub end_at: Option<i64>,
    pub player_board: Board,
    pub opponent_board: Board,
}

impl GameSession {
    /// Build a session from a snapshot. Opponent SHIP codes are masked.
    #[must_use]
    pub fn from_snapshot(snapshot: GameStatePayload) -> Self {
        let mut session = Self {
            id: snapshot.id,
            status: snapshot.status,
            active_player: snapshot.active_player,
            winner: snapshot.winner,
            end_at: snapshot.end_at,
            player_board: Board::from_grid(&snapshot.your_board),
            opponent_board: Board::from_grid(&snapshot.opponent_board),
        };
        let masked = session.opponent_board.mask_ships();
        if masked > 0 {
            tracing::warn!(game_id = %session.id, masked, "store: snapshot revealed opponent ships; masked");
        }
        session
    }

    #[must_use]
    pub fn is_turn_of(&self, player: &str) -> bool {
        self.active_player.as_deref() == Some(player)
    }

    #[must_use]
    pub fn awaiting_opponent(&self) -> bool {
        self.status == GameStatus::WaitingForPlayer
    }

    #[must_use]
    pub fn in_placement(&self) -> bool {
        self.status == GameStatus::WaitingForShip
    }

    /// Both boards are worth drawing once shots can be fired.
    #[must_use]
    pub fn boards_visible(&self) -> bool {
        matches!(self.status, GameStatus::Active | GameStatus::Over)
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.status == GameStatus::Over
    }

    #[must_use]
    pub fn outcome_for(&self, player: &str) -> Outcome {
        match self.winner.as_deref() {
            None => Outcome::Undecided,
            Some(winner) if winner == player => Outcome::Victory,
            Some(_) => Outcome::Defeat,
        }
    }

    #[must_use]
    pub fn board(&self, side: BoardSide) -> &Board {
        match side {
            BoardSide::Player => &self.player_board,
            BoardSide::Opponent => &self.opponent_board,
        }
    }

    fn board_mut(&mut self, side: BoardSide) -> &mut Board {
        match side {
            BoardSide::Player => &mut self.player_board,
            BoardSide::Opponent => &mut self.opponent_board,
        }
    }
}

// =============================================================================
// STORE
// =============================================================================

/// Result of [`GameStore::apply_move`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoveOutcome {
    /// The cell on `side` now holds the result.
    Applied { side: BoardSide },
    /// The cell was already resolved and kept its value. The turn handoff
    /// was still applied.
    CellLocked { side: BoardSide, existing: CellState },
}

impl MoveOutcome {
    #[must_use]
    pub fn side(self) -> BoardSide {
        match self {
            Self::Applied { side } | Self::CellLocked { side, .. } => side,
        }
    }
}

#[derive(Debug)]
pub struct GameStore {
    local_player: String,
    session: Option<GameSession>,
    session_tx: watch::Sender<Option<GameSession>>,
}

impl GameStore {
    #[must_use]
    pub fn new(local_player: impl Into<String>) -> Self {
        let (session_tx, _) = watch::channel(None);
        Self { local_player: local_player.into(), session: None, session_tx }
    }

    #[must_use]
    pub fn local_player(&self) -> &str {
        &self.local_player
    }

    #[must_use]
    pub fn session(&self) -> Option<&GameSession> {
        self.session.as_ref()
    }

    #[must_use]
    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    #[must_use]
    pub fn is_my_turn(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.is_turn_of(&self.local_player))
    }

    /// Observe every committed session change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<GameSession>> {
        self.session_tx.subscribe()
    }

    // -------------------------------------------------------------------------
    // Reducers
    // -------------------------------------------------------------------------

    /// Replace the whole session with a server snapshot (`GAME_STATE`).
    pub fn replace_full(&mut self, snapshot: GameStatePayload) {
        let session = GameSession::from_snapshot(snapshot);
        match &self.session {
            Some(prev) if prev.id == session.id => {
                tracing::debug!(game_id = %session.id, status = %session.status, "store: snapshot refreshed");
            }
            _ => {
                tracing::info!(game_id = %session.id, status = %session.status, "store: session created");
            }
        }
        self.session = Some(session);
        self.publish();
    }

    /// Replace only `status` (`GAME_UPDATE`).
    ///
    /// # Errors
    ///
    /// [`StoreError::Precondition`] without a session;
    /// [`StoreError::StatusRegression`] if `status` is behind the current one.
    pub fn patch_status(&mut self, status: GameStatus) -> Result<(), StoreError> {
        let session = self.active_mut("patch_status")?;
        if session.status == status {
            return Ok(());
        }
        if !session.status.can_advance_to(status) {
            return Err(StoreError::StatusRegression { from: session.status, to: status });
        }
        tracing::info!(game_id = %session.id, from = %session.status, to = %status, "store: status advanced");
        session.status = status;
        self.publish();
        Ok(())
    }

    /// Apply a resolved shot and the turn handoff that came with it (`MOVE`).
    ///
    /// A shot fired by the local player lands on the opponent board; any
    /// other shot lands on the local player's board. `active_player` and
    /// `end_at` are always taken from the frame.
    ///
    /// # Errors
    ///
    /// [`StoreError::Precondition`] without a session;
    /// [`StoreError::OutOfBounds`] or [`StoreError::IllegalResult`] for
    /// input that can never be applied. Nothing changes on error.
    pub fn apply_move(
        &mut self,
        coord: Coord,
        result: CellState,
        next_turn: &str,
        by: &str,
        end_at: Option<i64>,
    ) -> Result<MoveOutcome, StoreError> {
        let side = if by == self.local_player { BoardSide::Opponent } else { BoardSide::Player };
        let session = self.active_mut("apply_move")?;
        if !coord.in_bounds() {
            return Err(StoreError::OutOfBounds(coord));
        }
        if !result.is_terminal() {
            return Err(StoreError::IllegalResult(result));
        }

        let board = session.board_mut(side);
        let outcome = match board.cell(coord) {
            Some(existing) if existing.is_terminal() => {
                tracing::warn!(%coord, ?side, %existing, %result, "store: cell already resolved; keeping it");
                MoveOutcome::CellLocked { side, existing }
            }
            _ => {
                board.set(coord, result);
                MoveOutcome::Applied { side }
            }
        };
        session.active_player = Some(next_turn.to_owned());
        session.end_at = end_at;
        tracing::debug!(%coord, %result, by, next_turn, "store: move applied");
        self.publish();
        Ok(outcome)
    }

    /// Forced turn handoff after a server-side timeout (`TIME_OUT`).
    ///
    /// # Errors
    ///
    /// [`StoreError::Precondition`] without a session.
    pub fn apply_turn_timeout(&mut self, next_turn: &str, end_at: Option<i64>) -> Result<(), StoreError> {
        let session = self.active_mut("apply_turn_timeout")?;
        session.active_player = Some(next_turn.to_owned());
        session.end_at = end_at;
        tracing::info!(game_id = %session.id, next_turn, "store: turn timed out");
        self.publish();
        Ok(())
    }

    /// Terminal transition (`GAME_OVER`). Touches only `status` and `winner`.
    ///
    /// # Errors
    ///
    /// [`StoreError::Precondition`] without a session.
    pub fn apply_game_over(&mut self, winner: Option<String>) -> Result<(), StoreError> {
        let session = self.active_mut("apply_game_over")?;
        session.status = GameStatus::Over;
        session.winner = winner;
        tracing::info!(game_id = %session.id, winner = ?session.winner, "store: game over");
        self.publish();
        Ok(())
    }

    /// Drop the session. Connection state is not touched.
    pub fn reset(&mut self) {
        if let Some(session) = self.session.take() {
            tracing::info!(game_id = %session.id, "store: session cleared");
            self.publish();
        }
    }

    fn active_mut(&mut self, reducer: &'static str) -> Result<&mut GameSession, PreconditionError> {
        self.session.as_mut().ok_or(PreconditionError { reducer })
    }

    fn publish(&self) {
        self.session_tx.send_replace(self.session.clone());
    }
}
