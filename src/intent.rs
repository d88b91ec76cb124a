//! Local checks on user intents before they become outbound frames.
//!
//! The server is authoritative for game rules. These checks only stop
//! intents that cannot possibly be accepted in the current local state, so
//! the user gets an immediate answer instead of a silent drop.

#[cfg(test)]
#[path = "intent_test.rs"]
mod intent_test;

use std::collections::BTreeSet;

use frames::{CellState, Coord, GameStatus, REQUIRED_SHIPS};

use crate::connection::SendError;
use crate::store::GameSession;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IntentError {
    #[error("no active game session")]
    NoSession,
    #[error("cannot {action} while game is {status}")]
    WrongPhase { action: &'static str, status: GameStatus },
    #[error("it is not your turn")]
    NotYourTurn,
    #[error("coordinate {0} is outside the board")]
    OutOfBounds(Coord),
    #[error("cell {0} has already been fired at")]
    AlreadyResolved(Coord),
    #[error("fleet needs exactly {expected} cells, got {actual}")]
    ShipCount { expected: usize, actual: usize },
    #[error("cell {0} is listed more than once")]
    DuplicateCell(Coord),
    #[error(transparent)]
    Send(#[from] SendError),
}

/// Check that `local_player` may fire at `target` right now.
///
/// # Errors
///
/// Returns the first failed condition: no session, game not ACTIVE, not the
/// local player's turn, coordinate off the board, or a cell already resolved.
pub fn validate_shot(session: Option<&GameSession>, local_player: &str, target: Coord) -> Result<(), IntentError> {
    let session = session.ok_or(IntentError::NoSession)?;
    if session.status != GameStatus::Active {
        return Err(IntentError::WrongPhase { action: "fire", status: session.status });
    }
    if !session.is_turn_of(local_player) {
        return Err(IntentError::NotYourTurn);
    }
    match session.opponent_board.cell(target) {
        None => Err(IntentError::OutOfBounds(target)),
        Some(CellState::Empty) => Ok(()),
        Some(_) => Err(IntentError::AlreadyResolved(target)),
    }
}

/// Check a fleet placement and return the cells in wire order.
///
/// # Errors
///
/// Returns [`IntentError`] when there is no session, the game is not waiting
/// for ships, or `cells` is not exactly [`REQUIRED_SHIPS`] distinct cells on
/// the board.
pub fn validate_fleet(session: Option<&GameSession>, cells: &[Coord]) -> Result<Vec<Coord>, IntentError> {
    let session = session.ok_or(IntentError::NoSession)?;
    if session.status != GameStatus::WaitingForShip {
        return Err(IntentError::WrongPhase { action: "place ships", status: session.status });
    }
    if cells.len() != REQUIRED_SHIPS {
        return Err(IntentError::ShipCount { expected: REQUIRED_SHIPS, actual: cells.len() });
    }
    let mut seen = BTreeSet::new();
    for &cell in cells {
        if !cell.in_bounds() {
            return Err(IntentError::OutOfBounds(cell));
        }
        if !seen.insert(cell) {
            return Err(IntentError::DuplicateCell(cell));
        }
    }
    Ok(cells.to_vec())
}

/// Ship picker: a set of cells toggled one at a time.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Placement {
    cells: BTreeSet<Coord>,
}

impl Placement {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Select or deselect `cell`. Returns whether it is selected afterwards.
    ///
    /// Selecting a new cell once the fleet is complete does nothing.
    ///
    /// # Errors
    ///
    /// [`IntentError::OutOfBounds`] for a cell off the board.
    pub fn toggle(&mut self, cell: Coord) -> Result<bool, IntentError> {
        if !cell.in_bounds() {
            return Err(IntentError::OutOfBounds(cell));
        }
        if self.cells.remove(&cell) {
            return Ok(false);
        }
        if self.cells.len() >= REQUIRED_SHIPS {
            return Ok(false);
        }
        self.cells.insert(cell);
        Ok(true)
    }

    #[must_use]
    pub fn contains(&self, cell: Coord) -> bool {
        self.cells.contains(&cell)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Ships still to place.
    #[must_use]
    pub fn remaining(&self) -> usize {
        REQUIRED_SHIPS.saturating_sub(self.cells.len())
    }

    #[must_use]
    pub fn can_confirm(&self) -> bool {
        self.cells.len() == REQUIRED_SHIPS
    }

    /// Selected cells, ordered by row then column.
    #[must_use]
    pub fn cells(&self) -> Vec<Coord> {
        self.cells.iter().copied().collect()
    }

    pub fn clear(&mut self) {
        self.cells.clear();
    }
}
