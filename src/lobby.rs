//! Room and player identifiers.
//!
//! Room IDs are short uppercase codes players read to each other; player IDs
//! are random UUIDs that live only as long as the process. Both end up in the
//! connect URL query string, so they are restricted to URL-safe characters.

#[cfg(test)]
#[path = "lobby_test.rs"]
mod lobby_test;

use rand::Rng;
use uuid::Uuid;

const ROOM_ID_LEN: usize = 6;
const ROOM_ID_ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomIdError {
    #[error("identifier is empty")]
    Empty,
    #[error("identifier contains invalid character '{0}'")]
    InvalidChar(char),
}

/// Generate a fresh six-character room code.
#[must_use]
pub fn generate_room_id() -> String {
    let mut rng = rand::rng();
    (0..ROOM_ID_LEN)
        .map(|_| char::from(ROOM_ID_ALPHABET[rng.random_range(0..ROOM_ID_ALPHABET.len())]))
        .collect()
}

/// Normalize a room code typed by a user: trimmed and uppercased.
///
/// # Errors
///
/// Returns [`RoomIdError`] for empty input or characters outside
/// `[A-Z0-9_-]`.
pub fn normalize_room_id(raw: &str) -> Result<String, RoomIdError> {
    let normalized = raw.trim().to_uppercase();
    check_identifier(&normalized)?;
    Ok(normalized)
}

/// Check a caller-supplied player ID.
///
/// # Errors
///
/// Returns [`RoomIdError`] for empty input or characters outside
/// `[A-Za-z0-9_-]`.
pub fn validate_player_id(raw: &str) -> Result<String, RoomIdError> {
    let trimmed = raw.trim();
    check_identifier(trimmed)?;
    Ok(trimmed.to_owned())
}

/// A new random player ID for this process.
#[must_use]
pub fn new_player_id() -> String {
    Uuid::new_v4().to_string()
}

fn check_identifier(id: &str) -> Result<(), RoomIdError> {
    if id.is_empty() {
        return Err(RoomIdError::Empty);
    }
    if let Some(bad) = id.chars().find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_')) {
        return Err(RoomIdError::InvalidChar(bad));
    }
    Ok(())
}
