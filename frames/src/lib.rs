//! Shared frame model and JSON codec for the game websocket.
//!
//! Every frame on the wire is a JSON object `{ "type": ..., "payload": ... }`.
//! Inbound frames decode into [`Inbound`], one variant per message kind, so
//! dispatch code can match exhaustively. Outbound frames are built from
//! [`Outbound`] and rendered with [`encode_outbound`].
//!
//! DESIGN
//! ======
//! The envelope is decoded in two steps: first the `type` tag is read from a
//! loose JSON object, then the payload is deserialized into the struct for
//! that kind. This keeps "unknown tag" distinct from "bad payload" so callers
//! can report each precisely.

use std::fmt;
use std::str::FromStr;

use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Width and height of both boards.
pub const BOARD_SIZE: usize = 5;

/// Number of ship cells a player must submit with `PLACE_SHIP`.
pub const REQUIRED_SHIPS: usize = 5;

/// A full board as sent by the server, indexed `[x][y]`.
pub type Grid = [[CellState; BOARD_SIZE]; BOARD_SIZE];

// =============================================================================
// ERRORS
// =============================================================================

/// Error returned by [`decode_inbound`].
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The frame text is not JSON at all.
    #[error("frame is not valid JSON: {0}")]
    Malformed(#[source] serde_json::Error),
    /// The frame is JSON but not an object.
    #[error("frame is not a JSON object")]
    NotAnObject,
    /// The envelope has no string `type` field.
    #[error("frame has no string `type` field")]
    MissingType,
    /// The `type` tag is not part of the inbound catalog.
    #[error("unknown message type: {0}")]
    UnknownType(String),
    /// The payload does not match the shape required by its kind.
    #[error("invalid {kind} payload: {source}")]
    InvalidPayload {
        kind: MessageKind,
        #[source]
        source: serde_json::Error,
    },
    /// A coordinate lies outside the board.
    #[error("{kind} coordinate ({x}, {y}) is outside the board")]
    CoordinateOutOfRange { kind: MessageKind, x: usize, y: usize },
    /// A move reported a result other than HIT or MISS.
    #[error("move result must be HIT or MISS, got {0}")]
    IllegalMoveResult(CellState),
}

/// Error for a cell code outside `0..=3`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid cell code: {0}")]
pub struct InvalidCellCode(pub String);

// =============================================================================
// CELL STATE
// =============================================================================

/// State of one board cell, encoded on the wire as an integer code.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "serde_json::Number", into = "u8")]
pub enum CellState {
    #[default]
    Empty,
    Ship,
    Hit,
    Miss,
}

impl CellState {
    /// Integer code used on the wire.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Empty => 0,
            Self::Ship => 1,
            Self::Hit => 2,
            Self::Miss => 3,
        }
    }

    /// HIT and MISS are final: a resolved cell never changes again.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Hit | Self::Miss)
    }
}

impl TryFrom<i64> for CellState {
    type Error = InvalidCellCode;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::Empty),
            1 => Ok(Self::Ship),
            2 => Ok(Self::Hit),
            3 => Ok(Self::Miss),
            other => Err(InvalidCellCode(other.to_string())),
        }
    }
}

impl TryFrom<serde_json::Number> for CellState {
    type Error = InvalidCellCode;

    fn try_from(number: serde_json::Number) -> Result<Self, Self::Error> {
        let code = number_to_i64(&number).ok_or_else(|| InvalidCellCode(number.to_string()))?;
        Self::try_from(code)
    }
}

impl From<CellState> for u8 {
    fn from(cell: CellState) -> Self {
        cell.code()
    }
}

impl FromStr for CellState {
    type Err = InvalidCellCode;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        let code = trimmed
            .parse::<i64>()
            .map_err(|_| InvalidCellCode(trimmed.to_owned()))?;
        Self::try_from(code)
    }
}

impl fmt::Display for CellState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Empty => "EMPTY",
            Self::Ship => "SHIP",
            Self::Hit => "HIT",
            Self::Miss => "MISS",
        };
        f.write_str(label)
    }
}

// =============================================================================
// GAME STATUS
// =============================================================================

/// Lifecycle phase of a game, as asserted by the server.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameStatus {
    WaitingForPlayer,
    WaitingForShip,
    Active,
    Over,
}

impl GameStatus {
    /// Position in the forward-only phase order.
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::WaitingForPlayer => 0,
            Self::WaitingForShip => 1,
            Self::Active => 2,
            Self::Over => 3,
        }
    }

    /// Wire name of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::WaitingForPlayer => "WAITING_FOR_PLAYER",
            Self::WaitingForShip => "WAITING_FOR_SHIP",
            Self::Active => "ACTIVE",
            Self::Over => "OVER",
        }
    }

    /// Whether moving from `self` to `next` keeps the phase order.
    #[must_use]
    pub const fn can_advance_to(self, next: Self) -> bool {
        next.rank() >= self.rank()
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// MESSAGE KINDS
// =============================================================================

/// Tag of every inbound message kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MessageKind {
    GameState,
    GameUpdate,
    Move,
    GameOver,
    TimeOut,
    SyncTime,
    Error,
    Chat,
}

impl MessageKind {
    pub const ALL: [Self; 8] = [
        Self::GameState,
        Self::GameUpdate,
        Self::Move,
        Self::GameOver,
        Self::TimeOut,
        Self::SyncTime,
        Self::Error,
        Self::Chat,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::GameState => "GAME_STATE",
            Self::GameUpdate => "GAME_UPDATE",
            Self::Move => "MOVE",
            Self::GameOver => "GAME_OVER",
            Self::TimeOut => "TIME_OUT",
            Self::SyncTime => "SYNC_TIME",
            Self::Error => "ERROR",
            Self::Chat => "CHAT",
        }
    }

    /// Look up a kind by its wire tag.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == tag)
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// INBOUND PAYLOADS
// =============================================================================

/// Full authoritative snapshot (`GAME_STATE`).
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStatePayload {
    /// Game identifier, stable across reconnects.
    pub id: String,
    /// The local player's own board, ships visible.
    pub your_board: Grid,
    /// The opponent's board as the server reveals it.
    pub opponent_board: Grid,
    /// Player whose turn it is; absent before the game starts.
    #[serde(default, deserialize_with = "deserialize_identity")]
    pub active_player: Option<String>,
    /// Winning player; absent until the game is over.
    #[serde(default, deserialize_with = "deserialize_identity")]
    pub winner: Option<String>,
    pub status: GameStatus,
    /// Deadline of the current turn or phase, epoch milliseconds.
    #[serde(default, deserialize_with = "deserialize_deadline")]
    pub end_at: Option<i64>,
}

/// Status-only patch (`GAME_UPDATE`).
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct GameUpdatePayload {
    pub status: GameStatus,
}

/// Resolved shot plus turn handoff (`MOVE`).
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovePayload {
    #[serde(deserialize_with = "deserialize_index")]
    pub x: usize,
    #[serde(deserialize_with = "deserialize_index")]
    pub y: usize,
    /// Outcome of the shot; sent as a stringified cell code.
    #[serde(deserialize_with = "deserialize_cell_code")]
    pub result: CellState,
    /// Player who acts next.
    pub next_turn: String,
    /// Player who fired the shot.
    pub by: String,
    #[serde(default, deserialize_with = "deserialize_deadline")]
    pub end_at: Option<i64>,
}

/// Terminal transition (`GAME_OVER`).
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct GameOverPayload {
    #[serde(default, deserialize_with = "deserialize_identity")]
    pub winner: Option<String>,
    /// Optional human-readable reason.
    #[serde(default)]
    pub message: Option<String>,
}

/// Forced turn handoff after a server-side timeout (`TIME_OUT`).
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeOutPayload {
    pub next_turn: String,
    #[serde(default, deserialize_with = "deserialize_deadline")]
    pub end_at: Option<i64>,
}

/// Clock calibration (`SYNC_TIME`).
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncTimePayload {
    /// Server clock at send time, epoch milliseconds.
    #[serde(deserialize_with = "deserialize_i64_from_number")]
    pub server_time: i64,
}

/// Server-reported error (`ERROR`).
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ErrorPayload {
    #[serde(default)]
    pub message: String,
}

/// One decoded inbound frame.
#[derive(Clone, Debug, PartialEq)]
pub enum Inbound {
    GameState(GameStatePayload),
    GameUpdate(GameUpdatePayload),
    Move(MovePayload),
    GameOver(GameOverPayload),
    TimeOut(TimeOutPayload),
    SyncTime(SyncTimePayload),
    Error(ErrorPayload),
    /// Chat is not interpreted here; the payload is passed through untouched.
    Chat(Value),
}

impl Inbound {
    #[must_use]
    pub fn kind(&self) -> MessageKind {
        match self {
            Self::GameState(_) => MessageKind::GameState,
            Self::GameUpdate(_) => MessageKind::GameUpdate,
            Self::Move(_) => MessageKind::Move,
            Self::GameOver(_) => MessageKind::GameOver,
            Self::TimeOut(_) => MessageKind::TimeOut,
            Self::SyncTime(_) => MessageKind::SyncTime,
            Self::Error(_) => MessageKind::Error,
            Self::Chat(_) => MessageKind::Chat,
        }
    }
}

// =============================================================================
// OUTBOUND
// =============================================================================

/// A board coordinate, `x` selecting the row and `y` the column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coord {
    pub x: usize,
    pub y: usize,
}

impl Coord {
    #[must_use]
    pub const fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }

    #[must_use]
    pub const fn in_bounds(self) -> bool {
        self.x < BOARD_SIZE && self.y < BOARD_SIZE
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Messages the client sends to the server.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outbound {
    /// Fleet placement; exactly [`REQUIRED_SHIPS`] cells.
    PlaceShip { ships: Vec<Coord> },
    /// Shot at the opponent board.
    Move(Coord),
}

impl Outbound {
    /// Wire tag, for logging.
    #[must_use]
    pub const fn tag(&self) -> &'static str {
        match self {
            Self::PlaceShip { .. } => "PLACE_SHIP",
            Self::Move(_) => "MOVE",
        }
    }
}

// =============================================================================
// CODEC
// =============================================================================

/// Encode an outbound message as envelope JSON text.
#[must_use]
pub fn encode_outbound(message: &Outbound) -> String {
    // Serializing these plain structs into a String cannot fail; serde_json
    // only errors on non-string map keys or failing custom impls.
    serde_json::to_string(message).unwrap_or_default()
}

/// Decode one inbound frame.
///
/// # Errors
///
/// Returns a [`ProtocolError`] describing the first problem found: not JSON,
/// not an object, missing or unknown `type`, a payload that does not match
/// its kind, or a move that is off the board or not a HIT/MISS.
pub fn decode_inbound(text: &str) -> Result<Inbound, ProtocolError> {
    let value: Value = serde_json::from_str(text).map_err(ProtocolError::Malformed)?;
    let Value::Object(mut envelope) = value else {
        return Err(ProtocolError::NotAnObject);
    };

    let kind = match envelope.get("type") {
        Some(Value::String(tag)) => {
            MessageKind::from_tag(tag).ok_or_else(|| ProtocolError::UnknownType(tag.clone()))?
        }
        _ => return Err(ProtocolError::MissingType),
    };
    let payload = envelope.remove("payload").unwrap_or(Value::Null);

    decode_payload(kind, payload)
}

fn decode_payload(kind: MessageKind, payload: Value) -> Result<Inbound, ProtocolError> {
    let inbound = match kind {
        MessageKind::GameState => Inbound::GameState(parse_payload(kind, payload)?),
        MessageKind::GameUpdate => Inbound::GameUpdate(parse_payload(kind, payload)?),
        MessageKind::Move => {
            let shot: MovePayload = parse_payload(kind, payload)?;
            if !Coord::new(shot.x, shot.y).in_bounds() {
                return Err(ProtocolError::CoordinateOutOfRange { kind, x: shot.x, y: shot.y });
            }
            if !shot.result.is_terminal() {
                return Err(ProtocolError::IllegalMoveResult(shot.result));
            }
            Inbound::Move(shot)
        }
        MessageKind::GameOver => Inbound::GameOver(parse_payload(kind, payload)?),
        MessageKind::TimeOut => Inbound::TimeOut(parse_payload(kind, payload)?),
        MessageKind::SyncTime => Inbound::SyncTime(parse_payload(kind, payload)?),
        MessageKind::Error => Inbound::Error(parse_payload(kind, payload)?),
        MessageKind::Chat => Inbound::Chat(payload),
    };
    Ok(inbound)
}

fn parse_payload<T: DeserializeOwned>(kind: MessageKind, payload: Value) -> Result<T, ProtocolError> {
    serde_json::from_value(payload).map_err(|source| ProtocolError::InvalidPayload { kind, source })
}

// =============================================================================
// FIELD DESERIALIZERS
// =============================================================================

fn number_to_i64(number: &serde_json::Number) -> Option<i64> {
    if let Some(int) = number.as_i64() {
        return Some(int);
    }
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    if let Some(float) = number.as_f64()
        && float.is_finite()
        && float.fract() == 0.0
        && float >= i64::MIN as f64
        && float <= i64::MAX as f64
    {
        return Some(float as i64);
    }
    None
}

fn deserialize_i64_from_number<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Number(number) => {
            number_to_i64(&number).ok_or_else(|| D::Error::custom("expected integer-compatible number"))
        }
        _ => Err(D::Error::custom("expected number")),
    }
}

/// Board index; the range check against the board happens after decoding.
fn deserialize_index<'de, D>(deserializer: D) -> Result<usize, D::Error>
where
    D: Deserializer<'de>,
{
    let index = deserialize_i64_from_number(deserializer)?;
    usize::try_from(index).map_err(|_| D::Error::custom(format!("board index {index} is negative")))
}

/// Missing, `null`, and non-positive deadlines all mean "no deadline".
fn deserialize_deadline<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(number)) => {
            let ms = number_to_i64(&number)
                .ok_or_else(|| D::Error::custom("expected integer epoch-ms deadline"))?;
            Ok((ms > 0).then_some(ms))
        }
        Some(_) => Err(D::Error::custom("expected epoch-ms deadline")),
    }
}

/// The server sends `""` for "nobody".
fn deserialize_identity<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.filter(|id| !id.is_empty()))
}

fn deserialize_cell_code<'de, D>(deserializer: D) -> Result<CellState, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(raw) => raw.parse::<CellState>().map_err(D::Error::custom),
        Value::Number(number) => {
            let code = number_to_i64(&number).ok_or_else(|| D::Error::custom("expected integer cell code"))?;
            CellState::try_from(code).map_err(D::Error::custom)
        }
        _ => Err(D::Error::custom("expected cell code string or integer")),
    }
}

#[cfg(test)]
#[path = "lib_test.rs"]
mod tests;
