use super::*;

fn frame(kind: &str, payload: serde_json::Value) -> String {
    serde_json::json!({ "type": kind, "payload": payload }).to_string()
}

fn empty_grid() -> serde_json::Value {
    serde_json::json!([[0, 0, 0, 0, 0], [0, 0, 0, 0, 0], [0, 0, 0, 0, 0], [0, 0, 0, 0, 0], [0, 0, 0, 0, 0]])
}

// =============================================================
// CellState
// =============================================================

#[test]
fn cell_codes_match_wire_values() {
    assert_eq!(CellState::Empty.code(), 0);
    assert_eq!(CellState::Ship.code(), 1);
    assert_eq!(CellState::Hit.code(), 2);
    assert_eq!(CellState::Miss.code(), 3);
}

#[test]
fn only_hit_and_miss_are_terminal() {
    assert!(!CellState::Empty.is_terminal());
    assert!(!CellState::Ship.is_terminal());
    assert!(CellState::Hit.is_terminal());
    assert!(CellState::Miss.is_terminal());
}

#[test]
fn cell_state_parses_stringified_codes() {
    assert_eq!("2".parse::<CellState>().expect("hit"), CellState::Hit);
    assert_eq!(" 3 ".parse::<CellState>().expect("miss"), CellState::Miss);
    assert!("7".parse::<CellState>().is_err());
    assert!("hit".parse::<CellState>().is_err());
}

#[test]
fn cell_state_serializes_as_integer() {
    assert_eq!(serde_json::to_string(&CellState::Miss).expect("json"), "3");
    let cell: CellState = serde_json::from_str("1").expect("ship");
    assert_eq!(cell, CellState::Ship);
    assert!(serde_json::from_str::<CellState>("4").is_err());
}

// =============================================================
// GameStatus
// =============================================================

#[test]
fn game_status_uses_screaming_snake_case() {
    assert_eq!(
        serde_json::to_string(&GameStatus::WaitingForPlayer).expect("json"),
        "\"WAITING_FOR_PLAYER\""
    );
    let status: GameStatus = serde_json::from_str("\"WAITING_FOR_SHIP\"").expect("status");
    assert_eq!(status, GameStatus::WaitingForShip);
}

#[test]
fn game_status_order_is_forward_only() {
    assert!(GameStatus::WaitingForPlayer.can_advance_to(GameStatus::Active));
    assert!(GameStatus::Active.can_advance_to(GameStatus::Active));
    assert!(GameStatus::Active.can_advance_to(GameStatus::Over));
    assert!(!GameStatus::Over.can_advance_to(GameStatus::Active));
    assert!(!GameStatus::WaitingForShip.can_advance_to(GameStatus::WaitingForPlayer));
}

// =============================================================
// MessageKind
// =============================================================

#[test]
fn message_kind_tags_round_trip() {
    for kind in MessageKind::ALL {
        assert_eq!(MessageKind::from_tag(kind.as_str()), Some(kind));
    }
    assert_eq!(MessageKind::from_tag("PLACE_SHIP"), None);
    assert_eq!(MessageKind::from_tag("move"), None);
}

// =============================================================
// decode_inbound: envelope errors
// =============================================================

#[test]
fn decode_rejects_non_json() {
    let err = decode_inbound("{not json").expect_err("should fail");
    assert!(matches!(err, ProtocolError::Malformed(_)));
}

#[test]
fn decode_rejects_non_object() {
    let err = decode_inbound("[1,2,3]").expect_err("should fail");
    assert!(matches!(err, ProtocolError::NotAnObject));
}

#[test]
fn decode_rejects_missing_type() {
    let err = decode_inbound(r#"{"payload":{}}"#).expect_err("should fail");
    assert!(matches!(err, ProtocolError::MissingType));

    let err = decode_inbound(r#"{"type":7,"payload":{}}"#).expect_err("should fail");
    assert!(matches!(err, ProtocolError::MissingType));
}

#[test]
fn decode_rejects_unknown_type() {
    let err = decode_inbound(&frame("TELEPORT", serde_json::json!({}))).expect_err("should fail");
    assert!(matches!(err, ProtocolError::UnknownType(tag) if tag == "TELEPORT"));
}

#[test]
fn decode_reports_kind_for_bad_payload() {
    let err = decode_inbound(&frame("GAME_UPDATE", serde_json::json!({"status": "PAUSED"}))).expect_err("bad");
    assert!(matches!(err, ProtocolError::InvalidPayload { kind: MessageKind::GameUpdate, .. }));

    let err = decode_inbound(r#"{"type":"SYNC_TIME"}"#).expect_err("missing payload");
    assert!(matches!(err, ProtocolError::InvalidPayload { kind: MessageKind::SyncTime, .. }));
}

// =============================================================
// decode_inbound: payloads
// =============================================================

#[test]
fn decode_game_state_snapshot() {
    let text = frame(
        "GAME_STATE",
        serde_json::json!({
            "id": "g-1",
            "yourBoard": [[1, 0, 0, 0, 0], [0, 0, 0, 0, 0], [0, 0, 2, 0, 0], [0, 0, 0, 0, 0], [0, 0, 0, 0, 3]],
            "opponentBoard": empty_grid(),
            "activePlayer": "P1",
            "winner": "",
            "status": "ACTIVE",
            "endAt": 1_700_000_030_000_i64
        }),
    );
    let Inbound::GameState(state) = decode_inbound(&text).expect("decode") else {
        panic!("expected GAME_STATE");
    };
    assert_eq!(state.id, "g-1");
    assert_eq!(state.your_board[0][0], CellState::Ship);
    assert_eq!(state.your_board[2][2], CellState::Hit);
    assert_eq!(state.your_board[4][4], CellState::Miss);
    assert_eq!(state.active_player.as_deref(), Some("P1"));
    assert_eq!(state.winner, None);
    assert_eq!(state.status, GameStatus::Active);
    assert_eq!(state.end_at, Some(1_700_000_030_000));
}

#[test]
fn decode_game_state_accepts_integer_valued_float_cells() {
    let text = frame(
        "GAME_STATE",
        serde_json::json!({
            "id": "g-2",
            "yourBoard": [[1.0, 0.0, 0, 0, 0], [0, 0, 0, 0, 0], [0, 0, 2.0, 0, 0], [0, 0, 0, 0, 0], [0, 0, 0, 0, 3.0]],
            "opponentBoard": empty_grid(),
            "activePlayer": "P1",
            "winner": "",
            "status": "ACTIVE",
            "endAt": 0
        }),
    );
    let Inbound::GameState(state) = decode_inbound(&text).expect("decode") else {
        panic!("expected GAME_STATE");
    };
    assert_eq!(state.your_board[0][0], CellState::Ship);
    assert_eq!(state.your_board[0][1], CellState::Empty);
    assert_eq!(state.your_board[2][2], CellState::Hit);
    assert_eq!(state.your_board[4][4], CellState::Miss);

    let text = frame(
        "GAME_STATE",
        serde_json::json!({
            "id": "g-2",
            "yourBoard": [[0.5, 0, 0, 0, 0], [0, 0, 0, 0, 0], [0, 0, 0, 0, 0], [0, 0, 0, 0, 0], [0, 0, 0, 0, 0]],
            "opponentBoard": empty_grid(),
            "status": "ACTIVE"
        }),
    );
    assert!(matches!(
        decode_inbound(&text).expect_err("fractional cell"),
        ProtocolError::InvalidPayload { kind: MessageKind::GameState, .. }
    ));
}

#[test]
fn decode_game_state_rejects_wrong_board_shape() {
    let text = frame(
        "GAME_STATE",
        serde_json::json!({
            "id": "g-1",
            "yourBoard": [[0, 0, 0], [0, 0, 0]],
            "opponentBoard": empty_grid(),
            "activePlayer": "P1",
            "winner": "",
            "status": "ACTIVE",
            "endAt": 0
        }),
    );
    let err = decode_inbound(&text).expect_err("board too small");
    assert!(matches!(err, ProtocolError::InvalidPayload { kind: MessageKind::GameState, .. }));
}

#[test]
fn decode_treats_zero_or_missing_deadline_as_absent() {
    let text = frame("TIME_OUT", serde_json::json!({"nextTurn": "P2", "endAt": 0}));
    let Inbound::TimeOut(timeout) = decode_inbound(&text).expect("decode") else {
        panic!("expected TIME_OUT");
    };
    assert_eq!(timeout.end_at, None);

    let text = frame("TIME_OUT", serde_json::json!({"nextTurn": "P2"}));
    let Inbound::TimeOut(timeout) = decode_inbound(&text).expect("decode") else {
        panic!("expected TIME_OUT");
    };
    assert_eq!(timeout.end_at, None);
    assert_eq!(timeout.next_turn, "P2");
}

#[test]
fn decode_move_accepts_stringified_and_numeric_result() {
    let text = frame(
        "MOVE",
        serde_json::json!({"x": 2, "y": 3, "result": "2", "nextTurn": "P2", "by": "P1", "endAt": 9999}),
    );
    let Inbound::Move(shot) = decode_inbound(&text).expect("decode") else {
        panic!("expected MOVE");
    };
    assert_eq!((shot.x, shot.y), (2, 3));
    assert_eq!(shot.result, CellState::Hit);
    assert_eq!(shot.by, "P1");
    assert_eq!(shot.end_at, Some(9999));

    let text = frame(
        "MOVE",
        serde_json::json!({"x": 0, "y": 0, "result": 3, "nextTurn": "P1", "by": "P2", "endAt": 10500}),
    );
    let Inbound::Move(shot) = decode_inbound(&text).expect("decode") else {
        panic!("expected MOVE");
    };
    assert_eq!(shot.result, CellState::Miss);
}

#[test]
fn decode_move_rejects_off_board_coordinates() {
    let text = frame(
        "MOVE",
        serde_json::json!({"x": 5, "y": 0, "result": "2", "nextTurn": "P2", "by": "P1", "endAt": 1}),
    );
    let err = decode_inbound(&text).expect_err("off board");
    assert!(matches!(err, ProtocolError::CoordinateOutOfRange { x: 5, y: 0, .. }));

    let text = frame(
        "MOVE",
        serde_json::json!({"x": -1, "y": 0, "result": "2", "nextTurn": "P2", "by": "P1", "endAt": 1}),
    );
    assert!(matches!(
        decode_inbound(&text).expect_err("negative"),
        ProtocolError::InvalidPayload { kind: MessageKind::Move, .. }
    ));
}

#[test]
fn decode_move_accepts_integer_valued_float_coordinates() {
    let text = frame(
        "MOVE",
        serde_json::json!({"x": 2.0, "y": 3.0, "result": 2.0, "nextTurn": "P2", "by": "P1", "endAt": 9999.0}),
    );
    let Inbound::Move(shot) = decode_inbound(&text).expect("decode") else {
        panic!("expected MOVE");
    };
    assert_eq!((shot.x, shot.y), (2, 3));
    assert_eq!(shot.result, CellState::Hit);
    assert_eq!(shot.end_at, Some(9999));

    let text = frame(
        "MOVE",
        serde_json::json!({"x": 2.5, "y": 3, "result": "2", "nextTurn": "P2", "by": "P1", "endAt": 1}),
    );
    assert!(matches!(
        decode_inbound(&text).expect_err("fractional"),
        ProtocolError::InvalidPayload { kind: MessageKind::Move, .. }
    ));

    let text = frame(
        "MOVE",
        serde_json::json!({"x": 7.0, "y": 0, "result": "2", "nextTurn": "P2", "by": "P1", "endAt": 1}),
    );
    assert!(matches!(
        decode_inbound(&text).expect_err("off board"),
        ProtocolError::CoordinateOutOfRange { x: 7, y: 0, .. }
    ));
}

#[test]
fn decode_move_rejects_non_terminal_result() {
    let text = frame(
        "MOVE",
        serde_json::json!({"x": 1, "y": 1, "result": "1", "nextTurn": "P2", "by": "P1", "endAt": 1}),
    );
    let err = decode_inbound(&text).expect_err("ship is not a shot result");
    assert!(matches!(err, ProtocolError::IllegalMoveResult(CellState::Ship)));
}

#[test]
fn decode_sync_time_accepts_integer_valued_float() {
    let text = frame("SYNC_TIME", serde_json::json!({"serverTime": 1_000_000.0}));
    let Inbound::SyncTime(sync) = decode_inbound(&text).expect("decode") else {
        panic!("expected SYNC_TIME");
    };
    assert_eq!(sync.server_time, 1_000_000);
}

#[test]
fn decode_game_over_and_error_and_chat() {
    let Inbound::GameOver(over) =
        decode_inbound(&frame("GAME_OVER", serde_json::json!({"winner": "P1"}))).expect("decode")
    else {
        panic!("expected GAME_OVER");
    };
    assert_eq!(over.winner.as_deref(), Some("P1"));

    let Inbound::Error(error) =
        decode_inbound(&frame("ERROR", serde_json::json!({"message": "not your turn"}))).expect("decode")
    else {
        panic!("expected ERROR");
    };
    assert_eq!(error.message, "not your turn");

    let chat = decode_inbound(&frame("CHAT", serde_json::json!({"sender": "P2", "message": "gg"}))).expect("decode");
    assert_eq!(chat.kind(), MessageKind::Chat);
    assert_eq!(chat, Inbound::Chat(serde_json::json!({"sender": "P2", "message": "gg"})));
}

// =============================================================
// encode_outbound
// =============================================================

#[test]
fn encode_move_uses_envelope_shape() {
    let text = encode_outbound(&Outbound::Move(Coord::new(1, 4)));
    let value: serde_json::Value = serde_json::from_str(&text).expect("json");
    assert_eq!(value, serde_json::json!({"type": "MOVE", "payload": {"x": 1, "y": 4}}));
}

#[test]
fn encode_place_ship_lists_all_cells() {
    let ships = vec![Coord::new(0, 0), Coord::new(0, 1), Coord::new(2, 2), Coord::new(3, 4), Coord::new(4, 4)];
    let message = Outbound::PlaceShip { ships };
    assert_eq!(message.tag(), "PLACE_SHIP");
    let value: serde_json::Value = serde_json::from_str(&encode_outbound(&message)).expect("json");
    assert_eq!(value["type"], "PLACE_SHIP");
    assert_eq!(value["payload"]["ships"].as_array().map(Vec::len), Some(REQUIRED_SHIPS));
    assert_eq!(value["payload"]["ships"][3], serde_json::json!({"x": 3, "y": 4}));
}
