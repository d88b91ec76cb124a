use super::*;

fn target(room: &str, player: &str) -> ConnectTarget {
    ConnectTarget { room_id: room.to_owned(), player_id: player.to_owned() }
}

#[test]
fn defaults_match_reference_server() {
    let config = ClientConfig::default();
    assert_eq!(config.server_url, "ws://localhost:8080/ws");
    assert_eq!(config.countdown_poll, Duration::from_millis(200));
    assert_eq!(config.turn_secs, 30);
}

#[test]
fn with_server_url_accepts_ws_and_wss() {
    let config = ClientConfig::default().with_server_url("wss://example.test/ws/").expect("wss");
    assert_eq!(config.server_url, "wss://example.test/ws");

    let config = ClientConfig::default().with_server_url(" ws://127.0.0.1:9000/ws ").expect("ws");
    assert_eq!(config.server_url, "ws://127.0.0.1:9000/ws");
}

#[test]
fn with_server_url_rejects_http() {
    let err = ClientConfig::default()
        .with_server_url("http://example.test/ws")
        .expect_err("http is not a websocket scheme");
    assert!(matches!(err, ConfigError::InvalidServerUrl(url) if url == "http://example.test/ws"));
}

#[test]
fn connect_url_carries_room_and_player() {
    let config = ClientConfig::default();
    assert_eq!(
        config.connect_url(&target("ABC123", "p-1")),
        "ws://localhost:8080/ws?roomID=ABC123&playerID=p-1"
    );
}

#[test]
fn connect_url_appends_to_existing_query() {
    let config = ClientConfig::default().with_server_url("ws://host/ws?v=2").expect("url");
    assert_eq!(config.connect_url(&target("R", "P")), "ws://host/ws?v=2&roomID=R&playerID=P");
}

#[test]
fn poll_interval_is_clamped_sub_second() {
    assert_eq!(clamp_poll_ms(0), 10);
    assert_eq!(clamp_poll_ms(200), 200);
    assert_eq!(clamp_poll_ms(5_000), 999);
}

#[test]
fn env_parse_falls_back_on_missing_key() {
    assert_eq!(env_parse("STRIKER_TEST_KEY_THAT_IS_NEVER_SET", 42_u64), 42);
}
