use super::*;

#[test]
fn generated_room_ids_are_six_uppercase_base36_chars() {
    for _ in 0..50 {
        let id = generate_room_id();
        assert_eq!(id.len(), 6);
        assert!(id.chars().all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()), "bad id {id}");
    }
}

#[test]
fn normalize_trims_and_uppercases() {
    assert_eq!(normalize_room_id("  abc12x \n").expect("valid"), "ABC12X");
}

#[test]
fn normalize_rejects_blank_input() {
    assert_eq!(normalize_room_id("   "), Err(RoomIdError::Empty));
}

#[test]
fn normalize_rejects_url_unsafe_characters() {
    assert_eq!(normalize_room_id("ab&c"), Err(RoomIdError::InvalidChar('&')));
    assert_eq!(normalize_room_id("a b"), Err(RoomIdError::InvalidChar(' ')));
}

#[test]
fn player_ids_keep_case_and_accept_uuids() {
    let id = new_player_id();
    assert_eq!(validate_player_id(&id).expect("uuid is valid"), id);
    assert_eq!(validate_player_id(" Pilot_7 ").expect("valid"), "Pilot_7");
    assert_eq!(validate_player_id("p?1"), Err(RoomIdError::InvalidChar('?')));
}

#[test]
fn new_player_ids_are_unique() {
    assert_ne!(new_player_id(), new_player_id());
}
