use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use frames::{BOARD_SIZE, CellState, GameStatePayload, GameStatus};

use super::*;

// =============================================================================
// PURE DERIVATION
// =============================================================================

#[test]
fn no_deadline_means_no_countdown() {
    assert_eq!(remaining_secs(None, 1_000, 0), None);
}

#[test]
fn remaining_rounds_up_partial_seconds() {
    assert_eq!(remaining_secs(Some(10_000), 7_500, 0), Some(3));
    assert_eq!(remaining_secs(Some(10_000), 9_999, 0), Some(1));
    assert_eq!(remaining_secs(Some(10_000), 7_000, 0), Some(3));
}

#[test]
fn remaining_clamps_to_zero() {
    assert_eq!(remaining_secs(Some(10_000), 10_000, 0), Some(0));
    assert_eq!(remaining_secs(Some(10_000), 50_000, 0), Some(0));
}

#[test]
fn remaining_applies_offset() {
    // Server runs 2s ahead: local 5_000 is server 7_000.
    assert_eq!(remaining_secs(Some(10_000), 5_000, 2_000), Some(3));
    assert_eq!(remaining_secs(Some(10_000), 5_000, -2_000), Some(7));
}

#[test]
fn urgency_thresholds() {
    assert_eq!(Urgency::for_remaining(30), Urgency::Calm);
    assert_eq!(Urgency::for_remaining(6), Urgency::Calm);
    assert_eq!(Urgency::for_remaining(5), Urgency::Urgent);
    assert_eq!(Urgency::for_remaining(4), Urgency::Urgent);
    assert_eq!(Urgency::for_remaining(3), Urgency::Critical);
    assert_eq!(Urgency::for_remaining(0), Urgency::Critical);
}

#[test]
fn progress_is_capped() {
    assert_eq!(progress_percent(15, 30), 50);
    assert_eq!(progress_percent(45, 30), 100);
    assert_eq!(progress_percent(0, 30), 0);
    assert_eq!(progress_percent(10, 0), 0);
}

// =============================================================================
// POLLING TASK
// =============================================================================

#[derive(Clone)]
struct FakeClock(Arc<AtomicI64>);

impl Clock for FakeClock {
    fn now_ms(&self) -> i64 {
        self.0.load(Ordering::SeqCst)
    }
}

fn session_ending_at(end_at: Option<i64>) -> GameSession {
    GameSession::from_snapshot(GameStatePayload {
        id: "g".to_owned(),
        your_board: [[CellState::Empty; BOARD_SIZE]; BOARD_SIZE],
        opponent_board: [[CellState::Empty; BOARD_SIZE]; BOARD_SIZE],
        active_player: Some("P1".to_owned()),
        winner: None,
        status: GameStatus::Active,
        end_at,
    })
}

const PERIOD: Duration = Duration::from_millis(200);

#[tokio::test(start_paused = true)]
async fn timer_tracks_clock_and_offset() {
    let now = Arc::new(AtomicI64::new(7_500));
    let (session_tx, session_rx) = watch::channel(Some(session_ending_at(Some(10_000))));
    let (offset_tx, offset_rx) = watch::channel(0_i64);

    let timer = TurnTimer::spawn(session_rx, offset_rx, FakeClock(Arc::clone(&now)), PERIOD);
    // Land between ticks so each later sleep spans exactly one tick.
    tokio::time::sleep(PERIOD / 2).await;
    assert_eq!(timer.current(), Some(3));

    now.store(9_999, Ordering::SeqCst);
    tokio::time::sleep(PERIOD).await;
    assert_eq!(timer.current(), Some(1));

    offset_tx.send_replace(5_000);
    tokio::time::sleep(PERIOD).await;
    assert_eq!(timer.current(), Some(0));

    drop(session_tx);
}

#[tokio::test(start_paused = true)]
async fn timer_reports_none_without_deadline() {
    let (session_tx, session_rx) = watch::channel(Some(session_ending_at(Some(10_000))));
    let (_offset_tx, offset_rx) = watch::channel(0_i64);
    let clock = FakeClock(Arc::new(AtomicI64::new(0)));

    let timer = TurnTimer::spawn(session_rx, offset_rx, clock, PERIOD);
    tokio::time::sleep(PERIOD / 2).await;
    assert_eq!(timer.current(), Some(10));

    session_tx.send_replace(Some(session_ending_at(None)));
    tokio::time::sleep(PERIOD).await;
    assert_eq!(timer.current(), None);

    session_tx.send_replace(None);
    tokio::time::sleep(PERIOD).await;
    assert_eq!(timer.current(), None);
}

#[tokio::test(start_paused = true)]
async fn subscribers_only_wake_on_change() {
    let (_session_tx, session_rx) = watch::channel(Some(session_ending_at(Some(60_000))));
    let (_offset_tx, offset_rx) = watch::channel(0_i64);
    let clock = FakeClock(Arc::new(AtomicI64::new(0)));

    let timer = TurnTimer::spawn(session_rx, offset_rx, clock, PERIOD);
    let mut rx = timer.subscribe();
    rx.changed().await.expect("first value");
    assert_eq!(*rx.borrow_and_update(), Some(60));

    tokio::time::sleep(PERIOD * 5).await;
    assert!(!rx.has_changed().expect("timer alive"));
}

#[tokio::test(start_paused = true)]
async fn stop_ends_the_task() {
    let (_session_tx, session_rx) = watch::channel(None);
    let (_offset_tx, offset_rx) = watch::channel(0_i64);
    let clock = FakeClock(Arc::new(AtomicI64::new(0)));

    let timer = TurnTimer::spawn(session_rx, offset_rx, clock, PERIOD);
    let rx = timer.subscribe();
    timer.stop();
    tokio::time::sleep(PERIOD).await;
    drop(timer);
    assert!(rx.has_changed().is_err());
}
