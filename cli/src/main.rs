//! Terminal client for Space Striker.
//!
//! Joins a room over websocket, prints both boards whenever the game changes,
//! and reads commands from stdin. Logs go to stderr (`RUST_LOG`), game output
//! to stdout.


use clap::Parser;
use frames::{BOARD_SIZE, CellState, Coord, GameStatus, REQUIRED_SHIPS};
use space_striker::{
    Board, ClientConfig, ConfigError, GameSession, IntentError, JoinError, Notice, Outcome, Placement, RoomIdError,
    RoomSession, SystemClock, Urgency, WsConnector, generate_room_id, new_player_id, progress_percent, validate_player_id,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

const HELP: &str = "commands: fire X Y | place X,Y ... (toggle; bare 'place' submits) | status | join ROOM | leave | quit";

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("invalid player id: {0}")]
    PlayerId(#[from] RoomIdError),
    #[error("could not join room: {0}")]
    Join(#[from] JoinError),
    #[error("stdin read failed: {0}")]
    Stdin(#[from] std::io::Error),
}

#[derive(Parser, Debug)]
#[command(name = "striker-cli", about = "Space Striker terminal client")]
struct Cli {
    /// Websocket endpoint, e.g. ws://localhost:8080/ws
    #[arg(long, env = "STRIKER_SERVER_URL")]
    server_url: Option<String>,

    /// Room code to join; a fresh one is generated when omitted.
    #[arg(long, env = "STRIKER_ROOM")]
    room: Option<String>,

    /// Player id; a random one is generated when omitted.
    #[arg(long, env = "STRIKER_PLAYER")]
    player: Option<String>,
}

// =============================================================================
// COMMANDS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Fire(Coord),
    Place(Vec<Coord>),
    Status,
    Join(String),
    Leave,
    Quit,
    Help,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
enum CommandError {
    #[error("unknown command '{0}'")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
    #[error("bad coordinate '{0}'")]
    BadCoord(String),
}

fn parse_command(line: &str) -> Result<Option<Command>, CommandError> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };
    let args: Vec<&str> = words.collect();

    let command = match verb.to_ascii_lowercase().as_str() {
        "fire" | "f" => match args.as_slice() {
            [x, y] => Command::Fire(Coord::new(parse_index(x)?, parse_index(y)?)),
            [xy] => Command::Fire(parse_coord(xy)?),
            _ => return Err(CommandError::Usage("fire X Y")),
        },
        "place" | "p" => Command::Place(args.iter().map(|raw| parse_coord(raw)).collect::<Result<_, _>>()?),
        "join" | "j" => match args.as_slice() {
            [room] => Command::Join((*room).to_owned()),
            _ => return Err(CommandError::Usage("join ROOM")),
        },
        "status" | "s" => Command::Status,
        "leave" => Command::Leave,
        "quit" | "exit" | "q" => Command::Quit,
        "help" | "?" => Command::Help,
        other => return Err(CommandError::Unknown(other.to_owned())),
    };
    Ok(Some(command))
}

fn parse_coord(raw: &str) -> Result<Coord, CommandError> {
    let (x, y) = raw.split_once(',').ok_or_else(|| CommandError::BadCoord(raw.to_owned()))?;
    Ok(Coord::new(parse_index(x)?, parse_index(y)?))
}

fn parse_index(raw: &str) -> Result<usize, CommandError> {
    raw.trim().parse::<usize>().map_err(|_| CommandError::BadCoord(raw.to_owned()))
}

// =============================================================================
// RENDERING
// =============================================================================

fn cell_glyph(cell: CellState) -> char {
    match cell {
        CellState::Empty => '.',
        CellState::Ship => '#',
        CellState::Hit => 'X',
        CellState::Miss => 'o',
    }
}

fn board_lines(board: &Board) -> Vec<String> {
    board
        .to_grid()
        .iter()
        .enumerate()
        .map(|(x, row)| {
            let cells: Vec<String> = row.iter().map(|cell| cell_glyph(*cell).to_string()).collect();
            format!("{x} {}", cells.join(" "))
        })
        .collect()
}

fn render_session(session: &GameSession, local_player: &str) -> String {
    let turn = match session.active_player.as_deref() {
        None => "-",
        Some(player) if player == local_player => "yours",
        Some(_) => "opponent",
    };
    let mut out = format!("game {} [{}] turn: {turn}\n", session.id, session.status);

    if session.awaiting_opponent() {
        out.push_str("waiting for an opponent to join\n");
        return out;
    }

    let header: String = (0..BOARD_SIZE).map(|y| format!(" {y}")).collect();
    out.push_str("  YOU          ENEMY\n");
    out.push_str(&format!(" {header}    {header}\n"));
    let mine = board_lines(&session.player_board);
    let theirs = board_lines(&session.opponent_board);
    for (left, right) in mine.iter().zip(&theirs) {
        out.push_str(&format!("{left}   {right}\n"));
    }

    if session.in_placement() {
        out.push_str("place your fleet: place X,Y ...\n");
    }
    if session.status == GameStatus::Over {
        let verdict = match session.outcome_for(local_player) {
            Outcome::Victory => "VICTORY",
            Outcome::Defeat => "DEFEAT",
            Outcome::Undecided => "GAME OVER",
        };
        out.push_str(verdict);
        out.push('\n');
    }
    out
}

fn format_countdown(remaining: u64, turn_secs: u64) -> String {
    let filled = usize::from(progress_percent(remaining, turn_secs)) / 10;
    let bar = format!("{}{}", "#".repeat(filled), "-".repeat(10 - filled));
    let mark = match Urgency::for_remaining(remaining) {
        Urgency::Calm => "",
        Urgency::Urgent => " !",
        Urgency::Critical => " !!",
    };
    format!("{remaining:>2}s [{bar}]{mark}")
}

fn describe_placement(placement: &Placement) -> String {
    let cells: Vec<String> = placement.cells().iter().map(|c| format!("{},{}", c.x, c.y)).collect();
    format!("fleet {}/{REQUIRED_SHIPS}: {}", placement.len(), cells.join(" "))
}

/// Toggle `cells` into the pending fleet and submit it once complete.
/// A bare `place` with a full fleet submits as is.
fn place(
    session: &mut RoomSession<WsConnector>,
    placement: &mut Placement,
    cells: &[Coord],
) -> Result<(), IntentError> {
    for cell in cells {
        placement.toggle(*cell)?;
    }
    println!("{}", describe_placement(placement));
    if !placement.can_confirm() {
        if cells.is_empty() {
            println!("pick {} more", placement.remaining());
        }
        return Ok(());
    }
    session.place_ships(&placement.cells())?;
    placement.clear();
    println!("fleet submitted");
    Ok(())
}

fn describe_notice(notice: &Notice) -> String {
    match notice {
        Notice::Connected => "connected".to_owned(),
        Notice::ConnectionLost(e) => format!("connection lost ({e}); use 'join ROOM' to reconnect"),
        Notice::Protocol(e) => format!("ignored bad frame: {e}"),
        Notice::Precondition(e) => format!("ignored early frame: {e}"),
        Notice::Rejected { kind, error } => format!("ignored {kind}: {error}"),
        Notice::ServerError(message) => format!("server: {message}"),
        Notice::Chat(payload) => format!("chat: {payload}"),
        Notice::GameOver { winner, message, .. } => {
            let winner = winner.as_deref().unwrap_or("nobody");
            match message {
                Some(message) => format!("game over, winner {winner}: {message}"),
                None => format!("game over, winner {winner}"),
            }
        }
    }
}

// =============================================================================
// MAIN LOOP
// =============================================================================

fn run_command(session: &mut RoomSession<WsConnector>, placement: &mut Placement, command: Command) {
    let result: Result<(), IntentError> = match command {
        Command::Fire(target) => session.fire(target.x, target.y),
        Command::Place(cells) => place(session, placement, &cells),
        Command::Status => {
            let stats = session.router_stats();
            println!(
                "room {} as {} | {} | frames ok {} / rejected {}",
                session.room_id().unwrap_or("-"),
                session.local_player(),
                session.connection_state().label(),
                stats.routed,
                stats.rejected,
            );
            if let Some(game) = session.session() {
                print!("{}", render_session(game, session.local_player()));
            }
            Ok(())
        }
        Command::Join(room) => {
            placement.clear();
            if let Err(e) = session.join(&room) {
                println!("{e}");
            }
            Ok(())
        }
        Command::Leave => {
            placement.clear();
            session.leave();
            println!("left room");
            Ok(())
        }
        Command::Help => {
            println!("{HELP}");
            Ok(())
        }
        Command::Quit => Ok(()),
    };
    if let Err(e) = result {
        println!("{e}");
    }
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = ClientConfig::from_env()?;
    if let Some(url) = cli.server_url {
        config = config.with_server_url(url)?;
    }
    let player = match cli.player {
        Some(raw) => validate_player_id(&raw)?,
        None => new_player_id(),
    };
    let room = cli.room.unwrap_or_else(generate_room_id);
    let turn_secs = config.turn_secs;

    let (connector, mut events) = WsConnector::channel(&config);
    let mut session = RoomSession::new(config, connector, player);
    session.join(&room)?;
    println!("room {} as {}", session.room_id().unwrap_or("-"), session.local_player());
    println!("{HELP}");

    let timer = session.spawn_turn_timer(SystemClock);
    let mut countdown = timer.subscribe();
    let mut games = session.subscribe_session();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut placement = Placement::new();

    loop {
        tokio::select! {
            Some(event) = events.recv() => {
                if let Some(notice) = session.handle_event(event) {
                    println!("{}", describe_notice(&notice));
                }
            }
            Ok(()) = games.changed() => {
                let game = games.borrow_and_update().clone();
                if let Some(game) = game {
                    print!("{}", render_session(&game, session.local_player()));
                }
            }
            Ok(()) = countdown.changed() => {
                let remaining = *countdown.borrow_and_update();
                if let Some(remaining) = remaining
                    && session.is_my_turn()
                    && Urgency::for_remaining(remaining) != Urgency::Calm
                {
                    println!("{}", format_countdown(remaining, turn_secs));
                }
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                match parse_command(&line) {
                    Ok(None) => {}
                    Ok(Some(Command::Quit)) => break,
                    Ok(Some(command)) => run_command(&mut session, &mut placement, command),
                    Err(e) => println!("{e}"),
                }
            }
        }
    }

    timer.stop();
    session.leave();
    tracing::info!("striker-cli: exiting");
    Ok(())
}
