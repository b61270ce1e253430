use std::{
    pin::Pin,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use log::{debug, warn};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    time::{sleep, Sleep},
};

use memorama_core::{
    console::{board_lines, CardStyle},
    game::{FlipOutcome, FlipSource, MemoryGame, Resolution, Seat},
    message::PeerMessage,
    Difficulty,
};

use crate::net::{Connection, NetError};

/// Pause between the second flip and the verdict so both players see the
/// pair before it settles. Cosmetic only; protocol correctness does not
/// depend on it.
const REVEAL_DELAY: Duration = Duration::from_secs(1);

type RevealTimer = Option<Pin<Box<Sleep>>>;

pub async fn host(port: u16, difficulty: Difficulty) -> Result<(), NetError> {
    println!("Waiting for an opponent on port {port}...");
    let mut conn = Connection::listen(port).await?;

    let game = MemoryGame::new_hosted(difficulty, &mut rand::thread_rng());
    let seed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0);
    conn.send(&PeerMessage::StartGame {
        difficulty,
        seed,
        card_values: game.board().values(),
    })
    .await?;
    println!("Opponent connected. Board dealt: {difficulty}. You move first.");

    run(conn, Some(game)).await
}

pub async fn join(addr: &str) -> Result<(), NetError> {
    println!("Joining {addr}...");
    let conn = Connection::dial(addr).await?;
    println!("Connected. Waiting for the host to deal...");
    run(conn, None).await
}

async fn run(mut conn: Connection, mut game: Option<MemoryGame>) -> Result<(), NetError> {
    let mut input = BufReader::new(tokio::io::stdin()).lines();
    let mut reveal: RevealTimer = None;

    if let Some(game) = &game {
        print_board(game);
        print_turn(game);
    }
    print_help();

    loop {
        tokio::select! {
            msg = conn.recv() => {
                match msg? {
                    Some(msg) => {
                        if handle_message(&mut game, &mut reveal, msg) {
                            break;
                        }
                    }
                    None => {
                        println!("Connection closed by the other side.");
                        break;
                    }
                }
            }
            line = input.next_line() => {
                let Ok(Some(line)) = line else { break };
                if handle_command(&mut conn, &mut game, &mut reveal, line.trim()).await? {
                    break;
                }
            }
            _ = tick(&mut reveal), if reveal.is_some() => {
                reveal = None;
                if let Some(game) = &mut game {
                    if settle(&mut conn, game).await? {
                        break;
                    }
                }
            }
        }
    }
    Ok(())
}

async fn tick(timer: &mut RevealTimer) {
    match timer {
        Some(sleep) => sleep.as_mut().await,
        None => std::future::pending::<()>().await,
    }
}

/// Apply one inbound message. Returns true once the match is over.
fn handle_message(
    game: &mut Option<MemoryGame>,
    reveal: &mut RevealTimer,
    msg: PeerMessage,
) -> bool {
    match msg {
        PeerMessage::StartGame {
            difficulty,
            seed,
            card_values,
        } => {
            debug!("StartGame received (seed {seed})");
            match MemoryGame::join(difficulty, &card_values) {
                Ok(fresh) => {
                    println!("Board dealt: {difficulty}. The host moves first.");
                    *reveal = None;
                    print_board(&fresh);
                    *game = Some(fresh);
                }
                Err(e) => warn!("dropping StartGame: {e}"),
            }
        }
        PeerMessage::FlipCard { card_id } => {
            let Some(game) = game else {
                warn!("dropping FlipCard before StartGame");
                return false;
            };
            match game.flip(card_id, FlipSource::Remote) {
                FlipOutcome::Rejected => debug!("remote flip of {card_id} ignored"),
                _ => print_board(game),
            }
        }
        PeerMessage::MatchFound {
            card1_id,
            card2_id,
            scorer_is_host,
            points,
        } => {
            let Some(game) = game else {
                warn!("dropping MatchFound before StartGame");
                return false;
            };
            if let Err(e) = game.apply_match_found(card1_id, card2_id, scorer_is_host, points) {
                warn!("dropping MatchFound: {e}");
                return false;
            }
            println!("Opponent matched {card1_id} and {card2_id} (+{points}).");
            print_board(game);
            print_score(game);
            if game.completed() {
                print_final(game);
                return true;
            }
            print_turn(game);
        }
        PeerMessage::TurnChange { next_turn_is_host } => {
            let Some(game) = game else {
                warn!("dropping TurnChange before StartGame");
                return false;
            };
            game.apply_turn_change(next_turn_is_host);
            println!("Opponent missed.");
            print_board(game);
            print_turn(game);
        }
    }
    false
}

/// One line of player input. Returns true when the player quits.
async fn handle_command(
    conn: &mut Connection,
    game: &mut Option<MemoryGame>,
    reveal: &mut RevealTimer,
    line: &str,
) -> Result<bool, NetError> {
    match line {
        "" => {}
        "q" | "quit" => return Ok(true),
        "b" | "board" => {
            if let Some(game) = game {
                print_board(game);
            }
        }
        "s" | "score" => {
            if let Some(game) = game {
                print_score(game);
            }
        }
        "h" | "help" => print_help(),
        _ => match line.parse::<usize>() {
            Ok(id) => {
                let Some(game) = game else {
                    println!("Still waiting for the host to deal.");
                    return Ok(false);
                };
                match game.flip(id, FlipSource::Local) {
                    FlipOutcome::Rejected => debug!("flip {id} ignored"),
                    FlipOutcome::Flipped(_) => {
                        conn.send(&PeerMessage::FlipCard { card_id: id }).await?;
                        print_board(game);
                    }
                    FlipOutcome::PairChosen(..) => {
                        conn.send(&PeerMessage::FlipCard { card_id: id }).await?;
                        print_board(game);
                        *reveal = Some(Box::pin(sleep(REVEAL_DELAY)));
                    }
                }
            }
            Err(_) => println!("Unknown command, try 'help'."),
        },
    }
    Ok(false)
}

/// The acting side settles its pair once the reveal pause elapses, and
/// reports the verdict to the mirror side.
async fn settle(conn: &mut Connection, game: &mut MemoryGame) -> Result<bool, NetError> {
    let Some(resolution) = game.resolve() else {
        return Ok(false);
    };
    match resolution {
        Resolution::Match {
            card1,
            card2,
            points,
            completed,
        } => {
            let scorer_is_host = game.seat().map(Seat::is_host).unwrap_or(true);
            conn.send(&PeerMessage::MatchFound {
                card1_id: card1,
                card2_id: card2,
                scorer_is_host,
                points,
            })
            .await?;
            println!("Match! {card1} and {card2} earn {points} points. Keep going.");
            print_board(game);
            print_score(game);
            if completed {
                print_final(game);
                return Ok(true);
            }
        }
        Resolution::Mismatch {
            card1,
            card2,
            next_turn_is_host,
        } => {
            if let Some(next_turn_is_host) = next_turn_is_host {
                conn.send(&PeerMessage::TurnChange { next_turn_is_host })
                    .await?;
            }
            println!("No match: {card1} and {card2} flip back.");
            print_board(game);
            print_turn(game);
        }
    }
    Ok(false)
}

fn print_board(game: &MemoryGame) {
    println!();
    for line in board_lines(game.board(), game.difficulty().columns(), CardStyle::Numbers) {
        println!("{line}");
    }
    println!(
        "Pairs: {}/{}  Moves: {}",
        game.matched_pairs(),
        game.difficulty().pairs(),
        game.moves()
    );
}

fn print_score(game: &MemoryGame) {
    println!(
        "You: {} points ({} pairs)  Opponent: {} points ({} pairs)",
        game.local_score().points(),
        game.local_score().pairs_won(),
        game.remote_score().points(),
        game.remote_score().pairs_won()
    );
}

fn print_turn(game: &MemoryGame) {
    if game.is_my_turn() {
        println!("Your turn. Flip a card by id.");
    } else {
        println!("Opponent's turn.");
    }
}

fn print_final(game: &MemoryGame) {
    println!("All pairs found!");
    print_score(game);
    match (game.leading_seat(), game.seat()) {
        (None, _) => println!("It's a tie."),
        (Some(leader), Some(me)) if leader == me => println!("You win!"),
        _ => println!("Your opponent wins."),
    }
}

fn print_help() {
    println!("Commands: <card id> to flip, board, score, help, quit");
}
