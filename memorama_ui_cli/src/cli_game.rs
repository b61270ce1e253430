use std::{
    io::{self, BufRead, Write},
    str::FromStr,
    time::Instant,
};

use itertools::Itertools;
use log::warn;
use strum::IntoEnumIterator;

use memorama_core::{
    card::CardId,
    console::{board_lines, CardStyle},
    difficulty::Difficulty,
    game::{FlipOutcome, FlipSource, MemoryGame, Resolution},
    save::{SaveFormat, SavedGame},
};

use crate::store::{SaveEntry, SaveStore};

static RULES: &str = "
*** Memorama ***
Find all the matching pairs by flipping two cards per move. Consecutive
matches double the points (100, 200, 400 and so on); a miss flips both cards
back and resets the streak. The game is stored automatically after every
move, so an unfinished board is picked up again on the next start. Finished
or paused games can also be saved under a name in JSON, XML or plain text
and loaded back from the history.";

#[derive(Debug, PartialEq)]
enum CliAction {
    Quit,
    Rules,
    Board,
    Flip(CardId),
    Save,
    History,
    New(Difficulty),
    Style(CardStyle),
}

#[derive(Debug, PartialEq, Eq)]
struct ParseActionError;

impl FromStr for CliAction {
    type Err = ParseActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut words = s.split_whitespace();
        match words.next() {
            Some("q") | Some("quit") => Ok(CliAction::Quit),
            Some("r") | Some("rules") | Some("help") => Ok(CliAction::Rules),
            Some("b") | Some("board") => Ok(CliAction::Board),
            Some("save") => Ok(CliAction::Save),
            Some("history") => Ok(CliAction::History),
            Some("new") => words
                .next()
                .and_then(|word| Difficulty::from_str(word).ok())
                .map(CliAction::New)
                .ok_or(ParseActionError),
            Some("style") => words
                .next()
                .and_then(|word| CardStyle::from_str(word).ok())
                .map(CliAction::Style)
                .ok_or(ParseActionError),
            Some(word) => usize::from_str(word)
                .map(CliAction::Flip)
                .map_err(|_| ParseActionError),
            None => Err(ParseActionError),
        }
    }
}

pub struct CliGame {
    store: SaveStore,
    game: MemoryGame,
    style: CardStyle,
    /// Seconds carried over from a loaded save.
    elapsed_base: u64,
    started: Instant,
    /// Name and format the running game was loaded from or saved to, reused
    /// on the next save instead of prompting again.
    save_slot: Option<(String, SaveFormat)>,
}

impl CliGame {
    pub fn new(store: SaveStore) -> Self {
        let style = store.card_style();
        let resumed = store
            .take_autosave()
            .filter(|saved| !saved.game_completed)
            .map(SavedGame::into_game);
        let (game, elapsed_base) = match resumed {
            Some((game, elapsed)) => {
                println!("Resumed your unfinished game.");
                (game, elapsed)
            }
            None => (
                MemoryGame::new_solo(Difficulty::default(), &mut rand::thread_rng()),
                0,
            ),
        };
        CliGame {
            store,
            game,
            style,
            elapsed_base,
            started: Instant::now(),
            save_slot: None,
        }
    }

    pub fn run(&mut self) {
        println!("{RULES}");
        self.print_board();
        loop {
            match self.prompt() {
                CliAction::Quit => break,
                CliAction::Rules => {
                    println!("{RULES}");
                    print_commands();
                }
                CliAction::Board => self.print_board(),
                CliAction::Flip(id) => self.flip(id),
                CliAction::Save => self.save_dialog(),
                CliAction::History => self.history_dialog(),
                CliAction::New(difficulty) => self.new_game(difficulty),
                CliAction::Style(style) => {
                    self.style = style;
                    if let Err(e) = self.store.set_card_style(style) {
                        warn!("cannot persist the card style: {e}");
                    }
                    self.print_board();
                }
            }
        }
    }

    fn prompt(&self) -> CliAction {
        loop {
            print!("> ");
            io::stdout().flush().ok();
            let Some(Ok(line)) = io::stdin().lock().lines().next() else {
                return CliAction::Quit;
            };
            match CliAction::from_str(line.trim()) {
                Ok(action) => return action,
                Err(_) => print_commands(),
            }
        }
    }

    fn flip(&mut self, id: CardId) {
        match self.game.flip(id, FlipSource::Local) {
            // a tap on a dead card is ignored, not an error
            FlipOutcome::Rejected => {}
            FlipOutcome::Flipped(_) => self.print_board(),
            FlipOutcome::PairChosen(..) => {
                // show the second card before the verdict; the reveal pause
                // is purely cosmetic and the terminal needs none
                self.print_board();
                match self.game.resolve() {
                    Some(Resolution::Match {
                        card1,
                        card2,
                        points,
                        completed,
                    }) => {
                        println!(
                            "Match! {card1} and {card2} earn {points} points (streak x{}).",
                            self.game.local_score().streak()
                        );
                        if completed {
                            self.finish();
                        } else {
                            self.autosave();
                            self.print_board();
                        }
                    }
                    Some(Resolution::Mismatch { card1, card2, .. }) => {
                        println!("No match: {card1} and {card2} flip back.");
                        self.autosave();
                        self.print_board();
                    }
                    None => {}
                }
            }
        }
    }

    fn finish(&mut self) {
        // freeze the clock at the winning move
        self.elapsed_base += self.started.elapsed().as_secs();
        self.started = Instant::now();
        println!(
            "You cleared the board! Final score {} in {} moves, {}.",
            self.game.local_score().points(),
            self.game.moves(),
            format_time(self.elapsed_seconds())
        );
        self.store.clear_autosave();
        println!("Type 'save' to keep this game in the history, or 'new <difficulty>' to play again.");
    }

    fn save_dialog(&mut self) {
        let slot = match self.save_slot.clone() {
            Some(slot) => Some(slot),
            None => {
                let existing = self.store.save_names();
                if !existing.is_empty() {
                    println!("Existing saves: {}", existing.iter().join(", "));
                }
                self.read_line("Save name (empty cancels): ")
                    .map(|name| (name, self.read_format()))
            }
        };
        let Some((name, format)) = slot else { return };
        match self.store.save(&name, format, &self.snapshot()) {
            Ok(()) => {
                println!("Saved {}.{}", name, format.extension());
                self.save_slot = Some((name, format));
            }
            Err(e) => println!("Save failed: {e}"),
        }
    }

    fn history_dialog(&mut self) {
        let mut entries = self.store.entries(Some(self.game.difficulty()));
        if entries.is_empty() {
            println!("No saved {} games yet.", self.game.difficulty());
            return;
        }
        for (i, entry) in entries.iter().enumerate() {
            println!(
                "[{}] {}.{} — {} — {}/{} pairs, score {}",
                i,
                entry.name,
                entry.format.extension(),
                entry.modified.format("%Y-%m-%d %H:%M"),
                entry.state.matched_pairs,
                entry.state.difficulty.pairs(),
                entry.state.score
            );
        }
        let Some(choice) = self.read_line("Load which one? (empty cancels): ") else {
            return;
        };
        match choice.parse::<usize>() {
            Ok(i) if i < entries.len() => self.load(entries.swap_remove(i)),
            _ => println!("No such entry."),
        }
    }

    fn load(&mut self, entry: SaveEntry) {
        let (game, elapsed) = entry.state.into_game();
        self.game = game;
        self.elapsed_base = elapsed;
        self.started = Instant::now();
        self.save_slot = Some((entry.name, entry.format));
        println!("Loaded.");
        self.print_board();
    }

    fn new_game(&mut self, difficulty: Difficulty) {
        self.game = MemoryGame::new_solo(difficulty, &mut rand::thread_rng());
        self.elapsed_base = 0;
        self.started = Instant::now();
        self.save_slot = None;
        self.store.clear_autosave();
        println!("New {difficulty} game.");
        self.print_board();
    }

    fn snapshot(&self) -> SavedGame {
        SavedGame::capture(&self.game, self.elapsed_seconds())
    }

    fn elapsed_seconds(&self) -> u64 {
        if self.game.completed() {
            return self.elapsed_base;
        }
        self.elapsed_base + self.started.elapsed().as_secs()
    }

    fn autosave(&self) {
        if let Err(e) = self.store.autosave(&self.snapshot()) {
            warn!("autosave failed: {e}");
        }
    }

    fn print_board(&self) {
        println!();
        for line in board_lines(
            self.game.board(),
            self.game.difficulty().columns(),
            self.style,
        ) {
            println!("{line}");
        }
        println!(
            "Progress: {}/{} pairs | Moves: {} | Score: {} (streak x{}) | Time {}",
            self.game.matched_pairs(),
            self.game.difficulty().pairs(),
            self.game.moves(),
            self.game.local_score().points(),
            self.game.local_score().streak(),
            format_time(self.elapsed_seconds())
        );
    }

    fn read_line(&self, prompt: &str) -> Option<String> {
        print!("{prompt}");
        io::stdout().flush().ok();
        let line = io::stdin().lock().lines().next()?.ok()?;
        let line = line.trim().to_string();
        if line.is_empty() {
            None
        } else {
            Some(line)
        }
    }

    fn read_format(&self) -> SaveFormat {
        let options = SaveFormat::iter().join("/");
        loop {
            let Some(line) = self.read_line(&format!("Format [{options}] (default json): "))
            else {
                return SaveFormat::Json;
            };
            match SaveFormat::from_str(&line) {
                Ok(format) => return format,
                Err(_) => println!("Unknown format."),
            }
        }
    }
}

fn format_time(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

fn print_commands() {
    println!(
        "Commands: <card id>, board, save, history, new <easy|medium|hard>, \
         style <numbers|letters>, rules, quit"
    );
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::{format_time, CliAction};
    use memorama_core::{console::CardStyle, difficulty::Difficulty};

    #[test]
    fn parses_the_command_vocabulary() {
        assert_eq!(CliAction::from_str("q"), Ok(CliAction::Quit));
        assert_eq!(CliAction::from_str("7"), Ok(CliAction::Flip(7)));
        assert_eq!(
            CliAction::from_str("new hard"),
            Ok(CliAction::New(Difficulty::Hard))
        );
        assert_eq!(
            CliAction::from_str("style letters"),
            Ok(CliAction::Style(CardStyle::Letters))
        );
        assert!(CliAction::from_str("flip everything").is_err());
        assert!(CliAction::from_str("new").is_err());
    }

    #[test]
    fn minutes_and_seconds_are_zero_padded() {
        assert_eq!(format_time(65), "01:05");
        assert_eq!(format_time(0), "00:00");
    }
}
