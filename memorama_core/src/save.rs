use std::{collections::HashMap, str::FromStr};

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};
use thiserror::Error;
use xmlwriter::{Options, XmlWriter};

use crate::{
    board::Board,
    card::Card,
    difficulty::Difficulty,
    game::{MemoryGame, Move},
    score::ScoreSheet,
};

/// The three interchangeable save encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum SaveFormat {
    Json,
    Xml,
    Txt,
}

impl SaveFormat {
    pub fn extension(self) -> &'static str {
        match self {
            SaveFormat::Json => "json",
            SaveFormat::Xml => "xml",
            SaveFormat::Txt => "txt",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        Self::from_str(ext).ok()
    }
}

#[derive(Error, Debug)]
pub enum SaveError {
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("xml: {0}")]
    Xml(#[from] roxmltree::Error),
    #[error("save data is missing the {0} field")]
    MissingField(&'static str),
    #[error("cannot parse the {field} field from {value:?}")]
    BadField { field: &'static str, value: String },
}

/// Snapshot of a single-player game, field for field what the save files
/// carry in all three formats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedGame {
    pub difficulty: Difficulty,
    pub moves: usize,
    pub matched_pairs: usize,
    pub score: u64,
    pub match_streak: u32,
    pub elapsed_time_in_seconds: u64,
    pub game_completed: bool,
    pub cards: Vec<Card>,
    pub move_history: Vec<Move>,
}

impl SavedGame {
    pub fn capture(game: &MemoryGame, elapsed_time_in_seconds: u64) -> Self {
        SavedGame {
            difficulty: game.difficulty(),
            moves: game.moves(),
            matched_pairs: game.matched_pairs(),
            score: game.local_score().points(),
            match_streak: game.local_score().streak(),
            elapsed_time_in_seconds,
            game_completed: game.completed(),
            cards: game.board().cards().to_vec(),
            move_history: game.move_history().to_vec(),
        }
    }

    /// Rebuild the engine state and the elapsed-seconds base. A selection
    /// that was face-up mid-save flips back down so the loaded game starts
    /// from a clean `Idle` window.
    pub fn into_game(self) -> (MemoryGame, u64) {
        let elapsed = self.elapsed_time_in_seconds;
        let mut cards = self.cards;
        for card in &mut cards {
            if card.is_face_up && !card.is_matched {
                card.is_face_up = false;
            }
        }
        let sheet = ScoreSheet::restore(self.score, self.match_streak, self.matched_pairs);
        let game = MemoryGame::restore_solo(
            self.difficulty,
            Board::from_cards(cards),
            self.moves,
            self.matched_pairs,
            self.move_history,
            sheet,
            self.game_completed,
        );
        (game, elapsed)
    }

    pub fn to_string(&self, format: SaveFormat) -> Result<String, SaveError> {
        match format {
            SaveFormat::Json => Ok(serde_json::to_string(self)?),
            SaveFormat::Xml => Ok(to_xml(self)),
            SaveFormat::Txt => Ok(to_txt(self)),
        }
    }

    pub fn from_str(data: &str, format: SaveFormat) -> Result<Self, SaveError> {
        match format {
            SaveFormat::Json => Ok(serde_json::from_str(data)?),
            SaveFormat::Xml => from_xml(data),
            SaveFormat::Txt => from_txt(data),
        }
    }
}

// --- XML ---------------------------------------------------------------
// <GameState> with scalar child elements, plus one attribute element per
// card and per history entry.

fn to_xml(state: &SavedGame) -> String {
    let mut w = XmlWriter::new(Options::default());
    w.start_element("GameState");

    write_scalar(&mut w, "difficulty", state.difficulty);
    write_scalar(&mut w, "moves", state.moves);
    write_scalar(&mut w, "matchedPairs", state.matched_pairs);
    write_scalar(&mut w, "score", state.score);
    write_scalar(&mut w, "matchStreak", state.match_streak);
    write_scalar(&mut w, "elapsedTimeInSeconds", state.elapsed_time_in_seconds);
    write_scalar(&mut w, "gameCompleted", state.game_completed);

    for card in &state.cards {
        w.start_element("Card");
        w.write_attribute("id", &card.id);
        w.write_attribute("value", &card.value);
        w.write_attribute("isFaceUp", &card.is_face_up);
        w.write_attribute("isMatched", &card.is_matched);
        w.end_element();
    }
    for entry in &state.move_history {
        w.start_element("Move");
        w.write_attribute("card1Id", &entry.card1);
        w.write_attribute("card2Id", &entry.card2);
        w.end_element();
    }

    w.end_document()
}

fn write_scalar<T: std::fmt::Display>(w: &mut XmlWriter, name: &str, value: T) {
    w.start_element(name);
    w.write_text(&value.to_string());
    w.end_element();
}

fn from_xml(data: &str) -> Result<SavedGame, SaveError> {
    let doc = roxmltree::Document::parse(data)?;
    let root = doc.root_element();

    let mut difficulty = None;
    let mut moves = None;
    let mut matched_pairs = None;
    let mut score = None;
    let mut match_streak = None;
    let mut elapsed = None;
    let mut completed = None;
    let mut cards = Vec::new();
    let mut history = Vec::new();

    for node in root.children().filter(|n| n.is_element()) {
        match node.tag_name().name() {
            "difficulty" => difficulty = Some(parse_text(&node, "difficulty")?),
            "moves" => moves = Some(parse_text(&node, "moves")?),
            "matchedPairs" => matched_pairs = Some(parse_text(&node, "matchedPairs")?),
            "score" => score = Some(parse_text(&node, "score")?),
            "matchStreak" => match_streak = Some(parse_text(&node, "matchStreak")?),
            "elapsedTimeInSeconds" => elapsed = Some(parse_text(&node, "elapsedTimeInSeconds")?),
            "gameCompleted" => completed = Some(parse_text(&node, "gameCompleted")?),
            "Card" => cards.push(Card {
                id: parse_attr(&node, "id")?,
                value: parse_attr(&node, "value")?,
                is_face_up: parse_attr(&node, "isFaceUp")?,
                is_matched: parse_attr(&node, "isMatched")?,
            }),
            "Move" => history.push(Move {
                card1: parse_attr(&node, "card1Id")?,
                card2: parse_attr(&node, "card2Id")?,
            }),
            _ => {}
        }
    }

    Ok(SavedGame {
        difficulty: difficulty.ok_or(SaveError::MissingField("difficulty"))?,
        moves: moves.ok_or(SaveError::MissingField("moves"))?,
        matched_pairs: matched_pairs.ok_or(SaveError::MissingField("matchedPairs"))?,
        score: score.ok_or(SaveError::MissingField("score"))?,
        match_streak: match_streak.ok_or(SaveError::MissingField("matchStreak"))?,
        elapsed_time_in_seconds: elapsed.ok_or(SaveError::MissingField("elapsedTimeInSeconds"))?,
        game_completed: completed.ok_or(SaveError::MissingField("gameCompleted"))?,
        cards,
        move_history: history,
    })
}

fn parse_text<T: FromStr>(node: &roxmltree::Node, field: &'static str) -> Result<T, SaveError> {
    let text = node.text().unwrap_or("").trim();
    text.parse().map_err(|_| SaveError::BadField {
        field,
        value: text.to_string(),
    })
}

fn parse_attr<T: FromStr>(node: &roxmltree::Node, field: &'static str) -> Result<T, SaveError> {
    let value = node
        .attribute(field)
        .ok_or(SaveError::MissingField(field))?;
    value.parse().map_err(|_| SaveError::BadField {
        field,
        value: value.to_string(),
    })
}

// --- TXT ---------------------------------------------------------------
// key=value lines; cards and history entries joined with '|'.

fn to_txt(state: &SavedGame) -> String {
    let cards = state
        .cards
        .iter()
        .map(|c| format!("{},{},{},{}", c.id, c.value, c.is_face_up, c.is_matched))
        .join("|");
    let history = state
        .move_history
        .iter()
        .map(|m| format!("{},{}", m.card1, m.card2))
        .join("|");

    format!(
        "difficulty={}\n\
         moves={}\n\
         matchedPairs={}\n\
         score={}\n\
         matchStreak={}\n\
         elapsedTimeInSeconds={}\n\
         gameCompleted={}\n\
         cards={}\n\
         moveHistory={}",
        state.difficulty,
        state.moves,
        state.matched_pairs,
        state.score,
        state.match_streak,
        state.elapsed_time_in_seconds,
        state.game_completed,
        cards,
        history,
    )
}

fn from_txt(data: &str) -> Result<SavedGame, SaveError> {
    let map: HashMap<&str, &str> = data
        .lines()
        .filter_map(|line| line.split_once('='))
        .map(|(k, v)| (k.trim(), v.trim()))
        .collect();

    let cards = map
        .get("cards")
        .copied()
        .unwrap_or_default()
        .split('|')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let fields: Vec<&str> = part.split(',').collect();
            if fields.len() != 4 {
                return Err(SaveError::BadField {
                    field: "cards",
                    value: part.to_string(),
                });
            }
            Ok(Card {
                id: parse_field(fields[0], "cards")?,
                value: parse_field(fields[1], "cards")?,
                is_face_up: parse_field(fields[2], "cards")?,
                is_matched: parse_field(fields[3], "cards")?,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let history = map
        .get("moveHistory")
        .copied()
        .unwrap_or_default()
        .split('|')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let (a, b) = part.split_once(',').ok_or(SaveError::BadField {
                field: "moveHistory",
                value: part.to_string(),
            })?;
            Ok::<Move, SaveError>(Move {
                card1: parse_field(a, "moveHistory")?,
                card2: parse_field(b, "moveHistory")?,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(SavedGame {
        difficulty: txt_field(&map, "difficulty")?,
        moves: txt_field(&map, "moves")?,
        matched_pairs: txt_field(&map, "matchedPairs")?,
        score: txt_field(&map, "score")?,
        match_streak: txt_field(&map, "matchStreak")?,
        elapsed_time_in_seconds: txt_field(&map, "elapsedTimeInSeconds")?,
        game_completed: txt_field(&map, "gameCompleted")?,
        cards,
        move_history: history,
    })
}

fn txt_field<T: FromStr>(map: &HashMap<&str, &str>, field: &'static str) -> Result<T, SaveError> {
    let value = map.get(field).ok_or(SaveError::MissingField(field))?;
    parse_field(value, field)
}

fn parse_field<T: FromStr>(value: &str, field: &'static str) -> Result<T, SaveError> {
    value.trim().parse().map_err(|_| SaveError::BadField {
        field,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::{SaveFormat, SavedGame};
    use crate::{card::Card, difficulty::Difficulty, game::Move};

    fn sample() -> SavedGame {
        SavedGame {
            difficulty: Difficulty::Easy,
            moves: 3,
            matched_pairs: 1,
            score: 100,
            match_streak: 1,
            elapsed_time_in_seconds: 42,
            game_completed: false,
            cards: vec![
                Card {
                    id: 0,
                    value: 1,
                    is_face_up: true,
                    is_matched: true,
                },
                Card {
                    id: 1,
                    value: 2,
                    is_face_up: true,
                    is_matched: false,
                },
                Card::face_down(2, 2),
                Card {
                    id: 3,
                    value: 1,
                    is_face_up: true,
                    is_matched: true,
                },
            ],
            move_history: vec![Move { card1: 0, card2: 3 }],
        }
    }

    #[test]
    fn json_uses_camel_case_field_names() {
        let json = sample().to_string(SaveFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["difficulty"], "EASY");
        assert_eq!(value["matchedPairs"], 1);
        assert_eq!(value["matchStreak"], 1);
        assert_eq!(value["elapsedTimeInSeconds"], 42);
        assert_eq!(value["gameCompleted"], false);
        assert_eq!(value["cards"][0]["isFaceUp"], true);
        assert_eq!(value["moveHistory"][0]["card1Id"], 0);
    }

    #[test]
    fn every_format_round_trips_the_snapshot() {
        let state = sample();
        for format in [SaveFormat::Json, SaveFormat::Xml, SaveFormat::Txt] {
            let text = state.to_string(format).unwrap();
            let loaded = SavedGame::from_str(&text, format).unwrap();
            assert_eq!(loaded, state, "format {}", format);
        }
    }

    #[test]
    fn txt_layout_matches_the_key_value_shape() {
        let txt = sample().to_string(SaveFormat::Txt).unwrap();
        assert!(txt.starts_with("difficulty=EASY\nmoves=3\n"));
        assert!(txt.contains("cards=0,1,true,true|1,2,true,false|2,2,false,false|3,1,true,true"));
        assert!(txt.ends_with("moveHistory=0,3"));
    }

    #[test]
    fn txt_with_a_missing_field_is_rejected() {
        let err = SavedGame::from_str("difficulty=EASY\nmoves=1", SaveFormat::Txt);
        assert!(err.is_err());
    }

    #[test]
    fn loading_flips_an_open_selection_back_down() {
        let (game, elapsed) = sample().into_game();
        assert_eq!(elapsed, 42);
        // id 1 was face-up but unmatched at save time
        assert!(!game.board().card(1).unwrap().is_face_up);
        assert!(game.board().card(0).unwrap().is_matched);
        assert_eq!(game.local_score().points(), 100);
        assert_eq!(game.local_score().streak(), 1);
        assert_eq!(game.matched_pairs(), 1);
        assert!(game.is_my_turn());
    }
}
