use itertools::Itertools;
use strum_macros::{Display, EnumIter, EnumString};

use crate::{
    board::Board,
    card::{Card, CardValue},
};

/// How face-up cards are drawn in the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum CardStyle {
    Numbers,
    Letters,
}

impl CardStyle {
    pub fn glyph(self, value: CardValue) -> String {
        match self {
            CardStyle::Numbers => value.to_string(),
            CardStyle::Letters => {
                // A..Z, then doubled letters for the large boards
                let letter = (b'A' + ((value - 1) % 26) as u8) as char;
                let repeat = ((value - 1) / 26 + 1) as usize;
                letter.to_string().repeat(repeat)
            }
        }
    }
}

/// Render the board as a column grid. Hidden cards show a dot, face-up cards
/// their glyph, matched pairs are bracketed.
pub fn board_lines(board: &Board, columns: usize, style: CardStyle) -> Vec<String> {
    board
        .cards()
        .chunks(columns)
        .map(|row| row.iter().map(|card| cell(card, style)).join(" "))
        .collect()
}

fn cell(card: &Card, style: CardStyle) -> String {
    let face = if card.is_face_up || card.is_matched {
        style.glyph(card.value)
    } else {
        "·".to_string()
    };
    if card.is_matched {
        format!("[{:>2} {:>2}]", card.id, face)
    } else {
        format!(" {:>2} {:>2} ", card.id, face)
    }
}
