use thiserror::Error;

use crate::{card::CardId, difficulty::Difficulty};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GameError {
    #[error("received {got} card values for {difficulty}, which needs {expected} forming pairs")]
    MalformedDeck {
        difficulty: Difficulty,
        expected: usize,
        got: usize,
    },
    #[error("unknown card id {0}")]
    UnknownCard(CardId),
}

pub type Result<T> = core::result::Result<T, GameError>;
