pub mod board;
pub mod card;
pub mod console;
pub mod difficulty;
pub mod error;
pub mod game;
pub mod message;
pub mod save;
pub mod score;

pub use board::Board;
pub use card::{Card, CardId, CardValue};
pub use difficulty::Difficulty;
pub use error::GameError;
pub use game::{FlipOutcome, FlipSource, MemoryGame, Mode, Phase, Resolution, Seat};
pub use message::PeerMessage;
