use rand::{seq::SliceRandom, Rng};
use serde::{Deserialize, Serialize};

use crate::{
    card::{Card, CardId, CardValue},
    difficulty::Difficulty,
    error::{GameError, Result},
};

/// Ordered card layout of one game. Ids are board positions and never change
/// after the deal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    cards: Vec<Card>,
}

impl Board {
    /// Deal a fresh shuffled board: two cards of every value `1..=pairs`.
    pub fn deal<R: Rng>(difficulty: Difficulty, rng: &mut R) -> Self {
        let mut values: Vec<CardValue> = (1..=difficulty.pairs() as CardValue)
            .flat_map(|value| [value, value])
            .collect();
        values.shuffle(rng);
        Self::with_values(&values)
    }

    /// Rebuild a board from a transmitted value list, assigning ids in
    /// receipt order. The guest side of a session must use the exact list it
    /// received and never reshuffle.
    pub fn from_values(difficulty: Difficulty, values: &[CardValue]) -> Result<Self> {
        let expected = difficulty.card_count();
        if values.len() != expected || !forms_pairs(difficulty, values) {
            return Err(GameError::MalformedDeck {
                difficulty,
                expected,
                got: values.len(),
            });
        }
        Ok(Self::with_values(values))
    }

    /// Restore a board from saved card states.
    pub fn from_cards(cards: Vec<Card>) -> Self {
        Board { cards }
    }

    fn with_values(values: &[CardValue]) -> Self {
        Board {
            cards: values
                .iter()
                .enumerate()
                .map(|(id, &value)| Card::face_down(id, value))
                .collect(),
        }
    }

    pub fn values(&self) -> Vec<CardValue> {
        self.cards.iter().map(|card| card.value).collect()
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn card(&self, id: CardId) -> Option<&Card> {
        self.cards.get(id)
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn face_up_unmatched(&self) -> Vec<CardId> {
        self.cards
            .iter()
            .filter(|card| card.is_face_up && !card.is_matched)
            .map(|card| card.id)
            .collect()
    }

    pub(crate) fn flip_up(&mut self, id: CardId) {
        if let Some(card) = self.cards.get_mut(id) {
            card.is_face_up = true;
        }
    }

    pub(crate) fn flip_down(&mut self, id: CardId) {
        if let Some(card) = self.cards.get_mut(id) {
            if !card.is_matched {
                card.is_face_up = false;
            }
        }
    }

    pub(crate) fn set_matched(&mut self, id: CardId) {
        if let Some(card) = self.cards.get_mut(id) {
            card.is_face_up = true;
            card.is_matched = true;
        }
    }
}

fn forms_pairs(difficulty: Difficulty, values: &[CardValue]) -> bool {
    (1..=difficulty.pairs() as CardValue)
        .all(|value| values.iter().filter(|&&v| v == value).count() == 2)
}
