use serde::{Deserialize, Serialize};

/// Board position, assigned at the deal and immutable afterwards.
pub type CardId = usize;
/// Pairing key; exactly two cards on a board share a value.
pub type CardValue = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: CardId,
    pub value: CardValue,
    #[serde(default)]
    pub is_face_up: bool,
    #[serde(default)]
    pub is_matched: bool,
}

impl Card {
    pub fn face_down(id: CardId, value: CardValue) -> Self {
        Card {
            id,
            value,
            is_face_up: false,
            is_matched: false,
        }
    }

    /// A card can still be picked while it is hidden and unmatched.
    pub fn is_selectable(&self) -> bool {
        !self.is_face_up && !self.is_matched
    }
}
