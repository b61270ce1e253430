use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

/// Board sizes. Fixed at game start; in a versus session the host picks and
/// transmits it, the guest never negotiates.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumIter, EnumString,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn pairs(self) -> usize {
        match self {
            Difficulty::Easy => 6,
            Difficulty::Medium => 15,
            Difficulty::Hard => 28,
        }
    }

    pub fn columns(self) -> usize {
        match self {
            Difficulty::Easy => 4,
            Difficulty::Medium => 5,
            Difficulty::Hard => 8,
        }
    }

    pub fn card_count(self) -> usize {
        self.pairs() * 2
    }
}

impl Default for Difficulty {
    fn default() -> Self {
        Difficulty::Medium
    }
}
