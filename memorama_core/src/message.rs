use serde::{Deserialize, Serialize};

use crate::{
    card::{CardId, CardValue},
    difficulty::Difficulty,
};

/// The four message kinds of a versus session, one JSON object per line on
/// the wire. The transport assumes in-order exactly-once delivery and the
/// engine does not add acknowledgments or retransmission on top.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PeerMessage {
    /// The host hands the guest the full shuffled value list. The seed is
    /// informational only; correctness never depends on both ends sharing a
    /// random number generator.
    #[serde(rename_all = "camelCase")]
    StartGame {
        difficulty: Difficulty,
        seed: u64,
        card_values: Vec<CardValue>,
    },
    #[serde(rename_all = "camelCase")]
    FlipCard { card_id: CardId },
    #[serde(rename_all = "camelCase")]
    MatchFound {
        card1_id: CardId,
        card2_id: CardId,
        scorer_is_host: bool,
        points: u64,
    },
    #[serde(rename_all = "camelCase")]
    TurnChange { next_turn_is_host: bool },
}

impl PeerMessage {
    pub fn encode(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn decode(line: &str) -> serde_json::Result<Self> {
        serde_json::from_str(line.trim())
    }
}

#[cfg(test)]
mod tests {
    use super::PeerMessage;
    use crate::difficulty::Difficulty;

    #[test]
    fn encodes_with_a_type_tag_and_camel_case_fields() {
        let msg = PeerMessage::FlipCard { card_id: 7 };
        assert_eq!(msg.encode().unwrap(), r#"{"type":"FlipCard","cardId":7}"#);

        let msg = PeerMessage::MatchFound {
            card1_id: 0,
            card2_id: 3,
            scorer_is_host: true,
            points: 200,
        };
        assert_eq!(
            msg.encode().unwrap(),
            r#"{"type":"MatchFound","card1Id":0,"card2Id":3,"scorerIsHost":true,"points":200}"#
        );
    }

    #[test]
    fn start_game_survives_the_wire() {
        let msg = PeerMessage::StartGame {
            difficulty: Difficulty::Easy,
            seed: 1234,
            card_values: vec![1, 2, 3, 1, 2, 3, 4, 4, 5, 5, 6, 6],
        };
        let line = msg.encode().unwrap();
        assert!(line.contains(r#""difficulty":"EASY""#));
        assert_eq!(PeerMessage::decode(&line).unwrap(), msg);
    }

    #[test]
    fn garbage_lines_fail_to_decode() {
        assert!(PeerMessage::decode("not json").is_err());
        assert!(PeerMessage::decode(r#"{"type":"Unknown"}"#).is_err());
        assert!(PeerMessage::decode(r#"{"type":"FlipCard"}"#).is_err());
    }
}
