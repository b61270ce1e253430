use log::debug;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{
    board::Board,
    card::{CardId, CardValue},
    difficulty::Difficulty,
    error::{GameError, Result},
    score::ScoreSheet,
};

/// Which end of a versus session this engine is. Fixed for the lifetime of
/// the session; the host deals the board and moves first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Seat {
    Host,
    Guest,
}

impl Seat {
    pub fn is_host(self) -> bool {
        matches!(self, Seat::Host)
    }

    pub fn other(self) -> Seat {
        match self {
            Seat::Host => Seat::Guest,
            Seat::Guest => Seat::Host,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Solo,
    Versus { seat: Seat },
}

/// Selection window of the turn state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    OneSelected,
    Resolving,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlipSource {
    Local,
    Remote,
}

/// What a flip request did. Rejections are not errors; callers drop them
/// without surfacing anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlipOutcome {
    Rejected,
    Flipped(CardId),
    PairChosen(CardId, CardId),
}

/// Verdict of [`MemoryGame::resolve`] on the acting side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Match {
        card1: CardId,
        card2: CardId,
        points: u64,
        completed: bool,
    },
    Mismatch {
        card1: CardId,
        card2: CardId,
        /// Set in versus mode: the side named on the wire, role-relative.
        next_turn_is_host: Option<bool>,
    },
}

/// One found pair, in the order the cards were picked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Move {
    #[serde(rename = "card1Id")]
    pub card1: CardId,
    #[serde(rename = "card2Id")]
    pub card2: CardId,
}

/// The memory game engine, shared by solo play and both ends of a versus
/// session. Host and guest engines stay convergent because every transition
/// is either local-and-transmitted or replayed from the peer's messages in
/// arrival order; the mirror side never resolves a pair itself, it waits for
/// the acting side's MatchFound/TurnChange verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryGame {
    difficulty: Difficulty,
    board: Board,
    mode: Mode,
    phase: Phase,
    first_pick: Option<CardId>,
    second_pick: Option<CardId>,
    host_turn: bool,
    local: ScoreSheet,
    remote: ScoreSheet,
    matched_pairs: usize,
    moves: usize,
    move_history: Vec<Move>,
    completed: bool,
}

impl MemoryGame {
    pub fn new_solo<R: Rng>(difficulty: Difficulty, rng: &mut R) -> Self {
        Self::with_board(difficulty, Board::deal(difficulty, rng), Mode::Solo)
    }

    /// Host side of a versus session. The dealt value list must be sent to
    /// the guest verbatim in a StartGame message.
    pub fn new_hosted<R: Rng>(difficulty: Difficulty, rng: &mut R) -> Self {
        Self::with_board(
            difficulty,
            Board::deal(difficulty, rng),
            Mode::Versus { seat: Seat::Host },
        )
    }

    /// Guest side, built from the value list the host transmitted.
    pub fn join(difficulty: Difficulty, values: &[CardValue]) -> Result<Self> {
        Ok(Self::with_board(
            difficulty,
            Board::from_values(difficulty, values)?,
            Mode::Versus { seat: Seat::Guest },
        ))
    }

    fn with_board(difficulty: Difficulty, board: Board, mode: Mode) -> Self {
        MemoryGame {
            difficulty,
            board,
            mode,
            phase: Phase::Idle,
            first_pick: None,
            second_pick: None,
            host_turn: true,
            local: ScoreSheet::default(),
            remote: ScoreSheet::default(),
            matched_pairs: 0,
            moves: 0,
            move_history: Vec::new(),
            completed: false,
        }
    }

    pub(crate) fn restore_solo(
        difficulty: Difficulty,
        board: Board,
        moves: usize,
        matched_pairs: usize,
        move_history: Vec<Move>,
        sheet: ScoreSheet,
        completed: bool,
    ) -> Self {
        MemoryGame {
            difficulty,
            board,
            mode: Mode::Solo,
            phase: Phase::Idle,
            first_pick: None,
            second_pick: None,
            host_turn: true,
            local: sheet,
            remote: ScoreSheet::default(),
            matched_pairs,
            moves,
            move_history,
            completed,
        }
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn seat(&self) -> Option<Seat> {
        match self.mode {
            Mode::Solo => None,
            Mode::Versus { seat } => Some(seat),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn moves(&self) -> usize {
        self.moves
    }

    pub fn matched_pairs(&self) -> usize {
        self.matched_pairs
    }

    pub fn move_history(&self) -> &[Move] {
        &self.move_history
    }

    pub fn local_score(&self) -> &ScoreSheet {
        &self.local
    }

    pub fn remote_score(&self) -> &ScoreSheet {
        &self.remote
    }

    pub fn completed(&self) -> bool {
        self.completed
    }

    /// Turn ownership is one shared flag; each side derives its own answer
    /// from its fixed seat.
    pub fn is_my_turn(&self) -> bool {
        match self.mode {
            Mode::Solo => true,
            Mode::Versus { seat } => self.host_turn == seat.is_host(),
        }
    }

    /// Versus result once the board is complete: the seat with more points,
    /// or None on a tie (and always None in solo mode).
    pub fn leading_seat(&self) -> Option<Seat> {
        let Mode::Versus { seat } = self.mode else {
            return None;
        };
        match self.local.points().cmp(&self.remote.points()) {
            std::cmp::Ordering::Greater => Some(seat),
            std::cmp::Ordering::Less => Some(seat.other()),
            std::cmp::Ordering::Equal => None,
        }
    }

    /// A card flip request, either a local pick or a replayed peer
    /// notification. Every guard rejects silently: flipping while a pair is
    /// resolving, flipping a face-up or matched card, and acting out of turn
    /// are all ignored rather than errors. A replayed notification is also
    /// ignored while it IS the receiving side's turn, which guards against
    /// stale or duplicated messages after the turn already passed back.
    pub fn flip(&mut self, id: CardId, source: FlipSource) -> FlipOutcome {
        if self.completed || self.phase == Phase::Resolving {
            return FlipOutcome::Rejected;
        }
        if let Mode::Versus { .. } = self.mode {
            match source {
                FlipSource::Local if !self.is_my_turn() => {
                    debug!("flip {id} ignored: not our turn");
                    return FlipOutcome::Rejected;
                }
                FlipSource::Remote if self.is_my_turn() => {
                    debug!("remote flip {id} ignored: it is our turn");
                    return FlipOutcome::Rejected;
                }
                _ => {}
            }
        }
        match self.board.card(id) {
            None => {
                debug!("flip ignored: no card with id {id}");
                return FlipOutcome::Rejected;
            }
            Some(card) if !card.is_selectable() => return FlipOutcome::Rejected,
            Some(_) => {}
        }

        self.board.flip_up(id);
        match self.first_pick {
            None => {
                self.first_pick = Some(id);
                self.phase = Phase::OneSelected;
                FlipOutcome::Flipped(id)
            }
            Some(first) => {
                self.second_pick = Some(id);
                self.moves += 1;
                self.phase = Phase::Resolving;
                FlipOutcome::PairChosen(first, id)
            }
        }
    }

    /// Settle the selected pair. Only meaningful in `Resolving`, and in a
    /// versus game only on the side whose turn it is; the mirror side keeps
    /// its pair face-up until the peer's verdict message arrives.
    pub fn resolve(&mut self) -> Option<Resolution> {
        if self.phase != Phase::Resolving || !self.is_my_turn() {
            return None;
        }
        let first = self.first_pick?;
        let second = self.second_pick?;
        let matched = self.board.card(first)?.value == self.board.card(second)?.value;
        self.clear_selection();

        if matched {
            self.board.set_matched(first);
            self.board.set_matched(second);
            self.matched_pairs += 1;
            let points = self.local.record_match();
            self.move_history.push(Move {
                card1: first,
                card2: second,
            });
            self.completed = self.matched_pairs == self.difficulty.pairs();
            // the acting side keeps the turn
            Some(Resolution::Match {
                card1: first,
                card2: second,
                points,
                completed: self.completed,
            })
        } else {
            self.board.flip_down(first);
            self.board.flip_down(second);
            self.local.record_mismatch();
            let next_turn_is_host = match self.mode {
                Mode::Solo => None,
                Mode::Versus { .. } => {
                    self.host_turn = !self.host_turn;
                    Some(self.host_turn)
                }
            };
            Some(Resolution::Mismatch {
                card1: first,
                card2: second,
                next_turn_is_host,
            })
        }
    }

    /// The peer reported a match: mark both cards and credit the side the
    /// message names, relative to our own seat, applying the transmitted
    /// point delta verbatim. Re-applying the same message is a no-op so a
    /// duplicate can never double-score.
    pub fn apply_match_found(
        &mut self,
        card1: CardId,
        card2: CardId,
        scorer_is_host: bool,
        points: u64,
    ) -> Result<()> {
        let Mode::Versus { seat } = self.mode else {
            debug!("MatchFound ignored outside a versus game");
            return Ok(());
        };
        for id in [card1, card2] {
            if self.board.card(id).is_none() {
                return Err(GameError::UnknownCard(id));
            }
        }
        if self.board.card(card1).is_some_and(|c| c.is_matched)
            && self.board.card(card2).is_some_and(|c| c.is_matched)
        {
            debug!("duplicate MatchFound for {card1}/{card2} ignored");
            return Ok(());
        }

        self.board.set_matched(card1);
        self.board.set_matched(card2);
        self.matched_pairs += 1;
        self.move_history.push(Move { card1, card2 });
        if scorer_is_host == seat.is_host() {
            self.local.apply_reported(points);
        } else {
            self.remote.apply_reported(points);
        }
        self.clear_selection();
        self.completed = self.matched_pairs == self.difficulty.pairs();
        Ok(())
    }

    /// The peer mismatched and passed the turn. Face-up unmatched cards flip
    /// back down and the owner flag is taken from the message; "is it our
    /// turn now" falls out of comparing the named side with our own fixed
    /// seat, never out of blindly inverting the previous flag.
    pub fn apply_turn_change(&mut self, next_turn_is_host: bool) {
        if self.mode == Mode::Solo {
            debug!("TurnChange ignored outside a versus game");
            return;
        }
        for id in self.board.face_up_unmatched() {
            self.board.flip_down(id);
        }
        self.clear_selection();
        self.host_turn = next_turn_is_host;
    }

    fn clear_selection(&mut self) {
        self.first_pick = None;
        self.second_pick = None;
        self.phase = Phase::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EASY_DECK: [u32; 12] = [1, 2, 3, 1, 2, 3, 4, 4, 5, 5, 6, 6];

    fn solo_game(values: &[u32]) -> MemoryGame {
        let board = Board::from_values(Difficulty::Easy, values).unwrap();
        MemoryGame::restore_solo(
            Difficulty::Easy,
            board,
            0,
            0,
            Vec::new(),
            ScoreSheet::default(),
            false,
        )
    }

    fn versus_pair() -> (MemoryGame, MemoryGame) {
        // both ends built from the same transmitted value list; the host
        // engine only differs in its seat
        let mut host = MemoryGame::join(Difficulty::Easy, &EASY_DECK).unwrap();
        host.mode = Mode::Versus { seat: Seat::Host };
        let guest = MemoryGame::join(Difficulty::Easy, &EASY_DECK).unwrap();
        (host, guest)
    }

    #[test]
    fn first_flip_opens_the_selection_window() {
        let mut game = solo_game(&EASY_DECK);
        assert_eq!(game.flip(0, FlipSource::Local), FlipOutcome::Flipped(0));
        assert_eq!(game.phase(), Phase::OneSelected);
        assert!(game.board().card(0).unwrap().is_face_up);
    }

    #[test]
    fn second_flip_enters_resolving_and_blocks_a_third() {
        let mut game = solo_game(&EASY_DECK);
        game.flip(0, FlipSource::Local);
        assert_eq!(
            game.flip(1, FlipSource::Local),
            FlipOutcome::PairChosen(0, 1)
        );
        assert_eq!(game.phase(), Phase::Resolving);
        assert_eq!(game.moves(), 1);
        assert_eq!(game.flip(2, FlipSource::Local), FlipOutcome::Rejected);
    }

    #[test]
    fn face_up_and_matched_cards_reject_further_flips() {
        let mut game = solo_game(&EASY_DECK);
        game.flip(0, FlipSource::Local);
        assert_eq!(game.flip(0, FlipSource::Local), FlipOutcome::Rejected);

        game.flip(3, FlipSource::Local);
        game.resolve();
        assert!(game.board().card(0).unwrap().is_matched);
        assert_eq!(game.flip(0, FlipSource::Local), FlipOutcome::Rejected);
        assert_eq!(game.flip(3, FlipSource::Local), FlipOutcome::Rejected);
    }

    #[test]
    fn match_scores_and_mismatch_resets_the_streak() {
        let mut game = solo_game(&EASY_DECK);
        game.flip(0, FlipSource::Local);
        game.flip(3, FlipSource::Local);
        match game.resolve() {
            Some(Resolution::Match { points, .. }) => assert_eq!(points, 100),
            other => panic!("expected a match, got {:?}", other),
        }
        assert_eq!(game.local_score().streak(), 1);

        game.flip(1, FlipSource::Local);
        game.flip(4, FlipSource::Local);
        match game.resolve() {
            Some(Resolution::Match { points, .. }) => assert_eq!(points, 200),
            other => panic!("expected a match, got {:?}", other),
        }

        game.flip(2, FlipSource::Local);
        game.flip(6, FlipSource::Local);
        match game.resolve() {
            Some(Resolution::Mismatch { card1, card2, .. }) => {
                assert_eq!((card1, card2), (2, 6));
            }
            other => panic!("expected a mismatch, got {:?}", other),
        }
        assert_eq!(game.local_score().streak(), 0);
        assert!(!game.board().card(2).unwrap().is_face_up);
        assert!(!game.board().card(6).unwrap().is_face_up);

        game.flip(2, FlipSource::Local);
        game.flip(5, FlipSource::Local);
        match game.resolve() {
            Some(Resolution::Match { points, .. }) => assert_eq!(points, 100),
            other => panic!("expected a match, got {:?}", other),
        }
    }

    #[test]
    fn completing_the_board_is_detected_on_the_last_match() {
        let mut game = solo_game(&EASY_DECK);
        let pairs = [(0, 3), (1, 4), (2, 5), (6, 7), (8, 9), (10, 11)];
        for (i, (a, b)) in pairs.iter().enumerate() {
            game.flip(*a, FlipSource::Local);
            game.flip(*b, FlipSource::Local);
            let Some(Resolution::Match { completed, .. }) = game.resolve() else {
                panic!("pair {}/{} should match", a, b);
            };
            assert_eq!(completed, i == pairs.len() - 1);
        }
        assert!(game.completed());
        assert_eq!(game.matched_pairs(), 6);
        assert_eq!(game.move_history().len(), 6);
    }

    #[test]
    fn guest_cannot_flip_before_its_turn_and_host_ignores_stale_remote_flips() {
        let (mut host, mut guest) = versus_pair();
        assert!(host.is_my_turn());
        assert!(!guest.is_my_turn());
        assert_eq!(guest.flip(0, FlipSource::Local), FlipOutcome::Rejected);
        // a remote notification arriving while it is our own turn is stale
        assert_eq!(host.flip(0, FlipSource::Remote), FlipOutcome::Rejected);
    }

    #[test]
    fn mirror_side_never_resolves_its_replayed_pair() {
        let (mut host, mut guest) = versus_pair();
        host.flip(0, FlipSource::Local);
        host.flip(3, FlipSource::Local);
        guest.flip(0, FlipSource::Remote);
        guest.flip(3, FlipSource::Remote);
        assert_eq!(guest.phase(), Phase::Resolving);
        assert_eq!(guest.resolve(), None);
        assert!(host.resolve().is_some());
    }

    // The end-to-end exchange: host matches (turn stays), then mismatches
    // (turn passes), with the guest mirroring purely from messages.
    #[test]
    fn host_and_guest_converge_through_a_match_and_a_turn_change() {
        let (mut host, mut guest) = versus_pair();
        assert_eq!(host.board().cards(), guest.board().cards());

        host.flip(0, FlipSource::Local);
        guest.flip(0, FlipSource::Remote);
        host.flip(3, FlipSource::Local);
        guest.flip(3, FlipSource::Remote);

        let Some(Resolution::Match {
            card1,
            card2,
            points,
            completed,
        }) = host.resolve()
        else {
            panic!("ids 0 and 3 share value 1");
        };
        assert_eq!((card1, card2, points, completed), (0, 3, 100, false));
        assert!(host.is_my_turn(), "a match keeps the turn");
        guest.apply_match_found(card1, card2, true, points).unwrap();

        assert_eq!(guest.remote_score().points(), 100);
        assert_eq!(guest.remote_score().pairs_won(), 1);
        assert_eq!(guest.matched_pairs(), 1);
        assert!(!guest.is_my_turn());
        assert!(guest.board().card(0).unwrap().is_matched);
        assert!(guest.board().card(3).unwrap().is_matched);

        host.flip(1, FlipSource::Local);
        guest.flip(1, FlipSource::Remote);
        host.flip(6, FlipSource::Local);
        guest.flip(6, FlipSource::Remote);

        let Some(Resolution::Mismatch {
            next_turn_is_host, ..
        }) = host.resolve()
        else {
            panic!("ids 1 and 6 differ in value");
        };
        assert_eq!(next_turn_is_host, Some(false));
        assert!(!host.is_my_turn());
        assert_eq!(host.local_score().streak(), 0);

        guest.apply_turn_change(false);
        assert!(guest.is_my_turn());
        assert!(!guest.board().card(1).unwrap().is_face_up);
        assert!(!guest.board().card(6).unwrap().is_face_up);
        assert_eq!(host.board().cards(), guest.board().cards());
    }

    #[test]
    fn duplicate_match_found_never_double_scores() {
        let (_, mut guest) = versus_pair();
        guest.apply_match_found(0, 3, true, 100).unwrap();
        guest.apply_match_found(0, 3, true, 100).unwrap();
        assert_eq!(guest.remote_score().points(), 100);
        assert_eq!(guest.matched_pairs(), 1);
    }

    #[test]
    fn a_received_match_found_can_finish_the_game() {
        let (_, mut guest) = versus_pair();
        let pairs = [(0, 3), (1, 4), (2, 5), (6, 7), (8, 9)];
        for (a, b) in pairs {
            guest.apply_match_found(a, b, true, 100).unwrap();
        }
        assert!(!guest.completed());
        guest.apply_match_found(10, 11, true, 100).unwrap();
        assert!(guest.completed());
        assert_eq!(guest.leading_seat(), Some(Seat::Host));
    }

    #[test]
    fn match_found_with_unknown_ids_is_an_error() {
        let (_, mut guest) = versus_pair();
        assert_eq!(
            guest.apply_match_found(0, 99, true, 100),
            Err(GameError::UnknownCard(99))
        );
    }
}
