//! Data models for study sessions

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::flashcards::fallback::FALLBACK_DISTRACTORS;
use crate::flashcards::Card;
use crate::techniques::{GradingMode, TechniqueId};
use crate::xp::XpAward;

/// Lifecycle phase of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    Loading,
    Presenting,
    Collecting,
    Revealed,
    Graded,
    Complete,
}

impl Phase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete)
    }
}

/// What the user submits to reveal a card
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum Response {
    /// Flip the card without input
    Reveal,
    /// Free text answer
    Text(String),
    /// Index into the presented options
    Choice(usize),
}

/// Correctness or difficulty signal for a revealed card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum GradeSignal {
    /// Self assessment
    Correct(bool),
    /// Difficulty rating, 1 = Hard, 2 = Medium, 3 = Easy
    Rating(u8),
    /// Use the automatic check of the chosen option
    Auto,
}

/// Why a transition was refused. A rejected transition never changes session state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "camelCase")]
pub enum Rejection {
    #[serde(rename_all = "camelCase")]
    AnswerTooShort { min: usize, actual: usize },
    #[serde(rename_all = "camelCase")]
    TooFewWords { min: usize, actual: usize },
    NoOptionSelected,
    #[serde(rename_all = "camelCase")]
    InvalidOption { index: usize, options: usize },
    /// The response kind does not match the technique's input (e.g. text for a choice)
    WrongResponseKind,
    #[serde(rename_all = "camelCase")]
    WrongSignal { expected: GradingMode },
    #[serde(rename_all = "camelCase")]
    NotEnoughExplored { explored: usize, required: usize },
    NoCharacterSelected,
    BlankPlayerName,
    /// A card cannot be connected to itself
    SelfConnection,
}

impl Rejection {
    /// Short text suitable for showing next to the input
    pub fn message(&self) -> String {
        match self {
            Self::AnswerTooShort { min, .. } => {
                format!("Please write at least {} characters before revealing", min)
            }
            Self::TooFewWords { min, actual } => {
                format!("Explain in at least {} words ({} so far)", min, actual)
            }
            Self::NoOptionSelected => "Select an option first".to_string(),
            Self::InvalidOption { index, options } => {
                format!("Option {} does not exist ({} options)", index + 1, options)
            }
            Self::WrongResponseKind => "This technique expects a different kind of answer".to_string(),
            Self::WrongSignal { expected } => format!("This card is graded by {:?}", expected),
            Self::NotEnoughExplored { explored, required } => {
                format!("Explore at least {} cards first ({} so far)", required, explored)
            }
            Self::NoCharacterSelected => "Choose a character first".to_string(),
            Self::BlankPlayerName => "Player names cannot be blank".to_string(),
            Self::SelfConnection => "A card cannot be connected to itself".to_string(),
        }
    }
}

/// Result of a transition that may be refused by validation
#[derive(Debug, Clone, PartialEq)]
pub enum Transition<T> {
    Applied(T),
    Rejected(Rejection),
}

impl<T> Transition<T> {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }

    pub fn applied(self) -> Option<T> {
        match self {
            Self::Applied(value) => Some(value),
            Self::Rejected(_) => None,
        }
    }

    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            Self::Applied(_) => None,
            Self::Rejected(rejection) => Some(rejection),
        }
    }
}

/// Live feedback on a text draft
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputCheck {
    pub char_count: usize,
    pub word_count: usize,
    /// The draft would pass the reveal guard
    pub ready: bool,
    pub blocked_by: Option<Rejection>,
}

/// Options of a multiple choice card
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceSet {
    pub card_id: Uuid,
    pub options: Vec<String>,
    pub correct_index: usize,
}

impl ChoiceSet {
    /// Build `option_count` options: the answer plus distractors, shuffled.
    ///
    /// Blank distractors and ones equal to the answer are dropped, duplicates are
    /// removed, and missing slots are filled from the generic fallback set.
    pub fn build<R: Rng + ?Sized>(
        card: &Card,
        distractors: Vec<String>,
        option_count: usize,
        rng: &mut R,
    ) -> Self {
        let wanted = option_count.max(2) - 1;
        let answer_key = card.answer.trim().to_lowercase();

        let mut picked: Vec<String> = Vec::with_capacity(wanted);
        let fallback = FALLBACK_DISTRACTORS.iter().map(|s| s.to_string());
        for candidate in distractors.into_iter().chain(fallback) {
            if picked.len() == wanted {
                break;
            }
            let candidate = candidate.trim().to_string();
            let key = candidate.to_lowercase();
            if key.is_empty() || key == answer_key || picked.iter().any(|p| p.to_lowercase() == key) {
                continue;
            }
            picked.push(candidate);
        }

        let mut options = picked;
        options.push(card.answer.clone());
        options.shuffle(rng);
        let correct_index = options
            .iter()
            .position(|o| o == &card.answer)
            .unwrap_or(0);

        Self {
            card_id: card.id,
            options,
            correct_index,
        }
    }
}

/// Outcome of choosing an option
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceOutcome {
    pub selected: usize,
    pub correct_index: usize,
    pub correct: bool,
}

/// The answer side of a card next to what the user gave
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevealResult {
    pub card_id: Uuid,
    pub question: String,
    pub answer: String,
    pub user_input: Option<String>,
    pub choice: Option<ChoiceOutcome>,
}

/// Score of one player in a two-player session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerScore {
    pub name: String,
    pub score: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scoreboard {
    pub players: [PlayerScore; 2],
    /// 1 or 2; anything else is read as player 1
    pub current_turn: u8,
}

impl Default for Scoreboard {
    fn default() -> Self {
        Self::new("Player 1", "Player 2")
    }
}

impl Scoreboard {
    pub fn new(first: impl Into<String>, second: impl Into<String>) -> Self {
        Self {
            players: [
                PlayerScore {
                    name: first.into(),
                    score: 0,
                },
                PlayerScore {
                    name: second.into(),
                    score: 0,
                },
            ],
            current_turn: 1,
        }
    }

    fn turn_index(&self) -> usize {
        match self.current_turn {
            2 => 1,
            _ => 0,
        }
    }

    pub fn active_player(&self) -> &PlayerScore {
        &self.players[self.turn_index()]
    }

    /// Credit the active player and hand the turn over
    pub(crate) fn record_turn(&mut self, correct: bool) {
        let index = self.turn_index();
        if correct {
            self.players[index].score += 1;
        }
        self.current_turn = if index == 0 { 2 } else { 1 };
    }

    /// Name of the leading player, `None` on a tie
    pub fn leader(&self) -> Option<&str> {
        let [first, second] = &self.players;
        match first.score.cmp(&second.score) {
            std::cmp::Ordering::Greater => Some(&first.name),
            std::cmp::Ordering::Less => Some(&second.name),
            std::cmp::Ordering::Equal => None,
        }
    }
}

/// Result of a graded transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeOutcome {
    pub card_id: Uuid,
    pub correct: bool,
    pub award: XpAward,
    pub session_xp: u64,
    /// `Presenting` for the next card, or `Complete`
    pub phase: Phase,
    pub current_card: Option<Card>,
    /// Position the card was re-queued at (adaptive order only)
    pub requeued_at: Option<usize>,
    /// The card reached mastery and left the queue
    pub retired: bool,
    /// Whose turn it is now (two-player only)
    pub turn: Option<u8>,
}

/// XP from a mind-map exploration event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExploreOutcome {
    /// `None` when the card or connection was already counted
    pub award: Option<XpAward>,
    pub session_xp: u64,
    pub explored: usize,
    pub connections: usize,
}

/// Emitted once when a session completes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub technique: TechniqueId,
    /// Distinct cards graded (or explored, for free exploration)
    pub completed: usize,
    pub total: usize,
    /// Session XP including the completion bonus
    pub xp: u64,
    pub correct: u32,
    pub graded: u32,
    pub completion_bonus: u64,
    /// The user ended the session before the deck was finished
    pub ended_early: bool,
    pub focus_blocks: u32,
    pub connections: usize,
    pub players: Option<Scoreboard>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_choice_set_contains_answer_once() {
        let card = Card::new("Capital of France?", "Paris");
        let mut rng = StdRng::seed_from_u64(7);
        let set = ChoiceSet::build(
            &card,
            vec![
                "Lyon".to_string(),
                "paris".to_string(),
                "Lyon ".to_string(),
                "".to_string(),
                "Nice".to_string(),
                "Lille".to_string(),
            ],
            4,
            &mut rng,
        );
        assert_eq!(set.options.len(), 4);
        assert_eq!(set.options[set.correct_index], "Paris");
        assert_eq!(set.options.iter().filter(|o| o.to_lowercase() == "paris").count(), 1);
        assert!(set.options.contains(&"Lyon".to_string()));
    }

    #[test]
    fn test_choice_set_fills_from_fallback() {
        let card = Card::new("Q", "A");
        let mut rng = StdRng::seed_from_u64(1);
        let set = ChoiceSet::build(&card, Vec::new(), 4, &mut rng);
        assert_eq!(set.options.len(), 4);
        for generic in FALLBACK_DISTRACTORS {
            assert!(set.options.iter().any(|o| o == generic));
        }
    }

    #[test]
    fn test_scoreboard_turns() {
        let mut board = Scoreboard::new("Ann", "Ben");
        board.record_turn(true);
        assert_eq!(board.current_turn, 2);
        board.record_turn(false);
        assert_eq!(board.current_turn, 1);
        board.record_turn(true);
        assert_eq!(board.players[0].score, 2);
        assert_eq!(board.players[1].score, 0);
        assert_eq!(board.leader(), Some("Ann"));
        assert_eq!(board.active_player().name, "Ben");
    }

    #[test]
    fn test_scoreboard_out_of_range_turn() {
        let mut board: Scoreboard = serde_json::from_value(serde_json::json!({
            "players": [{"name": "Ann", "score": 0}, {"name": "Ben", "score": 0}],
            "currentTurn": 0
        }))
        .unwrap();
        assert_eq!(board.active_player().name, "Ann");
        board.record_turn(true);
        assert_eq!(board.players[0].score, 1);
        assert_eq!(board.current_turn, 2);
    }

    #[test]
    fn test_rejection_serializes_with_reason() {
        let json = serde_json::to_value(Rejection::AnswerTooShort { min: 3, actual: 1 }).unwrap();
        assert_eq!(json["reason"], "answerTooShort");
        assert_eq!(json["min"], 3);
    }
}
