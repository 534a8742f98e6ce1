//! Technique profiles
//!
//! Every technique runs through the same session state machine. A profile holds the
//! few things that differ between them: whether there is an input phase, how a card is
//! graded, how the deck is ordered, the XP table and the completion bonus.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::models::TechniqueId;

/// Minimum input the user must provide before the answer can be revealed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "min", rename_all = "camelCase")]
pub enum InputGuard {
    /// Trimmed character count
    MinChars(usize),
    /// Whitespace separated word count
    MinWords(usize),
}

/// Whether a technique has a `Collecting` phase and what it collects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum CollectingMode {
    /// Reveal directly from `Presenting`
    None,
    /// Free text answer, optionally guarded
    Text { guard: Option<InputGuard> },
    /// Pick one of `options` choices
    Choice { options: usize },
}

/// Where the correctness signal of a graded card comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GradingMode {
    /// User reports correct / incorrect
    SelfAssessed,
    /// Checked against the chosen option
    Automatic,
    /// User reports Hard / Medium / Easy
    DifficultyRating,
    /// No per-card grading; XP comes from exploration events
    Exploration,
}

/// How cards are consumed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CardOrder {
    /// Fixed order, one pass
    Linear,
    /// Re-sequenced by the card scheduler after every grade
    Adaptive,
    /// Any card in any order
    FreeExplore,
}

/// Base XP amounts for a technique. Only the entries a technique uses are non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct XpTable {
    pub correct: f64,
    pub incorrect: f64,
    pub hard: f64,
    pub medium: f64,
    pub easy: f64,
    /// Rating outside Hard/Medium/Easy
    pub unrated: f64,
    pub card_view: f64,
    pub connection: f64,
    pub focus_block: f64,
}

impl XpTable {
    fn correct_incorrect(correct: f64, incorrect: f64) -> Self {
        Self {
            correct,
            incorrect,
            ..Default::default()
        }
    }

    /// Base amount for a difficulty rating (1 = Hard, 2 = Medium, 3 = Easy)
    pub fn for_rating(&self, rating: u8) -> f64 {
        match rating {
            1 => self.hard,
            2 => self.medium,
            3 => self.easy,
            _ => self.unrated,
        }
    }

    pub fn for_correctness(&self, correct: bool) -> f64 {
        if correct {
            self.correct
        } else {
            self.incorrect
        }
    }
}

/// Focus / break lengths of the sprint timer overlay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SprintSettings {
    pub focus: Duration,
    pub rest: Duration,
}

impl SprintSettings {
    pub fn from_minutes(focus_minutes: u64, break_minutes: u64) -> Self {
        Self {
            focus: Duration::from_secs(focus_minutes * 60),
            rest: Duration::from_secs(break_minutes * 60),
        }
    }
}

impl Default for SprintSettings {
    fn default() -> Self {
        Self::from_minutes(25, 5)
    }
}

/// The parameter record of one technique
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TechniqueProfile {
    pub technique: TechniqueId,
    pub collecting: CollectingMode,
    pub grading: GradingMode,
    pub order: CardOrder,
    pub xp: XpTable,
    /// Flat bonus added once at the `Complete` transition
    pub completion_bonus: u64,
    /// Alternate turns between two players after every grade
    pub two_players: bool,
    /// Run the focus / break sprint timer alongside the cards
    pub timer_overlay: bool,
    /// Share of cards that must be explored before completion (free explore only)
    pub min_explored_ratio: f64,
}

impl TechniqueProfile {
    fn base(technique: TechniqueId) -> Self {
        Self {
            technique,
            collecting: CollectingMode::None,
            grading: GradingMode::SelfAssessed,
            order: CardOrder::Linear,
            xp: XpTable::default(),
            completion_bonus: 0,
            two_players: false,
            timer_overlay: false,
            min_explored_ratio: 0.0,
        }
    }

    pub fn for_technique(technique: TechniqueId) -> Self {
        let base = Self::base(technique);
        match technique {
            TechniqueId::Flashcards => Self {
                xp: XpTable::correct_incorrect(15.0, 5.0),
                completion_bonus: 50,
                ..base
            },
            TechniqueId::MultipleChoice => Self {
                collecting: CollectingMode::Choice { options: 4 },
                grading: GradingMode::Automatic,
                xp: XpTable::correct_incorrect(20.0, 5.0),
                ..base
            },
            TechniqueId::Pomodoro => Self {
                xp: XpTable {
                    focus_block: 40.0,
                    ..XpTable::correct_incorrect(15.0, 5.0)
                },
                timer_overlay: true,
                ..base
            },
            TechniqueId::SpacedRepetition => Self {
                grading: GradingMode::DifficultyRating,
                order: CardOrder::Adaptive,
                xp: XpTable {
                    hard: 5.0,
                    medium: 15.0,
                    easy: 25.0,
                    unrated: 10.0,
                    ..Default::default()
                },
                completion_bonus: 75,
                ..base
            },
            TechniqueId::ActiveRecall => Self {
                collecting: CollectingMode::Text {
                    guard: Some(InputGuard::MinChars(3)),
                },
                xp: XpTable::correct_incorrect(20.0, 10.0),
                completion_bonus: 60,
                ..base
            },
            TechniqueId::StudyBuddy => Self {
                xp: XpTable::correct_incorrect(15.0, 5.0),
                completion_bonus: 100,
                two_players: true,
                ..base
            },
            TechniqueId::MindMapping => Self {
                grading: GradingMode::Exploration,
                order: CardOrder::FreeExplore,
                xp: XpTable {
                    card_view: 15.0,
                    connection: 25.0,
                    ..Default::default()
                },
                completion_bonus: 100,
                min_explored_ratio: 0.5,
                ..base
            },
            TechniqueId::Feynman => Self {
                collecting: CollectingMode::Text {
                    guard: Some(InputGuard::MinWords(10)),
                },
                xp: XpTable::correct_incorrect(30.0, 10.0),
                ..base
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spaced_repetition_rating_table() {
        let profile = TechniqueProfile::for_technique(TechniqueId::SpacedRepetition);
        assert_eq!(profile.order, CardOrder::Adaptive);
        assert_eq!(profile.xp.for_rating(1), 5.0);
        assert_eq!(profile.xp.for_rating(2), 15.0);
        assert_eq!(profile.xp.for_rating(3), 25.0);
        assert_eq!(profile.xp.for_rating(9), 10.0);
    }

    #[test]
    fn test_text_guards() {
        let recall = TechniqueProfile::for_technique(TechniqueId::ActiveRecall);
        assert_eq!(
            recall.collecting,
            CollectingMode::Text {
                guard: Some(InputGuard::MinChars(3))
            }
        );

        let feynman = TechniqueProfile::for_technique(TechniqueId::Feynman);
        assert_eq!(
            feynman.collecting,
            CollectingMode::Text {
                guard: Some(InputGuard::MinWords(10))
            }
        );
        assert_eq!(
            TechniqueProfile::for_technique(TechniqueId::Flashcards).collecting,
            CollectingMode::None
        );
    }

    #[test]
    fn test_only_pomodoro_has_timer() {
        for technique in TechniqueId::ALL {
            let profile = TechniqueProfile::for_technique(technique);
            assert_eq!(profile.timer_overlay, technique == TechniqueId::Pomodoro);
            assert_eq!(profile.two_players, technique == TechniqueId::StudyBuddy);
        }
    }
}
