//! Data models for the technique catalog

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A named study modality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TechniqueId {
    Flashcards,
    MultipleChoice,
    Pomodoro,
    SpacedRepetition,
    ActiveRecall,
    StudyBuddy,
    MindMapping,
    Feynman,
}

impl TechniqueId {
    pub const ALL: [TechniqueId; 8] = [
        TechniqueId::Flashcards,
        TechniqueId::MultipleChoice,
        TechniqueId::Pomodoro,
        TechniqueId::SpacedRepetition,
        TechniqueId::ActiveRecall,
        TechniqueId::StudyBuddy,
        TechniqueId::MindMapping,
        TechniqueId::Feynman,
    ];

    /// Wire identifier, e.g. "spaced-repetition"
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Flashcards => "flashcards",
            Self::MultipleChoice => "multiple-choice",
            Self::Pomodoro => "pomodoro",
            Self::SpacedRepetition => "spaced-repetition",
            Self::ActiveRecall => "active-recall",
            Self::StudyBuddy => "study-buddy",
            Self::MindMapping => "mind-mapping",
            Self::Feynman => "feynman",
        }
    }

    /// Activity name reported with durable XP awards, e.g. "spaced_repetition"
    pub fn activity(&self) -> String {
        self.as_str().replace('-', "_")
    }

    /// Static catalog entry for this technique
    pub fn descriptor(&self) -> Technique {
        match self {
            Self::Flashcards => Technique {
                id: *self,
                name: "Flashcards",
                description: "Classic Q&A cards",
                required_level: 1,
            },
            Self::MultipleChoice => Technique {
                id: *self,
                name: "Multiple Choice Quiz",
                description: "Test yourself with 4-option questions",
                required_level: 2,
            },
            Self::Pomodoro => Technique {
                id: *self,
                name: "Pomodoro Mode",
                description: "Study in 25-minute focused sprints",
                required_level: 3,
            },
            Self::SpacedRepetition => Technique {
                id: *self,
                name: "Spaced Repetition",
                description: "Cards you struggle with come back sooner",
                required_level: 4,
            },
            Self::ActiveRecall => Technique {
                id: *self,
                name: "Active Recall",
                description: "Write answers before revealing",
                required_level: 5,
            },
            Self::StudyBuddy => Technique {
                id: *self,
                name: "Study Buddy",
                description: "Take turns against a friend",
                required_level: 6,
            },
            Self::MindMapping => Technique {
                id: *self,
                name: "Mind Mapping",
                description: "Explore cards and connect related ideas",
                required_level: 7,
            },
            Self::Feynman => Technique {
                id: *self,
                name: "Feynman Technique",
                description: "Explain the concept in your own words",
                required_level: 8,
            },
        }
    }

    pub fn required_level(&self) -> u32 {
        self.descriptor().required_level
    }

    /// Whether a user at `level` may study this technique
    pub fn is_unlocked_at(&self, level: u32) -> bool {
        level >= self.required_level()
    }
}

impl fmt::Display for TechniqueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown technique: {0}")]
pub struct UnknownTechnique(pub String);

impl FromStr for TechniqueId {
    type Err = UnknownTechnique;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == normalized)
            .ok_or_else(|| UnknownTechnique(s.to_string()))
    }
}

/// Catalog entry describing a technique
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Technique {
    pub id: TechniqueId,
    pub name: &'static str,
    pub description: &'static str,
    pub required_level: u32,
}

/// All techniques in unlock order
pub fn catalog() -> Vec<Technique> {
    TechniqueId::ALL.iter().map(|t| t.descriptor()).collect()
}

/// Techniques whose required level lies in `(from_level, to_level]`
pub fn unlocked_between(from_level: u32, to_level: u32) -> Vec<TechniqueId> {
    TechniqueId::ALL
        .into_iter()
        .filter(|t| !t.is_unlocked_at(from_level) && t.is_unlocked_at(to_level))
        .collect()
}
