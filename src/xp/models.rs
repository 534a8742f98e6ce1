//! Data models for characters and XP awards

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::techniques::TechniqueId;

/// Multiplier granted by every built-in character on its specialties
pub const DEFAULT_BONUS_MULTIPLIER: f64 = 1.5;

/// A study persona. Selected once per session and never mutated during it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Character {
    pub name: String,
    #[serde(default)]
    pub style: Option<String>,
    pub specialties: BTreeSet<TechniqueId>,
    #[serde(default = "default_bonus_multiplier")]
    pub bonus_multiplier: f64,
}

fn default_bonus_multiplier() -> f64 {
    DEFAULT_BONUS_MULTIPLIER
}

impl Character {
    pub fn new(name: impl Into<String>, specialties: impl IntoIterator<Item = TechniqueId>) -> Self {
        Self {
            name: name.into(),
            style: None,
            specialties: specialties.into_iter().collect(),
            bonus_multiplier: DEFAULT_BONUS_MULTIPLIER,
        }
    }

    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.bonus_multiplier = multiplier;
        self
    }

    fn with_style(mut self, style: &str) -> Self {
        self.style = Some(style.to_string());
        self
    }

    pub fn has_specialty(&self, technique: TechniqueId) -> bool {
        self.specialties.contains(&technique)
    }
}

/// The built-in character roster
pub fn roster() -> Vec<Character> {
    vec![
        Character::new("Yasmin", [TechniqueId::MindMapping, TechniqueId::Feynman])
            .with_style("Creative Explorer"),
        Character::new("Jade", [TechniqueId::SpacedRepetition, TechniqueId::Pomodoro])
            .with_style("Strategic Planner"),
        Character::new("Sasha", [TechniqueId::ActiveRecall, TechniqueId::MultipleChoice])
            .with_style("Active Learner"),
        Character::new("Cloe", [TechniqueId::StudyBuddy, TechniqueId::Flashcards])
            .with_style("Social Studier"),
    ]
}

/// Find a roster character by name (case-insensitive)
pub fn find_character(name: &str) -> Option<Character> {
    let wanted = name.trim().to_lowercase();
    roster().into_iter().find(|c| c.name.to_lowercase() == wanted)
}

/// Result of one XP computation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct XpAward {
    #[serde(rename = "totalXP")]
    pub total_xp: u64,
    pub bonus: u64,
    pub has_bonus: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub character_name: Option<String>,
}

impl XpAward {
    pub fn zero() -> Self {
        Self {
            total_xp: 0,
            bonus: 0,
            has_bonus: false,
            character_name: None,
        }
    }

    /// Notification text for a specialty bonus, if one applied
    pub fn bonus_message(&self) -> Option<String> {
        match (&self.character_name, self.has_bonus) {
            (Some(name), true) => Some(format!("{}'s Specialty! +{} bonus XP!", name, self.bonus)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roster_covers_every_technique() {
        let covered: BTreeSet<TechniqueId> = roster()
            .into_iter()
            .flat_map(|c| c.specialties.into_iter())
            .collect();
        assert_eq!(covered.len(), TechniqueId::ALL.len());
    }

    #[test]
    fn test_find_character_ignores_case() {
        let jade = find_character("jade").unwrap();
        assert!(jade.has_specialty(TechniqueId::SpacedRepetition));
        assert!(find_character("Nobody").is_none());
    }

    #[test]
    fn test_character_deserializes_without_multiplier() {
        let json = r#"{"name":"Jade","specialties":["spaced-repetition"]}"#;
        let character: Character = serde_json::from_str(json).unwrap();
        assert_eq!(character.bonus_multiplier, DEFAULT_BONUS_MULTIPLIER);
    }
}
