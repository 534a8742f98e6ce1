//! XP award computation
//!
//! Awards are pure arithmetic: the caller supplies the base amount for the activity
//! (see the technique XP tables) and the engine applies the character's specialty
//! multiplier. All rounding goes through [`round_half_up`] so that totals do not drift
//! when many awards are summed.

use crate::techniques::TechniqueId;

use super::models::{Character, XpAward};

/// Round to the nearest integer, halves going up. Negative and non-finite values
/// become zero since XP never decreases.
pub fn round_half_up(value: f64) -> u64 {
    if !value.is_finite() || value <= 0.0 {
        return 0;
    }
    (value + 0.5).floor() as u64
}

/// Compute the XP for an activity worth `base_amount` under `technique`.
///
/// # Arguments
/// * `base_amount` - Policy amount for the activity (e.g. 15 for a correct flashcard)
/// * `technique` - Technique the activity happened in
/// * `character` - Selected character, if any
pub fn compute_award(
    base_amount: f64,
    technique: TechniqueId,
    character: Option<&Character>,
) -> XpAward {
    let base = round_half_up(base_amount);

    match character {
        Some(character) if character.has_specialty(technique) => {
            let bonus = round_half_up(base_amount * (character.bonus_multiplier - 1.0));
            XpAward {
                total_xp: base + bonus,
                bonus,
                has_bonus: true,
                character_name: Some(character.name.clone()),
            }
        }
        _ => XpAward {
            total_xp: base,
            bonus: 0,
            has_bonus: false,
            character_name: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jade() -> Character {
        Character::new("Jade", [TechniqueId::SpacedRepetition])
    }

    #[test]
    fn test_specialty_bonus_scenario() {
        let award = compute_award(20.0, TechniqueId::SpacedRepetition, Some(&jade()));
        assert_eq!(
            award,
            XpAward {
                total_xp: 30,
                bonus: 10,
                has_bonus: true,
                character_name: Some("Jade".to_string()),
            }
        );
    }

    #[test]
    fn test_no_bonus_without_specialty() {
        let character = jade();
        for base in [0.0, 1.0, 4.5, 5.0, 15.0, 25.0, 99.4] {
            for technique in TechniqueId::ALL {
                if technique == TechniqueId::SpacedRepetition {
                    continue;
                }
                let award = compute_award(base, technique, Some(&character));
                assert!(!award.has_bonus);
                assert_eq!(award.bonus, 0);
                assert_eq!(award.total_xp, round_half_up(base));
                assert_eq!(award.character_name, None);
            }
        }
    }

    #[test]
    fn test_no_bonus_without_character() {
        let award = compute_award(15.0, TechniqueId::Flashcards, None);
        assert_eq!(award.total_xp, 15);
        assert!(!award.has_bonus);
        assert!(award.bonus_message().is_none());
    }

    #[test]
    fn test_one_and_a_half_multiplier() {
        let character = jade();
        for base in 0..=200u64 {
            let award = compute_award(base as f64, TechniqueId::SpacedRepetition, Some(&character));
            assert_eq!(award.total_xp, base + round_half_up(base as f64 * 0.5));
        }
    }

    #[test]
    fn test_round_half_up() {
        assert_eq!(round_half_up(2.5), 3);
        assert_eq!(round_half_up(2.49), 2);
        assert_eq!(round_half_up(7.5), 8);
        assert_eq!(round_half_up(-3.0), 0);
        assert_eq!(round_half_up(f64::NAN), 0);
    }

    #[test]
    fn test_odd_base_rounds_bonus_up() {
        // 5 * 0.5 = 2.5 -> 3
        let award = compute_award(5.0, TechniqueId::SpacedRepetition, Some(&jade()));
        assert_eq!(award.bonus, 3);
        assert_eq!(award.total_xp, 8);
        assert_eq!(
            award.bonus_message().as_deref(),
            Some("Jade's Specialty! +3 bonus XP!")
        );
    }
}
