//! Re-queue policy for adaptive study
//!
//! Online approximation of spaced repetition: instead of wall-clock intervals a graded
//! card is pushed a number of positions back into the remaining queue. Harder cards
//! resurface almost immediately, easy cards go deep.
//!
//! Ratings:
//! - 1: Hard (again)
//! - 2: Medium (good)
//! - 3: Easy

use super::models::{Card, Difficulty};

/// Offset used for a rating outside 1..=3
const DEFAULT_OFFSET: usize = 2;

/// Number of positions a card moves back after being rated
pub fn reinsertion_offset(rating: u8) -> usize {
    match rating {
        1 => 1,
        2 => 3,
        3 => 10,
        _ => DEFAULT_OFFSET,
    }
}

/// Offsets for Hard, Medium and Easy, for showing what each button will do
pub fn preview_offsets() -> [usize; 3] {
    [reinsertion_offset(1), reinsertion_offset(2), reinsertion_offset(3)]
}

/// Whether a rating counts as a correct answer (Medium or Easy)
pub fn rating_is_correct(rating: u8) -> bool {
    matches!(Difficulty::from_rating(rating), Some(Difficulty::Medium | Difficulty::Easy))
}

/// A card is mastered once its latest rating is Easy and it has been graded at
/// least `mastery_reviews` times.
pub fn is_mastered(card: &Card, mastery_reviews: u32) -> bool {
    card.difficulty == Difficulty::Easy && card.review_count >= mastery_reviews.max(1)
}

/// Describe a queue position as how many cards come before it
pub fn format_offset(offset: usize) -> String {
    match offset {
        0 => "next".to_string(),
        1 => "after 1 card".to_string(),
        n => format!("after {} cards", n),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offsets() {
        assert_eq!(preview_offsets(), [1, 3, 10]);
        assert_eq!(reinsertion_offset(0), 2);
        assert_eq!(reinsertion_offset(7), 2);
    }

    #[test]
    fn test_rating_is_correct() {
        assert!(!rating_is_correct(1));
        assert!(rating_is_correct(2));
        assert!(rating_is_correct(3));
        assert!(!rating_is_correct(4));
    }

    #[test]
    fn test_mastery() {
        let mut card = Card::new("q", "a");
        card.difficulty = Difficulty::Easy;
        card.review_count = 1;
        assert!(!is_mastered(&card, 2));
        card.review_count = 2;
        assert!(is_mastered(&card, 2));
        card.difficulty = Difficulty::Medium;
        assert!(!is_mastered(&card, 2));
    }

    #[test]
    fn test_format_offset() {
        assert_eq!(format_offset(0), "next");
        assert_eq!(format_offset(1), "after 1 card");
        assert_eq!(format_offset(10), "after 10 cards");
    }
}
