//! Adaptive card queue
//!
//! The queue head is always the card being presented. Grading a card moves it back by
//! the offset of its rating, capped at the tail so a card is never lost. Cards only
//! leave the queue through [`CardQueue::retire`].

use thiserror::Error;
use uuid::Uuid;

use super::algorithm::reinsertion_offset;
use super::models::{Card, Difficulty};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("Card not found in queue: {0}")]
    CardNotFound(Uuid),
}

pub type Result<T> = std::result::Result<T, SchedulerError>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardQueue {
    cards: Vec<Card>,
}

impl CardQueue {
    /// Seed a queue, resetting every card to `New` with no reviews. Input order is kept.
    pub fn initialize(cards: impl IntoIterator<Item = Card>) -> Self {
        let cards = cards
            .into_iter()
            .map(|mut card| {
                card.difficulty = Difficulty::New;
                card.review_count = 0;
                card
            })
            .collect();
        Self { cards }
    }

    /// Record a rating for a card and move it back in the queue.
    ///
    /// Returns the card's new index.
    pub fn grade(&mut self, card_id: Uuid, rating: u8) -> Result<usize> {
        let current_index = self
            .position_of(card_id)
            .ok_or(SchedulerError::CardNotFound(card_id))?;

        let mut card = self.cards.remove(current_index);
        if let Some(difficulty) = Difficulty::from_rating(rating) {
            card.difficulty = difficulty;
        } else {
            log::warn!(
                "scheduler: unrecognized rating {} for card {}, using default offset",
                rating,
                card_id
            );
        }
        card.review_count += 1;

        let insert_index = (current_index + reinsertion_offset(rating)).min(self.cards.len());
        self.cards.insert(insert_index, card);

        log::debug!(
            "scheduler: card {} rated {} moved {} -> {}",
            card_id,
            rating,
            current_index,
            insert_index
        );

        Ok(insert_index)
    }

    /// Remove a finished card from the active queue
    pub fn retire(&mut self, card_id: Uuid) -> Result<Card> {
        let index = self
            .position_of(card_id)
            .ok_or(SchedulerError::CardNotFound(card_id))?;
        Ok(self.cards.remove(index))
    }

    /// A queue with a single card left is not worth another grading round
    pub fn is_complete(&self) -> bool {
        self.cards.len() <= 1
    }

    pub fn head(&self) -> Option<&Card> {
        self.cards.first()
    }

    pub fn get(&self, card_id: Uuid) -> Option<&Card> {
        self.cards.iter().find(|c| c.id == card_id)
    }

    pub fn position_of(&self, card_id: Uuid) -> Option<usize> {
        self.cards.iter().position(|c| c.id == card_id)
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn ids(&self) -> Vec<Uuid> {
        self.cards.iter().map(|c| c.id).collect()
    }
}
