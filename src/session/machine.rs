//! Study session state machine
//!
//! One lifecycle serves every technique:
//!
//! ```text
//! Loading -> Presenting -> [Collecting] -> Revealed -> Graded -> Presenting | Complete
//! ```
//!
//! Everything a technique changes about it lives in its [`TechniqueProfile`]. The
//! machine is synchronous and owns no I/O; the engine feeds it collaborator results and
//! timer ticks. Validation failures come back as [`Transition::Rejected`] and leave the
//! session untouched, misuse by the caller comes back as a [`SessionError`].

use std::collections::HashSet;

use rand::Rng;
use thiserror::Error;
use uuid::Uuid;

use super::models::{
    ChoiceOutcome, ChoiceSet, ExploreOutcome, GradeOutcome, GradeSignal, InputCheck, Phase,
    Rejection, Response, RevealResult, Scoreboard, SessionSummary, Transition,
};
use super::timer::{SprintClock, SprintEvent, SprintSnapshot};
use crate::flashcards::algorithm::{is_mastered, rating_is_correct};
use crate::flashcards::fallback::fallback_deck;
use crate::flashcards::{Card, CardQueue, SchedulerError};
use crate::techniques::{
    CardOrder, CollectingMode, GradingMode, InputGuard, SprintSettings, TechniqueId,
    TechniqueProfile,
};
use crate::xp::{compute_award, Character, XpAward};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Session is already complete")]
    AlreadyComplete,

    #[error("Cannot {action} while the session is {phase:?}")]
    InvalidTransition { action: &'static str, phase: Phase },

    #[error("{technique} sessions do not support {action}")]
    Unsupported {
        technique: TechniqueId,
        action: &'static str,
    },

    #[error("Card is not part of this session: {0}")]
    UnknownCard(Uuid),

    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
}

pub type Result<T> = std::result::Result<T, SessionError>;

/// Per-session knobs that do not depend on the technique
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    /// Easy ratings needed before an adaptive card leaves the queue
    pub mastery_reviews: u32,
    pub sprint: SprintSettings,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            mastery_reviews: 2,
            sprint: SprintSettings::default(),
        }
    }
}

/// XP from a finished focus block
#[derive(Debug, Clone, PartialEq)]
pub struct SprintTick {
    pub event: SprintEvent,
    pub award: Option<XpAward>,
    pub session_xp: u64,
}

pub struct StudySession {
    id: Uuid,
    profile: TechniqueProfile,
    character: Option<Character>,
    settings: SessionSettings,
    topic: Option<String>,
    phase: Phase,

    /// Every card of the session. Records persist after retirement.
    deck: Vec<Card>,
    /// Active queue for adaptive order
    queue: CardQueue,
    /// Position in `deck` for linear order
    cursor: usize,

    // Per-card state, cleared when the next card is presented
    draft: String,
    choices: Option<ChoiceSet>,
    revealed: Option<RevealResult>,

    session_xp: u64,
    graded: u32,
    correct: u32,
    completed_cards: HashSet<Uuid>,
    connections: HashSet<(Uuid, Uuid)>,
    players: Option<Scoreboard>,
    sprint: Option<SprintClock>,
    summary: Option<SessionSummary>,
}

impl StudySession {
    /// A session waiting for its cards
    pub fn new(
        profile: TechniqueProfile,
        character: Option<Character>,
        settings: SessionSettings,
    ) -> Self {
        let players = profile.two_players.then(Scoreboard::default);
        let sprint = profile
            .timer_overlay
            .then(|| SprintClock::new(settings.sprint));

        Self {
            id: Uuid::new_v4(),
            profile,
            character,
            settings,
            topic: None,
            phase: Phase::Loading,
            deck: Vec::new(),
            queue: CardQueue::default(),
            cursor: 0,
            draft: String::new(),
            choices: None,
            revealed: None,
            session_xp: 0,
            graded: 0,
            correct: 0,
            completed_cards: HashSet::new(),
            connections: HashSet::new(),
            players,
            sprint,
            summary: None,
        }
    }

    /// A session over a known card set, already presenting its first card
    pub fn with_cards(
        profile: TechniqueProfile,
        character: Option<Character>,
        settings: SessionSettings,
        cards: Vec<Card>,
    ) -> Self {
        let mut session = Self::new(profile, character, settings);
        session.seed(cards);
        session
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    /// Leave `Loading` with the cards the card source produced.
    ///
    /// An empty set is replaced by the local fallback deck for the topic; returns
    /// whether that happened.
    pub fn finish_loading(&mut self, cards: Vec<Card>) -> Result<bool> {
        if self.phase != Phase::Loading {
            return Err(self.invalid("finish loading"));
        }
        let used_fallback = cards.is_empty();
        self.seed(cards);
        Ok(used_fallback)
    }

    fn seed(&mut self, cards: Vec<Card>) {
        let mut cards = if cards.is_empty() {
            let topic = self.topic.as_deref().unwrap_or_default();
            log::warn!("session: no cards for {:?}, using the fallback deck", topic);
            fallback_deck(topic, 0)
        } else {
            cards
        };

        let mut seen = HashSet::new();
        cards.retain(|card| {
            let fresh = seen.insert(card.id);
            if !fresh {
                log::warn!("session: dropping duplicate card {}", card.id);
            }
            fresh
        });

        self.queue = CardQueue::initialize(cards);
        self.deck = self.queue.cards().to_vec();
        self.cursor = 0;
        log::info!(
            "session {}: {} with {} cards",
            self.id,
            self.profile.technique,
            self.deck.len()
        );
        self.present_next();
    }

    fn present_next(&mut self) {
        self.phase = Phase::Presenting;
        self.draft.clear();
        self.choices = None;
        self.revealed = None;
    }

    fn invalid(&self, action: &'static str) -> SessionError {
        SessionError::InvalidTransition {
            action,
            phase: self.phase,
        }
    }

    fn unsupported(&self, action: &'static str) -> SessionError {
        SessionError::Unsupported {
            technique: self.profile.technique,
            action,
        }
    }

    fn ensure_active(&self) -> Result<()> {
        if self.phase.is_terminal() {
            return Err(SessionError::AlreadyComplete);
        }
        Ok(())
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn technique(&self) -> TechniqueId {
        self.profile.technique
    }

    pub fn profile(&self) -> &TechniqueProfile {
        &self.profile
    }

    pub fn character(&self) -> Option<&Character> {
        self.character.as_ref()
    }

    pub fn topic(&self) -> Option<&str> {
        self.topic.as_deref()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn session_xp(&self) -> u64 {
        self.session_xp
    }

    pub fn deck(&self) -> &[Card] {
        &self.deck
    }

    pub fn queue(&self) -> &CardQueue {
        &self.queue
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn choices(&self) -> Option<&ChoiceSet> {
        self.choices.as_ref()
    }

    pub fn scoreboard(&self) -> Option<&Scoreboard> {
        self.players.as_ref()
    }

    pub fn summary(&self) -> Option<&SessionSummary> {
        self.summary.as_ref()
    }

    pub fn sprint_snapshot(&self) -> Option<SprintSnapshot> {
        self.sprint.as_ref().map(|clock| clock.snapshot())
    }

    /// The card being studied. Free exploration has no current card.
    pub fn current_card(&self) -> Option<&Card> {
        if self.phase == Phase::Loading || self.phase.is_terminal() {
            return None;
        }
        match self.profile.order {
            CardOrder::Adaptive => self.queue.head(),
            CardOrder::Linear => self.deck.get(self.cursor),
            CardOrder::FreeExplore => None,
        }
    }

    /// The card that still needs its multiple choice options, if any
    pub fn needs_choices(&self) -> Option<&Card> {
        if !matches!(self.profile.collecting, CollectingMode::Choice { .. }) {
            return None;
        }
        if !matches!(self.phase, Phase::Presenting | Phase::Collecting) {
            return None;
        }
        let card = self.current_card()?;
        match &self.choices {
            Some(choices) if choices.card_id == card.id => None,
            _ => Some(card),
        }
    }

    /// Attach options for `card_id` built from generated distractors
    pub fn set_choices(&mut self, card_id: Uuid, distractors: Vec<String>) -> Result<()> {
        self.set_choices_with_rng(card_id, distractors, &mut rand::thread_rng())
    }

    pub fn set_choices_with_rng<R: Rng + ?Sized>(
        &mut self,
        card_id: Uuid,
        distractors: Vec<String>,
        rng: &mut R,
    ) -> Result<()> {
        self.ensure_active()?;
        let CollectingMode::Choice { options } = self.profile.collecting else {
            return Err(self.unsupported("choices"));
        };
        if !matches!(self.phase, Phase::Presenting | Phase::Collecting) {
            return Err(self.invalid("set choices"));
        }
        let card = self
            .current_card()
            .filter(|card| card.id == card_id)
            .cloned()
            .ok_or(SessionError::UnknownCard(card_id))?;

        self.choices = Some(ChoiceSet::build(&card, distractors, options, rng));
        Ok(())
    }

    /// Name the two players of a turn-based session. Scores are kept.
    pub fn set_player_names(&mut self, first: &str, second: &str) -> Result<Transition<()>> {
        self.ensure_active()?;
        let Some(players) = self.players.as_mut() else {
            return Err(self.unsupported("player names"));
        };
        let (first, second) = (first.trim(), second.trim());
        if first.is_empty() || second.is_empty() {
            return Ok(Transition::Rejected(Rejection::BlankPlayerName));
        }
        players.players[0].name = first.to_string();
        players.players[1].name = second.to_string();
        Ok(Transition::Applied(()))
    }

    /// Record the text typed so far and report whether it would pass the reveal guard
    pub fn update_draft(&mut self, text: &str) -> Result<InputCheck> {
        self.ensure_active()?;
        let CollectingMode::Text { guard } = self.profile.collecting else {
            return Err(self.unsupported("text answers"));
        };
        if !matches!(self.phase, Phase::Presenting | Phase::Collecting) {
            return Err(self.invalid("edit the answer"));
        }

        self.draft = text.to_string();
        self.phase = Phase::Collecting;

        let blocked_by = guard.and_then(|guard| check_guard(guard, text));
        Ok(InputCheck {
            char_count: text.trim().chars().count(),
            word_count: text.split_whitespace().count(),
            ready: blocked_by.is_none(),
            blocked_by,
        })
    }

    /// Reveal the answer of the current card
    pub fn submit_response(&mut self, response: Response) -> Result<Transition<RevealResult>> {
        self.ensure_active()?;
        if self.profile.order == CardOrder::FreeExplore {
            return Err(self.unsupported("revealing cards"));
        }
        if !matches!(self.phase, Phase::Presenting | Phase::Collecting) {
            return Err(self.invalid("reveal"));
        }
        let card = self
            .current_card()
            .cloned()
            .ok_or_else(|| self.invalid("reveal"))?;

        let mut revealed = RevealResult {
            card_id: card.id,
            question: card.question.clone(),
            answer: card.answer.clone(),
            user_input: None,
            choice: None,
        };

        match (self.profile.collecting, response) {
            (CollectingMode::None, Response::Reveal) => {}
            (CollectingMode::Text { guard }, Response::Text(text)) => {
                if let Some(rejection) = guard.and_then(|guard| check_guard(guard, &text)) {
                    return Ok(Transition::Rejected(rejection));
                }
                self.draft = text.clone();
                revealed.user_input = Some(text);
            }
            (CollectingMode::Choice { .. }, Response::Choice(selected)) => {
                if self.needs_choices().is_some() {
                    log::debug!("session {}: no distractors yet, using fallback options", self.id);
                    self.set_choices(card.id, Vec::new())?;
                }
                let Some(choices) = self.choices.as_ref() else {
                    return Err(self.invalid("reveal"));
                };
                if selected >= choices.options.len() {
                    return Ok(Transition::Rejected(Rejection::InvalidOption {
                        index: selected,
                        options: choices.options.len(),
                    }));
                }
                revealed.user_input = Some(choices.options[selected].clone());
                revealed.choice = Some(ChoiceOutcome {
                    selected,
                    correct_index: choices.correct_index,
                    correct: selected == choices.correct_index,
                });
            }
            (CollectingMode::Choice { .. }, Response::Reveal) => {
                return Ok(Transition::Rejected(Rejection::NoOptionSelected));
            }
            _ => return Ok(Transition::Rejected(Rejection::WrongResponseKind)),
        }

        self.phase = Phase::Revealed;
        self.revealed = Some(revealed.clone());
        Ok(Transition::Applied(revealed))
    }

    /// Grade the revealed card, award XP and move on
    pub fn grade(&mut self, signal: GradeSignal) -> Result<Transition<GradeOutcome>> {
        self.ensure_active()?;
        if self.phase != Phase::Revealed {
            return Err(self.invalid("grade"));
        }
        let Some(revealed) = self.revealed.clone() else {
            return Err(self.invalid("grade"));
        };
        let card_id = revealed.card_id;

        let (correct, base_amount, rating) = match (self.profile.grading, signal) {
            (GradingMode::SelfAssessed, GradeSignal::Correct(correct)) => {
                (correct, self.profile.xp.for_correctness(correct), None)
            }
            (GradingMode::Automatic, GradeSignal::Auto) => {
                let correct = revealed.choice.as_ref().map_or(false, |c| c.correct);
                (correct, self.profile.xp.for_correctness(correct), None)
            }
            (GradingMode::DifficultyRating, GradeSignal::Rating(rating)) => {
                (rating_is_correct(rating), self.profile.xp.for_rating(rating), Some(rating))
            }
            (GradingMode::Exploration, _) => return Err(self.unsupported("grading")),
            (expected, _) => {
                return Ok(Transition::Rejected(Rejection::WrongSignal { expected }));
            }
        };

        // The scheduler may refuse, so it runs before anything else is touched.
        let mut requeued_at = None;
        let mut retired = false;
        if self.profile.order == CardOrder::Adaptive {
            requeued_at = Some(self.queue.grade(card_id, rating.unwrap_or(0))?);
            if let Some(card) = self.queue.get(card_id).cloned() {
                if let Some(record) = self.deck.iter_mut().find(|c| c.id == card_id) {
                    *record = card.clone();
                }
                if is_mastered(&card, self.settings.mastery_reviews) {
                    self.queue.retire(card_id)?;
                    retired = true;
                    requeued_at = None;
                    log::debug!("session {}: card {} mastered", self.id, card_id);
                }
            }
        }

        self.phase = Phase::Graded;
        let award = compute_award(base_amount, self.profile.technique, self.character.as_ref());
        self.session_xp += award.total_xp;
        self.graded += 1;
        if correct {
            self.correct += 1;
        }
        self.completed_cards.insert(card_id);

        let turn = self.players.as_mut().map(|players| {
            players.record_turn(correct);
            players.current_turn
        });

        let finished = match self.profile.order {
            CardOrder::Adaptive => self.queue.is_complete(),
            CardOrder::Linear if self.profile.timer_overlay => {
                // Cards cycle until the user ends the sprint
                self.cursor = (self.cursor + 1) % self.deck.len().max(1);
                false
            }
            CardOrder::Linear => {
                self.cursor += 1;
                self.cursor >= self.deck.len()
            }
            CardOrder::FreeExplore => false,
        };

        if finished {
            self.complete(false);
        } else {
            self.present_next();
        }

        Ok(Transition::Applied(GradeOutcome {
            card_id,
            correct,
            award,
            session_xp: self.session_xp,
            phase: self.phase,
            current_card: self.current_card().cloned(),
            requeued_at,
            retired,
            turn,
        }))
    }

    fn ensure_exploring(&self) -> Result<()> {
        self.ensure_active()?;
        if self.profile.order != CardOrder::FreeExplore {
            return Err(self.unsupported("exploration"));
        }
        if self.phase == Phase::Loading {
            return Err(self.invalid("explore"));
        }
        Ok(())
    }

    fn ensure_in_deck(&self, card_id: Uuid) -> Result<()> {
        if self.deck.iter().any(|c| c.id == card_id) {
            Ok(())
        } else {
            Err(SessionError::UnknownCard(card_id))
        }
    }

    fn explore_outcome(&self, award: Option<XpAward>) -> ExploreOutcome {
        ExploreOutcome {
            award,
            session_xp: self.session_xp,
            explored: self.completed_cards.len(),
            connections: self.connections.len(),
        }
    }

    /// Open a card of the map. Only the first view of each card earns XP.
    pub fn explore(&mut self, card_id: Uuid) -> Result<ExploreOutcome> {
        self.ensure_exploring()?;
        self.ensure_in_deck(card_id)?;

        let award = self.completed_cards.insert(card_id).then(|| {
            let award = compute_award(
                self.profile.xp.card_view,
                self.profile.technique,
                self.character.as_ref(),
            );
            self.session_xp += award.total_xp;
            award
        });
        Ok(self.explore_outcome(award))
    }

    /// Link two cards of the map. Each unordered pair earns XP once.
    pub fn connect(&mut self, from: Uuid, to: Uuid) -> Result<Transition<ExploreOutcome>> {
        self.ensure_exploring()?;
        self.ensure_in_deck(from)?;
        self.ensure_in_deck(to)?;
        if from == to {
            return Ok(Transition::Rejected(Rejection::SelfConnection));
        }

        let pair = if from < to { (from, to) } else { (to, from) };
        let award = self.connections.insert(pair).then(|| {
            let award = compute_award(
                self.profile.xp.connection,
                self.profile.technique,
                self.character.as_ref(),
            );
            self.session_xp += award.total_xp;
            award
        });
        Ok(Transition::Applied(self.explore_outcome(award)))
    }

    fn sprint_clock(&mut self) -> Result<&mut SprintClock> {
        self.ensure_active()?;
        let technique = self.profile.technique;
        self.sprint.as_mut().ok_or(SessionError::Unsupported {
            technique,
            action: "the sprint timer",
        })
    }

    pub fn sprint_start(&mut self) -> Result<SprintSnapshot> {
        let clock = self.sprint_clock()?;
        clock.start();
        Ok(clock.snapshot())
    }

    pub fn sprint_pause(&mut self) -> Result<SprintSnapshot> {
        let clock = self.sprint_clock()?;
        clock.pause();
        Ok(clock.snapshot())
    }

    pub fn sprint_reset(&mut self) -> Result<SprintSnapshot> {
        let clock = self.sprint_clock()?;
        clock.reset();
        Ok(clock.snapshot())
    }

    /// Feed elapsed time to the sprint clock. A finished focus block earns XP.
    pub fn sprint_tick(&mut self, elapsed: std::time::Duration) -> Result<Option<SprintTick>> {
        let Some(event) = self.sprint_clock()?.advance(elapsed) else {
            return Ok(None);
        };

        let award = match event {
            SprintEvent::FocusCompleted { blocks } => {
                let award = compute_award(
                    self.profile.xp.focus_block,
                    self.profile.technique,
                    self.character.as_ref(),
                );
                self.session_xp += award.total_xp;
                log::info!("session {}: focus block {} done (+{} XP)", self.id, blocks, award.total_xp);
                Some(award)
            }
            SprintEvent::BreakCompleted => None,
        };

        Ok(Some(SprintTick {
            event,
            award,
            session_xp: self.session_xp,
        }))
    }

    /// End the session on the user's request.
    ///
    /// Techniques that run until the user stops (sprint timer, free exploration) earn
    /// their completion bonus here. A deck left unfinished earns none.
    pub fn finish(&mut self) -> Result<Transition<SessionSummary>> {
        self.ensure_active()?;
        if self.phase == Phase::Loading {
            return Err(self.invalid("finish"));
        }

        let open_ended =
            self.profile.timer_overlay || self.profile.order == CardOrder::FreeExplore;

        if self.profile.order == CardOrder::FreeExplore {
            let required =
                (self.deck.len() as f64 * self.profile.min_explored_ratio).ceil() as usize;
            let explored = self.completed_cards.len();
            if explored < required {
                return Ok(Transition::Rejected(Rejection::NotEnoughExplored {
                    explored,
                    required,
                }));
            }
        }

        let summary = self.complete(!open_ended);
        Ok(Transition::Applied(summary))
    }

    fn complete(&mut self, ended_early: bool) -> SessionSummary {
        debug_assert!(!self.phase.is_terminal());

        let completion_bonus = if ended_early {
            0
        } else {
            self.profile.completion_bonus
        };
        self.session_xp += completion_bonus;
        self.phase = Phase::Complete;
        if let Some(clock) = self.sprint.as_mut() {
            clock.pause();
        }
        self.draft.clear();
        self.choices = None;
        self.revealed = None;

        let summary = SessionSummary {
            technique: self.profile.technique,
            completed: self.completed_cards.len(),
            total: self.deck.len(),
            xp: self.session_xp,
            correct: self.correct,
            graded: self.graded,
            completion_bonus,
            ended_early,
            focus_blocks: self
                .sprint
                .as_ref()
                .map_or(0, |clock| clock.completed_focus_blocks()),
            connections: self.connections.len(),
            players: self.players.clone(),
        };

        log::info!(
            "session {}: complete, {} of {} cards, {} XP (bonus {})",
            self.id,
            summary.completed,
            summary.total,
            summary.xp,
            completion_bonus
        );

        self.summary = Some(summary.clone());
        summary
    }
}

fn check_guard(guard: InputGuard, text: &str) -> Option<Rejection> {
    match guard {
        InputGuard::MinChars(min) => {
            let actual = text.trim().chars().count();
            (actual < min).then_some(Rejection::AnswerTooShort { min, actual })
        }
        InputGuard::MinWords(min) => {
            let actual = text.split_whitespace().count();
            (actual < min).then_some(Rejection::TooFewWords { min, actual })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xp::find_character;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn deck(n: usize) -> Vec<Card> {
        (0..n)
            .map(|i| Card::new(format!("Question {}", i), format!("Answer {}", i)))
            .collect()
    }

    fn session(technique: TechniqueId, cards: usize) -> StudySession {
        StudySession::with_cards(
            TechniqueProfile::for_technique(technique),
            None,
            SessionSettings::default(),
            deck(cards),
        )
    }

    fn reveal_and_grade(session: &mut StudySession, signal: GradeSignal) -> GradeOutcome {
        assert!(session.submit_response(Response::Reveal).unwrap().is_applied());
        session.grade(signal).unwrap().applied().unwrap()
    }

    #[test]
    fn test_flashcards_full_pass_adds_bonus_once() {
        let mut s = session(TechniqueId::Flashcards, 3);
        assert_eq!(s.phase(), Phase::Presenting);

        let first = reveal_and_grade(&mut s, GradeSignal::Correct(true));
        assert_eq!(first.session_xp, 15);
        assert_eq!(first.phase, Phase::Presenting);
        reveal_and_grade(&mut s, GradeSignal::Correct(false));
        let last = reveal_and_grade(&mut s, GradeSignal::Correct(true));

        assert_eq!(last.phase, Phase::Complete);
        assert!(last.current_card.is_none());
        assert_eq!(last.session_xp, 15 + 5 + 15 + 50);

        let summary = s.summary().unwrap();
        assert_eq!(summary.completed, 3);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.correct, 2);
        assert_eq!(summary.completion_bonus, 50);
        assert!(!summary.ended_early);
    }

    #[test]
    fn test_specialty_character_bonus_per_card() {
        let mut s = StudySession::with_cards(
            TechniqueProfile::for_technique(TechniqueId::Flashcards),
            find_character("Cloe"),
            SessionSettings::default(),
            deck(2),
        );
        let outcome = reveal_and_grade(&mut s, GradeSignal::Correct(true));
        assert_eq!(outcome.award.total_xp, 23);
        assert_eq!(outcome.award.bonus, 8);
        let outcome = reveal_and_grade(&mut s, GradeSignal::Correct(false));
        assert_eq!(outcome.award.total_xp, 8);
        // The completion bonus is flat
        assert_eq!(outcome.session_xp, 23 + 8 + 50);
    }

    #[test]
    fn test_transitions_after_complete_fail() {
        let mut s = session(TechniqueId::Flashcards, 1);
        reveal_and_grade(&mut s, GradeSignal::Correct(true));
        assert_eq!(s.phase(), Phase::Complete);
        assert_eq!(
            s.submit_response(Response::Reveal),
            Err(SessionError::AlreadyComplete)
        );
        assert_eq!(s.grade(GradeSignal::Correct(true)), Err(SessionError::AlreadyComplete));
        assert!(matches!(s.finish(), Err(SessionError::AlreadyComplete)));
    }

    #[test]
    fn test_grade_before_reveal_is_invalid() {
        let mut s = session(TechniqueId::Flashcards, 2);
        assert_eq!(
            s.grade(GradeSignal::Correct(true)),
            Err(SessionError::InvalidTransition {
                action: "grade",
                phase: Phase::Presenting
            })
        );
    }

    #[test]
    fn test_wrong_signal_is_rejected_without_change() {
        let mut s = session(TechniqueId::Flashcards, 2);
        s.submit_response(Response::Reveal).unwrap();
        let result = s.grade(GradeSignal::Rating(3)).unwrap();
        assert_eq!(
            result.rejection(),
            Some(&Rejection::WrongSignal {
                expected: GradingMode::SelfAssessed
            })
        );
        assert_eq!(s.phase(), Phase::Revealed);
        assert_eq!(s.session_xp(), 0);
    }

    #[test]
    fn test_active_recall_guard() {
        let mut s = session(TechniqueId::ActiveRecall, 2);

        let check = s.update_draft("hi").unwrap();
        assert!(!check.ready);
        assert_eq!(s.phase(), Phase::Collecting);

        let result = s.submit_response(Response::Text("hi".to_string())).unwrap();
        assert_eq!(
            result.rejection(),
            Some(&Rejection::AnswerTooShort { min: 3, actual: 2 })
        );
        assert_eq!(s.phase(), Phase::Collecting);

        let revealed = s
            .submit_response(Response::Text("mitochondria".to_string()))
            .unwrap()
            .applied()
            .unwrap();
        assert_eq!(revealed.user_input.as_deref(), Some("mitochondria"));
        assert_eq!(s.phase(), Phase::Revealed);

        let outcome = s.grade(GradeSignal::Correct(true)).unwrap().applied().unwrap();
        assert_eq!(outcome.award.total_xp, 20);
        assert_eq!(s.draft(), "");
    }

    #[test]
    fn test_feynman_counts_words() {
        let mut s = session(TechniqueId::Feynman, 1);
        let result = s
            .submit_response(Response::Text("it is basically energy".to_string()))
            .unwrap();
        assert_eq!(
            result.rejection(),
            Some(&Rejection::TooFewWords { min: 10, actual: 4 })
        );

        let explanation = "plants use sunlight to turn water and carbon dioxide into sugar";
        assert!(s.update_draft(explanation).unwrap().ready);
        assert!(s
            .submit_response(Response::Text(explanation.to_string()))
            .unwrap()
            .is_applied());
        let outcome = s.grade(GradeSignal::Correct(true)).unwrap().applied().unwrap();
        assert_eq!(outcome.session_xp, 30);
        assert_eq!(outcome.phase, Phase::Complete);
    }

    #[test]
    fn test_response_kind_must_match() {
        let mut s = session(TechniqueId::Flashcards, 1);
        let result = s.submit_response(Response::Text("x".to_string())).unwrap();
        assert_eq!(result.rejection(), Some(&Rejection::WrongResponseKind));
        assert!(matches!(
            s.update_draft("x"),
            Err(SessionError::Unsupported { .. })
        ));
    }

    #[test]
    fn test_multiple_choice_grades_automatically() {
        let mut s = session(TechniqueId::MultipleChoice, 2);
        let card = s.needs_choices().cloned().unwrap();
        let mut rng = StdRng::seed_from_u64(42);
        s.set_choices_with_rng(
            card.id,
            vec!["Red herring".to_string(), "Decoy".to_string(), "Trap".to_string()],
            &mut rng,
        )
        .unwrap();
        assert!(s.needs_choices().is_none());

        let choices = s.choices().unwrap().clone();
        assert_eq!(choices.options.len(), 4);

        assert_eq!(
            s.submit_response(Response::Reveal).unwrap().rejection(),
            Some(&Rejection::NoOptionSelected)
        );
        assert_eq!(
            s.submit_response(Response::Choice(9)).unwrap().rejection(),
            Some(&Rejection::InvalidOption {
                index: 9,
                options: 4
            })
        );

        let revealed = s
            .submit_response(Response::Choice(choices.correct_index))
            .unwrap()
            .applied()
            .unwrap();
        assert!(revealed.choice.unwrap().correct);

        // The user cannot overrule the automatic check
        assert!(s.grade(GradeSignal::Correct(false)).unwrap().rejection().is_some());
        let outcome = s.grade(GradeSignal::Auto).unwrap().applied().unwrap();
        assert!(outcome.correct);
        assert_eq!(outcome.award.total_xp, 20);

        // Second card gets fallback options when none were generated
        assert!(s.needs_choices().is_some());
        s.submit_response(Response::Choice(0)).unwrap();
        let outcome = s.grade(GradeSignal::Auto).unwrap().applied().unwrap();
        assert_eq!(outcome.phase, Phase::Complete);
        assert_eq!(s.summary().unwrap().completion_bonus, 0);
    }

    #[test]
    fn test_spaced_repetition_retires_mastered_cards() {
        let mut s = session(TechniqueId::SpacedRepetition, 3);
        let ids = s.queue().ids();

        // Three Easy ratings send every card to the back once
        for expected in &ids {
            let outcome = reveal_and_grade(&mut s, GradeSignal::Rating(3));
            assert_eq!(outcome.card_id, *expected);
            assert!(!outcome.retired);
        }
        assert_eq!(s.queue().ids(), ids);

        let outcome = reveal_and_grade(&mut s, GradeSignal::Rating(3));
        assert!(outcome.retired);
        assert_eq!(s.queue().len(), 2);
        assert_eq!(outcome.current_card.unwrap().id, ids[1]);

        let outcome = reveal_and_grade(&mut s, GradeSignal::Rating(3));
        assert_eq!(outcome.phase, Phase::Complete);

        let summary = s.summary().unwrap();
        assert_eq!(summary.completed, 3);
        assert_eq!(summary.graded, 5);
        assert_eq!(summary.xp, 5 * 25 + 75);
        // Retired records stay in the deck
        assert_eq!(s.deck().len(), 3);
        assert_eq!(s.deck()[0].review_count, 2);
    }

    #[test]
    fn test_spaced_repetition_hard_card_comes_back() {
        let mut s = session(TechniqueId::SpacedRepetition, 4);
        let ids = s.queue().ids();
        let outcome = reveal_and_grade(&mut s, GradeSignal::Rating(1));
        assert_eq!(outcome.requeued_at, Some(1));
        assert_eq!(outcome.award.total_xp, 5);
        assert!(!outcome.correct);
        assert_eq!(s.queue().ids(), vec![ids[1], ids[0], ids[2], ids[3]]);

        // Unrecognized ratings still move the card and earn the unrated amount
        let outcome = reveal_and_grade(&mut s, GradeSignal::Rating(0));
        assert_eq!(outcome.requeued_at, Some(2));
        assert_eq!(outcome.award.total_xp, 10);
    }

    #[test]
    fn test_study_buddy_alternates_turns() {
        let mut s = session(TechniqueId::StudyBuddy, 3);
        assert_eq!(
            s.set_player_names(" ", "Ben").unwrap().rejection(),
            Some(&Rejection::BlankPlayerName)
        );
        assert!(s.set_player_names("Ann", "Ben").unwrap().is_applied());

        assert_eq!(reveal_and_grade(&mut s, GradeSignal::Correct(true)).turn, Some(2));
        assert_eq!(reveal_and_grade(&mut s, GradeSignal::Correct(true)).turn, Some(1));
        reveal_and_grade(&mut s, GradeSignal::Correct(false));

        let board = s.summary().unwrap().players.clone().unwrap();
        assert_eq!(board.players[0].score, 1);
        assert_eq!(board.players[1].score, 1);
        assert_eq!(board.leader(), None);
    }

    #[test]
    fn test_mind_mapping_exploration() {
        let mut s = session(TechniqueId::MindMapping, 4);
        let ids: Vec<Uuid> = s.deck().iter().map(|c| c.id).collect();
        assert!(s.current_card().is_none());
        assert!(matches!(
            s.submit_response(Response::Reveal),
            Err(SessionError::Unsupported { .. })
        ));

        assert_eq!(s.explore(ids[0]).unwrap().award.unwrap().total_xp, 15);
        assert!(s.explore(ids[0]).unwrap().award.is_none());
        assert_eq!(
            s.finish().unwrap().rejection(),
            Some(&Rejection::NotEnoughExplored {
                explored: 1,
                required: 2
            })
        );
        assert_eq!(s.phase(), Phase::Presenting);

        let linked = s.connect(ids[0], ids[2]).unwrap().applied().unwrap();
        assert_eq!(linked.award.unwrap().total_xp, 25);
        let again = s.connect(ids[2], ids[0]).unwrap().applied().unwrap();
        assert!(again.award.is_none());
        assert_eq!(
            s.connect(ids[1], ids[1]).unwrap().rejection(),
            Some(&Rejection::SelfConnection)
        );
        assert!(matches!(
            s.explore(Uuid::new_v4()),
            Err(SessionError::UnknownCard(_))
        ));

        s.explore(ids[3]).unwrap();
        let summary = s.finish().unwrap().applied().unwrap();
        assert_eq!(summary.completed, 2);
        assert_eq!(summary.connections, 1);
        assert_eq!(summary.xp, 15 + 25 + 15 + 100);
    }

    #[test]
    fn test_pomodoro_cycles_cards_until_finished() {
        let settings = SessionSettings {
            mastery_reviews: 2,
            sprint: SprintSettings {
                focus: std::time::Duration::from_secs(2),
                rest: std::time::Duration::from_secs(1),
            },
        };
        let mut s = StudySession::with_cards(
            TechniqueProfile::for_technique(TechniqueId::Pomodoro),
            find_character("Jade"),
            settings,
            deck(2),
        );

        for _ in 0..3 {
            let outcome = reveal_and_grade(&mut s, GradeSignal::Correct(true));
            assert_eq!(outcome.phase, Phase::Presenting);
        }
        assert_eq!(s.session_xp(), 3 * 23);

        assert!(s.sprint_tick(std::time::Duration::from_secs(5)).unwrap().is_none());
        s.sprint_start().unwrap();
        assert!(s.sprint_tick(std::time::Duration::from_secs(1)).unwrap().is_none());
        let tick = s.sprint_tick(std::time::Duration::from_secs(1)).unwrap().unwrap();
        assert_eq!(tick.event, SprintEvent::FocusCompleted { blocks: 1 });
        assert_eq!(tick.award.unwrap().total_xp, 60);

        let summary = s.finish().unwrap().applied().unwrap();
        assert_eq!(summary.focus_blocks, 1);
        assert_eq!(summary.xp, 3 * 23 + 60);
        assert!(!summary.ended_early);
        assert_eq!(s.sprint_tick(std::time::Duration::from_secs(1)), Err(SessionError::AlreadyComplete));
    }

    #[test]
    fn test_sprint_is_pomodoro_only() {
        let mut s = session(TechniqueId::Flashcards, 2);
        assert!(s.sprint_snapshot().is_none());
        assert!(matches!(s.sprint_start(), Err(SessionError::Unsupported { .. })));
    }

    #[test]
    fn test_finishing_a_deck_early_forfeits_bonus() {
        let mut s = session(TechniqueId::Flashcards, 3);
        reveal_and_grade(&mut s, GradeSignal::Correct(true));
        let summary = s.finish().unwrap().applied().unwrap();
        assert!(summary.ended_early);
        assert_eq!(summary.completion_bonus, 0);
        assert_eq!(summary.xp, 15);
        assert_eq!(summary.completed, 1);
    }

    #[test]
    fn test_loading_falls_back_on_empty_result() {
        let mut s = StudySession::new(
            TechniqueProfile::for_technique(TechniqueId::Flashcards),
            None,
            SessionSettings::default(),
        )
        .with_topic("Photosynthesis");
        assert_eq!(s.phase(), Phase::Loading);
        assert!(s.current_card().is_none());
        assert!(matches!(
            s.submit_response(Response::Reveal),
            Err(SessionError::InvalidTransition { .. })
        ));

        assert!(s.finish_loading(Vec::new()).unwrap());
        assert_eq!(s.phase(), Phase::Presenting);
        assert_eq!(s.deck().len(), 5);
        assert_eq!(
            s.current_card().unwrap().question,
            "What is the main concept of Photosynthesis?"
        );
        assert!(s.finish_loading(deck(2)).is_err());
    }

    #[test]
    fn test_duplicate_card_ids_are_dropped() {
        let card = Card::new("Q", "A");
        let s = StudySession::with_cards(
            TechniqueProfile::for_technique(TechniqueId::Flashcards),
            None,
            SessionSettings::default(),
            vec![card.clone(), card],
        );
        assert_eq!(s.deck().len(), 1);
    }
}
