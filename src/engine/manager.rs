//! Study engine
//!
//! Binds sessions to the XP engine, the progress service and the content sources.
//! One user, one active session: starting a session discards the previous one.
//!
//! Every transition runs to completion under the engine lock, so transitions on a
//! session never interleave. The lock is never held across an await. Durable XP awards
//! are spawned and not awaited; completion waits for them with a bounded timeout.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use futures_util::future::join_all;
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::models::{CompletionReport, Collaborators, EngineError, Result, SessionHandle};
use super::reconcile::{ProgressSnapshot, ProgressView};
use crate::backend::{BackendError, ProgressService};
use crate::config::EngineConfig;
use crate::flashcards::Card;
use crate::progress::UserProgress;
use crate::session::{
    ChoiceSet, ExploreOutcome, GradeOutcome, GradeSignal, InputCheck, Phase, Rejection, Response,
    RevealResult, SessionError, SessionSummary, SprintSnapshot, SprintTimer, StudySession,
    Transition,
};
use crate::techniques::{unlocked_between, TechniqueId, TechniqueProfile};
use crate::xp::{Character, XpAward};

/// Handles of completed sessions remembered for `AlreadyComplete` answers
const FINISHED_HISTORY: usize = 64;

struct SessionSlot {
    handle: SessionHandle,
    session: StudySession,
    /// `None` when the progress service could not be asked at start
    level_at_start: Option<u32>,
    /// Lowest durable total seen before one of this session's awards
    xp_before: Arc<Mutex<Option<u64>>>,
    awards: Vec<JoinHandle<()>>,
    bonus_dispatched: bool,
    /// Dropping the slot stops the timer
    timer: Option<SprintTimer>,
}

struct EngineState {
    active: Option<SessionSlot>,
    finished: VecDeque<SessionHandle>,
    view: ProgressView,
}

fn lock_state(state: &Mutex<EngineState>) -> MutexGuard<'_, EngineState> {
    state.lock().unwrap_or_else(|e| e.into_inner())
}

fn mark_finished(finished: &mut VecDeque<SessionHandle>, handle: SessionHandle) {
    if finished.len() == FINISHED_HISTORY {
        finished.pop_front();
    }
    finished.push_back(handle);
}

/// Run a collaborator request, turning an expired `timeout` into `BackendError::Timeout`
async fn bounded<T>(
    timeout: Duration,
    request: impl Future<Output = crate::backend::Result<T>>,
) -> crate::backend::Result<T> {
    tokio::time::timeout(timeout, request)
        .await
        .unwrap_or_else(|_| Err(BackendError::Timeout(timeout.as_millis() as u64)))
}

fn slot_in<'a>(
    active: &'a mut Option<SessionSlot>,
    finished: &VecDeque<SessionHandle>,
    handle: SessionHandle,
) -> Result<&'a mut SessionSlot> {
    let is_active = active.as_ref().map_or(false, |slot| slot.handle == handle);
    if !is_active {
        if finished.contains(&handle) {
            return Err(EngineError::Session(SessionError::AlreadyComplete));
        }
        return Err(EngineError::UnknownSession(handle));
    }
    active.as_mut().ok_or(EngineError::UnknownSession(handle))
}

/// What a spawned award task needs to deliver and reconcile an award
#[derive(Clone)]
struct AwardContext {
    state: Weak<Mutex<EngineState>>,
    progress: Arc<dyn ProgressService>,
    user_id: String,
    timeout: Duration,
}

impl AwardContext {
    /// Record `award` locally and send it to the progress service in the background
    fn dispatch(&self, slot: &mut SessionSlot, view: &mut ProgressView, activity: String, award: &XpAward) {
        if award.total_xp == 0 {
            return;
        }
        let award_id = Uuid::new_v4();
        view.record_local(award_id, award.total_xp);

        let task = tokio::spawn(deliver_award(
            self.clone(),
            Arc::clone(&slot.xp_before),
            award_id,
            activity,
            award.total_xp,
        ));
        slot.awards.retain(|task| !task.is_finished());
        slot.awards.push(task);
    }

    fn dispatch_completion_bonus(&self, slot: &mut SessionSlot, view: &mut ProgressView) {
        if slot.bonus_dispatched {
            return;
        }
        let Some(bonus) = slot.session.summary().map(|s| s.completion_bonus) else {
            return;
        };
        slot.bonus_dispatched = true;
        let activity = format!("{}_completion", slot.session.technique().activity());
        let award = XpAward {
            total_xp: bonus,
            ..XpAward::zero()
        };
        self.dispatch(slot, view, activity, &award);
    }
}

async fn deliver_award(
    ctx: AwardContext,
    xp_before: Arc<Mutex<Option<u64>>>,
    award_id: Uuid,
    activity: String,
    amount: u64,
) {
    let result = bounded(
        ctx.timeout,
        ctx.progress.apply_xp(&ctx.user_id, &activity, amount),
    )
    .await;

    if let Ok(durable) = &result {
        let before = durable.total_xp.saturating_sub(durable.xp_earned);
        let mut xp_before = xp_before.lock().unwrap_or_else(|e| e.into_inner());
        *xp_before = Some(xp_before.map_or(before, |seen| seen.min(before)));
    }

    let Some(state) = ctx.state.upgrade() else {
        return;
    };
    let mut state = lock_state(&state);
    match result {
        Ok(durable) => {
            log::debug!(
                "engine: {} XP for {} confirmed, total {}",
                amount,
                activity,
                durable.total_xp
            );
            state.view.confirm_award(award_id, &durable);
        }
        Err(e) => {
            log::warn!("engine: could not record {} XP for {}: {}", amount, activity, e);
            state.view.award_failed(award_id);
        }
    }
}

pub struct StudyEngine {
    user_id: String,
    config: EngineConfig,
    collaborators: Collaborators,
    state: Arc<Mutex<EngineState>>,
}

impl StudyEngine {
    pub fn new(user_id: impl Into<String>, config: EngineConfig, collaborators: Collaborators) -> Self {
        let view = ProgressView::new(config.levels().clone());
        Self {
            user_id: user_id.into(),
            config,
            collaborators,
            state: Arc::new(Mutex::new(EngineState {
                active: None,
                finished: VecDeque::new(),
                view,
            })),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, EngineState> {
        lock_state(&self.state)
    }

    fn award_context(&self) -> AwardContext {
        AwardContext {
            state: Arc::downgrade(&self.state),
            progress: Arc::clone(&self.collaborators.progress),
            user_id: self.user_id.clone(),
            timeout: self.config.collaborator_timeout(),
        }
    }

    /// Run `f` on a live session under the engine lock
    fn with_session<T>(
        &self,
        handle: SessionHandle,
        f: impl FnOnce(&mut StudySession) -> Result<T>,
    ) -> Result<T> {
        let mut state = self.lock();
        let EngineState { active, finished, .. } = &mut *state;
        let slot = slot_in(active, finished, handle)?;
        f(&mut slot.session)
    }

    /// Read-only access to a live session
    pub fn inspect<T>(&self, handle: SessionHandle, f: impl FnOnce(&StudySession) -> T) -> Result<T> {
        self.with_session(handle, |session| Ok(f(session)))
    }

    /// Ask the progress service for the user's progress and fold it into the view
    pub async fn refresh_progress(&self) -> Option<UserProgress> {
        let request = self.collaborators.progress.get_progress(&self.user_id);
        match bounded(self.config.collaborator_timeout(), request).await {
            Ok(progress) => {
                self.lock().view.confirm_progress(&progress);
                Some(progress)
            }
            Err(e) => {
                log::warn!("engine: could not fetch progress for {}: {}", self.user_id, e);
                None
            }
        }
    }

    /// Level check against the progress service. When the service cannot be reached
    /// the last confirmed level is used; with none known the session is allowed and
    /// the returned level is `None`.
    async fn check_unlocked(&self, technique: TechniqueId) -> Result<Option<u32>> {
        let level = match self.refresh_progress().await {
            Some(progress) => Some(progress.level),
            None => self.lock().view.confirmed_level(),
        };

        match level {
            Some(level) if !technique.is_unlocked_at(level) => Err(EngineError::TechniqueLocked {
                technique,
                required_level: technique.required_level(),
                level,
            }),
            Some(level) => Ok(Some(level)),
            None => {
                log::warn!("engine: level unknown, not enforcing the unlock for {}", technique);
                Ok(None)
            }
        }
    }

    fn check_character(&self, character: &Option<Character>) -> Result<()> {
        if self.config.session.require_character && character.is_none() {
            return Err(EngineError::Rejected(Rejection::NoCharacterSelected));
        }
        Ok(())
    }

    /// Start a session over caller-supplied cards
    pub async fn start_session(
        &self,
        cards: Vec<Card>,
        technique: TechniqueId,
        character: Option<Character>,
    ) -> Result<SessionHandle> {
        self.check_character(&character)?;
        let level = self.check_unlocked(technique).await?;

        let session = StudySession::with_cards(
            TechniqueProfile::for_technique(technique),
            character,
            self.config.session_settings(),
            cards,
        );
        let handle = self.install(session, level);
        self.prepare_choices(handle).await;
        Ok(handle)
    }

    /// Start a session over cards generated for `topic`, falling back to the local deck
    /// when generation fails or returns nothing
    pub async fn open_session(
        &self,
        topic: &str,
        count: Option<usize>,
        technique: TechniqueId,
        character: Option<Character>,
    ) -> Result<SessionHandle> {
        self.check_character(&character)?;
        let level = self.check_unlocked(technique).await?;

        let count = count
            .filter(|&n| n > 0)
            .unwrap_or(self.config.session.default_card_count);
        let mut session = StudySession::new(
            TechniqueProfile::for_technique(technique),
            character,
            self.config.session_settings(),
        )
        .with_topic(topic);

        let request = self.collaborators.cards.generate_cards(topic, count);
        let cards = match bounded(self.config.collaborator_timeout(), request).await {
            Ok(drafts) => drafts.into_iter().take(count).map(Card::from_draft).collect(),
            Err(e) => {
                log::warn!("engine: card generation for {:?} failed: {}", topic, e);
                Vec::new()
            }
        };
        session.finish_loading(cards)?;

        let handle = self.install(session, level);
        self.prepare_choices(handle).await;
        Ok(handle)
    }

    fn install(&self, session: StudySession, level_at_start: Option<u32>) -> SessionHandle {
        let handle = SessionHandle(session.id());
        let timed = session.profile().timer_overlay;

        let mut state = self.lock();
        if let Some(previous) = state.active.take() {
            log::info!("engine: session {} replaced by {}", previous.handle, handle);
        }
        // The timer only starts once its session is in place
        let timer = timed.then(|| self.spawn_sprint_timer(handle));
        state.active = Some(SessionSlot {
            handle,
            session,
            level_at_start,
            xp_before: Arc::new(Mutex::new(None)),
            awards: Vec::new(),
            bonus_dispatched: false,
            timer,
        });
        handle
    }

    fn spawn_sprint_timer(&self, handle: SessionHandle) -> SprintTimer {
        let ctx = self.award_context();
        SprintTimer::spawn(self.config.sprint_tick(), move |elapsed| {
            let Some(state) = ctx.state.upgrade() else {
                return false;
            };
            let mut state = lock_state(&state);
            let EngineState { active, view, .. } = &mut *state;
            let Some(slot) = active.as_mut().filter(|slot| slot.handle == handle) else {
                return false;
            };

            match slot.session.sprint_tick(elapsed) {
                Ok(Some(tick)) => {
                    if let Some(award) = tick.award {
                        let activity = format!("{}_focus_block", slot.session.technique().activity());
                        ctx.dispatch(slot, view, activity, &award);
                    }
                    true
                }
                Ok(None) => true,
                Err(e) => {
                    log::debug!("engine: sprint timer for {} stopping: {}", handle, e);
                    false
                }
            }
        })
    }

    async fn fetch_distractors(&self, card: &Card) -> Vec<String> {
        let request = self.collaborators.distractors.generate_distractors(
            &card.question,
            &card.answer,
            self.config.session.distractor_count,
        );
        match bounded(self.config.collaborator_timeout(), request).await {
            Ok(distractors) => distractors,
            Err(e) => {
                log::warn!("engine: distractor generation failed, using fallback: {}", e);
                Vec::new()
            }
        }
    }

    /// Fetch distractors for the current card when its options are still missing
    async fn prepare_choices(&self, handle: SessionHandle) {
        let card = self
            .inspect(handle, |session| session.needs_choices().cloned())
            .ok()
            .flatten();
        let Some(card) = card else {
            return;
        };

        let distractors = self.fetch_distractors(&card).await;

        // The user may have moved on while distractors were generated
        let result = self.with_session(handle, |session| {
            if session.needs_choices().map(|c| c.id) == Some(card.id) {
                session.set_choices(card.id, distractors)?;
            }
            Ok(())
        });
        if let Err(e) = result {
            log::debug!("engine: dropping distractors for {}: {}", handle, e);
        }
    }

    pub fn update_draft(&self, handle: SessionHandle, text: &str) -> Result<InputCheck> {
        self.with_session(handle, |session| Ok(session.update_draft(text)?))
    }

    pub fn submit_response(
        &self,
        handle: SessionHandle,
        response: Response,
    ) -> Result<Transition<RevealResult>> {
        self.with_session(handle, |session| Ok(session.submit_response(response)?))
    }

    pub fn set_player_names(
        &self,
        handle: SessionHandle,
        first: &str,
        second: &str,
    ) -> Result<Transition<()>> {
        self.with_session(handle, |session| Ok(session.set_player_names(first, second)?))
    }

    /// Grade the revealed card. The award is applied locally at once and sent to the
    /// progress service in the background.
    pub async fn grade(
        &self,
        handle: SessionHandle,
        signal: GradeSignal,
    ) -> Result<Transition<GradeOutcome>> {
        let ctx = self.award_context();
        let transition = {
            let mut state = self.lock();
            let EngineState { active, finished, view } = &mut *state;
            let slot = slot_in(active, finished, handle)?;

            let transition = slot.session.grade(signal)?;
            if let Transition::Applied(outcome) = &transition {
                let activity = slot.session.technique().activity();
                ctx.dispatch(slot, view, activity, &outcome.award);
                if outcome.phase == Phase::Complete {
                    ctx.dispatch_completion_bonus(slot, view);
                    if let Some(timer) = slot.timer.take() {
                        timer.shutdown();
                    }
                }
            }
            transition
        };

        if matches!(&transition, Transition::Applied(outcome) if outcome.phase != Phase::Complete) {
            self.prepare_choices(handle).await;
        }
        Ok(transition)
    }

    /// Open a mind-map card
    pub async fn explore(&self, handle: SessionHandle, card_id: Uuid) -> Result<ExploreOutcome> {
        let ctx = self.award_context();
        let mut state = self.lock();
        let EngineState { active, finished, view } = &mut *state;
        let slot = slot_in(active, finished, handle)?;

        let outcome = slot.session.explore(card_id)?;
        if let Some(award) = &outcome.award {
            let activity = format!("{}_view", slot.session.technique().activity());
            ctx.dispatch(slot, view, activity, award);
        }
        Ok(outcome)
    }

    /// Link two mind-map cards
    pub async fn connect(
        &self,
        handle: SessionHandle,
        from: Uuid,
        to: Uuid,
    ) -> Result<Transition<ExploreOutcome>> {
        let ctx = self.award_context();
        let mut state = self.lock();
        let EngineState { active, finished, view } = &mut *state;
        let slot = slot_in(active, finished, handle)?;

        let transition = slot.session.connect(from, to)?;
        if let Transition::Applied(ExploreOutcome { award: Some(award), .. }) = &transition {
            let activity = format!("{}_connection", slot.session.technique().activity());
            ctx.dispatch(slot, view, activity, award);
        }
        Ok(transition)
    }

    pub fn sprint_start(&self, handle: SessionHandle) -> Result<SprintSnapshot> {
        self.with_session(handle, |session| Ok(session.sprint_start()?))
    }

    pub fn sprint_pause(&self, handle: SessionHandle) -> Result<SprintSnapshot> {
        self.with_session(handle, |session| Ok(session.sprint_pause()?))
    }

    pub fn sprint_reset(&self, handle: SessionHandle) -> Result<SprintSnapshot> {
        self.with_session(handle, |session| Ok(session.sprint_reset()?))
    }

    pub fn timer_snapshot(&self, handle: SessionHandle) -> Result<Option<SprintSnapshot>> {
        self.inspect(handle, |session| session.sprint_snapshot())
    }

    pub fn choices(&self, handle: SessionHandle) -> Result<Option<ChoiceSet>> {
        self.inspect(handle, |session| session.choices().cloned())
    }

    pub fn progress_view(&self) -> ProgressSnapshot {
        self.lock().view.snapshot()
    }

    /// Finish a session and report the user's progress.
    ///
    /// A session that completed on its own is simply closed; otherwise it is ended on
    /// the user's request, which may be rejected (e.g. too little of a mind map seen).
    pub async fn complete_session(
        &self,
        handle: SessionHandle,
    ) -> Result<Transition<CompletionReport>> {
        let ctx = self.award_context();
        let (summary, awards, level_at_start, xp_before) = {
            let mut state = self.lock();
            let EngineState { active, finished, view } = &mut *state;
            let slot = slot_in(active, finished, handle)?;

            let summary: SessionSummary = match slot.session.summary().cloned() {
                Some(summary) => summary,
                None => match slot.session.finish()? {
                    Transition::Applied(summary) => summary,
                    Transition::Rejected(rejection) => return Ok(Transition::Rejected(rejection)),
                },
            };
            ctx.dispatch_completion_bonus(slot, view);

            let Some(mut slot) = active.take() else {
                return Err(EngineError::UnknownSession(handle));
            };
            mark_finished(finished, handle);
            (
                summary,
                std::mem::take(&mut slot.awards),
                slot.level_at_start,
                Arc::clone(&slot.xp_before),
            )
        };

        let outstanding = awards.len();
        let flush = tokio::time::timeout(self.config.award_flush_timeout(), join_all(awards));
        if flush.await.is_err() {
            log::warn!(
                "engine: {} XP awards still in flight after {:?}",
                outstanding,
                self.config.award_flush_timeout()
            );
        }

        let (progress, progress_confirmed) = match self.refresh_progress().await {
            Some(progress) => (progress, true),
            None => (self.lock().view.estimate(&self.user_id), false),
        };

        // Without a level from the start, the durable total before the session's first
        // recorded award stands in for it
        let level_at_start = level_at_start.or_else(|| {
            let xp_before = *xp_before.lock().unwrap_or_else(|e| e.into_inner());
            xp_before.map(|xp| self.config.levels().level_for(xp))
        });
        let (leveled_up, newly_unlocked) = match level_at_start {
            Some(start) => (progress.level > start, unlocked_between(start, progress.level)),
            None => {
                log::warn!(
                    "engine: level of {} before session {} unknown, not reporting a level-up",
                    self.user_id,
                    handle
                );
                (false, Vec::new())
            }
        };
        if leveled_up {
            log::info!(
                "engine: {} reached level {}, unlocked {:?}",
                self.user_id,
                progress.level,
                newly_unlocked
            );
        }

        Ok(Transition::Applied(CompletionReport {
            summary,
            progress,
            progress_confirmed,
            leveled_up,
            newly_unlocked,
        }))
    }

    /// Drop a session without completing it. Its timer stops before this returns;
    /// XP already earned still reaches the progress service.
    pub fn dispose(&self, handle: SessionHandle) -> Result<()> {
        let mut state = self.lock();
        let EngineState { active, finished, .. } = &mut *state;
        slot_in(active, finished, handle)?;
        if let Some(slot) = active.take() {
            if let Some(timer) = &slot.timer {
                timer.shutdown();
            }
            log::info!("engine: session {} disposed", slot.handle);
        }
        Ok(())
    }
}
