use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::task::JoinSet;
use tracing::{debug, warn};

use storage::repository::{
    ImageLookup, ImageRepository, QuestionRecord, QuestionRepository, StorageError,
};
use train_core::Clock;
use train_core::builtin::{starter_for_subject, starter_questions};
use train_core::model::{Difficulty, Question, QuestionId, RewardImage, SessionSettings, Subject};

use crate::error::{FetchError, SessionError};
use crate::generator::QuestionSource;
use crate::placement::PlacementBuilder;
use crate::policy::{PolicyContext, SessionPolicy, SourceDecision};
use crate::random::RandomSource;

/// How many recently stored prompts are handed to the generator as a ban
/// list per call.
const BAN_LIST_LIMIT: u32 = 24;

/// Observable buffer lifecycle per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferPhase {
    Empty,
    Filling,
    Ready,
    Draining,
}

/// Session-scoped buffer state, owned exclusively by the manager.
struct SessionState {
    /// Bumped on every session start and teardown; a completion callback
    /// whose epoch no longer matches touches nothing.
    epoch: u64,
    active: bool,
    draining: bool,
    subject: Subject,
    difficulty: Difficulty,
    queue: VecDeque<Question>,
    inflight: usize,
    /// A placement question entered this session's queue; no further one may.
    placement_enqueued: bool,
    /// A placement question was delivered; stragglers in the queue are void.
    placement_delivered: bool,
    last_was_placement: bool,
    /// Set on a rate-limited generation failure; the session runs cache-only
    /// from then on.
    generation_paused: bool,
    /// The question currently displayed, kept for late image attachment.
    current: Option<Question>,
}

impl SessionState {
    fn inactive() -> Self {
        Self {
            epoch: 0,
            active: false,
            draining: false,
            subject: Subject::Math,
            difficulty: Difficulty::MIN,
            queue: VecDeque::new(),
            inflight: 0,
            placement_enqueued: false,
            placement_delivered: false,
            last_was_placement: false,
            generation_paused: false,
            current: None,
        }
    }
}

/// Keeps the active session's lookahead queue topped up and hands questions
/// to the UI in queue order.
///
/// Fill tasks run concurrently and append on completion, so queue position is
/// decided by completion time, not fetch start time. All spawned tasks live
/// in a per-manager pool that teardown aborts and drains, and every
/// completion callback is guarded by the owning session's epoch.
#[derive(Clone)]
pub struct BufferManager {
    state: Arc<Mutex<SessionState>>,
    tasks: Arc<tokio::sync::Mutex<JoinSet<()>>>,
    policy: SessionPolicy,
    placements: PlacementBuilder,
    questions: Arc<dyn QuestionRepository>,
    images: Arc<dyn ImageRepository>,
    source: Option<Arc<dyn QuestionSource>>,
    random: Arc<dyn RandomSource>,
    settings: SessionSettings,
    clock: Clock,
}

impl BufferManager {
    #[must_use]
    pub fn new(
        questions: Arc<dyn QuestionRepository>,
        images: Arc<dyn ImageRepository>,
        source: Option<Arc<dyn QuestionSource>>,
        random: Arc<dyn RandomSource>,
        settings: SessionSettings,
        clock: Clock,
    ) -> Self {
        let policy = SessionPolicy::new(Arc::clone(&questions), Arc::clone(&random));
        let placements = PlacementBuilder::new(Arc::clone(&random));
        Self {
            state: Arc::new(Mutex::new(SessionState::inactive())),
            tasks: Arc::new(tokio::sync::Mutex::new(JoinSet::new())),
            policy,
            placements,
            questions,
            images,
            source,
            random,
            settings,
            clock,
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Resets buffer state for a new session and kicks the initial top-up.
    pub async fn start_session(&self, subject: Subject, difficulty: Difficulty) {
        self.teardown().await;
        {
            let mut state = self.lock_state();
            state.epoch += 1;
            state.active = true;
            state.draining = false;
            state.subject = subject;
            state.difficulty = difficulty;
            state.queue.clear();
            state.inflight = 0;
            state.placement_enqueued = false;
            state.placement_delivered = false;
            state.last_was_placement = false;
            state.generation_paused = false;
            state.current = None;
        }
        self.top_up().await;
    }

    /// Tears the session down: no further question will be served and no
    /// stale fill task can touch the state afterwards.
    pub async fn end_session(&self) {
        self.teardown().await;
    }

    async fn teardown(&self) {
        {
            let mut state = self.lock_state();
            state.epoch += 1;
            state.active = false;
            state.draining = true;
            state.queue.clear();
            state.inflight = 0;
            state.current = None;
        }
        let mut tasks = self.tasks.lock().await;
        tasks.abort_all();
        while tasks.join_next().await.is_some() {}
        drop(tasks);
        self.lock_state().draining = false;
    }

    /// Waits for every in-flight fill task to finish. Used by tests and by
    /// callers that want a fully settled buffer before inspecting it.
    pub async fn settle(&self) {
        let mut tasks = self.tasks.lock().await;
        while tasks.join_next().await.is_some() {}
    }

    #[must_use]
    pub fn phase(&self) -> BufferPhase {
        let state = self.lock_state();
        if state.draining {
            BufferPhase::Draining
        } else if !state.active {
            BufferPhase::Empty
        } else if !state.queue.is_empty() {
            BufferPhase::Ready
        } else if state.inflight > 0 {
            BufferPhase::Filling
        } else {
            BufferPhase::Empty
        }
    }

    #[must_use]
    pub fn queue_len(&self) -> usize {
        self.lock_state().queue.len()
    }

    #[must_use]
    pub fn inflight(&self) -> usize {
        self.lock_state().inflight
    }

    /// The question currently displayed to the learner, if any.
    #[must_use]
    pub fn current_question(&self) -> Option<Question> {
        self.lock_state().current.clone()
    }

    /// Pops the next ready question, or fetches one synchronously when the
    /// queue is empty. Never fails for lack of content: the emergency path
    /// widens to an any-difficulty sample and finally the built-in pack.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotStarted` if no session is active.
    pub async fn request_next(&self) -> Result<Question, SessionError> {
        let popped = {
            let mut state = self.lock_state();
            if !state.active {
                return Err(SessionError::NotStarted);
            }
            if state.placement_delivered {
                // Once one placement has been shown, queued stragglers
                // (possible under a fill race) are void: drop, never serve.
                state.queue.retain(|q| !q.is_placement());
            }
            let question = state.queue.pop_front();
            if let Some(question) = &question {
                Self::note_delivery(&mut state, question);
            }
            question
        };

        let question = match popped {
            Some(question) => question,
            None => {
                let question = self.emergency_fetch().await;
                let mut state = self.lock_state();
                if !state.active {
                    return Err(SessionError::NotStarted);
                }
                Self::note_delivery(&mut state, &question);
                question
            }
        };

        self.top_up().await;
        Ok(question)
    }

    fn note_delivery(state: &mut SessionState, question: &Question) {
        if question.is_placement() {
            state.placement_delivered = true;
            state.last_was_placement = true;
        } else {
            state.last_was_placement = false;
        }
        state.current = Some(question.clone());
    }

    /// Launches fill tasks for every open slot, keeping
    /// `queue.len() + inflight` at or under the target size.
    pub async fn top_up(&self) {
        let (epoch, needed) = {
            let mut state = self.lock_state();
            if !state.active {
                return;
            }
            let target = self.settings.target_buffer_size() as usize;
            let filled = state.queue.len() + state.inflight;
            if filled >= target {
                return;
            }
            let needed = target - filled;
            state.inflight += needed;
            (state.epoch, needed)
        };

        let mut tasks = self.tasks.lock().await;
        for _ in 0..needed {
            let manager = self.clone();
            tasks.spawn(async move {
                manager.fill_one(epoch).await;
            });
        }
    }

    /// One fill task: fetch a question, append it (completion order decides
    /// queue position), then try to attach its reward image.
    async fn fill_one(&self, epoch: u64) {
        let question = match self.fetch_candidate(epoch, true).await {
            Ok(question) => question,
            Err(err) => {
                warn!(error = %err, "buffer fill failed; slot left unfilled this cycle");
                self.finish_slot(epoch);
                return;
            }
        };

        let appended = {
            let mut state = self.lock_state();
            if state.epoch != epoch {
                // Session torn down while we were fetching; the result is
                // simply discarded.
                None
            } else {
                state.inflight = state.inflight.saturating_sub(1);
                if question.is_placement()
                    && (state.placement_enqueued || state.placement_delivered)
                {
                    debug!("discarding surplus placement question");
                    None
                } else {
                    if question.is_placement() {
                        state.placement_enqueued = true;
                    }
                    state.queue.push_back(question.clone());
                    Some(question)
                }
            }
        };

        if let Some(question) = appended {
            self.attach_image_later(epoch, &question).await;
        }
    }

    fn finish_slot(&self, epoch: u64) {
        let mut state = self.lock_state();
        if state.epoch == epoch {
            state.inflight = state.inflight.saturating_sub(1);
        }
    }

    /// Obtains one question according to the session policy.
    async fn fetch_candidate(
        &self,
        epoch: u64,
        allow_placement: bool,
    ) -> Result<Question, FetchError> {
        let (subject, difficulty, ctx) = {
            let state = self.lock_state();
            if state.epoch != epoch || !state.active {
                return Err(FetchError::SessionClosed);
            }
            let ctx = PolicyContext {
                allow_placement,
                placement_seen: state.placement_enqueued || state.placement_delivered,
                last_was_placement: state.last_was_placement,
                generation_available: self.source.is_some() && !state.generation_paused,
            };
            (state.subject, state.difficulty, ctx)
        };

        match self.policy.decide(subject, difficulty, &ctx).await? {
            SourceDecision::Placement => {
                let question = self.placements.build(difficulty, self.clock.now())?;
                Ok(question)
            }
            SourceDecision::Generate => {
                match self.generate_new(epoch, subject, difficulty).await {
                    Ok(question) => Ok(question),
                    Err(err) => {
                        // A failed generation still has the cache to lean on.
                        match self.cache_sample(subject, Some(difficulty)).await? {
                            Some(question) => Ok(question),
                            None => Err(err),
                        }
                    }
                }
            }
            SourceDecision::Cache => {
                match self.cache_sample(subject, Some(difficulty)).await? {
                    Some(question) => Ok(question),
                    None if ctx.generation_available => {
                        self.generate_new(epoch, subject, difficulty).await
                    }
                    None => Err(FetchError::EmptyCache),
                }
            }
        }
    }

    async fn generate_new(
        &self,
        epoch: u64,
        subject: Subject,
        difficulty: Difficulty,
    ) -> Result<Question, FetchError> {
        let Some(source) = &self.source else {
            return Err(FetchError::Generation(
                crate::error::GenerationError::Disabled,
            ));
        };

        let ban_list = match self
            .questions
            .recent_prompts(subject, difficulty, BAN_LIST_LIMIT)
            .await
        {
            Ok(prompts) => prompts,
            Err(err) => {
                debug!(error = %err, "ban list unavailable; generating without one");
                Vec::new()
            }
        };
        let hint = self.policy.topic_hint(subject);

        match source.generate(subject, difficulty, hint, &ban_list).await {
            Ok(question) => {
                // The buffer owns persistence timing: every successful
                // generation is written back to the store from here.
                let record = QuestionRecord::from_question(&question);
                if let Err(err) = self.questions.upsert_question(&record).await {
                    warn!(error = %err, "failed to persist generated question");
                }
                Ok(question)
            }
            Err(err) => {
                if err.is_rate_limited() {
                    warn!("generation rate limited; session falls back to cache-only");
                    let mut state = self.lock_state();
                    if state.epoch == epoch {
                        state.generation_paused = true;
                    }
                }
                Err(FetchError::Generation(err))
            }
        }
    }

    async fn cache_sample(
        &self,
        subject: Subject,
        difficulty: Option<Difficulty>,
    ) -> Result<Option<Question>, FetchError> {
        let record = self
            .questions
            .sample_random(subject, difficulty)
            .await
            .map_err(FetchError::Storage)?;
        match record {
            Some(record) => {
                let question = record.instantiate().map_err(|e| {
                    FetchError::Storage(StorageError::Serialization(e.to_string()))
                })?;
                Ok(Some(question))
            }
            None => Ok(None),
        }
    }

    /// The bounded synchronous path behind an empty queue: one policy fetch
    /// within the budget, then an any-difficulty rescue sample, then the
    /// built-in pack. The last step cannot fail.
    async fn emergency_fetch(&self) -> Question {
        let (epoch, subject) = {
            let state = self.lock_state();
            (state.epoch, state.subject)
        };

        let budget = self.settings.sync_fetch_budget();
        match tokio::time::timeout(budget, self.fetch_candidate(epoch, false)).await {
            Ok(Ok(question)) => return question,
            Ok(Err(err)) => warn!(error = %err, "emergency fetch failed; widening"),
            Err(_) => warn!("emergency fetch exceeded its budget; widening"),
        }

        match self.cache_sample(subject, None).await {
            Ok(Some(question)) => return question,
            Ok(None) => {}
            Err(err) => warn!(error = %err, "rescue sample failed"),
        }

        let now = self.clock.now();
        let mut pool = starter_for_subject(subject, now);
        if pool.is_empty() {
            pool = starter_questions(now);
        }
        let index = self.random.pick_index(pool.len());
        pool.swap_remove(index.min(pool.len().saturating_sub(1)))
    }

    /// Looks up or generates the reward image for a freshly queued question
    /// and attaches it wherever the question now lives.
    async fn attach_image_later(&self, epoch: u64, question: &Question) {
        let Some(prompt) = question.visual_subject().map(str::to_owned) else {
            return;
        };
        let id = question.id();

        match self.images.get_image(&prompt).await {
            Ok(ImageLookup::Found(image)) => {
                self.attach_by_identity(epoch, id, image);
                return;
            }
            Ok(ImageLookup::Blocked) => return,
            Ok(ImageLookup::Missing) => {}
            Err(err) => {
                debug!(error = %err, "image lookup failed");
                return;
            }
        }

        let Some(source) = &self.source else {
            return;
        };
        let Some(image) = source.generate_image(&prompt).await else {
            return;
        };
        if let Err(err) = self.images.put_image(&image).await {
            debug!(error = %err, "failed to cache generated image");
        }
        self.attach_by_identity(epoch, id, image);
    }

    /// Identity-based two-location attach: the queued item if still queued,
    /// else the currently displayed question, else the image is dropped.
    fn attach_by_identity(&self, epoch: u64, id: QuestionId, image: RewardImage) {
        let mut state = self.lock_state();
        if state.epoch != epoch {
            return;
        }
        if let Some(item) = state.queue.iter_mut().find(|q| q.id() == id) {
            item.attach_image(image);
            return;
        }
        if let Some(current) = state.current.as_mut() {
            if current.id() == id {
                current.attach_image(image);
                return;
            }
        }
        debug!("image resolved after its question left display; discarded");
    }
}
