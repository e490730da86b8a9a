use std::sync::Arc;

use storage::repository::{QuestionRepository, StorageError};
use train_core::model::{Difficulty, Subject};

use crate::random::RandomSource;

/// Chance that an eligible fetch is substituted with a placement question.
pub const PLACEMENT_CHANCE: f64 = 0.30;

/// Below this count the cache is still cold: always generate.
pub const CACHE_FLOOR: u64 = 100;

/// Above this count the cache is saturated: only a 5% freshness trickle.
pub const CACHE_COMFORT: u64 = 200;

/// Source choice for one buffer slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceDecision {
    /// Build a placement question locally, skipping cache and generator.
    Placement,
    /// Ask the question source for fresh content.
    Generate,
    /// Sample the content store.
    Cache,
}

/// Session-side facts the policy needs for one decision.
#[derive(Debug, Clone, Copy)]
pub struct PolicyContext {
    /// The emergency synchronous path forbids placements outright.
    pub allow_placement: bool,
    /// A placement already entered this session's queue or was delivered.
    pub placement_seen: bool,
    /// The previously delivered question was itself a placement.
    pub last_was_placement: bool,
    /// A generator is configured and not paused by a rate limit.
    pub generation_available: bool,
}

/// Per-fetch cache-vs-generate decision plus the placement throttle.
#[derive(Clone)]
pub struct SessionPolicy {
    questions: Arc<dyn QuestionRepository>,
    random: Arc<dyn RandomSource>,
}

impl SessionPolicy {
    #[must_use]
    pub fn new(questions: Arc<dyn QuestionRepository>, random: Arc<dyn RandomSource>) -> Self {
        Self { questions, random }
    }

    /// The saturation curve: build the cache aggressively until the floor,
    /// taper to a 40% refresh rate, then settle into long-tail freshness.
    #[must_use]
    pub fn generation_probability(count: u64) -> f64 {
        if count < CACHE_FLOOR {
            1.0
        } else if count < CACHE_COMFORT {
            0.4
        } else {
            0.05
        }
    }

    fn placement_eligible(subject: Subject, difficulty: Difficulty, ctx: &PolicyContext) -> bool {
        ctx.allow_placement
            && subject == Subject::Math
            && difficulty.value() <= 2
            && !ctx.placement_seen
            && !ctx.last_was_placement
    }

    /// Decides the source for the next fetch.
    ///
    /// The placement gate is checked first and short-circuits the saturation
    /// curve entirely when it fires.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the cache count cannot be read.
    pub async fn decide(
        &self,
        subject: Subject,
        difficulty: Difficulty,
        ctx: &PolicyContext,
    ) -> Result<SourceDecision, StorageError> {
        if Self::placement_eligible(subject, difficulty, ctx)
            && self.random.next_unit() < PLACEMENT_CHANCE
        {
            return Ok(SourceDecision::Placement);
        }

        let count = self.questions.count(subject, difficulty).await?;
        let probability = if ctx.generation_available {
            Self::generation_probability(count)
        } else {
            0.0
        };

        if self.random.next_unit() < probability && ctx.generation_available {
            Ok(SourceDecision::Generate)
        } else {
            Ok(SourceDecision::Cache)
        }
    }

    /// Topic-variety hint for the next generation call.
    #[must_use]
    pub fn topic_hint(&self, subject: Subject) -> &'static str {
        let hints = topic_hints(subject);
        hints[self.random.pick_index(hints.len())]
    }
}

fn topic_hints(subject: Subject) -> &'static [&'static str] {
    match subject {
        Subject::Math => &[
            "counting wagons",
            "adding passengers",
            "sharing snacks fairly",
            "comparing sizes",
            "simple shapes",
        ],
        Subject::Language => &[
            "first sounds of words",
            "opposites",
            "naming words",
            "rhyming words",
            "little stories",
        ],
        Subject::Logic => &[
            "color patterns",
            "what comes next",
            "sorting by size",
            "who sits where",
            "odd one out",
        ],
        Subject::Physics => &[
            "things that fall",
            "rolling and sliding",
            "floating and sinking",
            "pushing and pulling",
            "hot and cold",
        ],
    }
}
