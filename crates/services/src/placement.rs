use std::sync::Arc;

use chrono::{DateTime, Utc};

use train_core::model::{Difficulty, PlacementQuestion, Question, QuestionError, Subject};

use crate::random::RandomSource;

/// Item archetypes a placement round can ask the child to load.
const ARCHETYPES: &[(&str, &str)] = &[
    ("coal cars", "the coal depot"),
    ("passengers", "the red carriage"),
    ("crates of apples", "the freight wagon"),
    ("mail bags", "the mail van"),
    ("milk cans", "the dairy truck"),
    ("hay bales", "the farm wagon"),
];

/// Purely local constructive routine for placement questions: no network,
/// counts scale with difficulty, and the pool always exceeds the target so
/// there is something left to not pick.
#[derive(Clone)]
pub struct PlacementBuilder {
    random: Arc<dyn RandomSource>,
}

impl PlacementBuilder {
    #[must_use]
    pub fn new(random: Arc<dyn RandomSource>) -> Self {
        Self { random }
    }

    /// Builds one placement question.
    ///
    /// Difficulty 1-2 asks for 1-5 items; higher difficulties ask for 4-10.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if the constructed payload fails validation.
    pub fn build(
        &self,
        difficulty: Difficulty,
        now: DateTime<Utc>,
    ) -> Result<Question, QuestionError> {
        let (item, container) = ARCHETYPES[self.random.pick_index(ARCHETYPES.len())];

        let (low, high) = if difficulty.value() <= 2 {
            (1u32, 5u32)
        } else {
            (4u32, 10u32)
        };
        let span = (high - low + 1) as usize;
        let target = low + self.random.pick_index(span) as u32;
        let spare = 1 + self.random.pick_index(3) as u32;
        let total = target + spare;

        let prompt = format!("Move {target} {item} into {container}!");
        let explanation = format!("You loaded exactly {target} {item}. Great work!");
        let payload = PlacementQuestion::new(item, container, target, total)?;

        Question::new_placement(
            Subject::Math,
            difficulty,
            prompt,
            payload,
            explanation,
            now,
        )
    }
}
