use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{ContentKey, QuestionId};
use crate::model::image::RewardImage;
use crate::model::subject::{Difficulty, Subject};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question prompt cannot be empty")]
    EmptyPrompt,

    #[error("question explanation cannot be empty")]
    EmptyExplanation,

    #[error("choice question needs at least {} options, got {0}", MIN_OPTIONS)]
    TooFewOptions(usize),

    #[error("choice question allows at most {} options, got {0}", MAX_OPTIONS)]
    TooManyOptions(usize),

    #[error("choice option {0} is empty")]
    EmptyOption(usize),

    #[error("correct option index {index} out of range for {len} options")]
    CorrectIndexOutOfRange { index: usize, len: usize },

    #[error("placement item cannot be empty")]
    EmptyItem,

    #[error("placement container cannot be empty")]
    EmptyContainer,

    #[error("placement needs target >= 1 and total > target, got target {target} of {total}")]
    InvalidPlacementCounts { target: u32, total: u32 },
}

const MIN_OPTIONS: usize = 2;
const MAX_OPTIONS: usize = 6;

//
// ─── QUESTION PAYLOADS ─────────────────────────────────────────────────────────
//

/// Multiple-option payload: answer options and the index of the correct one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceQuestion {
    options: Vec<String>,
    correct: usize,
}

impl ChoiceQuestion {
    /// Validates and builds a choice payload.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` for too few/many options, a blank option, or
    /// an out-of-range correct index.
    pub fn new(options: Vec<String>, correct: usize) -> Result<Self, QuestionError> {
        if options.len() < MIN_OPTIONS {
            return Err(QuestionError::TooFewOptions(options.len()));
        }
        if options.len() > MAX_OPTIONS {
            return Err(QuestionError::TooManyOptions(options.len()));
        }
        for (i, option) in options.iter().enumerate() {
            if option.trim().is_empty() {
                return Err(QuestionError::EmptyOption(i));
            }
        }
        if correct >= options.len() {
            return Err(QuestionError::CorrectIndexOutOfRange {
                index: correct,
                len: options.len(),
            });
        }
        Ok(Self { options, correct })
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    #[must_use]
    pub fn correct_index(&self) -> usize {
        self.correct
    }

    /// True when the given response index picks the correct option.
    #[must_use]
    pub fn is_correct(&self, response: usize) -> bool {
        response == self.correct
    }
}

/// Drag/place payload: move exactly `target_count` of `item` (out of
/// `total_items` shown) into `container`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementQuestion {
    item: String,
    container: String,
    target_count: u32,
    total_items: u32,
}

impl PlacementQuestion {
    /// Validates and builds a placement payload.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` for blank item/container names or counts that
    /// do not satisfy `1 <= target < total`.
    pub fn new(
        item: impl Into<String>,
        container: impl Into<String>,
        target_count: u32,
        total_items: u32,
    ) -> Result<Self, QuestionError> {
        let item = item.into();
        if item.trim().is_empty() {
            return Err(QuestionError::EmptyItem);
        }
        let container = container.into();
        if container.trim().is_empty() {
            return Err(QuestionError::EmptyContainer);
        }
        if target_count == 0 || total_items <= target_count {
            return Err(QuestionError::InvalidPlacementCounts {
                target: target_count,
                total: total_items,
            });
        }
        Ok(Self {
            item,
            container,
            target_count,
            total_items,
        })
    }

    #[must_use]
    pub fn item(&self) -> &str {
        &self.item
    }

    #[must_use]
    pub fn container(&self) -> &str {
        &self.container
    }

    #[must_use]
    pub fn target_count(&self) -> u32 {
        self.target_count
    }

    #[must_use]
    pub fn total_items(&self) -> u32 {
        self.total_items
    }

    /// True when the collaborator-reported placed count hits the target.
    #[must_use]
    pub fn is_satisfied(&self, placed: u32) -> bool {
        placed == self.target_count
    }
}

/// The two question shapes. Exactly one payload exists per question, enforced
/// by the enum itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum QuestionKind {
    Choice(ChoiceQuestion),
    Placement(PlacementQuestion),
}

impl QuestionKind {
    #[must_use]
    pub fn is_placement(&self) -> bool {
        matches!(self, QuestionKind::Placement(_))
    }
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// The unit of gameplay content.
///
/// Created by the generator or instantiated from the cache; mutated only to
/// attach a reward image once one arrives; discarded after being answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    id: QuestionId,
    subject: Subject,
    difficulty: Difficulty,
    prompt: String,
    kind: QuestionKind,
    explanation: String,
    visual_subject: Option<String>,
    image: Option<RewardImage>,
    created_at: DateTime<Utc>,
}

impl Question {
    /// Builds a choice question.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` for a blank prompt/explanation or an invalid
    /// option payload.
    #[allow(clippy::too_many_arguments)]
    pub fn new_choice(
        subject: Subject,
        difficulty: Difficulty,
        prompt: impl Into<String>,
        options: Vec<String>,
        correct: usize,
        explanation: impl Into<String>,
        visual_subject: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, QuestionError> {
        let kind = QuestionKind::Choice(ChoiceQuestion::new(options, correct)?);
        Self::build(subject, difficulty, prompt, kind, explanation, visual_subject, created_at)
    }

    /// Builds a placement question.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` for a blank prompt/explanation or counts that
    /// do not satisfy `1 <= target < total`.
    pub fn new_placement(
        subject: Subject,
        difficulty: Difficulty,
        prompt: impl Into<String>,
        payload: PlacementQuestion,
        explanation: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, QuestionError> {
        Self::build(
            subject,
            difficulty,
            prompt,
            QuestionKind::Placement(payload),
            explanation,
            None,
            created_at,
        )
    }

    /// Rebuilds a question from persisted parts, minting a fresh delivery id.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if the persisted prompt or explanation fail
    /// validation.
    pub fn from_parts(
        subject: Subject,
        difficulty: Difficulty,
        prompt: impl Into<String>,
        kind: QuestionKind,
        explanation: impl Into<String>,
        visual_subject: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, QuestionError> {
        Self::build(subject, difficulty, prompt, kind, explanation, visual_subject, created_at)
    }

    fn build(
        subject: Subject,
        difficulty: Difficulty,
        prompt: impl Into<String>,
        kind: QuestionKind,
        explanation: impl Into<String>,
        visual_subject: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, QuestionError> {
        let prompt = prompt.into();
        if prompt.trim().is_empty() {
            return Err(QuestionError::EmptyPrompt);
        }
        let explanation = explanation.into();
        if explanation.trim().is_empty() {
            return Err(QuestionError::EmptyExplanation);
        }
        let visual_subject = visual_subject.filter(|v| !v.trim().is_empty());

        Ok(Self {
            id: QuestionId::new(),
            subject,
            difficulty,
            prompt,
            kind,
            explanation,
            visual_subject,
            image: None,
            created_at,
        })
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn subject(&self) -> Subject {
        self.subject
    }

    #[must_use]
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn kind(&self) -> &QuestionKind {
        &self.kind
    }

    #[must_use]
    pub fn is_placement(&self) -> bool {
        self.kind.is_placement()
    }

    #[must_use]
    pub fn explanation(&self) -> &str {
        &self.explanation
    }

    #[must_use]
    pub fn visual_subject(&self) -> Option<&str> {
        self.visual_subject.as_deref()
    }

    #[must_use]
    pub fn image(&self) -> Option<&RewardImage> {
        self.image.as_ref()
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Stable identity for cache upserts, distinct from the delivery id.
    #[must_use]
    pub fn content_key(&self) -> ContentKey {
        ContentKey::derive(self.subject.as_str(), &self.prompt)
    }

    /// Attaches a late-arriving reward image. Last write wins.
    pub fn attach_image(&mut self, image: RewardImage) {
        self.image = Some(image);
    }

    /// Clones the content under a fresh delivery id, without any attached
    /// image. Used whenever cached content is served again.
    #[must_use]
    pub fn reissued(&self) -> Self {
        Self {
            id: QuestionId::new(),
            image: None,
            ..self.clone()
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn choice_question() -> Question {
        Question::new_choice(
            Subject::Math,
            Difficulty::MIN,
            "What is 2 + 2?",
            vec!["3".into(), "4".into(), "5".into()],
            1,
            "2 + 2 makes 4.",
            Some("a happy blue train".into()),
            fixed_now(),
        )
        .unwrap()
    }

    #[test]
    fn choice_rejects_bad_option_counts() {
        let too_few = ChoiceQuestion::new(vec!["only".into()], 0).unwrap_err();
        assert!(matches!(too_few, QuestionError::TooFewOptions(1)));

        let options: Vec<String> = (0..7).map(|i| i.to_string()).collect();
        let too_many = ChoiceQuestion::new(options, 0).unwrap_err();
        assert!(matches!(too_many, QuestionError::TooManyOptions(7)));
    }

    #[test]
    fn choice_rejects_out_of_range_correct_index() {
        let err = ChoiceQuestion::new(vec!["a".into(), "b".into()], 2).unwrap_err();
        assert!(matches!(
            err,
            QuestionError::CorrectIndexOutOfRange { index: 2, len: 2 }
        ));
    }

    #[test]
    fn choice_verifies_response_index() {
        let q = choice_question();
        let QuestionKind::Choice(choice) = q.kind() else {
            panic!("expected choice");
        };
        assert!(choice.is_correct(1));
        assert!(!choice.is_correct(0));
    }

    #[test]
    fn placement_requires_total_above_target() {
        let err = PlacementQuestion::new("coal cars", "the depot", 3, 3).unwrap_err();
        assert!(matches!(
            err,
            QuestionError::InvalidPlacementCounts { target: 3, total: 3 }
        ));
        assert!(PlacementQuestion::new("coal cars", "the depot", 3, 5).is_ok());
    }

    #[test]
    fn placement_satisfied_only_at_exact_count() {
        let p = PlacementQuestion::new("apples", "the crate", 4, 7).unwrap();
        assert!(p.is_satisfied(4));
        assert!(!p.is_satisfied(3));
        assert!(!p.is_satisfied(5));
    }

    #[test]
    fn blank_visual_subject_is_dropped() {
        let q = Question::new_choice(
            Subject::Logic,
            Difficulty::MIN,
            "Which is bigger?",
            vec!["ant".into(), "elephant".into()],
            1,
            "Elephants are much bigger than ants.",
            Some("   ".into()),
            fixed_now(),
        )
        .unwrap();
        assert_eq!(q.visual_subject(), None);
    }

    #[test]
    fn reissue_mints_fresh_id_and_drops_image() {
        let mut q = choice_question();
        q.attach_image(
            RewardImage::new("a happy blue train", "data:image/png;base64,aGk=", fixed_now())
                .unwrap(),
        );

        let again = q.reissued();
        assert_ne!(again.id(), q.id());
        assert_eq!(again.prompt(), q.prompt());
        assert!(again.image().is_none());
        assert_eq!(again.content_key(), q.content_key());
    }

    #[test]
    fn content_key_is_stable_across_deliveries() {
        let a = choice_question();
        let b = choice_question();
        assert_ne!(a.id(), b.id());
        assert_eq!(a.content_key(), b.content_key());
    }
}
