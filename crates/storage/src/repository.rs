use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::seq::IteratorRandom;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

use train_core::model::{
    ContentKey, Difficulty, Question, QuestionError, QuestionKind, RewardImage, Subject,
};

/// Errors surfaced by storage adapters.
///
/// Storage reports failures to the caller and never retries on its own; the
/// caller decides whether to fall back.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Persisted shape for a question, keyed by stable content identity.
///
/// This mirrors the domain `Question` minus per-delivery state (delivery id,
/// attached image), so repositories can serialize without leaking storage
/// concerns into the domain layer. Serializable so import/export tooling can
/// move batches between stores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionRecord {
    pub key: ContentKey,
    pub subject: Subject,
    pub difficulty: Difficulty,
    pub prompt: String,
    pub kind: QuestionKind,
    pub explanation: String,
    pub visual_subject: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl QuestionRecord {
    #[must_use]
    pub fn from_question(question: &Question) -> Self {
        Self {
            key: question.content_key(),
            subject: question.subject(),
            difficulty: question.difficulty(),
            prompt: question.prompt().to_owned(),
            kind: question.kind().clone(),
            explanation: question.explanation().to_owned(),
            visual_subject: question.visual_subject().map(str::to_owned),
            created_at: question.created_at(),
        }
    }

    /// Turns the record back into a live question under a fresh delivery id.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if the persisted prompt or explanation fail
    /// validation.
    pub fn instantiate(&self) -> Result<Question, QuestionError> {
        Question::from_parts(
            self.subject,
            self.difficulty,
            self.prompt.clone(),
            self.kind.clone(),
            self.explanation.clone(),
            self.visual_subject.clone(),
            self.created_at,
        )
    }
}

/// Result of an image lookup by prompt.
#[derive(Debug, Clone)]
pub enum ImageLookup {
    Found(RewardImage),
    /// The prompt was marked permanently undeliverable; do not re-fetch.
    Blocked,
    Missing,
}

/// Repository contract for cached questions.
#[async_trait]
pub trait QuestionRepository: Send + Sync {
    /// Number of stored questions matching subject and difficulty exactly.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be read.
    async fn count(&self, subject: Subject, difficulty: Difficulty) -> Result<u64, StorageError>;

    /// Uniform-random pick among matches. `None` difficulty matches any
    /// difficulty for the subject (the emergency rescue path).
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be read.
    async fn sample_random(
        &self,
        subject: Subject,
        difficulty: Option<Difficulty>,
    ) -> Result<Option<QuestionRecord>, StorageError>;

    /// Idempotent upsert keyed on the record's content key.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be stored.
    async fn upsert_question(&self, record: &QuestionRecord) -> Result<(), StorageError>;

    /// Raises the stored difficulty one level, capped at the maximum.
    /// Returns the new difficulty.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if no question has the key.
    async fn bump_difficulty(&self, key: &ContentKey) -> Result<Difficulty, StorageError>;

    /// Most recently stored prompts for a subject/difficulty, for ban lists.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be read.
    async fn recent_prompts(
        &self,
        subject: Subject,
        difficulty: Difficulty,
        limit: u32,
    ) -> Result<Vec<String>, StorageError>;

    /// All records for a subject, for maintenance sweeps.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be read.
    async fn list_questions(&self, subject: Subject) -> Result<Vec<QuestionRecord>, StorageError>;
}

/// Repository contract for reward images, keyed by visual prompt.
#[async_trait]
pub trait ImageRepository: Send + Sync {
    /// Looks up an image by prompt.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be read.
    async fn get_image(&self, prompt: &str) -> Result<ImageLookup, StorageError>;

    /// Stores an image under its prompt. A blocked prompt stays blocked.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the image cannot be stored.
    async fn put_image(&self, image: &RewardImage) -> Result<(), StorageError>;

    /// Marks a prompt permanently undeliverable, discarding any stored data.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the mark cannot be stored.
    async fn block_image(&self, prompt: &str) -> Result<(), StorageError>;
}

#[derive(Debug, Clone)]
enum ImageSlot {
    Data(RewardImage),
    Blocked,
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    questions: Arc<Mutex<HashMap<String, QuestionRecord>>>,
    images: Arc<Mutex<HashMap<String, ImageSlot>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl QuestionRepository for InMemoryRepository {
    async fn count(&self, subject: Subject, difficulty: Difficulty) -> Result<u64, StorageError> {
        let guard = self
            .questions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let count = guard
            .values()
            .filter(|r| r.subject == subject && r.difficulty == difficulty)
            .count();
        Ok(count as u64)
    }

    async fn sample_random(
        &self,
        subject: Subject,
        difficulty: Option<Difficulty>,
    ) -> Result<Option<QuestionRecord>, StorageError> {
        let guard = self
            .questions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut rng = rand::rng();
        let picked = guard
            .values()
            .filter(|r| r.subject == subject && difficulty.is_none_or(|d| r.difficulty == d))
            .choose(&mut rng)
            .cloned();
        Ok(picked)
    }

    async fn upsert_question(&self, record: &QuestionRecord) -> Result<(), StorageError> {
        let mut guard = self
            .questions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(record.key.as_str().to_owned(), record.clone());
        Ok(())
    }

    async fn bump_difficulty(&self, key: &ContentKey) -> Result<Difficulty, StorageError> {
        let mut guard = self
            .questions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let record = guard.get_mut(key.as_str()).ok_or(StorageError::NotFound)?;
        record.difficulty = record.difficulty.bumped();
        Ok(record.difficulty)
    }

    async fn recent_prompts(
        &self,
        subject: Subject,
        difficulty: Difficulty,
        limit: u32,
    ) -> Result<Vec<String>, StorageError> {
        let guard = self
            .questions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut matches: Vec<&QuestionRecord> = guard
            .values()
            .filter(|r| r.subject == subject && r.difficulty == difficulty)
            .collect();
        matches.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matches
            .into_iter()
            .take(limit as usize)
            .map(|r| r.prompt.clone())
            .collect())
    }

    async fn list_questions(&self, subject: Subject) -> Result<Vec<QuestionRecord>, StorageError> {
        let guard = self
            .questions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut matches: Vec<QuestionRecord> = guard
            .values()
            .filter(|r| r.subject == subject)
            .cloned()
            .collect();
        matches.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(matches)
    }
}

#[async_trait]
impl ImageRepository for InMemoryRepository {
    async fn get_image(&self, prompt: &str) -> Result<ImageLookup, StorageError> {
        let guard = self
            .images
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(match guard.get(prompt) {
            Some(ImageSlot::Data(image)) => ImageLookup::Found(image.clone()),
            Some(ImageSlot::Blocked) => ImageLookup::Blocked,
            None => ImageLookup::Missing,
        })
    }

    async fn put_image(&self, image: &RewardImage) -> Result<(), StorageError> {
        let mut guard = self
            .images
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        match guard.get(image.prompt()) {
            Some(ImageSlot::Blocked) => {}
            _ => {
                guard.insert(image.prompt().to_owned(), ImageSlot::Data(image.clone()));
            }
        }
        Ok(())
    }

    async fn block_image(&self, prompt: &str) -> Result<(), StorageError> {
        let mut guard = self
            .images
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(prompt.to_owned(), ImageSlot::Blocked);
        Ok(())
    }
}

/// Aggregates the two content stores behind trait objects for easy backend
/// swapping.
#[derive(Clone)]
pub struct Storage {
    pub questions: Arc<dyn QuestionRepository>,
    pub images: Arc<dyn ImageRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let questions: Arc<dyn QuestionRepository> = Arc::new(repo.clone());
        let images: Arc<dyn ImageRepository> = Arc::new(repo);
        Self { questions, images }
    }
}
