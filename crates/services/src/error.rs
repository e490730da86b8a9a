//! Shared error types for the services crate.

use thiserror::Error;

use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;
use train_core::model::{MissionError, QuestionError, SettingsError};

/// Errors emitted by `QuestionSource` implementations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GenerationError {
    #[error("question generation is not configured")]
    Disabled,

    /// Upstream quota or rate limit. Callers must stop issuing further
    /// generation calls for the remainder of the run; a live session falls
    /// back to cache-only sampling.
    #[error("generation rate limited: {0}")]
    RateLimited(String),

    #[error("generation request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("generator returned an empty response")]
    EmptyResponse,

    #[error("generator returned malformed content: {0}")]
    Malformed(String),

    #[error(transparent)]
    InvalidQuestion(#[from] QuestionError),
}

impl GenerationError {
    /// True for quota/rate-limit failures, which pause further generation.
    #[must_use]
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, GenerationError::RateLimited(_))
    }
}

/// Per-fetch failures inside buffer fill tasks and the emergency path.
///
/// Fill tasks swallow these (the buffer's redundancy absorbs individual
/// failures); only the emergency synchronous path inspects them before
/// widening to the rescue and terminal fallbacks.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FetchError {
    #[error("no cached questions for this subject and difficulty")]
    EmptyCache,

    #[error("the owning session was torn down")]
    SessionClosed,

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Question(#[from] QuestionError),
}

/// Lifecycle errors for session and mission orchestration.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("no active session")]
    NotStarted,

    #[error("mission already complete")]
    Completed,

    #[error("advance called without a submitted answer")]
    NoPendingAnswer,

    #[error(transparent)]
    Mission(#[from] MissionError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `LibraryService` maintenance operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LibraryError {
    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Settings(#[from] SettingsError),
}
