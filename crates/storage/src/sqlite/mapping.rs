use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use train_core::model::{ContentKey, Difficulty, QuestionKind, Subject};

use crate::repository::{QuestionRecord, StorageError};

fn decode<T>(result: Result<T, sqlx::Error>) -> Result<T, StorageError> {
    result.map_err(|e| StorageError::Serialization(e.to_string()))
}

/// Maps a `questions` row back into a persisted record.
pub fn map_question_row(row: &SqliteRow) -> Result<QuestionRecord, StorageError> {
    let key: String = decode(row.try_get("content_key"))?;
    let subject_raw: String = decode(row.try_get("subject"))?;
    let subject = Subject::from_str(&subject_raw)
        .map_err(|e| StorageError::Serialization(e.to_string()))?;

    let difficulty_raw: i64 = decode(row.try_get("difficulty"))?;
    let difficulty_level = u8::try_from(difficulty_raw)
        .map_err(|_| StorageError::Serialization("difficulty out of range".into()))?;
    let difficulty = Difficulty::new(difficulty_level)
        .map_err(|e| StorageError::Serialization(e.to_string()))?;

    let kind_raw: String = decode(row.try_get("kind"))?;
    let kind: QuestionKind = serde_json::from_str(&kind_raw)
        .map_err(|e| StorageError::Serialization(e.to_string()))?;

    let prompt: String = decode(row.try_get("prompt"))?;
    let explanation: String = decode(row.try_get("explanation"))?;
    let visual_subject: Option<String> = decode(row.try_get("visual_subject"))?;
    let created_at: DateTime<Utc> = decode(row.try_get("created_at"))?;

    Ok(QuestionRecord {
        key: ContentKey::from_raw(key),
        subject,
        difficulty,
        prompt,
        kind,
        explanation,
        visual_subject,
        created_at,
    })
}

/// Serializes a kind payload for the `kind` column.
pub fn encode_kind(kind: &QuestionKind) -> Result<String, StorageError> {
    serde_json::to_string(kind).map_err(|e| StorageError::Serialization(e.to_string()))
}
