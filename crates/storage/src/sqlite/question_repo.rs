use sqlx::Row;

use train_core::model::{ContentKey, Difficulty, Subject};

use super::{SqliteRepository, mapping};
use crate::repository::{QuestionRecord, QuestionRepository, StorageError};

const QUESTION_COLUMNS: &str =
    "content_key, subject, difficulty, prompt, kind, explanation, visual_subject, created_at";

#[async_trait::async_trait]
impl QuestionRepository for SqliteRepository {
    async fn count(&self, subject: Subject, difficulty: Difficulty) -> Result<u64, StorageError> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS n FROM questions WHERE subject = ?1 AND difficulty = ?2",
        )
        .bind(subject.as_str())
        .bind(i64::from(difficulty.value()))
        .fetch_one(self.pool())
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let n: i64 = row
            .try_get("n")
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        Ok(u64::try_from(n).unwrap_or(0))
    }

    async fn sample_random(
        &self,
        subject: Subject,
        difficulty: Option<Difficulty>,
    ) -> Result<Option<QuestionRecord>, StorageError> {
        let row = match difficulty {
            Some(difficulty) => {
                sqlx::query(&format!(
                    "SELECT {QUESTION_COLUMNS} FROM questions \
                     WHERE subject = ?1 AND difficulty = ?2 \
                     ORDER BY RANDOM() LIMIT 1"
                ))
                .bind(subject.as_str())
                .bind(i64::from(difficulty.value()))
                .fetch_optional(self.pool())
                .await
            }
            None => {
                sqlx::query(&format!(
                    "SELECT {QUESTION_COLUMNS} FROM questions \
                     WHERE subject = ?1 \
                     ORDER BY RANDOM() LIMIT 1"
                ))
                .bind(subject.as_str())
                .fetch_optional(self.pool())
                .await
            }
        }
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.as_ref().map(mapping::map_question_row).transpose()
    }

    async fn upsert_question(&self, record: &QuestionRecord) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO questions (
                content_key, subject, difficulty, prompt, kind, explanation,
                visual_subject, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(subject, content_key) DO UPDATE SET
                -- keep created_at from the original insert; only update mutable fields
                difficulty = excluded.difficulty,
                prompt = excluded.prompt,
                kind = excluded.kind,
                explanation = excluded.explanation,
                visual_subject = excluded.visual_subject
            ",
        )
        .bind(record.key.as_str())
        .bind(record.subject.as_str())
        .bind(i64::from(record.difficulty.value()))
        .bind(&record.prompt)
        .bind(mapping::encode_kind(&record.kind)?)
        .bind(&record.explanation)
        .bind(record.visual_subject.as_deref())
        .bind(record.created_at)
        .execute(self.pool())
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn bump_difficulty(&self, key: &ContentKey) -> Result<Difficulty, StorageError> {
        let updated = sqlx::query(
            "UPDATE questions SET difficulty = MIN(difficulty + 1, ?1) WHERE content_key = ?2",
        )
        .bind(i64::from(Difficulty::MAX.value()))
        .bind(key.as_str())
        .execute(self.pool())
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        if updated.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }

        let row = sqlx::query("SELECT difficulty FROM questions WHERE content_key = ?1")
            .bind(key.as_str())
            .fetch_one(self.pool())
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let level: i64 = row
            .try_get("difficulty")
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        let level = u8::try_from(level)
            .map_err(|_| StorageError::Serialization("difficulty out of range".into()))?;
        Difficulty::new(level).map_err(|e| StorageError::Serialization(e.to_string()))
    }

    async fn recent_prompts(
        &self,
        subject: Subject,
        difficulty: Difficulty,
        limit: u32,
    ) -> Result<Vec<String>, StorageError> {
        let rows = sqlx::query(
            "SELECT prompt FROM questions \
             WHERE subject = ?1 AND difficulty = ?2 \
             ORDER BY created_at DESC LIMIT ?3",
        )
        .bind(subject.as_str())
        .bind(i64::from(difficulty.value()))
        .bind(i64::from(limit))
        .fetch_all(self.pool())
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        rows.iter()
            .map(|row| {
                row.try_get("prompt")
                    .map_err(|e| StorageError::Serialization(e.to_string()))
            })
            .collect()
    }

    async fn list_questions(&self, subject: Subject) -> Result<Vec<QuestionRecord>, StorageError> {
        let rows = sqlx::query(&format!(
            "SELECT {QUESTION_COLUMNS} FROM questions \
             WHERE subject = ?1 ORDER BY created_at"
        ))
        .bind(subject.as_str())
        .fetch_all(self.pool())
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        rows.iter().map(mapping::map_question_row).collect()
    }
}
