use std::sync::Arc;

use tracing::{debug, warn};

use storage::dedup::is_duplicate_of;
use storage::repository::{QuestionRecord, QuestionRepository};
use train_core::model::{ContentKey, Difficulty, Subject};
use train_core::similarity::SimilarityStrategy;

use crate::error::{GenerationError, LibraryError};
use crate::generator::QuestionSource;
use crate::policy::SessionPolicy;
use crate::random::RandomSource;

/// Outcome of a bulk generation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BulkGenerateReport {
    pub requested: u32,
    pub generated: u32,
    pub failed: u32,
    /// The run was cut short by an upstream rate limit; remaining slots were
    /// not attempted.
    pub rate_limited: bool,
}

/// Outcome of a bulk import/merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportReport {
    pub imported: usize,
    pub duplicates: usize,
}

/// Maintenance surface over the content store: bulk generation, import with
/// duplicate detection, difficulty feedback, and stats. Not part of the live
/// session path.
pub struct LibraryService {
    questions: Arc<dyn QuestionRepository>,
    source: Option<Arc<dyn QuestionSource>>,
    strategy: Arc<dyn SimilarityStrategy>,
    policy: SessionPolicy,
}

impl LibraryService {
    #[must_use]
    pub fn new(
        questions: Arc<dyn QuestionRepository>,
        source: Option<Arc<dyn QuestionSource>>,
        strategy: Arc<dyn SimilarityStrategy>,
        random: Arc<dyn RandomSource>,
    ) -> Self {
        let policy = SessionPolicy::new(Arc::clone(&questions), random);
        Self {
            questions,
            source,
            strategy,
            policy,
        }
    }

    /// Generates up to `want` new questions into the store.
    ///
    /// A rate-limited failure halts the remainder of the run immediately;
    /// other failures cost only their own slot.
    ///
    /// # Errors
    ///
    /// Returns `LibraryError::Generation(Disabled)` when no source is
    /// configured, or a storage error if the store cannot be read.
    pub async fn bulk_generate(
        &self,
        subject: Subject,
        difficulty: Difficulty,
        want: u32,
    ) -> Result<BulkGenerateReport, LibraryError> {
        let Some(source) = &self.source else {
            return Err(LibraryError::Generation(GenerationError::Disabled));
        };

        let existing = self.questions.list_questions(subject).await?;
        let mut known: Vec<QuestionRecord> = existing;
        let mut report = BulkGenerateReport {
            requested: want,
            generated: 0,
            failed: 0,
            rate_limited: false,
        };

        for _ in 0..want {
            let ban_list: Vec<String> = known
                .iter()
                .rev()
                .filter(|r| r.difficulty == difficulty)
                .take(24)
                .map(|r| r.prompt.clone())
                .collect();
            let hint = self.policy.topic_hint(subject);

            match source.generate(subject, difficulty, hint, &ban_list).await {
                Ok(question) => {
                    let record = QuestionRecord::from_question(&question);
                    if is_duplicate_of(&record, &known, self.strategy.as_ref()) {
                        debug!("bulk generation produced a duplicate; skipped");
                        report.failed += 1;
                        continue;
                    }
                    self.questions.upsert_question(&record).await?;
                    known.push(record);
                    report.generated += 1;
                }
                Err(err) if err.is_rate_limited() => {
                    warn!("bulk generation rate limited; halting run");
                    report.rate_limited = true;
                    break;
                }
                Err(err) => {
                    debug!(error = %err, "bulk generation slot failed");
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }

    /// Merges a batch of records into the store, discarding approximate
    /// duplicates of existing or just-imported content. First-seen wins.
    ///
    /// # Errors
    ///
    /// Returns `LibraryError::Storage` if the store cannot be read or
    /// written.
    pub async fn import(
        &self,
        records: Vec<QuestionRecord>,
    ) -> Result<ImportReport, LibraryError> {
        let mut known: Vec<QuestionRecord> = Vec::new();
        for subject in Subject::ALL {
            known.extend(self.questions.list_questions(subject).await?);
        }

        let mut report = ImportReport {
            imported: 0,
            duplicates: 0,
        };
        for record in records {
            if is_duplicate_of(&record, &known, self.strategy.as_ref()) {
                report.duplicates += 1;
                continue;
            }
            self.questions.upsert_question(&record).await?;
            known.push(record);
            report.imported += 1;
        }
        Ok(report)
    }

    /// Difficulty-feedback boundary: a question reported as too hard moves
    /// up one level (capped), affecting future sampling only.
    ///
    /// # Errors
    ///
    /// Returns `LibraryError::Storage` (`NotFound`) when no stored question
    /// has the key.
    pub async fn mark_too_hard(&self, key: &ContentKey) -> Result<Difficulty, LibraryError> {
        let bumped = self.questions.bump_difficulty(key).await?;
        Ok(bumped)
    }

    /// Stored question counts per difficulty for a subject.
    ///
    /// # Errors
    ///
    /// Returns `LibraryError::Storage` if the store cannot be read.
    pub async fn counts(&self, subject: Subject) -> Result<Vec<(Difficulty, u64)>, LibraryError> {
        let mut out = Vec::with_capacity(5);
        for level in Difficulty::MIN.value()..=Difficulty::MAX.value() {
            let difficulty = Difficulty::clamped(level);
            let count = self.questions.count(subject, difficulty).await?;
            out.push((difficulty, count));
        }
        Ok(out)
    }
}
