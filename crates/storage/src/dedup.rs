//! Maintenance-path duplicate sweep over stored question records.
//!
//! Not part of the live session path: bulk imports and cache grooming run it
//! to keep the store free of near-identical prompts. First-seen wins.

use train_core::similarity::{SimilarityStrategy, numeric_fingerprint};

use crate::repository::QuestionRecord;

/// Outcome of a duplicate sweep.
#[derive(Debug, Default)]
pub struct DedupReport {
    pub kept: Vec<QuestionRecord>,
    pub discarded: usize,
}

/// True when `candidate` duplicates any record already in `pool`.
///
/// Candidates must share subject, difficulty, and the exact numeric-literal
/// multiset before the strategy gets a say; the numeric gate protects
/// arithmetic problems that differ only by operands.
#[must_use]
pub fn is_duplicate_of(
    candidate: &QuestionRecord,
    pool: &[QuestionRecord],
    strategy: &dyn SimilarityStrategy,
) -> bool {
    let fingerprint = numeric_fingerprint(&candidate.prompt);
    pool.iter().any(|kept| {
        kept.subject == candidate.subject
            && kept.difficulty == candidate.difficulty
            && numeric_fingerprint(&kept.prompt) == fingerprint
            && strategy.similar(&kept.prompt, &candidate.prompt)
    })
}

/// Sweeps a batch of records, keeping the first-seen of each duplicate group.
#[must_use]
pub fn sweep(records: Vec<QuestionRecord>, strategy: &dyn SimilarityStrategy) -> DedupReport {
    let mut report = DedupReport::default();
    for record in records {
        if is_duplicate_of(&record, &report.kept, strategy) {
            report.discarded += 1;
        } else {
            report.kept.push(record);
        }
    }
    report
}
