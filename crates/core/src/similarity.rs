//! Approximate-duplicate detection for stored questions.
//!
//! Two questions are candidate duplicates only when they share subject,
//! difficulty, and the same multiset of numeric literals; the numeric gate
//! keeps arithmetic problems that differ only by operands ("3 + 4" vs
//! "5 + 6") from collapsing into one. Among candidates, a pluggable string
//! similarity strategy makes the final call.

/// Final-say similarity check between two candidate prompts.
pub trait SimilarityStrategy: Send + Sync {
    fn similar(&self, a: &str, b: &str) -> bool;
}

/// Default strategy: normalized Levenshtein ratio against a fixed threshold.
#[derive(Debug, Clone, Copy)]
pub struct NormalizedLevenshtein {
    threshold: f64,
}

impl NormalizedLevenshtein {
    pub const DEFAULT_THRESHOLD: f64 = 0.85;

    #[must_use]
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    /// Similarity ratio in [0, 1]: 1.0 for identical normalized strings.
    #[must_use]
    pub fn ratio(a: &str, b: &str) -> f64 {
        let a: Vec<char> = normalize(a).chars().collect();
        let b: Vec<char> = normalize(b).chars().collect();
        let longest = a.len().max(b.len());
        if longest == 0 {
            return 1.0;
        }
        let distance = levenshtein(&a, &b);
        1.0 - (distance as f64 / longest as f64)
    }
}

impl Default for NormalizedLevenshtein {
    fn default() -> Self {
        Self::new(Self::DEFAULT_THRESHOLD)
    }
}

impl SimilarityStrategy for NormalizedLevenshtein {
    fn similar(&self, a: &str, b: &str) -> bool {
        NormalizedLevenshtein::ratio(a, b) >= self.threshold
    }
}

/// Sorted multiset of the numeric literals appearing in a text.
///
/// Candidate duplicates must agree on this exactly; it is the precondition
/// for any strategy, regardless of which string distance is plugged in.
#[must_use]
pub fn numeric_fingerprint(text: &str) -> Vec<u64> {
    let mut numbers = Vec::new();
    let mut current: Option<u64> = None;
    for ch in text.chars() {
        if let Some(digit) = ch.to_digit(10) {
            let next = current
                .unwrap_or(0)
                .saturating_mul(10)
                .saturating_add(u64::from(digit));
            current = Some(next);
        } else if let Some(done) = current.take() {
            numbers.push(done);
        }
    }
    if let Some(done) = current {
        numbers.push(done);
    }
    numbers.sort_unstable();
    numbers
}

fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Classic two-row Levenshtein over char slices.
fn levenshtein(a: &[char], b: &[char]) -> usize {
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];

    for (i, &ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, &cb) in b.iter().enumerate() {
            let substitution = prev[j] + usize::from(ca != cb);
            curr[j + 1] = substitution.min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}
