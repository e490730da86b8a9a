use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

//
// ─── SUBJECT ───────────────────────────────────────────────────────────────────
//

/// The closed set of quiz subjects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Subject {
    Math,
    Language,
    Logic,
    Physics,
}

impl Subject {
    /// All subjects in presentation order.
    pub const ALL: [Subject; 4] = [
        Subject::Math,
        Subject::Language,
        Subject::Logic,
        Subject::Physics,
    ];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Subject::Math => "math",
            Subject::Language => "language",
            Subject::Logic => "logic",
            Subject::Physics => "physics",
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown subject: {0}")]
pub struct SubjectParseError(String);

impl FromStr for Subject {
    type Err = SubjectParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "math" => Ok(Subject::Math),
            "language" => Ok(Subject::Language),
            "logic" => Ok(Subject::Logic),
            "physics" => Ok(Subject::Physics),
            other => Err(SubjectParseError(other.to_string())),
        }
    }
}

//
// ─── DIFFICULTY ────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("difficulty must be between 1 and 5, got {0}")]
pub struct DifficultyError(u8);

/// Question difficulty level, 1 (easiest) through 5 (hardest).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Difficulty(u8);

impl Difficulty {
    pub const MIN: Difficulty = Difficulty(1);
    pub const MAX: Difficulty = Difficulty(5);

    /// Creates a difficulty level.
    ///
    /// # Errors
    ///
    /// Returns `DifficultyError` if `level` is outside 1..=5.
    pub fn new(level: u8) -> Result<Self, DifficultyError> {
        if (Self::MIN.0..=Self::MAX.0).contains(&level) {
            Ok(Self(level))
        } else {
            Err(DifficultyError(level))
        }
    }

    /// Creates a difficulty level, clamping out-of-range values into 1..=5.
    #[must_use]
    pub fn clamped(level: u8) -> Self {
        Self(level.clamp(Self::MIN.0, Self::MAX.0))
    }

    #[must_use]
    pub fn value(&self) -> u8 {
        self.0
    }

    /// One level harder, saturating at the maximum.
    ///
    /// Used by the "too hard" feedback path: reported questions move up a
    /// level so future sampling stops serving them to beginners.
    #[must_use]
    pub fn bumped(&self) -> Self {
        Self((self.0 + 1).min(Self::MAX.0))
    }
}

impl Default for Difficulty {
    fn default() -> Self {
        Self::MIN
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subject_round_trips_through_str() {
        for subject in Subject::ALL {
            let parsed: Subject = subject.as_str().parse().unwrap();
            assert_eq!(parsed, subject);
        }
    }

    #[test]
    fn subject_parse_rejects_unknown() {
        assert!("history".parse::<Subject>().is_err());
    }

    #[test]
    fn difficulty_rejects_out_of_range() {
        assert!(Difficulty::new(0).is_err());
        assert!(Difficulty::new(6).is_err());
        assert_eq!(Difficulty::new(3).unwrap().value(), 3);
    }

    #[test]
    fn difficulty_clamps() {
        assert_eq!(Difficulty::clamped(0), Difficulty::MIN);
        assert_eq!(Difficulty::clamped(9), Difficulty::MAX);
    }

    #[test]
    fn difficulty_bump_saturates_at_max() {
        assert_eq!(Difficulty::new(4).unwrap().bumped().value(), 5);
        assert_eq!(Difficulty::MAX.bumped(), Difficulty::MAX);
    }
}
