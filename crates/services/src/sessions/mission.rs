use train_core::model::{
    Difficulty, MissionState, Question, QuestionKind, SessionSettings, Subject,
};

use super::buffer::BufferManager;
use crate::error::SessionError;

/// Mission lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissionStatus {
    Idle,
    Active,
    Complete,
}

/// Outcome of verifying one submitted answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Correct,
    Incorrect,
}

/// A learner's answer as reported by the UI layer.
///
/// Placement correctness is supplied by the external drag-and-drop
/// collaborator as the number of items actually placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerResponse {
    Choice { index: usize },
    Placement { placed: u32 },
}

/// Snapshot of mission progress for the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MissionProgress {
    pub correct: u32,
    pub target: u32,
    pub is_complete: bool,
}

/// Result of advancing after a submitted answer.
#[derive(Debug, Clone)]
pub struct MissionAdvance {
    pub verdict: Verdict,
    pub progress: MissionProgress,
    /// Set on completion: the reward (a new train car, in the full app) is
    /// due now.
    pub reward_granted: bool,
    /// The next question when the mission continues; `None` after an
    /// incorrect answer (same question stays current) or on completion.
    pub next: Option<Question>,
}

/// Session lifecycle and scoring over the buffer.
pub struct MissionController {
    buffer: BufferManager,
    settings: SessionSettings,
    status: MissionStatus,
    mission: Option<MissionState>,
    pending_verdict: Option<Verdict>,
}

impl MissionController {
    #[must_use]
    pub fn new(buffer: BufferManager, settings: SessionSettings) -> Self {
        Self {
            buffer,
            settings,
            status: MissionStatus::Idle,
            mission: None,
            pending_verdict: None,
        }
    }

    #[must_use]
    pub fn status(&self) -> MissionStatus {
        self.status
    }

    #[must_use]
    pub fn progress(&self) -> Option<MissionProgress> {
        self.mission.map(|m| MissionProgress {
            correct: m.correct_count(),
            target: m.target(),
            is_complete: m.is_complete(),
        })
    }

    /// The question currently in front of the learner.
    #[must_use]
    pub fn current_question(&self) -> Option<Question> {
        self.buffer.current_question()
    }

    /// Starts a mission: resets the score, starts the buffer session, and
    /// returns the first question.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the mission target is invalid or the first
    /// question cannot be delivered.
    pub async fn begin(
        &mut self,
        subject: Subject,
        difficulty: Difficulty,
    ) -> Result<Question, SessionError> {
        let mission = MissionState::new(self.settings.mission_target())?;
        self.buffer.start_session(subject, difficulty).await;
        self.mission = Some(mission);
        self.status = MissionStatus::Active;
        self.pending_verdict = None;
        self.buffer.request_next().await
    }

    /// Verifies the learner's answer against the current question.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotStarted` outside an active mission,
    /// `SessionError::Completed` after the mission finished.
    pub fn submit_answer(&mut self, response: &AnswerResponse) -> Result<Verdict, SessionError> {
        match self.status {
            MissionStatus::Idle => return Err(SessionError::NotStarted),
            MissionStatus::Complete => return Err(SessionError::Completed),
            MissionStatus::Active => {}
        }
        let current = self
            .buffer
            .current_question()
            .ok_or(SessionError::NotStarted)?;

        let correct = match (current.kind(), response) {
            (QuestionKind::Choice(choice), AnswerResponse::Choice { index }) => {
                choice.is_correct(*index)
            }
            (QuestionKind::Placement(placement), AnswerResponse::Placement { placed }) => {
                placement.is_satisfied(*placed)
            }
            // A response of the wrong shape never counts as correct.
            _ => false,
        };

        let verdict = if correct {
            Verdict::Correct
        } else {
            Verdict::Incorrect
        };
        self.pending_verdict = Some(verdict);
        Ok(verdict)
    }

    /// Applies the last verdict: counts a correct answer, completes the
    /// mission exactly at the target, or fetches the next question.
    ///
    /// On an incorrect answer nothing changes and the same question stays
    /// current; the UI may permit re-answering.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NoPendingAnswer` when called without a
    /// preceding `submit_answer`.
    pub async fn advance(&mut self) -> Result<MissionAdvance, SessionError> {
        match self.status {
            MissionStatus::Idle => return Err(SessionError::NotStarted),
            MissionStatus::Complete => return Err(SessionError::Completed),
            MissionStatus::Active => {}
        }
        let verdict = self
            .pending_verdict
            .take()
            .ok_or(SessionError::NoPendingAnswer)?;
        let mission = self.mission.as_mut().ok_or(SessionError::NotStarted)?;

        if verdict == Verdict::Incorrect {
            return Ok(MissionAdvance {
                verdict,
                progress: MissionProgress {
                    correct: mission.correct_count(),
                    target: mission.target(),
                    is_complete: false,
                },
                reward_granted: false,
                next: None,
            });
        }

        mission.record_correct()?;
        let progress = MissionProgress {
            correct: mission.correct_count(),
            target: mission.target(),
            is_complete: mission.is_complete(),
        };

        if progress.is_complete {
            self.status = MissionStatus::Complete;
            self.buffer.end_session().await;
            return Ok(MissionAdvance {
                verdict,
                progress,
                reward_granted: true,
                next: None,
            });
        }

        let next = self.buffer.request_next().await?;
        Ok(MissionAdvance {
            verdict,
            progress,
            reward_granted: false,
            next: Some(next),
        })
    }
}
