//! Test doubles shared by the services integration tests.
#![allow(dead_code)]

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use services::{GenerationError, QuestionSource};
use storage::repository::{QuestionRecord, QuestionRepository};
use train_core::model::{Difficulty, Question, RewardImage, Subject};
use train_core::time::fixed_now;

/// Failure behavior of the stub source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceMode {
    Ok,
    FailTransient,
    RateLimited,
}

/// Scriptable `QuestionSource`: sequentially numbered choice questions,
/// optional per-call delays, optional gate on the first image fetch.
pub struct StubSource {
    calls: AtomicUsize,
    delays_ms: Mutex<Vec<u64>>,
    mode: SourceMode,
    visual: bool,
    image_gate: Mutex<Option<Arc<Notify>>>,
    images_available: bool,
}

impl StubSource {
    pub fn ok() -> Self {
        Self::with_mode(SourceMode::Ok)
    }

    pub fn with_mode(mode: SourceMode) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            delays_ms: Mutex::new(Vec::new()),
            mode,
            visual: false,
            image_gate: Mutex::new(None),
            images_available: false,
        }
    }

    /// Per-call sleeps, consumed in call order. Lets tests force fetches to
    /// complete out of start order.
    pub fn with_delays(self, delays_ms: impl IntoIterator<Item = u64>) -> Self {
        *self.delays_ms.lock().unwrap() = delays_ms.into_iter().collect();
        self
    }

    /// Generated questions carry a visual subject and images are served.
    pub fn with_images(mut self) -> Self {
        self.visual = true;
        self.images_available = true;
        self
    }

    /// The first image fetch blocks until the returned notify is signalled.
    pub fn gate_first_image(self) -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        *self.image_gate.lock().unwrap() = Some(Arc::clone(&gate));
        (self, gate)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QuestionSource for StubSource {
    async fn generate(
        &self,
        subject: Subject,
        difficulty: Difficulty,
        _topic_hint: &str,
        _ban_list: &[String],
    ) -> Result<Question, GenerationError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);

        let delay = {
            let mut delays = self.delays_ms.lock().unwrap();
            if delays.is_empty() {
                None
            } else {
                Some(delays.remove(0))
            }
        };
        if let Some(ms) = delay {
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }

        match self.mode {
            SourceMode::FailTransient => Err(GenerationError::EmptyResponse),
            SourceMode::RateLimited => Err(GenerationError::RateLimited("quota".into())),
            SourceMode::Ok => {
                let visual = self.visual.then(|| format!("stub scene {call}"));
                let question = Question::new_choice(
                    subject,
                    difficulty,
                    format!("Stub question number {call}?"),
                    vec!["yes".into(), "no".into()],
                    0,
                    "Because the stub says so.",
                    visual,
                    fixed_now(),
                )
                .expect("stub question is valid");
                Ok(question)
            }
        }
    }

    async fn generate_image(&self, prompt: &str) -> Option<RewardImage> {
        if !self.images_available {
            return None;
        }
        let gate = self.image_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        RewardImage::new(prompt, "data:image/png;base64,aGk=", fixed_now()).ok()
    }
}

/// Seeds `n` distinct choice questions for a subject/difficulty bucket.
pub async fn seed_questions(
    repo: &dyn QuestionRepository,
    subject: Subject,
    difficulty: u8,
    n: usize,
) {
    for i in 0..n {
        let question = Question::new_choice(
            subject,
            Difficulty::clamped(difficulty),
            format!("Seeded {subject} question number {i}?"),
            vec!["yes".into(), "no".into()],
            0,
            "Because it was seeded that way.",
            None,
            fixed_now(),
        )
        .unwrap();
        repo.upsert_question(&QuestionRecord::from_question(&question))
            .await
            .unwrap();
    }
}

/// Yields to the runtime until the condition holds, panicking after a
/// bounded number of polls so broken tests fail instead of hanging.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..1000 {
        if condition() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition not reached after 1000 polls");
}
