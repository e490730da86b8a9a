//! Hand-authored starter questions bundled with the application.
//!
//! This pack serves two jobs: it seeds a fresh content store, and it is the
//! terminal fallback when both generation and the cache have failed. It must
//! therefore cover every subject and require no I/O.

use chrono::{DateTime, Utc};

use crate::model::{Difficulty, Question, Subject};

struct Starter {
    subject: Subject,
    difficulty: u8,
    prompt: &'static str,
    options: &'static [&'static str],
    correct: usize,
    explanation: &'static str,
    visual_subject: Option<&'static str>,
}

const STARTERS: &[Starter] = &[
    // Math
    Starter {
        subject: Subject::Math,
        difficulty: 1,
        prompt: "What is 2 + 2?",
        options: &["3", "4", "5"],
        correct: 1,
        explanation: "2 + 2 makes 4. Count two fingers, then two more!",
        visual_subject: Some("a small blue steam engine with four wheels"),
    },
    Starter {
        subject: Subject::Math,
        difficulty: 1,
        prompt: "Which number comes after 6?",
        options: &["5", "7", "8"],
        correct: 1,
        explanation: "Counting up goes 5, 6, 7 - so 7 comes right after 6.",
        visual_subject: Some("seven colorful train cars in a row"),
    },
    Starter {
        subject: Subject::Math,
        difficulty: 2,
        prompt: "A train has 5 cars and picks up 3 more. How many cars now?",
        options: &["7", "8", "9"],
        correct: 1,
        explanation: "5 cars plus 3 cars makes 8 cars in the train.",
        visual_subject: Some("a long freight train with eight cars"),
    },
    Starter {
        subject: Subject::Math,
        difficulty: 3,
        prompt: "What is 6 times 4?",
        options: &["18", "22", "24", "28"],
        correct: 2,
        explanation: "6 groups of 4 make 24.",
        visual_subject: None,
    },
    // Language
    Starter {
        subject: Subject::Language,
        difficulty: 1,
        prompt: "Which word starts with the same sound as 'train'?",
        options: &["tree", "ball", "sun"],
        correct: 0,
        explanation: "'Train' and 'tree' both start with the 'tr' sound.",
        visual_subject: Some("a friendly green tree beside a railway"),
    },
    Starter {
        subject: Subject::Language,
        difficulty: 2,
        prompt: "What is the opposite of 'fast'?",
        options: &["quick", "slow", "loud"],
        correct: 1,
        explanation: "Something that is not fast is slow.",
        visual_subject: Some("a slow old steam engine puffing up a hill"),
    },
    Starter {
        subject: Subject::Language,
        difficulty: 3,
        prompt: "Which word is a naming word (a noun)?",
        options: &["jump", "station", "quickly"],
        correct: 1,
        explanation: "A station is a thing you can name, so it is a noun.",
        visual_subject: None,
    },
    // Logic
    Starter {
        subject: Subject::Logic,
        difficulty: 1,
        prompt: "Red car, blue car, red car, blue car... what comes next?",
        options: &["red car", "blue car", "green car"],
        correct: 0,
        explanation: "The pattern repeats red, blue, red, blue - so red is next.",
        visual_subject: Some("a toy train with alternating red and blue cars"),
    },
    Starter {
        subject: Subject::Logic,
        difficulty: 2,
        prompt: "All expresses are trains. Thunder is an express. What is Thunder?",
        options: &["a boat", "a train", "a plane"],
        correct: 1,
        explanation: "Every express is a train, and Thunder is an express, so Thunder is a train.",
        visual_subject: None,
    },
    Starter {
        subject: Subject::Logic,
        difficulty: 3,
        prompt: "Anna sits in front of Ben. Ben sits in front of Carl. Who is at the back?",
        options: &["Anna", "Ben", "Carl"],
        correct: 2,
        explanation: "Anna is first, Ben is behind her, and Carl is behind Ben.",
        visual_subject: None,
    },
    // Physics
    Starter {
        subject: Subject::Physics,
        difficulty: 1,
        prompt: "What happens when you let go of a ball?",
        options: &["it floats", "it falls down", "it flies up"],
        correct: 1,
        explanation: "Gravity pulls things down toward the ground.",
        visual_subject: Some("a red ball bouncing next to a railway platform"),
    },
    Starter {
        subject: Subject::Physics,
        difficulty: 2,
        prompt: "Which surface lets a toy train roll the farthest?",
        options: &["thick carpet", "smooth track", "sandy path"],
        correct: 1,
        explanation: "A smooth track has the least friction, so the train rolls farthest.",
        visual_subject: Some("a wooden toy train rolling on smooth rails"),
    },
    Starter {
        subject: Subject::Physics,
        difficulty: 3,
        prompt: "A heavy wagon and a light wagon roll down the same ramp. Which needs more push to stop?",
        options: &["the heavy one", "the light one", "both the same"],
        correct: 0,
        explanation: "Heavier things carry more momentum, so they are harder to stop.",
        visual_subject: None,
    },
];

/// Builds the full starter pack with fresh delivery ids.
///
/// Mis-authored entries are skipped rather than panicking; the pack is
/// covered by tests that assert every subject stays represented.
#[must_use]
pub fn starter_questions(now: DateTime<Utc>) -> Vec<Question> {
    STARTERS
        .iter()
        .filter_map(|s| {
            Question::new_choice(
                s.subject,
                Difficulty::clamped(s.difficulty),
                s.prompt,
                s.options.iter().map(|o| (*o).to_string()).collect(),
                s.correct,
                s.explanation,
                s.visual_subject.map(str::to_string),
                now,
            )
            .ok()
        })
        .collect()
}

/// Builds the starter questions for one subject, fresh delivery ids each call.
#[must_use]
pub fn starter_for_subject(subject: Subject, now: DateTime<Utc>) -> Vec<Question> {
    starter_questions(now)
        .into_iter()
        .filter(|q| q.subject() == subject)
        .collect()
}
