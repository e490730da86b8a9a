use storage::repository::{ImageLookup, QuestionRecord, Storage};
use train_core::builtin::starter_questions;
use train_core::model::{Difficulty, Question, RewardImage, Subject};
use train_core::time::fixed_now;

async fn storage_in_memory_sqlite() -> Storage {
    Storage::sqlite("sqlite::memory:")
        .await
        .expect("in-memory sqlite")
}

fn build_record(prompt: &str, subject: Subject, difficulty: u8) -> QuestionRecord {
    let question = Question::new_choice(
        subject,
        Difficulty::clamped(difficulty),
        prompt,
        vec!["yes".into(), "no".into()],
        0,
        "Because it is.",
        Some("a cheerful cartoon locomotive".into()),
        fixed_now(),
    )
    .unwrap();
    QuestionRecord::from_question(&question)
}

#[tokio::test]
async fn question_round_trips_through_sqlite() {
    let storage = storage_in_memory_sqlite().await;
    let record = build_record("What is 2 + 3?", Subject::Math, 1);

    storage.questions.upsert_question(&record).await.unwrap();

    let sampled = storage
        .questions
        .sample_random(Subject::Math, Some(Difficulty::clamped(1)))
        .await
        .unwrap()
        .expect("one stored question");

    assert_eq!(sampled.key, record.key);
    assert_eq!(sampled.prompt, record.prompt);
    assert_eq!(sampled.kind, record.kind);
    assert_eq!(sampled.visual_subject, record.visual_subject);

    let question = sampled.instantiate().unwrap();
    assert_eq!(question.subject(), Subject::Math);
    assert!(!question.is_placement());
}

#[tokio::test]
async fn upsert_same_key_does_not_duplicate() {
    let storage = storage_in_memory_sqlite().await;
    let record = build_record("What is 2 + 3?", Subject::Math, 1);

    storage.questions.upsert_question(&record).await.unwrap();
    storage.questions.upsert_question(&record).await.unwrap();

    let count = storage
        .questions
        .count(Subject::Math, Difficulty::clamped(1))
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn bump_difficulty_moves_record_between_buckets() {
    let storage = storage_in_memory_sqlite().await;
    let record = build_record("Which shape has three sides?", Subject::Math, 2);
    storage.questions.upsert_question(&record).await.unwrap();

    let bumped = storage.questions.bump_difficulty(&record.key).await.unwrap();
    assert_eq!(bumped, Difficulty::clamped(3));

    let old_bucket = storage
        .questions
        .count(Subject::Math, Difficulty::clamped(2))
        .await
        .unwrap();
    let new_bucket = storage
        .questions
        .count(Subject::Math, Difficulty::clamped(3))
        .await
        .unwrap();
    assert_eq!(old_bucket, 0);
    assert_eq!(new_bucket, 1);
}

#[tokio::test]
async fn any_difficulty_sample_widens_the_query() {
    let storage = storage_in_memory_sqlite().await;
    let record = build_record("Which is heavier?", Subject::Physics, 4);
    storage.questions.upsert_question(&record).await.unwrap();

    let narrow = storage
        .questions
        .sample_random(Subject::Physics, Some(Difficulty::clamped(1)))
        .await
        .unwrap();
    assert!(narrow.is_none());

    let wide = storage
        .questions
        .sample_random(Subject::Physics, None)
        .await
        .unwrap();
    assert!(wide.is_some());
}

#[tokio::test]
async fn blocked_image_prompt_short_circuits() {
    let storage = storage_in_memory_sqlite().await;
    storage.images.block_image("a scary clown").await.unwrap();

    let image =
        RewardImage::new("a scary clown", "data:image/png;base64,aGk=", fixed_now()).unwrap();
    storage.images.put_image(&image).await.unwrap();

    assert!(matches!(
        storage.images.get_image("a scary clown").await.unwrap(),
        ImageLookup::Blocked
    ));
}

#[tokio::test]
async fn image_round_trips_through_sqlite() {
    let storage = storage_in_memory_sqlite().await;
    let image =
        RewardImage::new("a shiny gold wagon", "data:image/png;base64,aGk=", fixed_now()).unwrap();
    storage.images.put_image(&image).await.unwrap();

    match storage.images.get_image("a shiny gold wagon").await.unwrap() {
        ImageLookup::Found(found) => {
            assert_eq!(found.prompt(), image.prompt());
            assert_eq!(found.data(), image.data());
        }
        other => panic!("expected found, got {other:?}"),
    }
}

#[tokio::test]
async fn starter_pack_seeds_every_subject() {
    let storage = storage_in_memory_sqlite().await;
    for question in starter_questions(fixed_now()) {
        storage
            .questions
            .upsert_question(&QuestionRecord::from_question(&question))
            .await
            .unwrap();
    }

    for subject in Subject::ALL {
        let stored = storage.questions.list_questions(subject).await.unwrap();
        assert!(!stored.is_empty(), "no stored questions for {subject}");
    }
}
