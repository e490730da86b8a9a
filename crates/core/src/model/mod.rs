mod ids;
mod image;
mod mission;
mod question;
mod settings;
mod subject;

pub use ids::{ContentKey, QuestionId};
pub use image::{ImageError, RewardImage};
pub use mission::{MissionError, MissionState};
pub use question::{ChoiceQuestion, PlacementQuestion, Question, QuestionError, QuestionKind};
pub use settings::{SessionSettings, SettingsError};
pub use subject::{Difficulty, DifficultyError, Subject, SubjectParseError};
