#![forbid(unsafe_code)]

pub mod app_services;
pub mod error;
pub mod generator;
pub mod library_service;
pub mod placement;
pub mod policy;
pub mod random;
pub mod sessions;

pub use train_core::Clock;
pub use sessions as session;

pub use app_services::AppServices;
pub use error::{AppServicesError, FetchError, GenerationError, LibraryError, SessionError};
pub use generator::{GeneratorConfig, OpenAiGenerator, QuestionSource};
pub use library_service::{BulkGenerateReport, ImportReport, LibraryService};
pub use placement::PlacementBuilder;
pub use policy::{PolicyContext, SessionPolicy, SourceDecision};
pub use random::{RandomSource, ScriptedRandom, ThreadRandom};

pub use sessions::{
    AnswerResponse, BufferManager, BufferPhase, MissionAdvance, MissionController,
    MissionProgress, MissionStatus, Verdict,
};
