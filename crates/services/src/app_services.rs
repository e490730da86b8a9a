use std::sync::Arc;

use storage::repository::Storage;
use train_core::Clock;
use train_core::model::SessionSettings;
use train_core::similarity::NormalizedLevenshtein;

use crate::error::AppServicesError;
use crate::generator::{OpenAiGenerator, QuestionSource};
use crate::library_service::LibraryService;
use crate::random::{RandomSource, ThreadRandom};
use crate::sessions::{BufferManager, MissionController};

/// Assembles the app-facing services over one `Storage`.
///
/// All collaborators are explicitly constructed and injected here; nothing
/// reaches for ambient global state.
#[derive(Clone)]
pub struct AppServices {
    storage: Storage,
    buffer: BufferManager,
    library: Arc<LibraryService>,
    settings: SessionSettings,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        settings: SessionSettings,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::assemble(storage, clock, settings))
    }

    /// Build services over in-memory storage, for tests and prototyping.
    #[must_use]
    pub fn new_in_memory(clock: Clock, settings: SessionSettings) -> Self {
        Self::assemble(Storage::in_memory(), clock, settings)
    }

    fn assemble(storage: Storage, clock: Clock, settings: SessionSettings) -> Self {
        let random: Arc<dyn RandomSource> = Arc::new(ThreadRandom);
        let source: Option<Arc<dyn QuestionSource>> = OpenAiGenerator::from_env(clock)
            .map(|generator| Arc::new(generator) as Arc<dyn QuestionSource>);

        let buffer = BufferManager::new(
            Arc::clone(&storage.questions),
            Arc::clone(&storage.images),
            source.clone(),
            Arc::clone(&random),
            settings.clone(),
            clock,
        );
        let library = Arc::new(LibraryService::new(
            Arc::clone(&storage.questions),
            source,
            Arc::new(NormalizedLevenshtein::default()),
            random,
        ));

        Self {
            storage,
            buffer,
            library,
            settings,
        }
    }

    #[must_use]
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Handle onto the shared buffer manager.
    #[must_use]
    pub fn buffer(&self) -> BufferManager {
        self.buffer.clone()
    }

    /// A fresh mission controller over the shared buffer.
    #[must_use]
    pub fn new_mission(&self) -> MissionController {
        MissionController::new(self.buffer.clone(), self.settings.clone())
    }

    #[must_use]
    pub fn library(&self) -> Arc<LibraryService> {
        Arc::clone(&self.library)
    }

    #[must_use]
    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }
}
