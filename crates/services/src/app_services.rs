use std::sync::Arc;

use storage::SessionStore;
use storage::repository::Storage;

use crate::Clock;
use crate::attempt_service::AttemptService;
use crate::error::AppServicesError;
use crate::quiz_service::QuizService;
use crate::sessions::{QuizSessionService, SessionPrompt};

/// Assembles app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    quizzes: Arc<QuizService>,
    attempts: Arc<AttemptService>,
    sessions: Arc<QuizSessionService>,
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
        base_url: &str,
        session_store: Arc<dyn SessionStore>,
        prompt: Arc<dyn SessionPrompt>,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_storage(
            &storage,
            clock,
            base_url,
            session_store,
            prompt,
        ))
    }

    /// Build services over an existing storage aggregate.
    #[must_use]
    pub fn from_storage(
        storage: &Storage,
        clock: Clock,
        base_url: &str,
        session_store: Arc<dyn SessionStore>,
        prompt: Arc<dyn SessionPrompt>,
    ) -> Self {
        let quizzes = Arc::new(QuizService::new(
            clock,
            Arc::clone(&storage.quizzes),
            storage.changes.clone(),
            base_url,
        ));
        let attempts = Arc::new(AttemptService::new(
            Arc::clone(&storage.quizzes),
            Arc::clone(&storage.attempts),
            storage.changes.clone(),
        ));
        let sessions = Arc::new(QuizSessionService::new(
            clock,
            Arc::clone(&storage.quizzes),
            Arc::clone(&storage.attempts),
            session_store,
            prompt,
        ));
        Self {
            quizzes,
            attempts,
            sessions,
        }
    }

    #[must_use]
    pub fn quizzes(&self) -> Arc<QuizService> {
        Arc::clone(&self.quizzes)
    }

    #[must_use]
    pub fn attempts(&self) -> Arc<AttemptService> {
        Arc::clone(&self.attempts)
    }

    #[must_use]
    pub fn sessions(&self) -> Arc<QuizSessionService> {
        Arc::clone(&self.sessions)
    }
}
