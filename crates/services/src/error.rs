//! Shared error types for the services crate.

use thiserror::Error;

use quiz_core::entry::EntryError;
use quiz_core::import::ImportError;
use quiz_core::model::{QuizError, QuizId, QuizValidationError, StudentInfoError};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

use crate::sessions::SessionPhase;

/// Errors emitted by the quiz session engine.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("invalid quiz link: no quiz id")]
    MissingQuizId,
    #[error("quiz {quiz_id} not found")]
    NotFound { quiz_id: QuizId },
    #[error("could not load the quiz")]
    Load(#[source] StorageError),
    #[error("could not save session progress")]
    Progress(#[source] StorageError),
    #[error("cannot {action} while the session is {phase:?}")]
    InvalidPhase {
        action: &'static str,
        phase: SessionPhase,
    },
    #[error(transparent)]
    Student(#[from] StudentInfoError),
}

/// Errors emitted by `QuizService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuizServiceError {
    #[error("quiz not found")]
    NotFound,
    #[error(transparent)]
    Validation(#[from] QuizValidationError),
    #[error(transparent)]
    Quiz(#[from] QuizError),
    #[error(transparent)]
    Import(#[from] ImportError),
    #[error(transparent)]
    Entry(#[from] EntryError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `AttemptService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AttemptServiceError {
    #[error("attempt not found")]
    NotFound,
    #[error("could not load attempt data")]
    Load(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
}
