use async_trait::async_trait;
use quiz_core::model::{AttemptId, AttemptRecord, QuizDefinition, QuizId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

use crate::changes::{ChangeFeed, StorageChange};

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// A quiz definition together with its storage identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredQuiz {
    pub id: QuizId,
    pub quiz: QuizDefinition,
}

/// An attempt record together with its storage identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredAttempt {
    pub id: AttemptId,
    pub attempt: AttemptRecord,
}

/// Repository contract for quiz definitions.
#[async_trait]
pub trait QuizRepository: Send + Sync {
    /// Insert a new quiz and return its assigned identifier.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the quiz cannot be stored.
    async fn insert_quiz(&self, quiz: &QuizDefinition) -> Result<QuizId, StorageError>;

    /// Overwrite an existing quiz.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if no quiz has this id.
    async fn update_quiz(&self, id: QuizId, quiz: &QuizDefinition) -> Result<(), StorageError>;

    /// Fetch a quiz by ID. Returns `Ok(None)` when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_quiz(&self, id: QuizId) -> Result<Option<QuizDefinition>, StorageError>;

    /// Quizzes created by `owner`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_quizzes(&self, owner: &str) -> Result<Vec<StoredQuiz>, StorageError>;

    /// Delete a quiz and every attempt recorded against it, as one operation.
    ///
    /// Returns the number of attempts removed.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the quiz does not exist.
    async fn delete_quiz_cascade(&self, id: QuizId) -> Result<u64, StorageError>;
}

/// Append-only repository contract for submitted attempts.
#[async_trait]
pub trait AttemptRepository: Send + Sync {
    /// Persist a new attempt.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the referenced quiz does not exist,
    /// or other storage errors.
    async fn append_attempt(&self, attempt: &AttemptRecord) -> Result<AttemptId, StorageError>;

    /// Fetch an attempt by ID. Returns `Ok(None)` when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_attempt(&self, id: AttemptId) -> Result<Option<AttemptRecord>, StorageError>;

    /// Attempts for a quiz, most recent submission first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_attempts(&self, quiz_id: QuizId) -> Result<Vec<StoredAttempt>, StorageError>;
}

#[derive(Default)]
struct MemoryState {
    next_quiz_id: u64,
    next_attempt_id: u64,
    quizzes: HashMap<QuizId, QuizDefinition>,
    attempts: HashMap<AttemptId, AttemptRecord>,
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    state: Arc<Mutex<MemoryState>>,
    feed: ChangeFeed,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::with_feed(ChangeFeed::new())
    }

    #[must_use]
    pub fn with_feed(feed: ChangeFeed) -> Self {
        Self {
            state: Arc::new(Mutex::new(MemoryState::default())),
            feed,
        }
    }

    #[must_use]
    pub fn feed(&self) -> &ChangeFeed {
        &self.feed
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, MemoryState>, StorageError> {
        self.state
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }
}

#[async_trait]
impl QuizRepository for InMemoryRepository {
    async fn insert_quiz(&self, quiz: &QuizDefinition) -> Result<QuizId, StorageError> {
        let id = {
            let mut guard = self.lock()?;
            guard.next_quiz_id += 1;
            let id = QuizId::new(guard.next_quiz_id);
            guard.quizzes.insert(id, quiz.clone());
            id
        };
        self.feed.publish(StorageChange::QuizSaved(id));
        Ok(id)
    }

    async fn update_quiz(&self, id: QuizId, quiz: &QuizDefinition) -> Result<(), StorageError> {
        {
            let mut guard = self.lock()?;
            let slot = guard.quizzes.get_mut(&id).ok_or(StorageError::NotFound)?;
            *slot = quiz.clone();
        }
        self.feed.publish(StorageChange::QuizSaved(id));
        Ok(())
    }

    async fn get_quiz(&self, id: QuizId) -> Result<Option<QuizDefinition>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.quizzes.get(&id).cloned())
    }

    async fn list_quizzes(&self, owner: &str) -> Result<Vec<StoredQuiz>, StorageError> {
        let guard = self.lock()?;
        let mut out: Vec<StoredQuiz> = guard
            .quizzes
            .iter()
            .filter(|(_, quiz)| quiz.owner() == owner)
            .map(|(id, quiz)| StoredQuiz {
                id: *id,
                quiz: quiz.clone(),
            })
            .collect();
        out.sort_by(|a, b| {
            b.quiz
                .created_at()
                .cmp(&a.quiz.created_at())
                .then(b.id.cmp(&a.id))
        });
        Ok(out)
    }

    async fn delete_quiz_cascade(&self, id: QuizId) -> Result<u64, StorageError> {
        let removed = {
            let mut guard = self.lock()?;
            if guard.quizzes.remove(&id).is_none() {
                return Err(StorageError::NotFound);
            }
            let before = guard.attempts.len();
            guard.attempts.retain(|_, attempt| attempt.quiz_id() != id);
            u64::try_from(before - guard.attempts.len()).unwrap_or(u64::MAX)
        };
        self.feed.publish(StorageChange::QuizDeleted(id));
        Ok(removed)
    }
}

#[async_trait]
impl AttemptRepository for InMemoryRepository {
    async fn append_attempt(&self, attempt: &AttemptRecord) -> Result<AttemptId, StorageError> {
        let id = {
            let mut guard = self.lock()?;
            if !guard.quizzes.contains_key(&attempt.quiz_id()) {
                return Err(StorageError::Conflict);
            }
            guard.next_attempt_id += 1;
            let id = AttemptId::new(guard.next_attempt_id);
            guard.attempts.insert(id, attempt.clone());
            id
        };
        self.feed.publish(StorageChange::AttemptAppended {
            quiz_id: attempt.quiz_id(),
            attempt_id: id,
        });
        Ok(id)
    }

    async fn get_attempt(&self, id: AttemptId) -> Result<Option<AttemptRecord>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.attempts.get(&id).cloned())
    }

    async fn list_attempts(&self, quiz_id: QuizId) -> Result<Vec<StoredAttempt>, StorageError> {
        let guard = self.lock()?;
        let mut out: Vec<StoredAttempt> = guard
            .attempts
            .iter()
            .filter(|(_, attempt)| attempt.quiz_id() == quiz_id)
            .map(|(id, attempt)| StoredAttempt {
                id: *id,
                attempt: attempt.clone(),
            })
            .collect();
        out.sort_by(|a, b| {
            b.attempt
                .submitted_at()
                .cmp(&a.attempt.submitted_at())
                .then(b.id.cmp(&a.id))
        });
        Ok(out)
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub quizzes: Arc<dyn QuizRepository>,
    pub attempts: Arc<dyn AttemptRepository>,
    pub changes: ChangeFeed,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let changes = repo.feed().clone();
        let quizzes: Arc<dyn QuizRepository> = Arc::new(repo.clone());
        let attempts: Arc<dyn AttemptRepository> = Arc::new(repo);
        Self {
            quizzes,
            attempts,
            changes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{AnswerSheet, Question, QuizSettings, StudentInfo};
    use quiz_core::time::fixed_now;

    fn build_quiz(title: &str, created_offset_secs: i64) -> QuizDefinition {
        let question = Question::new(
            "Q",
            vec!["a".into(), "b".into(), "c".into(), "d".into()],
            0,
        )
        .unwrap();
        QuizDefinition::new(
            title,
            "instructor",
            QuizSettings::default(),
            vec![question],
            fixed_now() + chrono::Duration::seconds(created_offset_secs),
        )
        .unwrap()
    }

    fn build_attempt(quiz_id: QuizId, offset_secs: i64) -> AttemptRecord {
        AttemptRecord::new(
            quiz_id,
            "Quiz",
            StudentInfo::new("Ms.", "Ada", "B", "Lovelace", "ada@example.com").unwrap(),
            AnswerSheet::new(),
            0,
            1,
            fixed_now() + chrono::Duration::seconds(offset_secs),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn lists_quizzes_newest_first_per_owner() {
        let repo = InMemoryRepository::new();
        let old = repo.insert_quiz(&build_quiz("old", 0)).await.unwrap();
        let new = repo.insert_quiz(&build_quiz("new", 60)).await.unwrap();

        let listed = repo.list_quizzes("instructor").await.unwrap();
        let ids: Vec<_> = listed.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![new, old]);
        assert!(repo.list_quizzes("someone-else").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn cascade_delete_removes_attempts() {
        let repo = InMemoryRepository::new();
        let keep = repo.insert_quiz(&build_quiz("keep", 0)).await.unwrap();
        let doomed = repo.insert_quiz(&build_quiz("doomed", 0)).await.unwrap();
        for i in 0..3 {
            repo.append_attempt(&build_attempt(doomed, i)).await.unwrap();
        }
        repo.append_attempt(&build_attempt(keep, 0)).await.unwrap();

        let removed = repo.delete_quiz_cascade(doomed).await.unwrap();
        assert_eq!(removed, 3);
        assert!(repo.get_quiz(doomed).await.unwrap().is_none());
        assert!(repo.list_attempts(doomed).await.unwrap().is_empty());
        assert_eq!(repo.list_attempts(keep).await.unwrap().len(), 1);

        let err = repo.delete_quiz_cascade(doomed).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound));
    }

    #[tokio::test]
    async fn attempt_for_missing_quiz_conflicts() {
        let repo = InMemoryRepository::new();
        let err = repo
            .append_attempt(&build_attempt(QuizId::new(99), 0))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Conflict));
    }

    #[tokio::test]
    async fn writes_are_published_on_the_feed() {
        let repo = InMemoryRepository::new();
        let mut rx = repo.feed().subscribe();
        let id = repo.insert_quiz(&build_quiz("q", 0)).await.unwrap();
        let attempt_id = repo.append_attempt(&build_attempt(id, 0)).await.unwrap();

        assert_eq!(rx.recv().await.unwrap(), StorageChange::QuizSaved(id));
        assert_eq!(
            rx.recv().await.unwrap(),
            StorageChange::AttemptAppended {
                quiz_id: id,
                attempt_id
            }
        );
    }
}
