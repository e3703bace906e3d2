use std::sync::Arc;

use quiz_core::Clock;
use quiz_core::entry::quiz_id_from_link;
use quiz_core::model::QuizId;
use storage::SessionStore;
use storage::repository::{AttemptRepository, QuizRepository};

use super::progress::ProgressStore;
use super::prompt::SessionPrompt;
use super::service::SessionEngine;
use crate::error::SessionError;

/// Opens quizzes for taking and wires engines to storage.
#[derive(Clone)]
pub struct QuizSessionService {
    clock: Clock,
    quizzes: Arc<dyn QuizRepository>,
    attempts: Arc<dyn AttemptRepository>,
    store: Arc<dyn SessionStore>,
    prompt: Arc<dyn SessionPrompt>,
}

impl QuizSessionService {
    #[must_use]
    pub fn new(
        clock: Clock,
        quizzes: Arc<dyn QuizRepository>,
        attempts: Arc<dyn AttemptRepository>,
        store: Arc<dyn SessionStore>,
        prompt: Arc<dyn SessionPrompt>,
    ) -> Self {
        Self {
            clock,
            quizzes,
            attempts,
            store,
            prompt,
        }
    }

    /// Load a quiz and look for saved progress.
    ///
    /// The engine starts in `ResumePrompt` when progress exists, otherwise in
    /// `CollectingStudentInfo`. Unreadable progress is ignored.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotFound` for unknown quizzes and
    /// `SessionError::Load` when the store fails.
    pub async fn load_quiz(&self, quiz_id: QuizId) -> Result<SessionEngine, SessionError> {
        let quiz = self
            .quizzes
            .get_quiz(quiz_id)
            .await
            .map_err(SessionError::Load)?
            .ok_or(SessionError::NotFound { quiz_id })?;

        let progress = ProgressStore::new(Arc::clone(&self.store), quiz_id);
        let pending = match progress.load() {
            Ok(pending) => pending,
            Err(err) => {
                tracing::warn!(%quiz_id, error = %err, "could not read saved progress");
                None
            }
        };
        tracing::info!(
            %quiz_id,
            questions = quiz.question_count(),
            has_saved_progress = pending.is_some(),
            "quiz loaded"
        );

        Ok(SessionEngine::new(
            quiz_id,
            quiz,
            self.clock,
            progress,
            Arc::clone(&self.attempts),
            Arc::clone(&self.prompt),
            pending,
        ))
    }

    /// Load the quiz addressed by a share link's `id` parameter.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::MissingQuizId` when the link carries no usable id,
    /// otherwise as [`QuizSessionService::load_quiz`].
    pub async fn load_from_link(&self, link: &str) -> Result<SessionEngine, SessionError> {
        let quiz_id = quiz_id_from_link(link).map_err(|err| {
            tracing::debug!(error = %err, "rejected quiz link");
            SessionError::MissingQuizId
        })?;
        self.load_quiz(quiz_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sessions::{FixedPrompt, SessionPhase};
    use quiz_core::time::fixed_clock;
    use storage::InMemorySessionStore;
    use storage::repository::InMemoryRepository;

    fn service() -> QuizSessionService {
        let repo = InMemoryRepository::new();
        QuizSessionService::new(
            fixed_clock(),
            Arc::new(repo.clone()),
            Arc::new(repo),
            Arc::new(InMemorySessionStore::new()),
            Arc::new(FixedPrompt::new(false)),
        )
    }

    #[tokio::test]
    async fn unknown_quiz_is_not_found() {
        let err = service().load_quiz(QuizId::new(99)).await.err().unwrap();
        assert!(matches!(err, SessionError::NotFound { quiz_id } if quiz_id == QuizId::new(99)));
    }

    #[tokio::test]
    async fn link_without_id_is_rejected() {
        let err = service()
            .load_from_link("http://localhost:8080/quiz/index.html")
            .await
            .err()
            .unwrap();
        assert!(matches!(err, SessionError::MissingQuizId));

        let err = service()
            .load_from_link("http://localhost:8080/quiz/index.html?id=abc")
            .await
            .err()
            .unwrap();
        assert!(matches!(err, SessionError::MissingQuizId));
    }

    #[tokio::test]
    async fn link_with_id_loads_quiz() {
        use quiz_core::model::{Question, QuizDefinition, QuizSettings};
        use quiz_core::time::fixed_now;

        let repo = InMemoryRepository::new();
        let question = Question::new(
            "Pick a",
            vec!["a".into(), "b".into(), "c".into(), "d".into()],
            0,
        )
        .unwrap();
        let quiz = QuizDefinition::new("One", "me", QuizSettings::default(), vec![question], fixed_now())
            .unwrap();
        let id = repo.insert_quiz(&quiz).await.unwrap();
        let service = QuizSessionService::new(
            fixed_clock(),
            Arc::new(repo.clone()),
            Arc::new(repo),
            Arc::new(InMemorySessionStore::new()),
            Arc::new(FixedPrompt::new(false)),
        );

        let engine = service
            .load_from_link(&format!("http://localhost:8080/quiz/index.html?id={id}"))
            .await
            .unwrap();
        assert_eq!(engine.quiz_id(), id);
        assert_eq!(engine.phase(), SessionPhase::CollectingStudentInfo);
    }
}
