use std::sync::Arc;

use quiz_core::model::{AttemptId, AttemptRecord, QuizId};
use quiz_core::scoring::{ReviewItem, review_answers};
use storage::ChangeFeed;
use storage::StorageChange;
use storage::repository::{AttemptRepository, QuizRepository, StoredAttempt};

use crate::error::AttemptServiceError;
use crate::live::LiveQuery;

/// A stored attempt next to the per-question review against its quiz.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptReview {
    pub attempt: AttemptRecord,
    pub items: Vec<ReviewItem>,
}

/// Read side of submitted attempts for quiz owners.
#[derive(Clone)]
pub struct AttemptService {
    quizzes: Arc<dyn QuizRepository>,
    attempts: Arc<dyn AttemptRepository>,
    changes: ChangeFeed,
}

impl AttemptService {
    #[must_use]
    pub fn new(
        quizzes: Arc<dyn QuizRepository>,
        attempts: Arc<dyn AttemptRepository>,
        changes: ChangeFeed,
    ) -> Self {
        Self {
            quizzes,
            attempts,
            changes,
        }
    }

    /// Attempts for a quiz, most recent submission first.
    ///
    /// # Errors
    ///
    /// Returns `AttemptServiceError::Load` if repository access fails.
    pub async fn list_attempts(
        &self,
        quiz_id: QuizId,
    ) -> Result<Vec<StoredAttempt>, AttemptServiceError> {
        Ok(self.attempts.list_attempts(quiz_id).await?)
    }

    /// Live version of [`AttemptService::list_attempts`].
    #[must_use]
    pub fn watch_attempts(&self, quiz_id: QuizId) -> LiveQuery<StoredAttempt> {
        let attempts = Arc::clone(&self.attempts);
        LiveQuery::new(
            self.changes.subscribe(),
            move |change| {
                change.quiz_id() == quiz_id
                    && matches!(
                        change,
                        StorageChange::AttemptAppended { .. } | StorageChange::QuizDeleted(_)
                    )
            },
            move || {
                let attempts = Arc::clone(&attempts);
                Box::pin(async move { attempts.list_attempts(quiz_id).await })
            },
        )
    }

    /// # Errors
    ///
    /// Returns `AttemptServiceError::NotFound` for unknown attempts.
    pub async fn get_attempt(&self, id: AttemptId) -> Result<AttemptRecord, AttemptServiceError> {
        self.attempts
            .get_attempt(id)
            .await?
            .ok_or(AttemptServiceError::NotFound)
    }

    /// Per-question review of an attempt: the student's choice (or "No Answer"),
    /// the correct option and whether they match.
    ///
    /// # Errors
    ///
    /// Returns `AttemptServiceError::NotFound` if the attempt or its quiz is gone.
    pub async fn review_attempt(&self, id: AttemptId) -> Result<AttemptReview, AttemptServiceError> {
        let attempt = self.get_attempt(id).await?;
        let quiz = self
            .quizzes
            .get_quiz(attempt.quiz_id())
            .await?
            .ok_or(AttemptServiceError::NotFound)?;
        let items = review_answers(&quiz, attempt.answers());
        Ok(AttemptReview { attempt, items })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Duration;
    use quiz_core::model::{
        AnswerSheet, OptionIndex, Question, QuizDefinition, QuizSettings, StudentInfo,
    };
    use quiz_core::scoring::NO_ANSWER;
    use quiz_core::time::fixed_now;
    use storage::repository::InMemoryRepository;

    fn quiz() -> QuizDefinition {
        let opts = || vec!["w".to_string(), "x".into(), "y".into(), "z".into()];
        QuizDefinition::new(
            "Review me",
            "instructor",
            QuizSettings::default(),
            vec![
                Question::new("One", opts(), 1).unwrap(),
                Question::new("Two", opts(), 2).unwrap(),
            ],
            fixed_now(),
        )
        .unwrap()
    }

    fn attempt(quiz_id: QuizId, name: &str, minutes: i64) -> AttemptRecord {
        AttemptRecord::new(
            quiz_id,
            "Review me",
            StudentInfo::new("Ms", name, "Q", "Student", "s@example.com").unwrap(),
            AnswerSheet::from_slots(vec![Some(OptionIndex::new(1).unwrap()), None]),
            1,
            2,
            fixed_now() + Duration::minutes(minutes),
        )
        .unwrap()
    }

    fn service(repo: &InMemoryRepository) -> AttemptService {
        AttemptService::new(
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
            repo.feed().clone(),
        )
    }

    #[tokio::test]
    async fn review_marks_unanswered_questions() {
        let repo = InMemoryRepository::new();
        let quiz_id = repo.insert_quiz(&quiz()).await.unwrap();
        let id = repo.append_attempt(&attempt(quiz_id, "Ann", 0)).await.unwrap();

        let review = service(&repo).review_attempt(id).await.unwrap();
        assert_eq!(review.attempt.score(), 1);
        assert!(review.items[0].is_correct);
        assert_eq!(review.items[0].student_choice_label(), "x");
        assert_eq!(review.items[1].student_choice_label(), NO_ANSWER);
        assert_eq!(review.items[1].correct_choice, "y");
        assert!(!review.items[1].is_correct);
    }

    #[tokio::test]
    async fn list_is_newest_first() {
        let repo = InMemoryRepository::new();
        let quiz_id = repo.insert_quiz(&quiz()).await.unwrap();
        repo.append_attempt(&attempt(quiz_id, "Early", 1)).await.unwrap();
        repo.append_attempt(&attempt(quiz_id, "Late", 5)).await.unwrap();

        let listed = service(&repo).list_attempts(quiz_id).await.unwrap();
        let names: Vec<_> = listed
            .iter()
            .map(|a| a.attempt.student_info().first_name.as_str())
            .collect();
        assert_eq!(names, ["Late", "Early"]);
    }

    #[tokio::test]
    async fn missing_attempt_is_not_found() {
        let repo = InMemoryRepository::new();
        let err = service(&repo)
            .review_attempt(AttemptId::new(5))
            .await
            .unwrap_err();
        assert!(matches!(err, AttemptServiceError::NotFound));
    }

    #[tokio::test]
    async fn watch_attempts_sees_new_submissions() {
        let repo = InMemoryRepository::new();
        let quiz_id = repo.insert_quiz(&quiz()).await.unwrap();
        let other = repo.insert_quiz(&quiz()).await.unwrap();
        let service = service(&repo);
        let mut live = service.watch_attempts(quiz_id);
        assert!(live.next().await.unwrap().unwrap().is_empty());

        repo.append_attempt(&attempt(other, "Elsewhere", 0)).await.unwrap();
        repo.append_attempt(&attempt(quiz_id, "Here", 0)).await.unwrap();
        let snapshot = live.next().await.unwrap().unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].attempt.student_info().first_name, "Here");
    }
}
