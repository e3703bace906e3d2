use std::sync::Arc;

use url::Url;

use quiz_core::entry::share_link;
use quiz_core::import::{ImportReport, parse_questions};
use quiz_core::model::{QuestionDraft, QuizDefinition, QuizDraft, QuizId};
use storage::ChangeFeed;
use storage::repository::{QuizRepository, StorageError, StoredQuiz};

use crate::Clock;
use crate::error::QuizServiceError;
use crate::live::LiveQuery;

/// Authoring operations: create, edit, list, share and delete quizzes.
#[derive(Clone)]
pub struct QuizService {
    clock: Clock,
    quizzes: Arc<dyn QuizRepository>,
    changes: ChangeFeed,
    base_url: String,
}

impl QuizService {
    #[must_use]
    pub fn new(
        clock: Clock,
        quizzes: Arc<dyn QuizRepository>,
        changes: ChangeFeed,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            clock,
            quizzes,
            changes,
            base_url: base_url.into(),
        }
    }

    /// Validate a draft and store it as a new quiz owned by `owner`.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::Validation` listing every draft problem.
    /// Returns `QuizServiceError::Storage` if persistence fails.
    pub async fn create_quiz(
        &self,
        owner: &str,
        draft: QuizDraft,
    ) -> Result<QuizId, QuizServiceError> {
        let validated = draft.validate()?;
        let quiz = validated.into_definition(owner, self.clock.now())?;
        let id = self.quizzes.insert_quiz(&quiz).await?;
        tracing::info!(quiz_id = %id, owner, questions = quiz.question_count(), "quiz created");
        Ok(id)
    }

    /// Replace title, settings and questions of an existing quiz.
    ///
    /// Owner and creation time are kept; `updated_at` is set to now.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::NotFound` for unknown quizzes,
    /// `QuizServiceError::Validation` for an invalid draft.
    pub async fn update_quiz(&self, id: QuizId, draft: QuizDraft) -> Result<(), QuizServiceError> {
        let validated = draft.validate()?;
        let existing = self
            .quizzes
            .get_quiz(id)
            .await?
            .ok_or(QuizServiceError::NotFound)?;
        let revised = existing.revised(validated, self.clock.now());
        self.quizzes
            .update_quiz(id, &revised)
            .await
            .map_err(not_found)?;
        tracing::info!(quiz_id = %id, "quiz updated");
        Ok(())
    }

    /// Fetch a quiz. Returns `Ok(None)` when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::Storage` if repository access fails.
    pub async fn get_quiz(&self, id: QuizId) -> Result<Option<QuizDefinition>, QuizServiceError> {
        Ok(self.quizzes.get_quiz(id).await?)
    }

    /// Quizzes owned by `owner`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::Storage` if repository access fails.
    pub async fn list_quizzes(&self, owner: &str) -> Result<Vec<StoredQuiz>, QuizServiceError> {
        Ok(self.quizzes.list_quizzes(owner).await?)
    }

    /// Live version of [`QuizService::list_quizzes`].
    #[must_use]
    pub fn watch_quizzes(&self, owner: &str) -> LiveQuery<StoredQuiz> {
        let quizzes = Arc::clone(&self.quizzes);
        let owner = owner.to_string();
        LiveQuery::new(
            self.changes.subscribe(),
            |change| change.touches_quizzes(),
            move || {
                let quizzes = Arc::clone(&quizzes);
                let owner = owner.clone();
                Box::pin(async move { quizzes.list_quizzes(&owner).await })
            },
        )
    }

    /// Delete a quiz with all its attempts. Returns the number of attempts removed.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::NotFound` for unknown quizzes.
    pub async fn delete_quiz(&self, id: QuizId) -> Result<u64, QuizServiceError> {
        let removed = self
            .quizzes
            .delete_quiz_cascade(id)
            .await
            .map_err(not_found)?;
        tracing::info!(quiz_id = %id, attempts_removed = removed, "quiz deleted");
        Ok(removed)
    }

    /// Parse a JSON question array and append the valid items to `draft`.
    ///
    /// Items already in the draft are kept. The returned report lists the
    /// imported count and every rejected item with its reasons.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::Import` if the input is empty, not JSON, or
    /// not an array; the draft is left untouched.
    pub fn import_questions(
        &self,
        draft: &mut QuizDraft,
        json: &str,
    ) -> Result<ImportReport, QuizServiceError> {
        let report = parse_questions(json)?;
        draft
            .questions
            .extend(report.imported.iter().map(QuestionDraft::from));
        tracing::info!(
            imported = report.imported.len(),
            rejected = report.rejected.len(),
            "questions imported"
        );
        Ok(report)
    }

    /// Link students open to take the quiz.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::Entry` if the configured base URL is invalid.
    pub fn share_link(&self, id: QuizId) -> Result<Url, QuizServiceError> {
        Ok(share_link(&self.base_url, id)?)
    }
}

fn not_found(err: StorageError) -> QuizServiceError {
    match err {
        StorageError::NotFound => QuizServiceError::NotFound,
        other => QuizServiceError::Storage(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use quiz_core::model::{AnswerSheet, AttemptRecord, DraftIssue, StudentInfo, TimerType};
    use quiz_core::time::{fixed_clock, fixed_now};
    use storage::repository::{AttemptRepository, InMemoryRepository};

    fn question(text: &str, answer: i64) -> QuestionDraft {
        QuestionDraft {
            text: text.to_string(),
            options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            answer: Some(answer),
        }
    }

    fn draft(title: &str) -> QuizDraft {
        QuizDraft {
            title: title.to_string(),
            timer_type: TimerType::None,
            timer_value: None,
            points_per_item: None,
            questions: vec![question("First?", 0), question("Second?", 1)],
        }
    }

    fn service(repo: &InMemoryRepository) -> QuizService {
        QuizService::new(
            fixed_clock(),
            Arc::new(repo.clone()),
            repo.feed().clone(),
            "http://localhost:8080/",
        )
    }

    #[tokio::test]
    async fn create_defaults_points_and_keeps_owner() {
        let repo = InMemoryRepository::new();
        let service = service(&repo);
        let id = service.create_quiz("instructor", draft("Basics")).await.unwrap();

        let quiz = service.get_quiz(id).await.unwrap().unwrap();
        assert_eq!(quiz.owner(), "instructor");
        assert_eq!(quiz.settings().points_per_item(), 1);
        assert_eq!(quiz.total_points(), 2);
        assert_eq!(quiz.created_at(), fixed_now());
        assert_eq!(quiz.updated_at(), None);
    }

    #[tokio::test]
    async fn invalid_draft_reports_every_issue() {
        let repo = InMemoryRepository::new();
        let service = service(&repo);
        let mut bad = draft(" ");
        bad.timer_type = TimerType::PerItem;
        bad.timer_value = Some(0);
        bad.questions[1].options.pop();

        let err = service.create_quiz("instructor", bad).await.unwrap_err();
        let QuizServiceError::Validation(err) = err else {
            panic!("expected validation error");
        };
        assert!(err.issues.contains(&DraftIssue::MissingTitle));
        assert!(err.issues.contains(&DraftIssue::InvalidTimerValue));
        assert!(err.issues.contains(&DraftIssue::IncompleteQuestions(vec![2])));
        assert!(service.list_quizzes("instructor").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_keeps_creation_metadata() {
        let repo = InMemoryRepository::new();
        let service = service(&repo);
        let id = service.create_quiz("instructor", draft("Basics")).await.unwrap();

        let mut edit = draft("Basics v2");
        edit.points_per_item = Some(5);
        service.update_quiz(id, edit).await.unwrap();

        let quiz = service.get_quiz(id).await.unwrap().unwrap();
        assert_eq!(quiz.title(), "Basics v2");
        assert_eq!(quiz.owner(), "instructor");
        assert_eq!(quiz.total_points(), 10);
        assert_eq!(quiz.updated_at(), Some(fixed_now()));

        let err = service.update_quiz(QuizId::new(404), draft("x")).await.unwrap_err();
        assert!(matches!(err, QuizServiceError::NotFound));
    }

    #[tokio::test]
    async fn import_appends_valid_items_and_reports_rejections() {
        let repo = InMemoryRepository::new();
        let service = service(&repo);
        let mut form = draft("Imported");
        let json = r#"[
            {"question": "Q1", "options": ["a", "b", "c", "d"], "answer": 0},
            {"question": "Q2", "options": ["a", "b", "c"], "answer": 1}
        ]"#;

        let report = service.import_questions(&mut form, json).unwrap();
        assert_eq!(report.imported.len(), 1);
        assert_eq!(report.rejected.len(), 1);
        assert_eq!(report.rejected[0].position, 2);
        assert_eq!(form.questions.len(), 3);
        assert_eq!(form.questions[2].text, "Q1");

        let err = service.import_questions(&mut form, "{}").unwrap_err();
        assert!(matches!(err, QuizServiceError::Import(_)));
        assert_eq!(form.questions.len(), 3);
    }

    #[tokio::test]
    async fn delete_removes_quiz_and_attempts() {
        let repo = InMemoryRepository::new();
        let service = service(&repo);
        let id = service.create_quiz("instructor", draft("Doomed")).await.unwrap();
        let student = StudentInfo::new("Dr", "Grace", "B", "Hopper", "grace@example.com").unwrap();
        for _ in 0..2 {
            let attempt = AttemptRecord::new(
                id,
                "Doomed",
                student.clone(),
                AnswerSheet::from_slots(vec![None, None]),
                0,
                2,
                fixed_now(),
            )
            .unwrap();
            repo.append_attempt(&attempt).await.unwrap();
        }

        assert_eq!(service.delete_quiz(id).await.unwrap(), 2);
        assert!(service.get_quiz(id).await.unwrap().is_none());
        assert!(repo.list_attempts(id).await.unwrap().is_empty());
        assert!(matches!(
            service.delete_quiz(id).await,
            Err(QuizServiceError::NotFound)
        ));
    }

    #[tokio::test]
    async fn watch_quizzes_refreshes_on_change() {
        let repo = InMemoryRepository::new();
        let service = service(&repo);
        let mut live = service.watch_quizzes("instructor");
        assert!(live.next().await.unwrap().unwrap().is_empty());

        let id = service.create_quiz("instructor", draft("Live")).await.unwrap();
        let snapshot = live.next().await.unwrap().unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].id, id);

        service.delete_quiz(id).await.unwrap();
        assert!(live.next().await.unwrap().unwrap().is_empty());
    }

    #[test]
    fn share_link_points_at_quiz_page() {
        let repo = InMemoryRepository::new();
        let link = service(&repo).share_link(QuizId::new(12)).unwrap();
        assert_eq!(link.as_str(), "http://localhost:8080/quiz/index.html?id=12");
    }
}
