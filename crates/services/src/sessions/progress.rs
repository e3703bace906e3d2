use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use quiz_core::model::{AnswerSheet, QuizId, StudentInfo};
use storage::SessionStore;
use storage::repository::StorageError;

/// Snapshot written to the session store after every state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub student_info: StudentInfo,
    pub student_answers: AnswerSheet,
    pub current_question_index: usize,
}

impl SessionState {
    #[must_use]
    pub fn new(student_info: StudentInfo) -> Self {
        Self {
            student_info,
            student_answers: AnswerSheet::new(),
            current_question_index: 0,
        }
    }
}

/// Progress found in the session store when a quiz is opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedProgress {
    pub state: SessionState,
    /// Absolute end of a total timer, if one was running.
    pub deadline: Option<DateTime<Utc>>,
}

/// Session-store access scoped to one quiz.
///
/// State lives under `quiz_state:<id>` as JSON, the total deadline under
/// `timer_end:<id>` as epoch milliseconds.
#[derive(Clone)]
pub struct ProgressStore {
    store: Arc<dyn SessionStore>,
    quiz_id: QuizId,
}

impl ProgressStore {
    #[must_use]
    pub fn new(store: Arc<dyn SessionStore>, quiz_id: QuizId) -> Self {
        Self { store, quiz_id }
    }

    fn state_key(&self) -> String {
        format!("quiz_state:{}", self.quiz_id)
    }

    fn deadline_key(&self) -> String {
        format!("timer_end:{}", self.quiz_id)
    }

    /// Reads saved progress.
    ///
    /// A state entry that no longer parses is treated as absent and dropped.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be read.
    pub fn load(&self) -> Result<Option<SavedProgress>, StorageError> {
        let Some(raw) = self.store.get(&self.state_key())? else {
            return Ok(None);
        };
        let state = match serde_json::from_str::<SessionState>(&raw) {
            Ok(state) => state,
            Err(err) => {
                tracing::warn!(quiz_id = %self.quiz_id, error = %err, "discarding unreadable session state");
                self.clear()?;
                return Ok(None);
            }
        };
        let deadline = self
            .store
            .get(&self.deadline_key())?
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .and_then(DateTime::<Utc>::from_timestamp_millis);
        Ok(Some(SavedProgress { state, deadline }))
    }

    /// # Errors
    ///
    /// Returns `StorageError` if the state cannot be encoded or written.
    pub fn save_state(&self, state: &SessionState) -> Result<(), StorageError> {
        let raw =
            serde_json::to_string(state).map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.store.set(&self.state_key(), &raw)
    }

    /// # Errors
    ///
    /// Returns `StorageError` if the deadline cannot be written.
    pub fn save_deadline(&self, deadline: DateTime<Utc>) -> Result<(), StorageError> {
        self.store
            .set(&self.deadline_key(), &deadline.timestamp_millis().to_string())
    }

    /// Removes both entries for the quiz.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if either entry cannot be removed.
    pub fn clear(&self) -> Result<(), StorageError> {
        self.store.remove(&self.state_key())?;
        self.store.remove(&self.deadline_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::OptionIndex;
    use quiz_core::time::fixed_now;
    use storage::InMemorySessionStore;

    fn student() -> StudentInfo {
        StudentInfo::new("Ms", "Ada", "B", "Lovelace", "ada@example.com").unwrap()
    }

    #[test]
    fn state_uses_camel_case_keys() {
        let mut state = SessionState::new(student());
        state
            .student_answers
            .record(0, Some(OptionIndex::new(2).unwrap()));
        state.current_question_index = 1;

        let json: serde_json::Value = serde_json::to_value(&state).unwrap();
        assert_eq!(json["currentQuestionIndex"], 1);
        assert_eq!(json["studentAnswers"], serde_json::json!([2]));
        assert_eq!(json["studentInfo"]["firstName"], "Ada");
    }

    #[test]
    fn save_load_and_clear() {
        let raw = Arc::new(InMemorySessionStore::new());
        let progress = ProgressStore::new(raw.clone(), QuizId::new(7));
        assert!(progress.load().unwrap().is_none());

        let state = SessionState::new(student());
        progress.save_state(&state).unwrap();
        progress.save_deadline(fixed_now()).unwrap();

        assert_eq!(
            raw.get("timer_end:7").unwrap().as_deref(),
            Some("1700000000000")
        );
        let saved = progress.load().unwrap().unwrap();
        assert_eq!(saved.state, state);
        assert_eq!(saved.deadline, Some(fixed_now()));

        progress.clear().unwrap();
        assert!(progress.load().unwrap().is_none());
        assert!(raw.get("timer_end:7").unwrap().is_none());
    }

    #[test]
    fn unreadable_state_is_discarded() {
        let raw = Arc::new(InMemorySessionStore::new());
        raw.set("quiz_state:3", "{not json").unwrap();
        let progress = ProgressStore::new(raw.clone(), QuizId::new(3));

        assert!(progress.load().unwrap().is_none());
        assert!(raw.get("quiz_state:3").unwrap().is_none());
    }
}
