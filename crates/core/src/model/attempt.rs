use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::QuizId;
use crate::model::question::OptionIndex;
use crate::model::student::StudentInfo;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AttemptError {
    #[error("score ({score}) exceeds total points ({total})")]
    ScoreExceedsTotal { score: u32, total: u32 },
}

//
// ─── ANSWER SHEET ──────────────────────────────────────────────────────────────
//

/// One slot per question: an option index, or `None` for "no answer".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerSheet(Vec<Option<OptionIndex>>);

impl AnswerSheet {
    #[must_use]
    pub fn new() -> Self {
        Self(Vec::new())
    }

    #[must_use]
    pub fn from_slots(slots: Vec<Option<OptionIndex>>) -> Self {
        Self(slots)
    }

    /// Stores `selection` at `index`, growing the sheet with empty slots as needed.
    pub fn record(&mut self, index: usize, selection: Option<OptionIndex>) {
        if self.0.len() <= index {
            self.0.resize(index + 1, None);
        }
        self.0[index] = selection;
    }

    /// Slot at `index`; missing slots read as unanswered.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<OptionIndex> {
        self.0.get(index).copied().flatten()
    }

    /// Pads the sheet so it has exactly one slot per question.
    pub fn pad_to(&mut self, len: usize) {
        if self.0.len() < len {
            self.0.resize(len, None);
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn slots(&self) -> &[Option<OptionIndex>] {
        &self.0
    }
}

//
// ─── ATTEMPT RECORD ────────────────────────────────────────────────────────────
//

/// Immutable record of one completed student session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptRecord {
    quiz_id: QuizId,
    quiz_title: String,
    student_info: StudentInfo,
    answers: AnswerSheet,
    score: u32,
    total_points: u32,
    submitted_at: DateTime<Utc>,
}

impl AttemptRecord {
    /// Creates an attempt record.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::ScoreExceedsTotal` if `score > total_points`.
    pub fn new(
        quiz_id: QuizId,
        quiz_title: impl Into<String>,
        student_info: StudentInfo,
        answers: AnswerSheet,
        score: u32,
        total_points: u32,
        submitted_at: DateTime<Utc>,
    ) -> Result<Self, AttemptError> {
        if score > total_points {
            return Err(AttemptError::ScoreExceedsTotal {
                score,
                total: total_points,
            });
        }
        Ok(Self {
            quiz_id,
            quiz_title: quiz_title.into(),
            student_info,
            answers,
            score,
            total_points,
            submitted_at,
        })
    }

    #[must_use]
    pub fn quiz_id(&self) -> QuizId {
        self.quiz_id
    }

    #[must_use]
    pub fn quiz_title(&self) -> &str {
        &self.quiz_title
    }

    #[must_use]
    pub fn student_info(&self) -> &StudentInfo {
        &self.student_info
    }

    #[must_use]
    pub fn answers(&self) -> &AnswerSheet {
        &self.answers
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn total_points(&self) -> u32 {
        self.total_points
    }

    #[must_use]
    pub fn submitted_at(&self) -> DateTime<Utc> {
        self.submitted_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn student() -> StudentInfo {
        StudentInfo::new("Ms.", "Ada", "B", "Lovelace", "ada@example.com").unwrap()
    }

    #[test]
    fn answer_sheet_records_and_pads() {
        let mut sheet = AnswerSheet::new();
        sheet.record(2, OptionIndex::new(3).ok());
        assert_eq!(sheet.len(), 3);
        assert_eq!(sheet.get(0), None);
        assert_eq!(sheet.get(2), OptionIndex::new(3).ok());
        assert_eq!(sheet.get(10), None);

        sheet.pad_to(5);
        assert_eq!(sheet.len(), 5);
    }

    #[test]
    fn answer_sheet_serializes_nulls() {
        let sheet = AnswerSheet::from_slots(vec![OptionIndex::new(1).ok(), None]);
        assert_eq!(serde_json::to_string(&sheet).unwrap(), "[1,null]");
    }

    #[test]
    fn rejects_score_above_total() {
        let err = AttemptRecord::new(
            QuizId::new(1),
            "Quiz",
            student(),
            AnswerSheet::new(),
            3,
            2,
            fixed_now(),
        )
        .unwrap_err();
        assert_eq!(err, AttemptError::ScoreExceedsTotal { score: 3, total: 2 });
    }
}
