use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::model::question::{Question, QuestionError};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizError {
    #[error("quiz title cannot be empty")]
    EmptyTitle,

    #[error("timer value must be > 0 when a timer is enabled")]
    InvalidTimerValue,

    #[error("points per item must be > 0")]
    InvalidPointsPerItem,
}

/// One problem found while validating an authoring draft.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DraftIssue {
    MissingTitle,
    InvalidTimerValue,
    InvalidPointsPerItem,
    NoQuestions,
    /// 1-based numbers of the questions with missing fields.
    IncompleteQuestions(Vec<usize>),
}

impl fmt::Display for DraftIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DraftIssue::MissingTitle => write!(f, "please enter a quiz title"),
            DraftIssue::InvalidTimerValue => {
                write!(f, "please enter a valid number greater than 0 for the timer")
            }
            DraftIssue::InvalidPointsPerItem => write!(f, "points per item must be greater than 0"),
            DraftIssue::NoQuestions => write!(f, "a quiz needs at least one question"),
            DraftIssue::IncompleteQuestions(numbers) => {
                let list = numbers
                    .iter()
                    .map(|n| format!("#{n}"))
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "please fill out all fields for questions {list}")
            }
        }
    }
}

/// Every issue found in a draft, reported together.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("quiz draft is invalid: {}", render_issues(.issues))]
pub struct QuizValidationError {
    pub issues: Vec<DraftIssue>,
}

fn render_issues(issues: &[DraftIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

//
// ─── SETTINGS ──────────────────────────────────────────────────────────────────
//

/// Stored discriminant of the timer configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TimerType {
    #[default]
    None,
    PerItem,
    Total,
}

/// Timer configuration. Only one countdown mode can ever be active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimerSetting {
    #[default]
    None,
    /// Countdown rescoped to each question.
    PerItem { seconds: u32 },
    /// Single countdown spanning the whole session.
    Total { minutes: u32 },
}

impl TimerSetting {
    /// Builds a timer setting from its stored `timerType`/`timerValue` pair.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::InvalidTimerValue` when a timer is enabled without a positive value.
    pub fn from_parts(kind: TimerType, value: Option<u32>) -> Result<Self, QuizError> {
        match (kind, value) {
            (TimerType::None, _) => Ok(Self::None),
            (_, None | Some(0)) => Err(QuizError::InvalidTimerValue),
            (TimerType::PerItem, Some(seconds)) => Ok(Self::PerItem { seconds }),
            (TimerType::Total, Some(minutes)) => Ok(Self::Total { minutes }),
        }
    }

    #[must_use]
    pub fn kind(self) -> TimerType {
        match self {
            TimerSetting::None => TimerType::None,
            TimerSetting::PerItem { .. } => TimerType::PerItem,
            TimerSetting::Total { .. } => TimerType::Total,
        }
    }

    #[must_use]
    pub fn value(self) -> Option<u32> {
        match self {
            TimerSetting::None => None,
            TimerSetting::PerItem { seconds } => Some(seconds),
            TimerSetting::Total { minutes } => Some(minutes),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSettings {
    #[serde(default)]
    timer_type: TimerType,
    #[serde(default)]
    timer_value: Option<u32>,
    #[serde(default)]
    points_per_item: Option<u32>,
}

/// Per-quiz scoring and timing settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawSettings", into = "RawSettings")]
pub struct QuizSettings {
    timer: TimerSetting,
    points_per_item: u32,
}

impl QuizSettings {
    pub const DEFAULT_POINTS_PER_ITEM: u32 = 1;

    /// Creates settings.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::InvalidPointsPerItem` if `points_per_item` is zero.
    pub fn new(timer: TimerSetting, points_per_item: u32) -> Result<Self, QuizError> {
        if points_per_item == 0 {
            return Err(QuizError::InvalidPointsPerItem);
        }
        Ok(Self {
            timer,
            points_per_item,
        })
    }

    #[must_use]
    pub fn timer(&self) -> TimerSetting {
        self.timer
    }

    #[must_use]
    pub fn points_per_item(&self) -> u32 {
        self.points_per_item
    }
}

impl Default for QuizSettings {
    fn default() -> Self {
        Self {
            timer: TimerSetting::None,
            points_per_item: Self::DEFAULT_POINTS_PER_ITEM,
        }
    }
}

impl TryFrom<RawSettings> for QuizSettings {
    type Error = QuizError;

    fn try_from(raw: RawSettings) -> Result<Self, Self::Error> {
        let timer = TimerSetting::from_parts(raw.timer_type, raw.timer_value)?;
        Self::new(
            timer,
            raw.points_per_item
                .unwrap_or(Self::DEFAULT_POINTS_PER_ITEM),
        )
    }
}

impl From<QuizSettings> for RawSettings {
    fn from(settings: QuizSettings) -> Self {
        Self {
            timer_type: settings.timer.kind(),
            timer_value: settings.timer.value(),
            points_per_item: Some(settings.points_per_item),
        }
    }
}

//
// ─── QUIZ DEFINITION ───────────────────────────────────────────────────────────
//

/// Instructor-authored quiz content and settings.
///
/// Read-only for the duration of a session; the engine keeps its own copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizDefinition {
    title: String,
    owner: String,
    settings: QuizSettings,
    questions: Vec<Question>,
    created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    updated_at: Option<DateTime<Utc>>,
}

impl QuizDefinition {
    /// Creates a quiz definition.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::EmptyTitle` if the title is blank.
    pub fn new(
        title: impl Into<String>,
        owner: impl Into<String>,
        settings: QuizSettings,
        questions: Vec<Question>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, QuizError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(QuizError::EmptyTitle);
        }
        Ok(Self {
            title,
            owner: owner.into(),
            settings,
            questions,
            created_at,
            updated_at: None,
        })
    }

    /// Rehydrate a quiz from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::EmptyTitle` if the stored title is blank.
    pub fn from_persisted(
        title: String,
        owner: String,
        settings: QuizSettings,
        questions: Vec<Question>,
        created_at: DateTime<Utc>,
        updated_at: Option<DateTime<Utc>>,
    ) -> Result<Self, QuizError> {
        let mut quiz = Self::new(title, owner, settings, questions, created_at)?;
        quiz.updated_at = updated_at;
        Ok(quiz)
    }

    /// Returns a copy carrying the content of `draft`, keeping owner and creation time.
    #[must_use]
    pub fn revised(&self, draft: ValidatedQuiz, updated_at: DateTime<Utc>) -> Self {
        Self {
            title: draft.title,
            owner: self.owner.clone(),
            settings: draft.settings,
            questions: draft.questions,
            created_at: self.created_at,
            updated_at: Some(updated_at),
        }
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    #[must_use]
    pub fn settings(&self) -> &QuizSettings {
        &self.settings
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn question(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    #[must_use]
    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    /// `pointsPerItem × questionCount`.
    #[must_use]
    pub fn total_points(&self) -> u32 {
        let count = u32::try_from(self.questions.len()).unwrap_or(u32::MAX);
        self.settings.points_per_item().saturating_mul(count)
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }
}

//
// ─── AUTHORING DRAFTS ──────────────────────────────────────────────────────────
//

/// Raw question fields as typed into the authoring form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionDraft {
    #[serde(rename = "question", default)]
    pub text: String,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub answer: Option<i64>,
}

impl QuestionDraft {
    /// Converts the draft into a validated question.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` for blank text/options, wrong option count or a missing answer.
    pub fn validate(self) -> Result<Question, QuestionError> {
        let answer = self.answer.ok_or(QuestionError::AnswerOutOfRange(-1))?;
        Question::new(self.text, self.options, answer)
    }
}

impl From<&Question> for QuestionDraft {
    fn from(question: &Question) -> Self {
        Self {
            text: question.text().to_string(),
            options: question.options().to_vec(),
            answer: Some(i64::from(question.answer().value())),
        }
    }
}

/// Raw quiz fields as typed into the authoring form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizDraft {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub timer_type: TimerType,
    #[serde(default)]
    pub timer_value: Option<u32>,
    #[serde(default)]
    pub points_per_item: Option<u32>,
    #[serde(default)]
    pub questions: Vec<QuestionDraft>,
}

/// Output of a successful draft validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedQuiz {
    pub title: String,
    pub settings: QuizSettings,
    pub questions: Vec<Question>,
}

impl ValidatedQuiz {
    /// Assigns owner and creation time, producing a storable definition.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::EmptyTitle` if the title is blank.
    pub fn into_definition(
        self,
        owner: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Result<QuizDefinition, QuizError> {
        QuizDefinition::new(self.title, owner, self.settings, self.questions, created_at)
    }
}

impl QuizDraft {
    /// Validates every field and reports all problems at once.
    ///
    /// # Errors
    ///
    /// Returns `QuizValidationError` listing each `DraftIssue` found.
    pub fn validate(self) -> Result<ValidatedQuiz, QuizValidationError> {
        let mut issues = Vec::new();

        if self.title.trim().is_empty() {
            issues.push(DraftIssue::MissingTitle);
        }

        let timer = TimerSetting::from_parts(self.timer_type, self.timer_value);
        if timer.is_err() {
            issues.push(DraftIssue::InvalidTimerValue);
        }

        let points = self
            .points_per_item
            .unwrap_or(QuizSettings::DEFAULT_POINTS_PER_ITEM);
        if points == 0 {
            issues.push(DraftIssue::InvalidPointsPerItem);
        }

        if self.questions.is_empty() {
            issues.push(DraftIssue::NoQuestions);
        }

        let mut questions = Vec::with_capacity(self.questions.len());
        let mut incomplete = Vec::new();
        for (i, draft) in self.questions.into_iter().enumerate() {
            match draft.validate() {
                Ok(q) => questions.push(q),
                Err(_) => incomplete.push(i + 1),
            }
        }
        if !incomplete.is_empty() {
            issues.push(DraftIssue::IncompleteQuestions(incomplete));
        }

        match (issues.is_empty(), timer) {
            (true, Ok(timer)) => {
                let settings = QuizSettings::new(timer, points)
                    .map_err(|_| QuizValidationError {
                        issues: vec![DraftIssue::InvalidPointsPerItem],
                    })?;
                Ok(ValidatedQuiz {
                    title: self.title.trim().to_string(),
                    settings,
                    questions,
                })
            }
            _ => Err(QuizValidationError { issues }),
        }
    }
}

impl From<&QuizDefinition> for QuizDraft {
    fn from(quiz: &QuizDefinition) -> Self {
        let timer = quiz.settings().timer();
        Self {
            title: quiz.title().to_string(),
            timer_type: timer.kind(),
            timer_value: timer.value(),
            points_per_item: Some(quiz.settings().points_per_item()),
            questions: quiz.questions().iter().map(QuestionDraft::from).collect(),
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn question_draft(text: &str, answer: Option<i64>) -> QuestionDraft {
        QuestionDraft {
            text: text.to_string(),
            options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            answer,
        }
    }

    fn draft() -> QuizDraft {
        QuizDraft {
            title: "Capitals".to_string(),
            timer_type: TimerType::PerItem,
            timer_value: Some(30),
            points_per_item: None,
            questions: vec![question_draft("first", Some(0))],
        }
    }

    #[test]
    fn valid_draft_defaults_points_to_one() {
        let quiz = draft().validate().unwrap();
        assert_eq!(quiz.settings.points_per_item(), 1);
        assert_eq!(quiz.settings.timer(), TimerSetting::PerItem { seconds: 30 });
    }

    #[test]
    fn draft_reports_every_issue() {
        let mut bad = draft();
        bad.title = "  ".into();
        bad.timer_value = None;
        bad.questions = vec![
            question_draft("ok", Some(1)),
            question_draft("", Some(1)),
            question_draft("no answer", None),
        ];

        let err = bad.validate().unwrap_err();
        assert_eq!(
            err.issues,
            vec![
                DraftIssue::MissingTitle,
                DraftIssue::InvalidTimerValue,
                DraftIssue::IncompleteQuestions(vec![2, 3]),
            ]
        );
        assert!(err.to_string().contains("#2, #3"));
    }

    #[test]
    fn empty_question_list_is_rejected() {
        let mut bad = draft();
        bad.questions.clear();
        let err = bad.validate().unwrap_err();
        assert_eq!(err.issues, vec![DraftIssue::NoQuestions]);
    }

    #[test]
    fn timer_none_ignores_value() {
        let timer = TimerSetting::from_parts(TimerType::None, Some(0)).unwrap();
        assert_eq!(timer, TimerSetting::None);
        assert_eq!(
            TimerSetting::from_parts(TimerType::Total, Some(0)),
            Err(QuizError::InvalidTimerValue)
        );
    }

    #[test]
    fn settings_use_document_shape() {
        let settings = QuizSettings::new(TimerSetting::Total { minutes: 10 }, 2).unwrap();
        let json = serde_json::to_value(settings).unwrap();
        assert_eq!(json["timerType"], "total");
        assert_eq!(json["timerValue"], 10);
        assert_eq!(json["pointsPerItem"], 2);

        let parsed: QuizSettings =
            serde_json::from_value(serde_json::json!({"timerType": "per-item", "timerValue": 15}))
                .unwrap();
        assert_eq!(parsed.timer(), TimerSetting::PerItem { seconds: 15 });
        assert_eq!(parsed.points_per_item(), 1);
    }

    #[test]
    fn total_points_multiplies_per_item() {
        let validated = QuizDraft {
            points_per_item: Some(5),
            questions: vec![question_draft("a", Some(0)), question_draft("b", Some(1))],
            ..draft()
        }
        .validate()
        .unwrap();
        let quiz = validated.into_definition("instructor", fixed_now()).unwrap();
        assert_eq!(quiz.total_points(), 10);
    }

    #[test]
    fn revised_keeps_owner_and_creation_time() {
        let quiz = draft()
            .validate()
            .unwrap()
            .into_definition("instructor", fixed_now())
            .unwrap();
        let mut edit = QuizDraft::from(&quiz);
        edit.title = "Renamed".into();
        let later = fixed_now() + chrono::Duration::hours(1);
        let revised = quiz.revised(edit.validate().unwrap(), later);

        assert_eq!(revised.title(), "Renamed");
        assert_eq!(revised.owner(), "instructor");
        assert_eq!(revised.created_at(), fixed_now());
        assert_eq!(revised.updated_at(), Some(later));
    }
}
