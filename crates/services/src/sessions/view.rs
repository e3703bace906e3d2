use quiz_core::model::{AttemptId, OptionIndex, Question, StudentInfo};
use quiz_core::scoring::ReviewItem;

use super::timer::TimerDisplay;

/// Lifecycle of a quiz session.
///
/// Loading happens before an engine exists; a loaded engine starts in
/// `CollectingStudentInfo` or, when saved progress was found, `ResumePrompt`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    CollectingStudentInfo,
    ResumePrompt,
    InProgress,
    Submitted,
}

/// Inputs a presenter feeds into `SessionEngine::handle`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    ResumeChosen(bool),
    BeginSession(StudentInfo),
    Select(OptionIndex),
    Next,
    Tick,
    PerItemTimeout,
    TotalTimeout,
    Submit,
}

/// The question currently on screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionView {
    /// 0-based position.
    pub index: usize,
    pub total: usize,
    pub text: String,
    pub options: Vec<String>,
    pub selection: Option<OptionIndex>,
    /// The next answer submits the quiz.
    pub is_last: bool,
    pub timer: Option<TimerDisplay>,
}

impl QuestionView {
    pub(crate) fn build(
        index: usize,
        total: usize,
        question: &Question,
        selection: Option<OptionIndex>,
        timer: Option<TimerDisplay>,
    ) -> Self {
        Self {
            index,
            total,
            text: question.text().to_string(),
            options: question.options().to_vec(),
            selection,
            is_last: index + 1 >= total,
            timer,
        }
    }

    /// `"Question 2 of 5"`.
    #[must_use]
    pub fn heading(&self) -> String {
        format!("Question {} of {}", self.index + 1, self.total)
    }
}

/// Result screen data produced exactly once per session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionReport {
    pub student_name: String,
    pub score: u32,
    pub total_points: u32,
    pub review: Vec<ReviewItem>,
    /// Set when the attempt reached the document store.
    pub attempt_id: Option<AttemptId>,
}

impl SubmissionReport {
    #[must_use]
    pub fn saved(&self) -> bool {
        self.attempt_id.is_some()
    }

    /// `"Score: 3 / 5"`.
    #[must_use]
    pub fn score_line(&self) -> String {
        format!("Score: {} / {}", self.score, self.total_points)
    }
}

/// What the presenter should show after an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionUpdate {
    /// Nothing changed on screen.
    Idle,
    AwaitingStudentInfo,
    ShowQuestion(QuestionView),
    Timer(TimerDisplay),
    Submitted(SubmissionReport),
}
