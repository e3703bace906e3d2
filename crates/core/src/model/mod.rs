mod attempt;
mod ids;
mod question;
mod quiz;
mod student;

pub use ids::{AttemptId, ParseIdError, QuizId};

pub use attempt::{AnswerSheet, AttemptError, AttemptRecord};
pub use question::{OPTION_COUNT, OPTION_LETTERS, OptionIndex, Question, QuestionError};
pub use quiz::{
    DraftIssue, QuestionDraft, QuizDefinition, QuizDraft, QuizError, QuizSettings,
    QuizValidationError, TimerSetting, TimerType, ValidatedQuiz,
};
pub use student::{StudentInfo, StudentInfoError};
