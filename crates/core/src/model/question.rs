use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Number of options every question carries.
pub const OPTION_COUNT: usize = 4;

/// Option letters used when rendering a question.
pub const OPTION_LETTERS: [char; OPTION_COUNT] = ['A', 'B', 'C', 'D'];

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question text cannot be empty")]
    EmptyText,

    #[error("a question needs exactly 4 options, found {found}")]
    OptionCount { found: usize },

    #[error("option {position} is blank")]
    BlankOption { position: usize },

    #[error("answer index must be between 0 and 3, got {0}")]
    AnswerOutOfRange(i64),
}

//
// ─── OPTION INDEX ──────────────────────────────────────────────────────────────
//

/// Index of one of the four options (0..=3).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct OptionIndex(u8);

impl OptionIndex {
    /// Creates an option index.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError::AnswerOutOfRange` when `value > 3`.
    pub fn new(value: u8) -> Result<Self, QuestionError> {
        if usize::from(value) >= OPTION_COUNT {
            return Err(QuestionError::AnswerOutOfRange(i64::from(value)));
        }
        Ok(Self(value))
    }

    /// Maps a letter (`a`-`d`, case-insensitive) to its option index.
    #[must_use]
    pub fn from_letter(letter: char) -> Option<Self> {
        let upper = letter.to_ascii_uppercase();
        OPTION_LETTERS
            .iter()
            .position(|l| *l == upper)
            .and_then(|pos| u8::try_from(pos).ok())
            .map(Self)
    }

    #[must_use]
    pub fn value(self) -> u8 {
        self.0
    }

    #[must_use]
    pub fn as_usize(self) -> usize {
        usize::from(self.0)
    }

    #[must_use]
    pub fn letter(self) -> char {
        OPTION_LETTERS[self.as_usize()]
    }
}

impl TryFrom<u8> for OptionIndex {
    type Error = QuestionError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<OptionIndex> for u8 {
    fn from(value: OptionIndex) -> Self {
        value.0
    }
}

impl fmt::Debug for OptionIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OptionIndex({})", self.0)
    }
}

impl fmt::Display for OptionIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// A single-answer multiple-choice question with exactly four options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    #[serde(rename = "question")]
    text: String,
    options: [String; OPTION_COUNT],
    answer: OptionIndex,
}

impl Question {
    /// Builds a validated question.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` when the text or any option is blank, when the option
    /// count is not 4, or when `answer` does not point at one of the options.
    pub fn new(
        text: impl Into<String>,
        options: Vec<String>,
        answer: i64,
    ) -> Result<Self, QuestionError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(QuestionError::EmptyText);
        }

        let found = options.len();
        let options: [String; OPTION_COUNT] = options
            .try_into()
            .map_err(|_| QuestionError::OptionCount { found })?;
        if let Some(blank) = options.iter().position(|o| o.trim().is_empty()) {
            return Err(QuestionError::BlankOption {
                position: blank + 1,
            });
        }

        let answer = u8::try_from(answer)
            .map_err(|_| QuestionError::AnswerOutOfRange(answer))
            .and_then(OptionIndex::new)?;

        Ok(Self {
            text,
            options,
            answer,
        })
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn options(&self) -> &[String; OPTION_COUNT] {
        &self.options
    }

    #[must_use]
    pub fn answer(&self) -> OptionIndex {
        self.answer
    }

    #[must_use]
    pub fn option_text(&self, index: OptionIndex) -> &str {
        &self.options[index.as_usize()]
    }

    #[must_use]
    pub fn correct_text(&self) -> &str {
        self.option_text(self.answer)
    }

    /// A missing selection never matches, whatever the answer index is.
    #[must_use]
    pub fn is_correct(&self, selected: Option<OptionIndex>) -> bool {
        selected == Some(self.answer)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn builds_valid_question() {
        let q = Question::new("2 + 2?", opts(&["3", "4", "5", "6"]), 1).unwrap();
        assert_eq!(q.correct_text(), "4");
        assert!(q.is_correct(Some(OptionIndex::new(1).unwrap())));
        assert!(!q.is_correct(Some(OptionIndex::new(0).unwrap())));
    }

    #[test]
    fn unanswered_is_never_correct() {
        let q = Question::new("first?", opts(&["a", "b", "c", "d"]), 0).unwrap();
        assert!(!q.is_correct(None));
    }

    #[test]
    fn rejects_three_options() {
        let err = Question::new("q", opts(&["a", "b", "c"]), 0).unwrap_err();
        assert_eq!(err, QuestionError::OptionCount { found: 3 });
    }

    #[test]
    fn rejects_blank_option_and_bad_answer() {
        let err = Question::new("q", opts(&["a", " ", "c", "d"]), 0).unwrap_err();
        assert_eq!(err, QuestionError::BlankOption { position: 2 });

        let err = Question::new("q", opts(&["a", "b", "c", "d"]), 4).unwrap_err();
        assert_eq!(err, QuestionError::AnswerOutOfRange(4));

        let err = Question::new("q", opts(&["a", "b", "c", "d"]), -1).unwrap_err();
        assert_eq!(err, QuestionError::AnswerOutOfRange(-1));
    }

    #[test]
    fn option_letters_map_both_ways() {
        let idx = OptionIndex::from_letter('c').unwrap();
        assert_eq!(idx.value(), 2);
        assert_eq!(idx.letter(), 'C');
        assert!(OptionIndex::from_letter('e').is_none());
    }

    #[test]
    fn serializes_in_document_shape() {
        let q = Question::new("q", opts(&["a", "b", "c", "d"]), 3).unwrap();
        let json = serde_json::to_value(&q).unwrap();
        assert_eq!(json["question"], "q");
        assert_eq!(json["answer"], 3);

        let bad = serde_json::json!({"question": "q", "options": ["a", "b", "c", "d"], "answer": 9});
        assert!(serde_json::from_value::<Question>(bad).is_err());
    }
}
