//! Bulk import of questions from a JSON array.
//!
//! Each element must carry `question` (non-empty string), `options` (exactly four
//! non-empty strings) and `answer` (integer 0-3). Invalid elements are skipped and
//! reported by their 1-based position; the rest of the batch is still imported.

use serde_json::Value;
use std::fmt;
use thiserror::Error;

use crate::model::{OPTION_COUNT, Question};

/// Failures that reject the whole input.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ImportError {
    #[error("nothing to import")]
    Empty,
    #[error("invalid JSON syntax: {0}")]
    Syntax(#[from] serde_json::Error),
    #[error("the JSON must be an array `[...]`")]
    NotAnArray,
}

/// Why a single element was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ImportIssue {
    NotAnObject,
    MissingQuestion,
    OptionsCount,
    BlankOption,
    AnswerOutOfRange,
}

impl fmt::Display for ImportIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportIssue::NotAnObject => write!(f, "item is not a valid object"),
            ImportIssue::MissingQuestion => write!(f, "missing or empty \"question\""),
            ImportIssue::OptionsCount => {
                write!(f, "the \"options\" must be an array with exactly 4 items")
            }
            ImportIssue::BlankOption => write!(f, "one or more options are blank"),
            ImportIssue::AnswerOutOfRange => {
                write!(f, "the \"answer\" must be a number between 0 and 3")
            }
        }
    }
}

/// A skipped element and every reason it was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedItem {
    /// 1-based position in the input array.
    pub position: usize,
    pub issues: Vec<ImportIssue>,
}

impl RejectedItem {
    #[must_use]
    pub fn reasons(&self) -> String {
        self.issues
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Outcome of a bulk import.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub imported: Vec<Question>,
    pub rejected: Vec<RejectedItem>,
}

impl ImportReport {
    #[must_use]
    pub fn summary(&self) -> String {
        let mut text = format!(
            "{} questions were imported successfully.",
            self.imported.len()
        );
        if !self.rejected.is_empty() {
            text.push_str(&format!(
                " {} items were skipped due to errors.",
                self.rejected.len()
            ));
        }
        text
    }
}

/// Parses and validates a bulk-import document.
///
/// # Errors
///
/// Returns `ImportError` when the input is blank, is not valid JSON, or is not an array.
pub fn parse_questions(input: &str) -> Result<ImportReport, ImportError> {
    if input.trim().is_empty() {
        return Err(ImportError::Empty);
    }
    let value: Value = serde_json::from_str(input)?;
    let Value::Array(items) = value else {
        return Err(ImportError::NotAnArray);
    };

    let mut report = ImportReport::default();
    for (i, item) in items.iter().enumerate() {
        match validate_item(item) {
            Ok(question) => report.imported.push(question),
            Err(issues) => report.rejected.push(RejectedItem {
                position: i + 1,
                issues,
            }),
        }
    }
    Ok(report)
}

fn validate_item(item: &Value) -> Result<Question, Vec<ImportIssue>> {
    let Value::Object(map) = item else {
        return Err(vec![ImportIssue::NotAnObject]);
    };

    let mut issues = Vec::new();

    let text = map
        .get("question")
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty());
    if text.is_none() {
        issues.push(ImportIssue::MissingQuestion);
    }

    let options: Option<Vec<String>> = match map.get("options").and_then(Value::as_array) {
        Some(list) if list.len() == OPTION_COUNT => {
            let strings: Option<Vec<String>> = list
                .iter()
                .map(|o| {
                    o.as_str()
                        .filter(|s| !s.trim().is_empty())
                        .map(str::to_string)
                })
                .collect();
            if strings.is_none() {
                issues.push(ImportIssue::BlankOption);
            }
            strings
        }
        _ => {
            issues.push(ImportIssue::OptionsCount);
            None
        }
    };

    let answer = map
        .get("answer")
        .and_then(Value::as_i64)
        .filter(|a| (0..=3).contains(a));
    if answer.is_none() {
        issues.push(ImportIssue::AnswerOutOfRange);
    }

    match (text, options, answer) {
        (Some(text), Some(options), Some(answer)) if issues.is_empty() => {
            Question::new(text, options, answer).map_err(|_| vec![ImportIssue::NotAnObject])
        }
        _ => Err(issues),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn imports_valid_and_reports_three_option_item() {
        let input = r#"[
            {"question": "Capital of France?", "options": ["Paris", "Rome", "Madrid", "Berlin"], "answer": 0},
            {"question": "2 + 2?", "options": ["3", "4", "5"], "answer": 1}
        ]"#;

        let report = parse_questions(input).unwrap();
        assert_eq!(report.imported.len(), 1);
        assert_eq!(report.rejected.len(), 1);
        assert_eq!(report.rejected[0].position, 2);
        assert_eq!(report.rejected[0].issues, vec![ImportIssue::OptionsCount]);
        assert!(report.rejected[0].reasons().contains("exactly 4 items"));
    }

    #[test]
    fn collects_every_reason_for_an_item() {
        let input = r#"[{"question": " ", "options": ["a", "", "c", "d"], "answer": 7}]"#;
        let report = parse_questions(input).unwrap();
        assert_eq!(
            report.rejected[0].issues,
            vec![
                ImportIssue::MissingQuestion,
                ImportIssue::BlankOption,
                ImportIssue::AnswerOutOfRange
            ]
        );
    }

    #[test]
    fn non_object_and_fractional_answer_are_rejected() {
        let input = r#"[42, {"question": "q", "options": ["a", "b", "c", "d"], "answer": 1.5}]"#;
        let report = parse_questions(input).unwrap();
        assert!(report.imported.is_empty());
        assert_eq!(report.rejected[0].issues, vec![ImportIssue::NotAnObject]);
        assert_eq!(report.rejected[1].issues, vec![ImportIssue::AnswerOutOfRange]);
    }

    #[test]
    fn whole_input_errors() {
        assert!(matches!(parse_questions("  "), Err(ImportError::Empty)));
        assert!(matches!(parse_questions("[{"), Err(ImportError::Syntax(_))));
        assert!(matches!(
            parse_questions(r#"{"question": "q"}"#),
            Err(ImportError::NotAnArray)
        ));
    }

    #[test]
    fn summary_mentions_skipped_items() {
        let report = parse_questions(r#"[{"question": "q"}]"#).unwrap();
        assert_eq!(
            report.summary(),
            "0 questions were imported successfully. 1 items were skipped due to errors."
        );
    }
}
