use thiserror::Error;

use crate::entry::EntryError;
use crate::import::ImportError;
use crate::model::{AttemptError, QuestionError, QuizError, QuizValidationError, StudentInfoError};

/// Umbrella error for callers that do not care which domain rule failed.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Quiz(#[from] QuizError),
    #[error(transparent)]
    Draft(#[from] QuizValidationError),
    #[error(transparent)]
    Student(#[from] StudentInfoError),
    #[error(transparent)]
    Attempt(#[from] AttemptError),
    #[error(transparent)]
    Import(#[from] ImportError),
    #[error(transparent)]
    Entry(#[from] EntryError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::quiz_id_from_link;
    use crate::model::StudentInfo;

    fn first_failure() -> Result<(), Error> {
        StudentInfo::new("Mr", "", "J", "Doe", "j@example.com")?;
        quiz_id_from_link("http://localhost/quiz/index.html")?;
        Ok(())
    }

    #[test]
    fn domain_errors_convert_into_umbrella() {
        let err = first_failure().unwrap_err();
        assert!(matches!(err, Error::Student(_)));
        assert_eq!(err.to_string(), "first name is required");
    }
}
