//! Share links and the `id` query parameter that addresses a quiz.

use thiserror::Error;
use url::Url;

use crate::model::{ParseIdError, QuizId};

const QUIZ_PAGE: &str = "quiz/index.html";
const ID_PARAM: &str = "id";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum EntryError {
    #[error("invalid quiz link: {0}")]
    InvalidLink(#[from] url::ParseError),
    #[error("quiz link has no `id` parameter")]
    MissingId,
    #[error(transparent)]
    InvalidId(#[from] ParseIdError),
}

/// Builds the link students open to take a quiz.
///
/// # Errors
///
/// Returns `EntryError::InvalidLink` if `base_url` is not an absolute URL.
pub fn share_link(base_url: &str, quiz_id: QuizId) -> Result<Url, EntryError> {
    let base = base_url.trim().trim_end_matches('/');
    let mut url = Url::parse(&format!("{base}/{QUIZ_PAGE}"))?;
    url.query_pairs_mut()
        .append_pair(ID_PARAM, &quiz_id.to_string());
    Ok(url)
}

/// Extracts the quiz id from a share link.
///
/// # Errors
///
/// Returns `EntryError` when the link does not parse, lacks `id`, or `id` is not a quiz id.
pub fn quiz_id_from_link(link: &str) -> Result<QuizId, EntryError> {
    let url = Url::parse(link.trim())?;
    let raw = url
        .query_pairs()
        .find(|(key, _)| key == ID_PARAM)
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.trim().is_empty())
        .ok_or(EntryError::MissingId)?;
    Ok(raw.parse()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn share_link_round_trips_through_parser() {
        let link = share_link("https://example.org/mc-quiz-maker/", QuizId::new(17)).unwrap();
        assert_eq!(
            link.as_str(),
            "https://example.org/mc-quiz-maker/quiz/index.html?id=17"
        );
        assert_eq!(quiz_id_from_link(link.as_str()).unwrap(), QuizId::new(17));
    }

    #[test]
    fn missing_or_bad_id_is_an_error() {
        assert_eq!(
            quiz_id_from_link("https://example.org/quiz/index.html"),
            Err(EntryError::MissingId)
        );
        assert_eq!(
            quiz_id_from_link("https://example.org/quiz/index.html?id="),
            Err(EntryError::MissingId)
        );
        assert!(matches!(
            quiz_id_from_link("https://example.org/quiz/index.html?id=abc"),
            Err(EntryError::InvalidId(_))
        ));
        assert!(matches!(
            quiz_id_from_link("not a url"),
            Err(EntryError::InvalidLink(_))
        ));
    }
}
