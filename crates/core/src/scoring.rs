//! Scoring and per-question review of a finished answer sheet.

use crate::model::{AnswerSheet, Question, QuizDefinition};

/// Label shown when a question was left unanswered.
pub const NO_ANSWER: &str = "No Answer";

/// Points earned: `pointsPerItem` for every slot equal to the question's answer.
///
/// Unanswered slots never match.
#[must_use]
pub fn score_answers(quiz: &QuizDefinition, answers: &AnswerSheet) -> u32 {
    let per_item = quiz.settings().points_per_item();
    quiz.questions()
        .iter()
        .enumerate()
        .filter(|(i, q)| q.is_correct(answers.get(*i)))
        .fold(0_u32, |acc, _| acc.saturating_add(per_item))
}

/// One row of the per-question review.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewItem {
    /// 1-based question number.
    pub number: usize,
    pub question: String,
    /// Text of the chosen option, `None` when unanswered.
    pub student_choice: Option<String>,
    pub correct_choice: String,
    pub is_correct: bool,
}

impl ReviewItem {
    fn build(number: usize, question: &Question, answers: &AnswerSheet) -> Self {
        let selected = answers.get(number - 1);
        Self {
            number,
            question: question.text().to_string(),
            student_choice: selected.map(|idx| question.option_text(idx).to_string()),
            correct_choice: question.correct_text().to_string(),
            is_correct: question.is_correct(selected),
        }
    }

    #[must_use]
    pub fn student_choice_label(&self) -> &str {
        self.student_choice.as_deref().unwrap_or(NO_ANSWER)
    }
}

/// Builds the review for every question of the quiz.
#[must_use]
pub fn review_answers(quiz: &QuizDefinition, answers: &AnswerSheet) -> Vec<ReviewItem> {
    quiz.questions()
        .iter()
        .enumerate()
        .map(|(i, q)| ReviewItem::build(i + 1, q, answers))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{OptionIndex, QuizSettings, TimerSetting};
    use crate::time::fixed_now;

    fn question(text: &str, answer: i64) -> Question {
        Question::new(
            text,
            vec!["w".into(), "x".into(), "y".into(), "z".into()],
            answer,
        )
        .unwrap()
    }

    fn quiz(points: u32, answers: &[i64]) -> QuizDefinition {
        let questions = answers
            .iter()
            .enumerate()
            .map(|(i, a)| question(&format!("Q{i}"), *a))
            .collect();
        QuizDefinition::new(
            "Scoring",
            "instructor",
            QuizSettings::new(TimerSetting::None, points).unwrap(),
            questions,
            fixed_now(),
        )
        .unwrap()
    }

    fn sheet(slots: &[Option<u8>]) -> AnswerSheet {
        AnswerSheet::from_slots(
            slots
                .iter()
                .map(|s| s.and_then(|v| OptionIndex::new(v).ok()))
                .collect(),
        )
    }

    #[test]
    fn two_questions_one_unanswered() {
        let quiz = quiz(1, &[1, 2]);
        let answers = sheet(&[Some(1), None]);
        assert_eq!(score_answers(&quiz, &answers), 1);
        assert_eq!(quiz.total_points(), 2);
    }

    #[test]
    fn score_counts_matches_times_points() {
        let quiz = quiz(3, &[0, 1, 2, 3]);
        let answers = sheet(&[Some(0), Some(0), Some(2), Some(3)]);
        assert_eq!(score_answers(&quiz, &answers), 9);
    }

    #[test]
    fn short_sheet_scores_missing_slots_as_wrong() {
        let quiz = quiz(1, &[0, 0, 0]);
        assert_eq!(score_answers(&quiz, &sheet(&[Some(0)])), 1);
    }

    #[test]
    fn review_lists_choice_text_and_correctness() {
        let quiz = quiz(1, &[1, 2]);
        let review = review_answers(&quiz, &sheet(&[Some(1), None]));

        assert_eq!(review.len(), 2);
        assert_eq!(review[0].number, 1);
        assert_eq!(review[0].student_choice_label(), "x");
        assert!(review[0].is_correct);
        assert_eq!(review[1].student_choice_label(), NO_ANSWER);
        assert_eq!(review[1].correct_choice, "y");
        assert!(!review[1].is_correct);
    }
}
