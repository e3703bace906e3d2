use quiz_core::model::{
    AnswerSheet, AttemptId, AttemptRecord, Question, QuizDefinition, QuizId, QuizSettings,
    StudentInfo,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use sqlx::Row;

use crate::repository::{StorageError, StoredAttempt, StoredQuiz};

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn id_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn quiz_id_from_i64(v: i64) -> Result<QuizId, StorageError> {
    Ok(QuizId::new(i64_to_u64("quiz_id", v)?))
}

pub(crate) fn attempt_id_from_i64(v: i64) -> Result<AttemptId, StorageError> {
    Ok(AttemptId::new(i64_to_u64("attempt_id", v)?))
}

/// Encodes a document fragment stored in a TEXT column.
pub(crate) fn to_json<T: Serialize>(value: &T) -> Result<String, StorageError> {
    serde_json::to_string(value).map_err(ser)
}

fn from_json<T: DeserializeOwned>(
    row: &sqlx::sqlite::SqliteRow,
    column: &'static str,
) -> Result<T, StorageError> {
    let raw: String = row.try_get(column).map_err(ser)?;
    serde_json::from_str(&raw)
        .map_err(|e| StorageError::Serialization(format!("invalid {column}: {e}")))
}

pub(crate) fn map_quiz_row(row: &sqlx::sqlite::SqliteRow) -> Result<QuizDefinition, StorageError> {
    let settings: QuizSettings = from_json(row, "settings")?;
    let questions: Vec<Question> = from_json(row, "questions")?;

    QuizDefinition::from_persisted(
        row.try_get::<String, _>("title").map_err(ser)?,
        row.try_get::<String, _>("owner").map_err(ser)?,
        settings,
        questions,
        row.try_get("created_at").map_err(ser)?,
        row.try_get("updated_at").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_quiz_row_with_id(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<StoredQuiz, StorageError> {
    Ok(StoredQuiz {
        id: quiz_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        quiz: map_quiz_row(row)?,
    })
}

pub(crate) fn map_attempt_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<AttemptRecord, StorageError> {
    let student: StudentInfo = from_json(row, "student_info")?;
    let answers: AnswerSheet = from_json(row, "answers")?;

    AttemptRecord::new(
        quiz_id_from_i64(row.try_get::<i64, _>("quiz_id").map_err(ser)?)?,
        row.try_get::<String, _>("quiz_title").map_err(ser)?,
        student,
        answers,
        u32_from_i64("score", row.try_get::<i64, _>("score").map_err(ser)?)?,
        u32_from_i64(
            "total_points",
            row.try_get::<i64, _>("total_points").map_err(ser)?,
        )?,
        row.try_get("submitted_at").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_attempt_row_with_id(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<StoredAttempt, StorageError> {
    Ok(StoredAttempt {
        id: attempt_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        attempt: map_attempt_row(row)?,
    })
}
