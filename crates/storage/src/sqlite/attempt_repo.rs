use quiz_core::model::{AttemptId, AttemptRecord, QuizId};

use super::SqliteRepository;
use super::mapping::{
    attempt_id_from_i64, id_i64, map_attempt_row, map_attempt_row_with_id, to_json,
};
use crate::changes::StorageChange;
use crate::repository::{AttemptRepository, StorageError, StoredAttempt};

fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db| db.is_foreign_key_violation())
}

#[async_trait::async_trait]
impl AttemptRepository for SqliteRepository {
    async fn append_attempt(&self, attempt: &AttemptRecord) -> Result<AttemptId, StorageError> {
        let res = sqlx::query(
            r"
                INSERT INTO quiz_attempts (
                    quiz_id, quiz_title, student_info, answers,
                    score, total_points, submitted_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ",
        )
        .bind(id_i64("quiz_id", attempt.quiz_id().value())?)
        .bind(attempt.quiz_title())
        .bind(to_json(attempt.student_info())?)
        .bind(to_json(attempt.answers())?)
        .bind(i64::from(attempt.score()))
        .bind(i64::from(attempt.total_points()))
        .bind(attempt.submitted_at())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                StorageError::Conflict
            } else {
                conn(e)
            }
        })?;

        let id = attempt_id_from_i64(res.last_insert_rowid())?;
        self.feed.publish(StorageChange::AttemptAppended {
            quiz_id: attempt.quiz_id(),
            attempt_id: id,
        });
        Ok(id)
    }

    async fn get_attempt(&self, id: AttemptId) -> Result<Option<AttemptRecord>, StorageError> {
        let row = sqlx::query(
            r"
                SELECT
                    id, quiz_id, quiz_title, student_info, answers,
                    score, total_points, submitted_at
                FROM quiz_attempts
                WHERE id = ?1
            ",
        )
        .bind(id_i64("attempt_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        match row {
            Some(row) => map_attempt_row(&row).map(Some),
            None => Ok(None),
        }
    }

    async fn list_attempts(&self, quiz_id: QuizId) -> Result<Vec<StoredAttempt>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT
                    id, quiz_id, quiz_title, student_info, answers,
                    score, total_points, submitted_at
                FROM quiz_attempts
                WHERE quiz_id = ?1
                ORDER BY submitted_at DESC, id DESC
            ",
        )
        .bind(id_i64("quiz_id", quiz_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_attempt_row_with_id(&row)?);
        }
        Ok(out)
    }
}
