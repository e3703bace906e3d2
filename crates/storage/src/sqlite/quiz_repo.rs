use quiz_core::model::{QuizDefinition, QuizId};

use super::SqliteRepository;
use super::mapping::{id_i64, map_quiz_row, map_quiz_row_with_id, quiz_id_from_i64, to_json};
use crate::changes::StorageChange;
use crate::repository::{QuizRepository, StorageError, StoredQuiz};

fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait::async_trait]
impl QuizRepository for SqliteRepository {
    async fn insert_quiz(&self, quiz: &QuizDefinition) -> Result<QuizId, StorageError> {
        let res = sqlx::query(
            r"
                INSERT INTO quizzes (owner, title, settings, questions, created_at, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ",
        )
        .bind(quiz.owner())
        .bind(quiz.title())
        .bind(to_json(quiz.settings())?)
        .bind(to_json(&quiz.questions())?)
        .bind(quiz.created_at())
        .bind(quiz.updated_at())
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        let id = quiz_id_from_i64(res.last_insert_rowid())?;
        self.feed.publish(StorageChange::QuizSaved(id));
        Ok(id)
    }

    async fn update_quiz(&self, id: QuizId, quiz: &QuizDefinition) -> Result<(), StorageError> {
        let res = sqlx::query(
            r"
                UPDATE quizzes SET
                    title = ?2,
                    settings = ?3,
                    questions = ?4,
                    updated_at = ?5
                WHERE id = ?1
            ",
        )
        .bind(id_i64("quiz_id", id.value())?)
        .bind(quiz.title())
        .bind(to_json(quiz.settings())?)
        .bind(to_json(&quiz.questions())?)
        .bind(quiz.updated_at())
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        self.feed.publish(StorageChange::QuizSaved(id));
        Ok(())
    }

    async fn get_quiz(&self, id: QuizId) -> Result<Option<QuizDefinition>, StorageError> {
        let row = sqlx::query(
            r"
                SELECT id, owner, title, settings, questions, created_at, updated_at
                FROM quizzes WHERE id = ?1
            ",
        )
        .bind(id_i64("quiz_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        match row {
            Some(row) => map_quiz_row(&row).map(Some),
            None => Ok(None),
        }
    }

    async fn list_quizzes(&self, owner: &str) -> Result<Vec<StoredQuiz>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT id, owner, title, settings, questions, created_at, updated_at
                FROM quizzes
                WHERE owner = ?1
                ORDER BY created_at DESC, id DESC
            ",
        )
        .bind(owner)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_quiz_row_with_id(&row)?);
        }
        Ok(out)
    }

    async fn delete_quiz_cascade(&self, id: QuizId) -> Result<u64, StorageError> {
        let quiz_id = id_i64("quiz_id", id.value())?;
        let mut tx = self.pool.begin().await.map_err(conn)?;

        let attempts = sqlx::query("DELETE FROM quiz_attempts WHERE quiz_id = ?1")
            .bind(quiz_id)
            .execute(&mut *tx)
            .await
            .map_err(conn)?
            .rows_affected();

        let quizzes = sqlx::query("DELETE FROM quizzes WHERE id = ?1")
            .bind(quiz_id)
            .execute(&mut *tx)
            .await
            .map_err(conn)?
            .rows_affected();

        if quizzes == 0 {
            tx.rollback().await.map_err(conn)?;
            return Err(StorageError::NotFound);
        }

        tx.commit().await.map_err(conn)?;
        self.feed.publish(StorageChange::QuizDeleted(id));
        Ok(attempts)
    }
}
