use quiz_core::model::ResultSummary;

use super::SqliteRepository;
use super::mapping::map_result_row;
use crate::repository::{ResultFilter, ResultRepository, ResultRow, StorageError};

fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait::async_trait]
impl ResultRepository for SqliteRepository {
    async fn insert_result(&self, summary: &ResultSummary) -> Result<i64, StorageError> {
        let res = sqlx::query(
            r"
                INSERT INTO quiz_results (mode, correct_answers, incorrect_answers, completed_at)
                VALUES (?1, ?2, ?3, ?4)
            ",
        )
        .bind(summary.mode().as_str())
        .bind(i64::from(summary.correct_answers()))
        .bind(i64::from(summary.incorrect_answers()))
        .bind(summary.completed_at())
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(res.last_insert_rowid())
    }

    async fn get_result(&self, id: i64) -> Result<ResultRow, StorageError> {
        let row = sqlx::query(
            r"
                SELECT id, mode, correct_answers, incorrect_answers, completed_at
                FROM quiz_results
                WHERE id = ?1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?
        .ok_or(StorageError::NotFound)?;

        map_result_row(&row)
    }

    async fn list_results(&self, filter: ResultFilter) -> Result<Vec<ResultRow>, StorageError> {
        let mut sql = String::from(
            r"
                SELECT id, mode, correct_answers, incorrect_answers, completed_at
                FROM quiz_results
            ",
        );

        let mut bind_index = 1;
        if filter.mode.is_some() {
            sql.push_str(" WHERE mode = ?");
            sql.push_str(&bind_index.to_string());
            bind_index += 1;
        }
        sql.push_str(" ORDER BY completed_at DESC, id DESC");
        if filter.limit.is_some() {
            sql.push_str(" LIMIT ?");
            sql.push_str(&bind_index.to_string());
        }

        let mut query = sqlx::query(&sql);
        if let Some(mode) = filter.mode {
            query = query.bind(mode.as_str());
        }
        if let Some(limit) = filter.limit {
            query = query.bind(i64::from(limit));
        }

        let rows = query.fetch_all(&self.pool).await.map_err(conn)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_result_row(&row)?);
        }
        Ok(out)
    }

    async fn close(&self) {
        self.pool.close().await;
        tracing::debug!("closed result store");
    }
}
