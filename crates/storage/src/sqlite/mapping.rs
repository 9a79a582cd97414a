use quiz_core::model::{ResultSummary, SessionMode};
use sqlx::Row;

use crate::repository::{ResultRow, StorageError};

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn parse_mode(s: &str) -> Result<SessionMode, StorageError> {
    s.parse::<SessionMode>().map_err(ser)
}

pub(crate) fn map_result_row(row: &sqlx::sqlite::SqliteRow) -> Result<ResultRow, StorageError> {
    let id: i64 = row.try_get("id").map_err(ser)?;
    let mode_str: String = row.try_get("mode").map_err(ser)?;
    let mode = parse_mode(mode_str.as_str())?;
    let correct = u32_from_i64(
        "correct_answers",
        row.try_get::<i64, _>("correct_answers").map_err(ser)?,
    )?;
    let incorrect = u32_from_i64(
        "incorrect_answers",
        row.try_get::<i64, _>("incorrect_answers").map_err(ser)?,
    )?;
    let completed_at = row.try_get("completed_at").map_err(ser)?;

    Ok(ResultRow::new(
        id,
        ResultSummary::new(mode, correct, incorrect, completed_at),
    ))
}
