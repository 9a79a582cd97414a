use std::sync::Arc;
use std::time::Duration;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnection, SqlitePoolOptions};
use thiserror::Error;

use crate::repository::{ResultRepository, Storage};

mod mapping;
mod migrate;
mod result_repo;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SqliteInitError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Pool settings for the result store.
///
/// Results are written once per finished session, so a small pool is enough.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqliteOptions {
    pub max_connections: u32,
    pub acquire_timeout: Duration,
    pub busy_timeout: Duration,
}

impl Default for SqliteOptions {
    fn default() -> Self {
        Self {
            max_connections: 4,
            acquire_timeout: Duration::from_secs(5),
            busy_timeout: Duration::from_secs(5),
        }
    }
}

async fn apply_pragmas(conn: &mut SqliteConnection, busy_timeout: Duration) -> sqlx::Result<()> {
    sqlx::query("PRAGMA journal_mode = WAL;")
        .execute(&mut *conn)
        .await?;
    let busy = format!("PRAGMA busy_timeout = {};", busy_timeout.as_millis());
    sqlx::query(&busy).execute(&mut *conn).await?;
    Ok(())
}

/// `SQLite`-backed result store.
#[derive(Clone)]
pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    /// Connect with default pool settings.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if the connection cannot be established or if
    /// the per-connection pragmas fail.
    pub async fn connect(database_url: &str) -> Result<Self, SqliteInitError> {
        Self::connect_with(database_url, &SqliteOptions::default()).await
    }

    /// Connect using explicit pool settings.
    ///
    /// # Errors
    ///
    /// Same as [`SqliteRepository::connect`].
    pub async fn connect_with(
        database_url: &str,
        options: &SqliteOptions,
    ) -> Result<Self, SqliteInitError> {
        let busy_timeout = options.busy_timeout;
        let pool = SqlitePoolOptions::new()
            .max_connections(options.max_connections)
            .acquire_timeout(options.acquire_timeout)
            .after_connect(move |conn, _meta| Box::pin(apply_pragmas(conn, busy_timeout)))
            .connect(database_url)
            .await?;
        tracing::debug!(
            url = database_url,
            max_connections = options.max_connections,
            "opened result store"
        );
        Ok(Self { pool })
    }

    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Apply pending schema migrations.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if migration queries fail.
    pub async fn migrate(&self) -> Result<(), SqliteInitError> {
        migrate::run_migrations(&self.pool).await
    }
}

impl Storage {
    /// Open and migrate a `SQLite` result store.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if connection or migrations cannot be
    /// completed.
    pub async fn sqlite(database_url: &str) -> Result<Self, SqliteInitError> {
        let repo = SqliteRepository::connect(database_url).await?;
        repo.migrate().await?;
        let results: Arc<dyn ResultRepository> = Arc::new(repo);
        Ok(Self { results })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repository_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SqliteRepository>();
    }

    #[test]
    fn default_options_keep_a_small_pool() {
        let options = SqliteOptions::default();
        assert_eq!(options.max_connections, 4);
        assert_eq!(options.busy_timeout, Duration::from_secs(5));
    }
}
