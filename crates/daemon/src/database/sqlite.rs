use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

use super::DatabaseSetupError;

pub async fn connect_sqlite(database_url: &url::Url) -> Result<SqlitePool, DatabaseSetupError> {
    let url = database_url.as_str();
    let options = SqliteConnectOptions::from_str(url)
        .map_err(DatabaseSetupError::Unavailable)?
        .foreign_keys(true);

    // every connection to `:memory:` is its own database, so pin the pool to one
    // connection that never gets recycled
    if url.contains(":memory:") {
        return SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(DatabaseSetupError::Unavailable);
    }

    let options = options
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal);

    SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .map_err(DatabaseSetupError::Unavailable)
}

pub async fn migrate_sqlite(pool: &SqlitePool) -> Result<(), DatabaseSetupError> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(DatabaseSetupError::MigrationFailed)
}
