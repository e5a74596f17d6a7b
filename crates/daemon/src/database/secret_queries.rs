use sqlx::Row;
use uuid::Uuid;

use super::types::DUuid;
use super::Database;

impl Database {
    pub async fn upsert_secret(
        &self,
        user_id: Uuid,
        secret_id: &str,
        data: &[u8],
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO secrets (user_id, secret_id, data)
            VALUES (?, ?, ?)
            ON CONFLICT (user_id, secret_id) DO UPDATE SET
                data = excluded.data,
                updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(DUuid::from(user_id))
        .bind(secret_id)
        .bind(data)
        .execute(&**self)
        .await?;
        Ok(())
    }

    pub async fn secret_data(
        &self,
        user_id: Uuid,
        secret_id: &str,
    ) -> Result<Option<Vec<u8>>, sqlx::Error> {
        let row = sqlx::query("SELECT data FROM secrets WHERE user_id = ? AND secret_id = ?")
            .bind(DUuid::from(user_id))
            .bind(secret_id)
            .fetch_optional(&**self)
            .await?;

        row.map(|r| r.try_get::<Vec<u8>, _>("data")).transpose()
    }

    /// Returns the number of rows removed
    pub async fn remove_secret(&self, user_id: Uuid, secret_id: &str) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM secrets WHERE user_id = ? AND secret_id = ?")
            .bind(DUuid::from(user_id))
            .bind(secret_id)
            .execute(&**self)
            .await?;
        Ok(result.rows_affected())
    }
}
