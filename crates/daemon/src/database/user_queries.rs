use sqlx::Row;
use uuid::Uuid;

use common::credential::HashedCredential;

use super::types::DUuid;
use super::Database;

impl Database {
    pub async fn login_exists(&self, login: &str) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT EXISTS(SELECT 1 FROM users WHERE login = ?) AS found")
            .bind(login)
            .fetch_one(&**self)
            .await?;
        row.try_get::<bool, _>("found")
    }

    pub async fn insert_user(&self, credential: &HashedCredential) -> Result<Uuid, sqlx::Error> {
        let id = DUuid::new();
        sqlx::query("INSERT INTO users (id, login, password) VALUES (?, ?, ?)")
            .bind(id)
            .bind(&credential.login)
            .bind(&credential.password_hash)
            .execute(&**self)
            .await?;
        Ok(id.into())
    }

    pub async fn user_by_login(&self, login: &str) -> Result<Option<(Uuid, String)>, sqlx::Error> {
        let row = sqlx::query("SELECT id, password FROM users WHERE login = ?")
            .bind(login)
            .fetch_optional(&**self)
            .await?;

        row.map(|r| {
            let id: DUuid = r.try_get("id")?;
            let password: String = r.try_get("password")?;
            Ok((id.into(), password))
        })
        .transpose()
    }
}
