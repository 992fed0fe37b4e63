use crate::credentials::{CredentialResult, CredentialStore, validate_key, validate_owner};
use rocket_db_pools::sqlx::{self, PgPool};

/// Store backed by the `tutor_credentials` table.
#[derive(Debug, Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[rocket::async_trait]
impl CredentialStore for PgCredentialStore {
    async fn get(&self, owner: &str) -> CredentialResult<Option<String>> {
        let owner = validate_owner(owner)?;
        let key: Option<String> =
            sqlx::query_scalar("SELECT api_key FROM tutor_credentials WHERE owner = $1")
                .bind(owner)
                .fetch_optional(&self.pool)
                .await?;
        Ok(key)
    }

    async fn set(&self, owner: &str, api_key: &str) -> CredentialResult<()> {
        let owner = validate_owner(owner)?;
        let api_key = validate_key(api_key)?;
        sqlx::query(
            r#"INSERT INTO tutor_credentials (owner, api_key, updated_at)
               VALUES ($1, $2, NOW())
               ON CONFLICT (owner) DO UPDATE
               SET api_key = EXCLUDED.api_key,
                   updated_at = NOW()"#,
        )
        .bind(owner)
        .bind(api_key)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn clear(&self, owner: &str) -> CredentialResult<bool> {
        let owner = validate_owner(owner)?;
        let result = sqlx::query("DELETE FROM tutor_credentials WHERE owner = $1")
            .bind(owner)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
