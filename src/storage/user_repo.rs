use crate::error::Result;
use crate::storage::DbPool;
use crate::storage::records::user::{UserCredentials, UserIdentity};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: DbPool,
}

impl UserRepository {
    #[must_use]
    pub const fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<UserCredentials>> {
        let user = sqlx::query_as::<_, UserCredentials>(
            "SELECT id, email, password_hash, role, phone_number, created_at FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    pub async fn identity(&self, user_id: Uuid) -> Result<Option<UserIdentity>> {
        let identity = sqlx::query_as::<_, UserIdentity>("SELECT email, role FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(identity)
    }
}
