use time::OffsetDateTime;
use uuid::Uuid;

/// The columns needed to authenticate a login attempt.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserCredentials {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub phone_number: Option<String>,
    #[allow(dead_code)]
    pub created_at: OffsetDateTime,
}

/// Public identity of a user, joined into message payloads.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserIdentity {
    pub email: String,
    pub role: String,
}
