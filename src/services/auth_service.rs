use crate::config::AuthConfig;
use crate::domain::auth::{self, Claims};
use crate::error::{AppError, Result};
use crate::storage::user_repo::UserRepository;
use opentelemetry::{global, metrics::Counter};
use serde::Serialize;
use serde_json::{Value, json};
use uuid::Uuid;

#[derive(Clone, Debug)]
struct Metrics {
    login_total: Counter<u64>,
}

impl Metrics {
    fn new() -> Self {
        let meter = global::meter("faena-server");
        Self {
            login_total: meter
                .u64_counter("faena_auth_login_total")
                .with_description("Total number of successful logins")
                .build(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthenticatedUser {
    pub id: Uuid,
    pub email: String,
    pub role: String,
    pub phone_number: Option<String>,
}

#[derive(Clone, Debug)]
pub struct AuthService {
    config: AuthConfig,
    user_repo: UserRepository,
    metrics: Metrics,
}

impl AuthService {
    pub fn new(config: AuthConfig, user_repo: UserRepository) -> Self {
        Self { config, user_repo, metrics: Metrics::new() }
    }

    /// Verifies credentials and issues a bearer token. Both "no such user"
    /// and "wrong password" collapse into the same error so the response
    /// does not leak which emails exist.
    #[tracing::instrument(
        skip(self, email, password),
        fields(user_id = tracing::field::Empty),
        err(level = "warn")
    )]
    pub async fn login(&self, email: &str, password: &str) -> Result<Value> {
        let Some(user) = self.user_repo.find_by_email(email).await? else {
            tracing::warn!("Login failed: user not found");
            return Err(AppError::AuthError);
        };

        tracing::Span::current().record("user_id", tracing::field::display(user.id));

        // Argon2 verification is CPU-bound; keep it off the async executor.
        let password = password.to_string();
        let password_hash = user.password_hash.clone();
        let is_valid = tokio::task::spawn_blocking(move || auth::verify_password(&password, &password_hash))
            .await
            .map_err(|_| AppError::Internal)??;
        if !is_valid {
            tracing::warn!("Login failed: invalid password");
            return Err(AppError::AuthError);
        }

        let claims = Claims::new(user.id, user.role.clone(), self.config.token_ttl_secs);
        let token = claims.encode(&self.config.jwt_secret)?;

        self.metrics.login_total.add(1, &[]);

        Ok(json!({
            "token": token,
            "user": AuthenticatedUser {
                id: user.id,
                email: user.email,
                role: user.role,
                phone_number: user.phone_number,
            },
        }))
    }

    pub fn verify_token(&self, token: &str) -> Result<Claims> {
        Claims::decode(token, &self.config.jwt_secret)
    }
}
