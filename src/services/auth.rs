//! Authentication: credential hashing, token issuance and the access gate

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration, Utc};
use once_cell::sync::Lazy;

use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    models::user::{normalize_email, Caller, TokenClaims, User},
    repository::Repository,
};

const INVALID_CREDENTIALS: &str = "Invalid email or password";

/// Verified against when the email is unknown, so both failure paths pay
/// for one Argon2 verification
static DUMMY_HASH: Lazy<Option<String>> =
    Lazy::new(|| hash_password("maintenance-dummy-password").ok());

#[derive(Clone)]
pub struct AuthService {
    repository: Repository,
    config: AuthConfig,
}

impl AuthService {
    pub fn new(repository: Repository, config: AuthConfig) -> Self {
        Self { repository, config }
    }

    /// Verify an email/password pair and issue a token. Unknown emails and
    /// wrong passwords produce the same error.
    pub async fn login(&self, email: &str, password: &str) -> AppResult<(User, String)> {
        let Some(user) = self
            .repository
            .users
            .find_by_email(&normalize_email(email))
            .await?
        else {
            if let Some(hash) = DUMMY_HASH.as_deref() {
                let _ = verify_password(hash, password);
            }
            return Err(AppError::Authentication(INVALID_CREDENTIALS.to_string()));
        };

        if !verify_password(&user.password, password)? {
            return Err(AppError::Authentication(INVALID_CREDENTIALS.to_string()));
        }

        let token = self.issue_token(&user)?;
        tracing::info!(user_id = %user.id, "User logged in");
        Ok((user, token))
    }

    /// Signed token carrying the user id, valid for `token_ttl_days`
    pub fn issue_token(&self, user: &User) -> AppResult<String> {
        let now = Utc::now();
        let claims = TokenClaims {
            sub: user.id,
            iat: now.timestamp(),
            exp: (now + Duration::days(self.config.token_ttl_days)).timestamp(),
        };
        claims
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
    }

    /// Resolve a bearer token to the current identity of its user
    pub async fn authenticate(&self, token: &str) -> AppResult<Caller> {
        let claims = TokenClaims::from_token(token, &self.config.jwt_secret).map_err(|e| {
            tracing::debug!("Rejected token: {}", e);
            AppError::Authentication("Not authorized, token failed".to_string())
        })?;

        let user = self
            .repository
            .users
            .get(claims.sub)
            .await?
            .ok_or_else(|| AppError::Authentication("Not authorized, user no longer exists".to_string()))?;

        Ok(Caller::from(&user))
    }
}

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}

/// Check a plaintext password against a stored Argon2 hash
pub fn verify_password(hash: &str, password: &str) -> AppResult<bool> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}
