//! User model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::serde_helpers::empty_as_none;
use crate::error::AppError;

/// Account role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Employee,
    Technician,
    Admin,
}

text_enum!(Role {
    Employee => "employee",
    Technician => "technician",
    Admin => "admin",
});

impl Role {
    /// Roles allowed to work on tickets and equipment
    pub const STAFF: &'static [Role] = &[Role::Technician, Role::Admin];
    pub const ADMIN_ONLY: &'static [Role] = &[Role::Admin];
}

/// Full user model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    /// Stored lowercased
    pub email: String,
    /// Hashed password (argon2)
    #[serde(skip_serializing)]
    #[schema(write_only)]
    pub password: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// User fields shown inline on a work order
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserRef {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

impl From<&User> for UserRef {
    fn from(u: &User) -> Self {
        Self {
            id: u.id,
            name: u.name.clone(),
            email: u.email.clone(),
        }
    }
}

/// Entry of the technician picker
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TechnicianSummary {
    pub id: Uuid,
    pub name: String,
}

/// Identity of the caller, resolved from the bearer token for each request.
/// Passed explicitly into every service operation that depends on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Caller {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl From<&User> for Caller {
    fn from(u: &User) -> Self {
        Self {
            id: u.id,
            name: u.name.clone(),
            email: u.email.clone(),
            role: u.role,
        }
    }
}

impl Caller {
    pub fn is_employee(&self) -> bool {
        self.role == Role::Employee
    }

    /// Role allow-list check
    pub fn require_any_role(&self, allowed: &[Role]) -> Result<(), AppError> {
        if allowed.contains(&self.role) {
            Ok(())
        } else {
            Err(AppError::Authorization(format!(
                "Access denied. Role '{}' is not allowed to perform this action",
                self.role
            )))
        }
    }

    pub fn require_staff(&self) -> Result<(), AppError> {
        self.require_any_role(Role::STAFF)
    }

    pub fn require_admin(&self) -> Result<(), AppError> {
        self.require_any_role(Role::ADMIN_ONLY)
    }
}

/// JWT claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// User id
    pub sub: Uuid,
    pub exp: i64,
    pub iat: i64,
}

impl TokenClaims {
    /// Create a new JWT token
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// Parse JWT token (signature and expiry are checked)
    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }
}

/// Create user request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateUser {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[serde(alias = "credential")]
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
    #[serde(default, deserialize_with = "empty_as_none")]
    #[schema(value_type = Option<Role>)]
    pub role: Option<Role>,
}

/// Update user request; empty fields keep their current value
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateUser {
    pub name: Option<String>,
    pub email: Option<String>,
    /// A new password is hashed; leaving it empty keeps the stored hash
    #[serde(alias = "credential")]
    pub password: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    #[schema(value_type = Option<Role>)]
    pub role: Option<Role>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caller(role: Role) -> Caller {
        Caller {
            id: Uuid::new_v4(),
            name: "Ana".into(),
            email: "ana@example.com".into(),
            role,
        }
    }

    #[test]
    fn role_allow_list() {
        assert!(caller(Role::Admin).require_staff().is_ok());
        assert!(caller(Role::Technician).require_staff().is_ok());
        assert!(matches!(
            caller(Role::Employee).require_staff(),
            Err(AppError::Authorization(_))
        ));
        assert!(caller(Role::Technician).require_admin().is_err());
    }

    #[test]
    fn token_round_trip_and_wrong_secret() {
        let now = Utc::now().timestamp();
        let claims = TokenClaims {
            sub: Uuid::new_v4(),
            iat: now,
            exp: now + 3600,
        };
        let token = claims.create_token("secret").unwrap();
        let parsed = TokenClaims::from_token(&token, "secret").unwrap();
        assert_eq!(parsed.sub, claims.sub);
        assert!(TokenClaims::from_token(&token, "other").is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let past = Utc::now().timestamp() - 7200;
        let claims = TokenClaims {
            sub: Uuid::new_v4(),
            iat: past - 3600,
            exp: past,
        };
        let token = claims.create_token("secret").unwrap();
        assert!(TokenClaims::from_token(&token, "secret").is_err());
    }

    #[test]
    fn password_is_never_serialized() {
        let user = User {
            id: Uuid::new_v4(),
            name: "Ana".into(),
            email: "ana@example.com".into(),
            password: "$argon2id$hash".into(),
            role: Role::Employee,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password").is_none());
        assert_eq!(json["role"], "employee");
    }

    #[test]
    fn create_user_accepts_credential_alias() {
        let body: CreateUser = serde_json::from_str(
            r#"{"name": "Bo", "email": "bo@example.com", "credential": "pw"}"#,
        )
        .unwrap();
        assert_eq!(body.password, "pw");
        assert_eq!(body.role, None);
    }

    #[test]
    fn emails_are_case_folded() {
        assert_eq!(normalize_email("  Ana@Example.COM "), "ana@example.com");
    }
}
