//! User management service

use chrono::Utc;
use uuid::Uuid;
use validator::{Validate, ValidateEmail};

use super::auth::hash_password;
use crate::{
    config::SeedConfig,
    error::{AppError, AppResult},
    models::user::{normalize_email, CreateUser, Role, TechnicianSummary, UpdateUser, User},
    repository::Repository,
};

#[derive(Clone)]
pub struct UsersService {
    repository: Repository,
}

impl UsersService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn get_by_id(&self, id: Uuid) -> AppResult<User> {
        self.repository
            .users
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    pub async fn list(&self) -> AppResult<Vec<User>> {
        self.repository.users.list(&[]).await
    }

    /// Users that can be assigned to work orders
    pub async fn technicians(&self) -> AppResult<Vec<TechnicianSummary>> {
        let users = self.repository.users.list(Role::STAFF).await?;
        Ok(users
            .into_iter()
            .map(|u| TechnicianSummary { id: u.id, name: u.name })
            .collect())
    }

    pub async fn create_user(&self, data: CreateUser) -> AppResult<User> {
        data.validate()?;
        let email = normalize_email(&data.email);

        if self.repository.users.find_by_email(&email).await?.is_some() {
            return Err(AppError::Conflict("A user with this email already exists".to_string()));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            name: data.name,
            email,
            password: hash_password(&data.password)?,
            role: data.role.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        };
        self.repository.users.insert(&user).await?;

        tracing::info!(user_id = %user.id, role = %user.role, "User created");
        Ok(user)
    }

    /// Partial update. The stored hash is replaced only when a new,
    /// non-empty password is supplied.
    pub async fn update_user(&self, id: Uuid, data: UpdateUser) -> AppResult<User> {
        let mut user = self.get_by_id(id).await?;

        if let Some(name) = data.name.filter(|n| !n.is_empty()) {
            user.name = name;
        }
        if let Some(email) = data.email.as_deref().map(normalize_email).filter(|e| !e.is_empty()) {
            if !email.validate_email() {
                return Err(AppError::Validation("Invalid email format".to_string()));
            }
            if let Some(other) = self.repository.users.find_by_email(&email).await? {
                if other.id != id {
                    return Err(AppError::Conflict("A user with this email already exists".to_string()));
                }
            }
            user.email = email;
        }
        if let Some(role) = data.role {
            user.role = role;
        }
        if let Some(password) = data.password.filter(|p| !p.is_empty()) {
            user.password = hash_password(&password)?;
        }
        user.updated_at = Utc::now();

        if !self.repository.users.replace(&user).await? {
            return Err(AppError::NotFound("User not found".to_string()));
        }
        Ok(user)
    }

    /// Hard delete; work orders keep their references to the removed user
    pub async fn delete_user(&self, id: Uuid) -> AppResult<()> {
        if !self.repository.users.delete(id).await? {
            return Err(AppError::NotFound("User not found".to_string()));
        }
        tracing::info!(user_id = %id, "User removed");
        Ok(())
    }

    /// Create the configured administrator unless an admin already exists.
    /// Returns the created account, if any.
    pub async fn ensure_default_admin(&self, seed: &SeedConfig) -> AppResult<Option<User>> {
        if self.repository.users.count_by_role(Role::Admin).await? > 0 {
            tracing::debug!("An administrator already exists, skipping seed");
            return Ok(None);
        }

        let (Some(name), Some(email), Some(password)) = (
            seed.admin_name.clone(),
            seed.admin_email.clone(),
            seed.admin_password.clone(),
        ) else {
            tracing::warn!("No administrator exists and no seed administrator is configured");
            return Ok(None);
        };

        let admin = self
            .create_user(CreateUser {
                name,
                email,
                password,
                role: Some(Role::Admin),
            })
            .await?;
        tracing::info!(email = %admin.email, "Default administrator created");
        Ok(Some(admin))
    }
}
