//! Users repository for database operations

use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use super::{unique_violation, UserStore};
use crate::{
    error::AppResult,
    models::user::{Role, User},
};

const DUPLICATE_EMAIL: &str = "A user with this email already exists";

#[derive(Clone)]
pub struct UsersRepository {
    pool: Pool<Postgres>,
}

impl UsersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for UsersRepository {
    async fn get(&self, id: Uuid) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn insert(&self, user: &User) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, name, email, password, role, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password)
        .bind(user.role)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| unique_violation(e, DUPLICATE_EMAIL))?;
        Ok(())
    }

    async fn replace(&self, user: &User) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE users SET name = $2, email = $3, password = $4, role = $5, updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password)
        .bind(user.role)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| unique_violation(e, DUPLICATE_EMAIL))?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list(&self, roles: &[Role]) -> AppResult<Vec<User>> {
        let users = if roles.is_empty() {
            sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY name")
                .fetch_all(&self.pool)
                .await?
        } else {
            let roles: Vec<String> = roles.iter().map(|r| r.as_str().to_string()).collect();
            sqlx::query_as::<_, User>("SELECT * FROM users WHERE role = ANY($1) ORDER BY name")
                .bind(roles)
                .fetch_all(&self.pool)
                .await?
        };
        Ok(users)
    }

    async fn count_by_role(&self, role: Role) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = $1")
            .bind(role)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
