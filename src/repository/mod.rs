//! Repository layer: document-style stores for equipment, work orders and users

pub mod equipment;
pub mod memory;
pub mod users;
pub mod work_orders;

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        equipment::{Equipment, EquipmentFilter, EquipmentStatus},
        user::{Role, User},
        work_order::{WorkOrder, WorkOrderFilter},
    },
};

#[async_trait]
pub trait EquipmentStore: Send + Sync {
    async fn get(&self, id: Uuid) -> AppResult<Option<Equipment>>;

    async fn find_by_code(&self, code: &str) -> AppResult<Option<Equipment>>;

    /// Fails with `Conflict` when the code is already taken
    async fn insert(&self, equipment: &Equipment) -> AppResult<()>;

    /// Replace the whole record; `false` when it no longer exists
    async fn replace(&self, equipment: &Equipment) -> AppResult<bool>;

    /// `false` when the record no longer exists
    async fn set_status(&self, id: Uuid, status: EquipmentStatus) -> AppResult<bool>;

    async fn delete(&self, id: Uuid) -> AppResult<bool>;

    /// Newest first, with the total number of matches
    async fn search(
        &self,
        filter: &EquipmentFilter,
        limit: i64,
        offset: i64,
    ) -> AppResult<(Vec<Equipment>, i64)>;

    /// Ordered by code
    async fn list_by_status(&self, status: EquipmentStatus) -> AppResult<Vec<Equipment>>;

    async fn count(&self, filter: &EquipmentFilter) -> AppResult<i64>;
}

#[async_trait]
pub trait WorkOrderStore: Send + Sync {
    async fn get(&self, id: Uuid) -> AppResult<Option<WorkOrder>>;

    async fn insert(&self, order: &WorkOrder) -> AppResult<()>;

    /// Replace the whole document, history included; `false` when missing
    async fn replace(&self, order: &WorkOrder) -> AppResult<bool>;

    /// Newest first, with the total number of matches
    async fn search(
        &self,
        filter: &WorkOrderFilter,
        limit: i64,
        offset: i64,
    ) -> AppResult<(Vec<WorkOrder>, i64)>;

    /// All matches, newest first
    async fn list(&self, filter: &WorkOrderFilter) -> AppResult<Vec<WorkOrder>>;

    async fn count(&self, filter: &WorkOrderFilter) -> AppResult<i64>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get(&self, id: Uuid) -> AppResult<Option<User>>;

    /// `email` must already be normalized
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>>;

    /// Fails with `Conflict` when the email is already taken
    async fn insert(&self, user: &User) -> AppResult<()>;

    async fn replace(&self, user: &User) -> AppResult<bool>;

    async fn delete(&self, id: Uuid) -> AppResult<bool>;

    /// Users whose role is in `roles` (all users when empty), ordered by name
    async fn list(&self, roles: &[Role]) -> AppResult<Vec<User>>;

    async fn count_by_role(&self, role: Role) -> AppResult<i64>;
}

/// Main repository struct bundling the three stores
#[derive(Clone)]
pub struct Repository {
    pool: Option<Pool<Postgres>>,
    pub equipment: Arc<dyn EquipmentStore>,
    pub work_orders: Arc<dyn WorkOrderStore>,
    pub users: Arc<dyn UserStore>,
}

impl Repository {
    /// Create a PostgreSQL-backed repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            equipment: Arc::new(equipment::EquipmentRepository::new(pool.clone())),
            work_orders: Arc::new(work_orders::WorkOrdersRepository::new(pool.clone())),
            users: Arc::new(users::UsersRepository::new(pool.clone())),
            pool: Some(pool),
        }
    }

    /// Repository kept entirely in process memory
    pub fn in_memory() -> Self {
        let store = Arc::new(memory::MemoryStore::default());
        Self {
            pool: None,
            equipment: store.clone(),
            work_orders: store.clone(),
            users: store,
        }
    }

    /// Check that the backing store answers
    pub async fn ping(&self) -> AppResult<()> {
        if let Some(pool) = &self.pool {
            sqlx::query("SELECT 1").execute(pool).await?;
        }
        Ok(())
    }
}

/// Turn a unique-constraint violation into a `Conflict` with `message`
pub(crate) fn unique_violation(err: sqlx::Error, message: &str) -> AppError {
    let is_unique = err
        .as_database_error()
        .and_then(|e| e.code())
        .is_some_and(|code| code == "23505");
    if is_unique {
        AppError::Conflict(message.to_string())
    } else {
        AppError::Database(err)
    }
}

/// Escape `%`, `_` and `\` for a LIKE pattern
pub(crate) fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
