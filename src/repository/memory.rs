//! In-process store used by tests and `memory://` deployments

use async_trait::async_trait;
use indexmap::IndexMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{EquipmentStore, UserStore, WorkOrderStore};
use crate::{
    error::{AppError, AppResult},
    models::{
        equipment::{Equipment, EquipmentFilter, EquipmentStatus},
        user::{Role, User},
        work_order::{WorkOrder, WorkOrderFilter},
    },
};

/// Records are kept in insertion order so ties on `created_at` still sort
/// newest first.
#[derive(Default)]
pub struct MemoryStore {
    equipment: RwLock<IndexMap<Uuid, Equipment>>,
    work_orders: RwLock<IndexMap<Uuid, WorkOrder>>,
    users: RwLock<IndexMap<Uuid, User>>,
}

/// Newest first; among equal timestamps the later insert comes first
fn newest_first<'a, T: 'a, I>(records: I, created_at: impl Fn(&T) -> chrono::DateTime<chrono::Utc>) -> Vec<T>
where
    I: DoubleEndedIterator<Item = &'a T>,
    T: Clone,
{
    let mut out: Vec<T> = records.rev().cloned().collect();
    out.sort_by_key(|r| std::cmp::Reverse(created_at(r)));
    out
}

fn page<T>(items: Vec<T>, limit: i64, offset: i64) -> Vec<T> {
    items
        .into_iter()
        .skip(offset.max(0) as usize)
        .take(limit.max(0) as usize)
        .collect()
}

#[async_trait]
impl EquipmentStore for MemoryStore {
    async fn get(&self, id: Uuid) -> AppResult<Option<Equipment>> {
        Ok(self.equipment.read().await.get(&id).cloned())
    }

    async fn find_by_code(&self, code: &str) -> AppResult<Option<Equipment>> {
        let equipment = self.equipment.read().await;
        Ok(equipment.values().find(|e| e.code == code).cloned())
    }

    async fn insert(&self, equipment: &Equipment) -> AppResult<()> {
        let mut store = self.equipment.write().await;
        if store.values().any(|e| e.code == equipment.code) {
            return Err(AppError::Conflict(
                "An equipment with this code already exists".to_string(),
            ));
        }
        store.insert(equipment.id, equipment.clone());
        Ok(())
    }

    async fn replace(&self, equipment: &Equipment) -> AppResult<bool> {
        let mut store = self.equipment.write().await;
        if store
            .values()
            .any(|e| e.code == equipment.code && e.id != equipment.id)
        {
            return Err(AppError::Conflict(
                "An equipment with this code already exists".to_string(),
            ));
        }
        match store.get_mut(&equipment.id) {
            Some(slot) => {
                *slot = equipment.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn set_status(&self, id: Uuid, status: EquipmentStatus) -> AppResult<bool> {
        let mut store = self.equipment.write().await;
        match store.get_mut(&id) {
            Some(equipment) => {
                equipment.status = status;
                equipment.updated_at = chrono::Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        Ok(self.equipment.write().await.shift_remove(&id).is_some())
    }

    async fn search(
        &self,
        filter: &EquipmentFilter,
        limit: i64,
        offset: i64,
    ) -> AppResult<(Vec<Equipment>, i64)> {
        let store = self.equipment.read().await;
        let matching = newest_first(
            store.values().filter(|e| filter.matches(e)),
            |e: &Equipment| e.created_at,
        );
        let total = matching.len() as i64;
        Ok((page(matching, limit, offset), total))
    }

    async fn list_by_status(&self, status: EquipmentStatus) -> AppResult<Vec<Equipment>> {
        let store = self.equipment.read().await;
        let mut items: Vec<Equipment> = store
            .values()
            .filter(|e| e.status == status)
            .cloned()
            .collect();
        items.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(items)
    }

    async fn count(&self, filter: &EquipmentFilter) -> AppResult<i64> {
        let store = self.equipment.read().await;
        Ok(store.values().filter(|e| filter.matches(e)).count() as i64)
    }
}

#[async_trait]
impl WorkOrderStore for MemoryStore {
    async fn get(&self, id: Uuid) -> AppResult<Option<WorkOrder>> {
        Ok(self.work_orders.read().await.get(&id).cloned())
    }

    async fn insert(&self, order: &WorkOrder) -> AppResult<()> {
        self.work_orders
            .write()
            .await
            .insert(order.id, order.clone());
        Ok(())
    }

    async fn replace(&self, order: &WorkOrder) -> AppResult<bool> {
        let mut store = self.work_orders.write().await;
        match store.get_mut(&order.id) {
            Some(slot) => {
                *slot = order.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn search(
        &self,
        filter: &WorkOrderFilter,
        limit: i64,
        offset: i64,
    ) -> AppResult<(Vec<WorkOrder>, i64)> {
        let matching = WorkOrderStore::list(self, filter).await?;
        let total = matching.len() as i64;
        Ok((page(matching, limit, offset), total))
    }

    async fn list(&self, filter: &WorkOrderFilter) -> AppResult<Vec<WorkOrder>> {
        let store = self.work_orders.read().await;
        Ok(newest_first(
            store.values().filter(|o| filter.matches(o)),
            |o: &WorkOrder| o.created_at,
        ))
    }

    async fn count(&self, filter: &WorkOrderFilter) -> AppResult<i64> {
        let store = self.work_orders.read().await;
        Ok(store.values().filter(|o| filter.matches(o)).count() as i64)
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn get(&self, id: Uuid) -> AppResult<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn insert(&self, user: &User) -> AppResult<()> {
        let mut store = self.users.write().await;
        if store.values().any(|u| u.email == user.email) {
            return Err(AppError::Conflict(
                "A user with this email already exists".to_string(),
            ));
        }
        store.insert(user.id, user.clone());
        Ok(())
    }

    async fn replace(&self, user: &User) -> AppResult<bool> {
        let mut store = self.users.write().await;
        if store
            .values()
            .any(|u| u.email == user.email && u.id != user.id)
        {
            return Err(AppError::Conflict(
                "A user with this email already exists".to_string(),
            ));
        }
        match store.get_mut(&user.id) {
            Some(slot) => {
                *slot = user.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        Ok(self.users.write().await.shift_remove(&id).is_some())
    }

    async fn list(&self, roles: &[Role]) -> AppResult<Vec<User>> {
        let store = self.users.read().await;
        let mut users: Vec<User> = store
            .values()
            .filter(|u| roles.is_empty() || roles.contains(&u.role))
            .cloned()
            .collect();
        users.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(users)
    }

    async fn count_by_role(&self, role: Role) -> AppResult<i64> {
        let store = self.users.read().await;
        Ok(store.values().filter(|u| u.role == role).count() as i64)
    }
}
