//! Equipment repository for database operations

use async_trait::async_trait;
use sqlx::{Pool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{escape_like, unique_violation, EquipmentStore};
use crate::{
    error::AppResult,
    models::equipment::{Equipment, EquipmentFilter, EquipmentStatus},
};

const DUPLICATE_CODE: &str = "An equipment with this code already exists";

#[derive(Clone)]
pub struct EquipmentRepository {
    pool: Pool<Postgres>,
}

impl EquipmentRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &EquipmentFilter) {
        builder.push(" WHERE TRUE");
        if let Some(kind) = filter.kind {
            builder.push(" AND kind = ").push_bind(kind);
        }
        if let Some(status) = filter.status {
            builder.push(" AND status = ").push_bind(status);
        }
        if let Some(ref location) = filter.location {
            builder
                .push(" AND location ILIKE ")
                .push_bind(format!("%{}%", escape_like(location)));
        }
    }
}

#[async_trait]
impl EquipmentStore for EquipmentRepository {
    async fn get(&self, id: Uuid) -> AppResult<Option<Equipment>> {
        let row = sqlx::query_as::<_, Equipment>("SELECT * FROM equipments WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn find_by_code(&self, code: &str) -> AppResult<Option<Equipment>> {
        let row = sqlx::query_as::<_, Equipment>("SELECT * FROM equipments WHERE code = $1")
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn insert(&self, equipment: &Equipment) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO equipments (
                id, code, kind, brand, model, location, status,
                purchase_date, warranty_end, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(equipment.id)
        .bind(&equipment.code)
        .bind(equipment.kind)
        .bind(&equipment.brand)
        .bind(&equipment.model)
        .bind(&equipment.location)
        .bind(equipment.status)
        .bind(equipment.purchase_date)
        .bind(equipment.warranty_end)
        .bind(equipment.created_at)
        .bind(equipment.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| unique_violation(e, DUPLICATE_CODE))?;
        Ok(())
    }

    async fn replace(&self, equipment: &Equipment) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE equipments SET
                code = $2, kind = $3, brand = $4, model = $5, location = $6,
                status = $7, purchase_date = $8, warranty_end = $9, updated_at = $10
            WHERE id = $1
            "#,
        )
        .bind(equipment.id)
        .bind(&equipment.code)
        .bind(equipment.kind)
        .bind(&equipment.brand)
        .bind(&equipment.model)
        .bind(&equipment.location)
        .bind(equipment.status)
        .bind(equipment.purchase_date)
        .bind(equipment.warranty_end)
        .bind(equipment.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| unique_violation(e, DUPLICATE_CODE))?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_status(&self, id: Uuid, status: EquipmentStatus) -> AppResult<bool> {
        let result = sqlx::query("UPDATE equipments SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(status)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM equipments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn search(
        &self,
        filter: &EquipmentFilter,
        limit: i64,
        offset: i64,
    ) -> AppResult<(Vec<Equipment>, i64)> {
        let total = self.count(filter).await?;

        let mut builder = QueryBuilder::new("SELECT * FROM equipments");
        Self::push_filter(&mut builder, filter);
        builder
            .push(" ORDER BY created_at DESC, id LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let rows = builder
            .build_query_as::<Equipment>()
            .fetch_all(&self.pool)
            .await?;
        Ok((rows, total))
    }

    async fn list_by_status(&self, status: EquipmentStatus) -> AppResult<Vec<Equipment>> {
        let rows = sqlx::query_as::<_, Equipment>(
            "SELECT * FROM equipments WHERE status = $1 ORDER BY code",
        )
        .bind(status)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn count(&self, filter: &EquipmentFilter) -> AppResult<i64> {
        let mut builder = QueryBuilder::new("SELECT COUNT(*) FROM equipments");
        Self::push_filter(&mut builder, filter);
        let total = builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }
}
