//! Work orders repository for database operations

use async_trait::async_trait;
use sqlx::{types::Json, Pool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::WorkOrderStore;
use crate::{
    error::AppResult,
    models::work_order::{WorkOrder, WorkOrderFilter, WorkOrderRow, WorkOrderStatus},
};

#[derive(Clone)]
pub struct WorkOrdersRepository {
    pool: Pool<Postgres>,
}

fn status_texts(statuses: &[WorkOrderStatus]) -> Vec<String> {
    statuses.iter().map(|s| s.as_str().to_string()).collect()
}

impl WorkOrdersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &WorkOrderFilter) {
        builder.push(" WHERE TRUE");
        if let Some(requester_id) = filter.requester_id {
            builder.push(" AND requester_id = ").push_bind(requester_id);
        }
        if let Some(equipment_id) = filter.equipment_id {
            builder.push(" AND equipment_id = ").push_bind(equipment_id);
        }
        if !filter.statuses.is_empty() {
            builder
                .push(" AND status = ANY(")
                .push_bind(status_texts(&filter.statuses))
                .push(")");
        }
        if !filter.exclude_statuses.is_empty() {
            builder
                .push(" AND NOT (status = ANY(")
                .push_bind(status_texts(&filter.exclude_statuses))
                .push("))");
        }
        if let Some(priority) = filter.priority {
            builder.push(" AND priority = ").push_bind(priority);
        }
    }
}

#[async_trait]
impl WorkOrderStore for WorkOrdersRepository {
    async fn get(&self, id: Uuid) -> AppResult<Option<WorkOrder>> {
        let row = sqlx::query_as::<_, WorkOrderRow>("SELECT * FROM work_orders WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(WorkOrder::from))
    }

    async fn insert(&self, order: &WorkOrder) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO work_orders (
                id, title, description, status, priority, equipment_id,
                requester_id, technician_id, history, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(order.id)
        .bind(&order.title)
        .bind(&order.description)
        .bind(order.status)
        .bind(order.priority)
        .bind(order.equipment_id)
        .bind(order.requester_id)
        .bind(order.technician_id)
        .bind(Json(order.history()))
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn replace(&self, order: &WorkOrder) -> AppResult<bool> {
        // Field changes and the history entry describing them land in one statement
        let result = sqlx::query(
            r#"
            UPDATE work_orders SET
                title = $2, description = $3, status = $4, priority = $5,
                technician_id = $6, history = $7, updated_at = $8
            WHERE id = $1
            "#,
        )
        .bind(order.id)
        .bind(&order.title)
        .bind(&order.description)
        .bind(order.status)
        .bind(order.priority)
        .bind(order.technician_id)
        .bind(Json(order.history()))
        .bind(order.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn search(
        &self,
        filter: &WorkOrderFilter,
        limit: i64,
        offset: i64,
    ) -> AppResult<(Vec<WorkOrder>, i64)> {
        let total = self.count(filter).await?;

        let mut builder = QueryBuilder::new("SELECT * FROM work_orders");
        Self::push_filter(&mut builder, filter);
        builder
            .push(" ORDER BY created_at DESC, id LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let rows = builder
            .build_query_as::<WorkOrderRow>()
            .fetch_all(&self.pool)
            .await?;
        Ok((rows.into_iter().map(WorkOrder::from).collect(), total))
    }

    async fn list(&self, filter: &WorkOrderFilter) -> AppResult<Vec<WorkOrder>> {
        let mut builder = QueryBuilder::new("SELECT * FROM work_orders");
        Self::push_filter(&mut builder, filter);
        builder.push(" ORDER BY created_at DESC, id");

        let rows = builder
            .build_query_as::<WorkOrderRow>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(WorkOrder::from).collect())
    }

    async fn count(&self, filter: &WorkOrderFilter) -> AppResult<i64> {
        let mut builder = QueryBuilder::new("SELECT COUNT(*) FROM work_orders");
        Self::push_filter(&mut builder, filter);
        let total = builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }
}
