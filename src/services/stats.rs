//! Dashboard statistics

use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::{
        equipment::{EquipmentFilter, EquipmentStatus},
        work_order::{Priority, WorkOrderFilter, WorkOrderStatus},
    },
    repository::Repository,
};

/// Live counts shown on the dashboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_equipment: i64,
    pub equipment_in_maintenance: i64,
    /// Tickets in open, in_progress or awaiting_part
    pub open_work_orders: i64,
    /// Tickets still `open` with high priority
    pub high_priority_open: i64,
}

#[derive(Clone)]
pub struct StatsService {
    repository: Repository,
}

impl StatsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn dashboard(&self) -> AppResult<DashboardStats> {
        let in_maintenance = EquipmentFilter {
            status: Some(EquipmentStatus::InMaintenance),
            ..Default::default()
        };
        let active = WorkOrderFilter {
            statuses: WorkOrderStatus::ACTIVE.to_vec(),
            ..Default::default()
        };
        let urgent = WorkOrderFilter {
            statuses: vec![WorkOrderStatus::Open],
            priority: Some(Priority::High),
            ..Default::default()
        };
        let all = EquipmentFilter::default();

        let (total_equipment, equipment_in_maintenance, open_work_orders, high_priority_open) = tokio::try_join!(
            self.repository.equipment.count(&all),
            self.repository.equipment.count(&in_maintenance),
            self.repository.work_orders.count(&active),
            self.repository.work_orders.count(&urgent),
        )?;

        Ok(DashboardStats {
            total_equipment,
            equipment_in_maintenance,
            open_work_orders,
            high_priority_open,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{
            equipment::{CreateEquipment, EquipmentKind},
            user::{Caller, Role},
            work_order::{CreateWorkOrder, UpdateWorkOrder},
        },
        services::{equipment::EquipmentService, work_orders::WorkOrdersService},
    };
    use uuid::Uuid;

    #[tokio::test]
    async fn empty_store_counts_zero() {
        let stats = StatsService::new(Repository::in_memory()).dashboard().await.unwrap();
        assert_eq!(
            stats,
            DashboardStats {
                total_equipment: 0,
                equipment_in_maintenance: 0,
                open_work_orders: 0,
                high_priority_open: 0,
            }
        );
    }

    #[tokio::test]
    async fn counts_follow_ticket_lifecycle() {
        let repository = Repository::in_memory();
        let equipment = EquipmentService::new(repository.clone(), 10);
        let orders = WorkOrdersService::new(repository.clone(), 10);
        let caller = Caller {
            id: Uuid::new_v4(),
            name: "Ines".into(),
            email: "ines@example.com".into(),
            role: Role::Technician,
        };

        let mut ids = Vec::new();
        for code in ["A", "B", "C"] {
            ids.push(
                equipment
                    .create(&CreateEquipment {
                        code: code.into(),
                        kind: EquipmentKind::Desktop,
                        brand: None,
                        model: None,
                        location: "Office".into(),
                        purchase_date: None,
                    })
                    .await
                    .unwrap()
                    .id,
            );
        }

        let ticket = |equipment_id, priority| CreateWorkOrder {
            title: "Broken".into(),
            description: "Does not boot".into(),
            priority: Some(priority),
            equipment_id,
        };
        let high = orders.open(&ticket(ids[0], Priority::High), &caller).await.unwrap();
        orders.open(&ticket(ids[1], Priority::High), &caller).await.unwrap();
        let low = orders.open(&ticket(ids[1], Priority::Low), &caller).await.unwrap();

        let in_progress = UpdateWorkOrder {
            status: Some(WorkOrderStatus::InProgress),
            ..Default::default()
        };
        orders.update(high.id, &in_progress, &caller).await.unwrap();
        let done = UpdateWorkOrder {
            status: Some(WorkOrderStatus::Done),
            ..Default::default()
        };
        orders.update(low.id, &done, &caller).await.unwrap();

        let stats = StatsService::new(repository).dashboard().await.unwrap();
        assert_eq!(stats.total_equipment, 3);
        // Equipment B went operational when its second ticket closed
        assert_eq!(stats.equipment_in_maintenance, 1);
        assert_eq!(stats.open_work_orders, 2);
        assert_eq!(stats.high_priority_open, 1);
    }
}
