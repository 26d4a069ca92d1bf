//! Work order lifecycle: opening, state transitions, technician assignment
//! and the audit history, plus the equipment status coupling.
//!
//! Equipment follows its tickets: opening a ticket puts the equipment in
//! maintenance, moving a ticket to `done`/`canceled` makes it operational
//! again and any other status change puts it back in maintenance. The
//! ticket write and the equipment write are not transactional; an
//! equipment record that vanished in between is skipped, never an error.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        equipment::{EquipmentRef, EquipmentStatus},
        user::{Caller, UserRef},
        work_order::{
            CreateWorkOrder, UpdateWorkOrder, WorkOrder, WorkOrderDetails, WorkOrderFilter,
            WorkOrderQuery,
        },
        PageRequest, Paginated,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct WorkOrdersService {
    repository: Repository,
    page_size: i64,
}

impl WorkOrdersService {
    pub fn new(repository: Repository, page_size: i64) -> Self {
        Self { repository, page_size }
    }

    /// Open a ticket against an existing equipment on behalf of `requester`
    pub async fn open(&self, data: &CreateWorkOrder, requester: &Caller) -> AppResult<WorkOrderDetails> {
        data.validate()?;

        let equipment = self
            .repository
            .equipment
            .get(data.equipment_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Equipment not found".to_string()))?;

        let order = WorkOrder::open(data, requester, Utc::now());
        self.repository.work_orders.insert(&order).await?;

        // Unconditional, even for equipment already in maintenance or discarded
        if !self
            .repository
            .equipment
            .set_status(equipment.id, EquipmentStatus::InMaintenance)
            .await?
        {
            tracing::warn!(equipment_id = %equipment.id, "Equipment vanished while opening work order");
        }

        tracing::info!(
            work_order_id = %order.id,
            equipment_id = %equipment.id,
            requester_id = %requester.id,
            "Work order opened"
        );
        self.details(order).await
    }

    /// Apply status, priority and technician changes. All effective changes
    /// are described by a single history entry attributed to `actor`.
    pub async fn update(
        &self,
        id: Uuid,
        data: &UpdateWorkOrder,
        actor: &Caller,
    ) -> AppResult<WorkOrderDetails> {
        let mut order = self.find(id).await?;
        let mut changes: Vec<String> = Vec::new();

        if let Some(status) = data.status.filter(|s| *s != order.status) {
            changes.push(format!("Status changed to \"{}\".", status.label()));
            order.status = status;
            self.sync_equipment_status(&order).await;
        }

        if let Some(priority) = data.priority.filter(|p| *p != order.priority) {
            changes.push(format!("Priority changed to \"{}\".", priority));
            order.priority = priority;
        }

        if let Some(raw) = data.technician_id.as_deref().map(str::trim) {
            if raw.is_empty() {
                if order.technician_id.take().is_some() {
                    changes.push("Technician removed.".to_string());
                }
            } else {
                match raw.parse::<Uuid>() {
                    Ok(tech_id) if order.technician_id == Some(tech_id) => {}
                    Ok(tech_id) => match self.repository.users.get(tech_id).await? {
                        Some(technician) => {
                            changes.push(format!("Assigned to technician \"{}\".", technician.name));
                            order.technician_id = Some(technician.id);
                        }
                        // TODO: decide whether an unknown technician id should be a 404 instead of a no-op
                        None => {
                            tracing::warn!(work_order_id = %id, technician_id = %tech_id, "Technician not found, assignment ignored");
                        }
                    },
                    Err(_) => {
                        tracing::warn!(work_order_id = %id, technician_id = raw, "Malformed technician id, assignment ignored");
                    }
                }
            }
        }

        if !changes.is_empty() {
            let now = Utc::now();
            order.append_history(&actor.name, changes.join(" "), now);
            order.updated_at = now;

            if !self.repository.work_orders.replace(&order).await? {
                return Err(AppError::NotFound("Work order not found".to_string()));
            }
            tracing::info!(work_order_id = %id, actor_id = %actor.id, status = %order.status, "Work order updated");
        }

        self.details(order).await
    }

    /// Employees may only read their own tickets
    pub async fn get(&self, id: Uuid, caller: &Caller) -> AppResult<WorkOrderDetails> {
        let order = self.find(id).await?;
        if caller.is_employee() && order.requester_id != caller.id {
            return Err(AppError::Authorization("Access denied".to_string()));
        }
        self.details(order).await
    }

    pub async fn list(&self, query: &WorkOrderQuery, caller: &Caller) -> AppResult<Paginated<WorkOrderDetails>> {
        let page = PageRequest::new(query.page, self.page_size);
        let filter = WorkOrderFilter::for_listing(query, caller);
        let (orders, total) = self
            .repository
            .work_orders
            .search(&filter, page.limit(), page.offset())
            .await?;
        let items = self.populate(orders).await?;
        Ok(page.wrap(items, total))
    }

    /// Every ticket ever opened for an equipment, newest first. Not
    /// restricted by caller role.
    pub async fn history_for_equipment(&self, equipment_id: Uuid) -> AppResult<Vec<WorkOrderDetails>> {
        let filter = WorkOrderFilter {
            equipment_id: Some(equipment_id),
            ..Default::default()
        };
        let orders = self.repository.work_orders.list(&filter).await?;
        self.populate(orders).await
    }

    async fn find(&self, id: Uuid) -> AppResult<WorkOrder> {
        self.repository
            .work_orders
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Work order not found".to_string()))
    }

    async fn sync_equipment_status(&self, order: &WorkOrder) {
        let target = if order.status.is_terminal() {
            EquipmentStatus::Operational
        } else {
            EquipmentStatus::InMaintenance
        };
        match self.repository.equipment.set_status(order.equipment_id, target).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!(equipment_id = %order.equipment_id, "Equipment no longer exists, status update skipped");
            }
            Err(e) => {
                tracing::warn!(equipment_id = %order.equipment_id, "Equipment status update skipped: {}", e);
            }
        }
    }

    async fn details(&self, order: WorkOrder) -> AppResult<WorkOrderDetails> {
        self.populate(vec![order])
            .await?
            .pop()
            .ok_or_else(|| AppError::Internal("Work order population returned nothing".to_string()))
    }

    /// Read-time join: fetch each referenced equipment and user once and
    /// merge their display fields into the tickets.
    async fn populate(&self, orders: Vec<WorkOrder>) -> AppResult<Vec<WorkOrderDetails>> {
        let equipment_ids: HashSet<Uuid> = orders.iter().map(|o| o.equipment_id).collect();
        let user_ids: HashSet<Uuid> = orders
            .iter()
            .flat_map(|o| std::iter::once(o.requester_id).chain(o.technician_id))
            .collect();

        let mut equipment: HashMap<Uuid, EquipmentRef> = HashMap::new();
        for id in equipment_ids {
            if let Some(e) = self.repository.equipment.get(id).await? {
                equipment.insert(id, EquipmentRef::from(&e));
            }
        }

        let mut users: HashMap<Uuid, UserRef> = HashMap::new();
        for id in user_ids {
            if let Some(u) = self.repository.users.get(id).await? {
                users.insert(id, UserRef::from(&u));
            }
        }

        Ok(orders
            .into_iter()
            .map(|o| WorkOrderDetails {
                equipment: equipment.get(&o.equipment_id).cloned(),
                requester: users.get(&o.requester_id).cloned(),
                technician: o.technician_id.and_then(|id| users.get(&id).cloned()),
                history: o.history().to_vec(),
                id: o.id,
                title: o.title,
                description: o.description,
                status: o.status,
                priority: o.priority,
                created_at: o.created_at,
                updated_at: o.updated_at,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        equipment::{CreateEquipment, Equipment, EquipmentFilter, EquipmentKind},
        user::{Role, User},
        work_order::{Priority, WorkOrderStatus, OPENED_ACTION},
    };

    struct Fixture {
        repository: Repository,
        service: WorkOrdersService,
        employee: Caller,
        other_employee: Caller,
        technician: Caller,
        equipment: Equipment,
    }

    async fn add_user(repository: &Repository, name: &str, role: Role) -> Caller {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            password: "unused".into(),
            role,
            created_at: now,
            updated_at: now,
        };
        repository.users.insert(&user).await.unwrap();
        Caller::from(&user)
    }

    async fn add_equipment(repository: &Repository, code: &str) -> Equipment {
        let equipment = Equipment::new(
            &CreateEquipment {
                code: code.into(),
                kind: EquipmentKind::Printer,
                brand: Some("HP".into()),
                model: None,
                location: "Floor 2".into(),
                purchase_date: None,
            },
            Utc::now(),
        );
        repository.equipment.insert(&equipment).await.unwrap();
        equipment
    }

    async fn fixture() -> Fixture {
        let repository = Repository::in_memory();
        let employee = add_user(&repository, "Fabio", Role::Employee).await;
        let other_employee = add_user(&repository, "Gina", Role::Employee).await;
        let technician = add_user(&repository, "Hugo", Role::Technician).await;
        let equipment = add_equipment(&repository, "PRN-1").await;
        Fixture {
            service: WorkOrdersService::new(repository.clone(), 10),
            repository,
            employee,
            other_employee,
            technician,
            equipment,
        }
    }

    fn ticket(equipment_id: Uuid) -> CreateWorkOrder {
        CreateWorkOrder {
            title: "Does not print".into(),
            description: "Blinking orange light".into(),
            priority: Some(Priority::Medium),
            equipment_id,
        }
    }

    async fn equipment_status(f: &Fixture) -> EquipmentStatus {
        f.repository
            .equipment
            .get(f.equipment.id)
            .await
            .unwrap()
            .unwrap()
            .status
    }

    #[tokio::test]
    async fn open_puts_equipment_in_maintenance() {
        let f = fixture().await;
        let order = f.service.open(&ticket(f.equipment.id), &f.employee).await.unwrap();

        assert_eq!(order.status, WorkOrderStatus::Open);
        assert_eq!(order.history.len(), 1);
        assert_eq!(order.history[0].action, OPENED_ACTION);
        assert_eq!(order.history[0].actor_name, "Fabio");
        assert_eq!(order.equipment.as_ref().unwrap().code, "PRN-1");
        assert_eq!(order.requester.as_ref().unwrap().name, "Fabio");
        assert!(order.technician.is_none());
        assert_eq!(equipment_status(&f).await, EquipmentStatus::InMaintenance);
    }

    #[tokio::test]
    async fn open_against_missing_equipment_creates_nothing() {
        let f = fixture().await;
        let err = f
            .service
            .open(&ticket(Uuid::new_v4()), &f.employee)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        let count = f
            .repository
            .work_orders
            .count(&WorkOrderFilter::default())
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn open_overrides_discarded_equipment() {
        let f = fixture().await;
        f.repository
            .equipment
            .set_status(f.equipment.id, EquipmentStatus::Discarded)
            .await
            .unwrap();
        f.service.open(&ticket(f.equipment.id), &f.employee).await.unwrap();
        assert_eq!(equipment_status(&f).await, EquipmentStatus::InMaintenance);
    }

    #[tokio::test]
    async fn status_transitions_drive_equipment_status() {
        let f = fixture().await;
        let order = f.service.open(&ticket(f.equipment.id), &f.employee).await.unwrap();

        let done = UpdateWorkOrder { status: Some(WorkOrderStatus::Done), ..Default::default() };
        let order = f.service.update(order.id, &done, &f.technician).await.unwrap();
        assert_eq!(order.status, WorkOrderStatus::Done);
        assert_eq!(equipment_status(&f).await, EquipmentStatus::Operational);
        assert_eq!(order.history.last().unwrap().action, "Status changed to \"done\".");
        assert_eq!(order.history.last().unwrap().actor_name, "Hugo");

        let reopen = UpdateWorkOrder { status: Some(WorkOrderStatus::InProgress), ..Default::default() };
        let order = f.service.update(order.id, &reopen, &f.technician).await.unwrap();
        assert_eq!(equipment_status(&f).await, EquipmentStatus::InMaintenance);
        assert_eq!(order.history.len(), 3);
    }

    #[tokio::test]
    async fn unchanged_status_writes_nothing() {
        let f = fixture().await;
        let order = f.service.open(&ticket(f.equipment.id), &f.employee).await.unwrap();
        // Any equipment write would flip this back to in_maintenance
        f.repository
            .equipment
            .set_status(f.equipment.id, EquipmentStatus::Discarded)
            .await
            .unwrap();

        let same = UpdateWorkOrder {
            status: Some(WorkOrderStatus::Open),
            priority: Some(Priority::Medium),
            ..Default::default()
        };
        let order = f.service.update(order.id, &same, &f.technician).await.unwrap();
        assert_eq!(order.history.len(), 1);
        assert_eq!(equipment_status(&f).await, EquipmentStatus::Discarded);
    }

    #[tokio::test]
    async fn combined_changes_make_one_entry_in_fixed_order() {
        let f = fixture().await;
        let order = f.service.open(&ticket(f.equipment.id), &f.employee).await.unwrap();

        let update = UpdateWorkOrder {
            status: Some(WorkOrderStatus::AwaitingPart),
            priority: Some(Priority::High),
            technician_id: Some(f.technician.id.to_string()),
        };
        let order = f.service.update(order.id, &update, &f.technician).await.unwrap();
        assert_eq!(order.history.len(), 2);
        assert_eq!(
            order.history[1].action,
            "Status changed to \"awaiting part\". Priority changed to \"high\". Assigned to technician \"Hugo\"."
        );
        assert_eq!(order.technician.as_ref().unwrap().id, f.technician.id);
    }

    #[tokio::test]
    async fn unknown_technician_is_silently_ignored() {
        let f = fixture().await;
        let order = f.service.open(&ticket(f.equipment.id), &f.employee).await.unwrap();

        for bogus in [Uuid::new_v4().to_string(), "not-an-id".to_string()] {
            let update = UpdateWorkOrder { technician_id: Some(bogus), ..Default::default() };
            let updated = f.service.update(order.id, &update, &f.technician).await.unwrap();
            assert!(updated.technician.is_none());
            assert_eq!(updated.history.len(), 1);
        }
    }

    #[tokio::test]
    async fn empty_technician_id_unassigns() {
        let f = fixture().await;
        let order = f.service.open(&ticket(f.equipment.id), &f.employee).await.unwrap();

        let assign = UpdateWorkOrder {
            technician_id: Some(f.technician.id.to_string()),
            ..Default::default()
        };
        f.service.update(order.id, &assign, &f.technician).await.unwrap();

        // Same technician again: no change
        let order = f.service.update(order.id, &assign, &f.technician).await.unwrap();
        assert_eq!(order.history.len(), 2);

        let clear = UpdateWorkOrder { technician_id: Some(String::new()), ..Default::default() };
        let order = f.service.update(order.id, &clear, &f.technician).await.unwrap();
        assert!(order.technician.is_none());
        assert_eq!(order.history.len(), 3);
        assert_eq!(order.history[2].action, "Technician removed.");

        // Clearing with nobody assigned is not a change
        let order = f.service.update(order.id, &clear, &f.technician).await.unwrap();
        assert_eq!(order.history.len(), 3);
    }

    #[tokio::test]
    async fn update_tolerates_deleted_equipment() {
        let f = fixture().await;
        let order = f.service.open(&ticket(f.equipment.id), &f.employee).await.unwrap();
        f.repository.equipment.delete(f.equipment.id).await.unwrap();

        let done = UpdateWorkOrder { status: Some(WorkOrderStatus::Canceled), ..Default::default() };
        let order = f.service.update(order.id, &done, &f.technician).await.unwrap();
        assert_eq!(order.status, WorkOrderStatus::Canceled);
        assert!(order.equipment.is_none());
        assert_eq!(order.history.len(), 2);
    }

    #[tokio::test]
    async fn update_unknown_ticket_is_not_found() {
        let f = fixture().await;
        let err = f
            .service
            .update(Uuid::new_v4(), &UpdateWorkOrder::default(), &f.technician)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn employees_only_read_their_own_tickets() {
        let f = fixture().await;
        let order = f.service.open(&ticket(f.equipment.id), &f.employee).await.unwrap();

        assert!(f.service.get(order.id, &f.employee).await.is_ok());
        assert!(f.service.get(order.id, &f.technician).await.is_ok());
        assert!(matches!(
            f.service.get(order.id, &f.other_employee).await,
            Err(AppError::Authorization(_))
        ));
    }

    #[tokio::test]
    async fn employee_listing_ignores_other_requesters() {
        let f = fixture().await;
        for _ in 0..3 {
            f.service.open(&ticket(f.equipment.id), &f.employee).await.unwrap();
        }
        for _ in 0..2 {
            f.service.open(&ticket(f.equipment.id), &f.other_employee).await.unwrap();
        }

        let query = WorkOrderQuery { priority: Some(Priority::Medium), ..Default::default() };
        let mine = f.service.list(&query, &f.employee).await.unwrap();
        assert_eq!(mine.total, 3);
        assert!(mine
            .items
            .iter()
            .all(|o| o.requester.as_ref().unwrap().id == f.employee.id));

        let all = f.service.list(&query, &f.technician).await.unwrap();
        assert_eq!(all.total, 5);
    }

    #[tokio::test]
    async fn hide_completed_unless_status_is_explicit() {
        let f = fixture().await;
        let mut ids = Vec::new();
        for _ in 0..4 {
            ids.push(f.service.open(&ticket(f.equipment.id), &f.employee).await.unwrap().id);
        }
        let finish = |status| UpdateWorkOrder { status: Some(status), ..Default::default() };
        f.service.update(ids[0], &finish(WorkOrderStatus::Done), &f.technician).await.unwrap();
        f.service.update(ids[1], &finish(WorkOrderStatus::Canceled), &f.technician).await.unwrap();

        let hide = WorkOrderQuery { hide_completed: Some(true), ..Default::default() };
        let active = f.service.list(&hide, &f.technician).await.unwrap();
        assert_eq!(active.total, 2);
        assert!(active.items.iter().all(|o| !o.status.is_terminal()));

        let explicit = WorkOrderQuery {
            status: Some(WorkOrderStatus::Done),
            hide_completed: Some(true),
            ..Default::default()
        };
        let done = f.service.list(&explicit, &f.technician).await.unwrap();
        assert_eq!(done.total, 1);
        assert_eq!(done.items[0].id, ids[0]);
    }

    #[tokio::test]
    async fn pagination_past_the_end_keeps_totals() {
        let f = fixture().await;
        for _ in 0..25 {
            f.service.open(&ticket(f.equipment.id), &f.employee).await.unwrap();
        }

        let page3 = f
            .service
            .list(&WorkOrderQuery { page: Some(3), ..Default::default() }, &f.technician)
            .await
            .unwrap();
        assert_eq!(page3.items.len(), 5);
        assert_eq!(page3.pages, 3);

        let page10 = f
            .service
            .list(&WorkOrderQuery { page: Some(10), ..Default::default() }, &f.technician)
            .await
            .unwrap();
        assert!(page10.items.is_empty());
        assert_eq!(page10.pages, 3);
        assert_eq!(page10.total, 25);
    }

    #[tokio::test]
    async fn equipment_history_is_newest_first_and_unrestricted() {
        let f = fixture().await;
        let other = add_equipment(&f.repository, "PRN-2").await;
        let first = f.service.open(&ticket(f.equipment.id), &f.employee).await.unwrap();
        let second = f.service.open(&ticket(f.equipment.id), &f.other_employee).await.unwrap();
        f.service.open(&ticket(other.id), &f.employee).await.unwrap();

        let history = f.service.history_for_equipment(f.equipment.id).await.unwrap();
        let ids: Vec<Uuid> = history.iter().map(|o| o.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }

    #[tokio::test]
    async fn deleted_requester_resolves_to_null() {
        let f = fixture().await;
        let order = f.service.open(&ticket(f.equipment.id), &f.employee).await.unwrap();
        f.repository.users.delete(f.employee.id).await.unwrap();

        let history = f.service.history_for_equipment(f.equipment.id).await.unwrap();
        assert_eq!(history[0].id, order.id);
        assert!(history[0].requester.is_none());
        // Actor names were captured at write time
        assert_eq!(history[0].history[0].actor_name, "Fabio");
    }

    #[tokio::test]
    async fn equipment_counts_follow_tickets() {
        let f = fixture().await;
        let in_maintenance = EquipmentFilter {
            status: Some(EquipmentStatus::InMaintenance),
            ..Default::default()
        };
        assert_eq!(f.repository.equipment.count(&in_maintenance).await.unwrap(), 0);
        f.service.open(&ticket(f.equipment.id), &f.employee).await.unwrap();
        assert_eq!(f.repository.equipment.count(&in_maintenance).await.unwrap(), 1);
    }
}
