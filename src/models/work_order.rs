//! Work order (ticket) model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use super::{
    equipment::EquipmentRef,
    serde_helpers::empty_as_none,
    user::{Caller, UserRef},
};

/// Ticket state. `done` and `canceled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum WorkOrderStatus {
    #[default]
    Open,
    InProgress,
    AwaitingPart,
    Done,
    Canceled,
}

text_enum!(WorkOrderStatus {
    Open => "open",
    InProgress => "in_progress",
    AwaitingPart => "awaiting_part",
    Done => "done",
    Canceled => "canceled",
});

impl WorkOrderStatus {
    pub const ACTIVE: &'static [WorkOrderStatus] = &[
        WorkOrderStatus::Open,
        WorkOrderStatus::InProgress,
        WorkOrderStatus::AwaitingPart,
    ];
    pub const COMPLETED: &'static [WorkOrderStatus] =
        &[WorkOrderStatus::Done, WorkOrderStatus::Canceled];

    pub fn is_terminal(&self) -> bool {
        Self::COMPLETED.contains(self)
    }

    /// Human form used in history entries ("in progress")
    pub fn label(&self) -> String {
        self.as_str().replace('_', " ")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[default]
    Low,
    Medium,
    High,
}

text_enum!(Priority {
    Low => "low",
    Medium => "medium",
    High => "high",
});

/// One audit record. The actor name is captured when the entry is written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub actor_name: String,
    pub action: String,
}

pub const OPENED_ACTION: &str = "Work order opened.";

/// Work order document. The history can only grow: entries are appended
/// through [`WorkOrder::append_history`] and never edited.
#[derive(Debug, Clone)]
pub struct WorkOrder {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub status: WorkOrderStatus,
    pub priority: Priority,
    /// Set at creation, never changed
    pub equipment_id: Uuid,
    /// Set at creation, never changed
    pub requester_id: Uuid,
    pub technician_id: Option<Uuid>,
    history: Vec<HistoryEntry>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WorkOrder {
    pub fn open(data: &CreateWorkOrder, requester: &Caller, now: DateTime<Utc>) -> Self {
        let mut order = Self {
            id: Uuid::new_v4(),
            title: data.title.clone(),
            description: data.description.clone(),
            status: WorkOrderStatus::Open,
            priority: data.priority.unwrap_or_default(),
            equipment_id: data.equipment_id,
            requester_id: requester.id,
            technician_id: None,
            history: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        order.append_history(&requester.name, OPENED_ACTION, now);
        order
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn append_history(&mut self, actor_name: &str, action: impl Into<String>, at: DateTime<Utc>) {
        self.history.push(HistoryEntry {
            timestamp: at,
            actor_name: actor_name.to_string(),
            action: action.into(),
        });
    }
}

/// Database row for work orders; history is a JSONB array
#[derive(Debug, FromRow)]
pub struct WorkOrderRow {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub status: WorkOrderStatus,
    pub priority: Priority,
    pub equipment_id: Uuid,
    pub requester_id: Uuid,
    pub technician_id: Option<Uuid>,
    pub history: Json<Vec<HistoryEntry>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<WorkOrderRow> for WorkOrder {
    fn from(row: WorkOrderRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            description: row.description,
            status: row.status,
            priority: row.priority,
            equipment_id: row.equipment_id,
            requester_id: row.requester_id,
            technician_id: row.technician_id,
            history: row.history.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Work order with references resolved to display form. A reference whose
/// record has been deleted resolves to `null`.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WorkOrderDetails {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub status: WorkOrderStatus,
    pub priority: Priority,
    pub equipment: Option<EquipmentRef>,
    pub requester: Option<UserRef>,
    pub technician: Option<UserRef>,
    pub history: Vec<HistoryEntry>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Open work order request
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateWorkOrder {
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    #[validate(length(min = 1, message = "Description is required"))]
    pub description: String,
    #[serde(default, deserialize_with = "empty_as_none")]
    #[schema(value_type = Option<Priority>)]
    pub priority: Option<Priority>,
    pub equipment_id: Uuid,
}

/// Update work order request
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateWorkOrder {
    #[serde(default, deserialize_with = "empty_as_none")]
    #[schema(value_type = Option<WorkOrderStatus>)]
    pub status: Option<WorkOrderStatus>,
    #[serde(default, deserialize_with = "empty_as_none")]
    #[schema(value_type = Option<Priority>)]
    pub priority: Option<Priority>,
    /// Technician user id; `""` removes the current technician
    pub technician_id: Option<String>,
}

/// Work order list query parameters
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct WorkOrderQuery {
    #[serde(default, deserialize_with = "empty_as_none")]
    #[param(value_type = Option<WorkOrderStatus>)]
    pub status: Option<WorkOrderStatus>,
    #[serde(default, deserialize_with = "empty_as_none")]
    #[param(value_type = Option<Priority>)]
    pub priority: Option<Priority>,
    /// Hide done/canceled tickets when no status filter is given
    #[serde(default, deserialize_with = "empty_as_none")]
    #[param(value_type = Option<bool>)]
    pub hide_completed: Option<bool>,
    pub page: Option<i64>,
}

/// Store-level work order filter; empty vectors mean "no constraint"
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkOrderFilter {
    pub requester_id: Option<Uuid>,
    pub equipment_id: Option<Uuid>,
    pub statuses: Vec<WorkOrderStatus>,
    pub exclude_statuses: Vec<WorkOrderStatus>,
    pub priority: Option<Priority>,
}

impl WorkOrderFilter {
    /// Listing filter as seen by `caller`: employees only ever see their own
    /// tickets, an explicit status wins over `hide_completed`.
    pub fn for_listing(query: &WorkOrderQuery, caller: &Caller) -> Self {
        let mut filter = Self {
            priority: query.priority,
            ..Default::default()
        };
        if caller.is_employee() {
            filter.requester_id = Some(caller.id);
        }
        match query.status {
            Some(status) => filter.statuses = vec![status],
            None if query.hide_completed.unwrap_or(false) => {
                filter.exclude_statuses = WorkOrderStatus::COMPLETED.to_vec();
            }
            None => {}
        }
        filter
    }

    pub fn matches(&self, order: &WorkOrder) -> bool {
        if self.requester_id.is_some_and(|id| id != order.requester_id) {
            return false;
        }
        if self.equipment_id.is_some_and(|id| id != order.equipment_id) {
            return false;
        }
        if !self.statuses.is_empty() && !self.statuses.contains(&order.status) {
            return false;
        }
        if self.exclude_statuses.contains(&order.status) {
            return false;
        }
        self.priority.map_or(true, |p| p == order.priority)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::Role;

    fn caller(role: Role) -> Caller {
        Caller {
            id: Uuid::new_v4(),
            name: "Carla".into(),
            email: "carla@example.com".into(),
            role,
        }
    }

    fn request() -> CreateWorkOrder {
        CreateWorkOrder {
            title: "Printer jam".into(),
            description: "Paper stuck in tray 2".into(),
            priority: None,
            equipment_id: Uuid::new_v4(),
        }
    }

    #[test]
    fn opened_order_has_single_history_entry() {
        let requester = caller(Role::Employee);
        let order = WorkOrder::open(&request(), &requester, Utc::now());
        assert_eq!(order.status, WorkOrderStatus::Open);
        assert_eq!(order.priority, Priority::Low);
        assert_eq!(order.requester_id, requester.id);
        assert_eq!(order.history().len(), 1);
        assert_eq!(order.history()[0].actor_name, "Carla");
        assert_eq!(order.history()[0].action, OPENED_ACTION);
    }

    #[test]
    fn employee_listing_is_forced_to_own_tickets() {
        let employee = caller(Role::Employee);
        let query = WorkOrderQuery {
            status: Some(WorkOrderStatus::Open),
            ..Default::default()
        };
        let filter = WorkOrderFilter::for_listing(&query, &employee);
        assert_eq!(filter.requester_id, Some(employee.id));

        let tech = caller(Role::Technician);
        assert_eq!(WorkOrderFilter::for_listing(&query, &tech).requester_id, None);
    }

    #[test]
    fn explicit_status_overrides_hide_completed() {
        let admin = caller(Role::Admin);
        let hide = WorkOrderQuery {
            hide_completed: Some(true),
            ..Default::default()
        };
        let filter = WorkOrderFilter::for_listing(&hide, &admin);
        assert_eq!(filter.exclude_statuses, WorkOrderStatus::COMPLETED.to_vec());

        let explicit = WorkOrderQuery {
            status: Some(WorkOrderStatus::Done),
            hide_completed: Some(true),
            ..Default::default()
        };
        let filter = WorkOrderFilter::for_listing(&explicit, &admin);
        assert_eq!(filter.statuses, vec![WorkOrderStatus::Done]);
        assert!(filter.exclude_statuses.is_empty());
    }

    #[test]
    fn status_labels_are_human_readable() {
        assert_eq!(WorkOrderStatus::AwaitingPart.label(), "awaiting part");
        assert!(WorkOrderStatus::Canceled.is_terminal());
        assert!(!WorkOrderStatus::InProgress.is_terminal());
    }

    #[test]
    fn query_string_parsing() {
        let query: WorkOrderQuery =
            serde_json::from_str(r#"{"status": "", "priority": "high", "hideCompleted": "true"}"#)
                .unwrap();
        assert_eq!(query.status, None);
        assert_eq!(query.priority, Some(Priority::High));
        assert_eq!(query.hide_completed, Some(true));
    }
}
