//! Equipment model

use chrono::{DateTime, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use super::serde_helpers::{clearable_date, empty_as_none, optional_date};

/// Kind of equipment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum EquipmentKind {
    Desktop,
    Notebook,
    Projector,
    Printer,
    Monitor,
    Other,
}

text_enum!(EquipmentKind {
    Desktop => "Desktop",
    Notebook => "Notebook",
    Projector => "Projector",
    Printer => "Printer",
    Monitor => "Monitor",
    Other => "Other",
});

/// Equipment lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EquipmentStatus {
    #[default]
    Operational,
    InMaintenance,
    Discarded,
}

text_enum!(EquipmentStatus {
    Operational => "operational",
    InMaintenance => "in_maintenance",
    Discarded => "discarded",
});

/// Warranty length applied when a purchase date is first recorded
pub const WARRANTY_MONTHS: u32 = 12;

pub fn warranty_end_for(purchase_date: NaiveDate) -> Option<NaiveDate> {
    purchase_date.checked_add_months(Months::new(WARRANTY_MONTHS))
}

/// Equipment record
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Equipment {
    pub id: Uuid,
    /// Unique inventory code
    pub code: String,
    pub kind: EquipmentKind,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub location: String,
    pub status: EquipmentStatus,
    pub purchase_date: Option<NaiveDate>,
    /// Derived from the purchase date, see [`Equipment::set_purchase_date`]
    pub warranty_end: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Equipment {
    pub fn new(data: &CreateEquipment, now: DateTime<Utc>) -> Self {
        let mut equipment = Self {
            id: Uuid::new_v4(),
            code: data.code.trim().to_string(),
            kind: data.kind,
            brand: non_empty(&data.brand),
            model: non_empty(&data.model),
            location: data.location.clone(),
            status: EquipmentStatus::Operational,
            purchase_date: None,
            warranty_end: None,
            created_at: now,
            updated_at: now,
        };
        equipment.set_purchase_date(data.purchase_date);
        equipment
    }

    /// Records a purchase date. The warranty end is computed only when the
    /// date actually changes and no warranty end is known yet; clearing the
    /// purchase date clears the warranty end as well.
    pub fn set_purchase_date(&mut self, date: Option<NaiveDate>) {
        let changed = self.purchase_date != date;
        self.purchase_date = date;
        match date {
            None => self.warranty_end = None,
            Some(d) if changed && self.warranty_end.is_none() => {
                self.warranty_end = warranty_end_for(d);
            }
            Some(_) => {}
        }
    }

    /// Partial overwrite: omitted or empty fields keep their current value.
    pub fn apply_update(&mut self, data: &UpdateEquipment, now: DateTime<Utc>) {
        if let Some(code) = data.code.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
            self.code = code.to_string();
        }
        if let Some(kind) = data.kind {
            self.kind = kind;
        }
        if let Some(brand) = non_empty(&data.brand) {
            self.brand = Some(brand);
        }
        if let Some(model) = non_empty(&data.model) {
            self.model = Some(model);
        }
        if let Some(location) = non_empty(&data.location) {
            self.location = location;
        }
        if let Some(status) = data.status {
            self.status = status;
        }
        if let Some(purchase_date) = data.purchase_date {
            self.set_purchase_date(purchase_date);
        }
        self.updated_at = now;
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|v| !v.is_empty()).cloned()
}

/// Equipment fields shown inline on a work order
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EquipmentRef {
    pub id: Uuid,
    pub code: String,
    pub kind: EquipmentKind,
    pub location: String,
    pub brand: Option<String>,
    pub model: Option<String>,
}

impl From<&Equipment> for EquipmentRef {
    fn from(e: &Equipment) -> Self {
        Self {
            id: e.id,
            code: e.code.clone(),
            kind: e.kind,
            location: e.location.clone(),
            brand: e.brand.clone(),
            model: e.model.clone(),
        }
    }
}

/// Create equipment request
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateEquipment {
    #[validate(length(min = 1, message = "Code is required"))]
    pub code: String,
    pub kind: EquipmentKind,
    pub brand: Option<String>,
    pub model: Option<String>,
    #[validate(length(min = 1, message = "Location is required"))]
    pub location: String,
    #[serde(default, deserialize_with = "optional_date")]
    #[schema(value_type = Option<String>, format = Date)]
    pub purchase_date: Option<NaiveDate>,
}

/// Update equipment request
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEquipment {
    pub code: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    #[schema(value_type = Option<EquipmentKind>)]
    pub kind: Option<EquipmentKind>,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub location: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    #[schema(value_type = Option<EquipmentStatus>)]
    pub status: Option<EquipmentStatus>,
    /// Omit to keep, `null` or `""` to clear
    #[serde(default, deserialize_with = "clearable_date")]
    #[schema(value_type = Option<String>, format = Date)]
    pub purchase_date: Option<Option<NaiveDate>>,
}

/// Equipment list query parameters
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct EquipmentQuery {
    #[serde(default, deserialize_with = "empty_as_none")]
    #[param(value_type = Option<EquipmentKind>)]
    pub kind: Option<EquipmentKind>,
    #[serde(default, deserialize_with = "empty_as_none")]
    #[param(value_type = Option<EquipmentStatus>)]
    pub status: Option<EquipmentStatus>,
    /// Case-insensitive substring
    pub location: Option<String>,
    pub page: Option<i64>,
}

/// Store-level equipment filter
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EquipmentFilter {
    pub kind: Option<EquipmentKind>,
    pub status: Option<EquipmentStatus>,
    pub location: Option<String>,
}

impl From<&EquipmentQuery> for EquipmentFilter {
    fn from(query: &EquipmentQuery) -> Self {
        Self {
            kind: query.kind,
            status: query.status,
            location: query.location.clone().filter(|l| !l.is_empty()),
        }
    }
}

impl EquipmentFilter {
    pub fn matches(&self, equipment: &Equipment) -> bool {
        if self.kind.is_some_and(|k| k != equipment.kind) {
            return false;
        }
        if self.status.is_some_and(|s| s != equipment.status) {
            return false;
        }
        match &self.location {
            Some(needle) => equipment
                .location
                .to_lowercase()
                .contains(&needle.to_lowercase()),
            None => true,
        }
    }
}
