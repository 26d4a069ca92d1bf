//! Equipment service

use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        equipment::{CreateEquipment, Equipment, EquipmentFilter, EquipmentQuery, EquipmentStatus, UpdateEquipment},
        PageRequest, Paginated,
    },
    repository::Repository,
};

const DUPLICATE_CODE: &str = "An equipment with this code already exists";

#[derive(Clone)]
pub struct EquipmentService {
    repository: Repository,
    page_size: i64,
}

impl EquipmentService {
    pub fn new(repository: Repository, page_size: i64) -> Self {
        Self { repository, page_size }
    }

    pub async fn list(&self, query: &EquipmentQuery) -> AppResult<Paginated<Equipment>> {
        let page = PageRequest::new(query.page, self.page_size);
        let filter = EquipmentFilter::from(query);
        let (items, total) = self
            .repository
            .equipment
            .search(&filter, page.limit(), page.offset())
            .await?;
        Ok(page.wrap(items, total))
    }

    /// Equipment that can receive a new work order, ordered by code
    pub async fn list_operational(&self) -> AppResult<Vec<Equipment>> {
        self.repository
            .equipment
            .list_by_status(EquipmentStatus::Operational)
            .await
    }

    pub async fn get_by_id(&self, id: Uuid) -> AppResult<Equipment> {
        self.repository
            .equipment
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Equipment not found".to_string()))
    }

    pub async fn create(&self, data: &CreateEquipment) -> AppResult<Equipment> {
        data.validate()?;
        let equipment = Equipment::new(data, Utc::now());
        if equipment.code.is_empty() {
            return Err(AppError::Validation("Code is required".to_string()));
        }

        if self
            .repository
            .equipment
            .find_by_code(&equipment.code)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(DUPLICATE_CODE.to_string()));
        }

        self.repository.equipment.insert(&equipment).await?;
        tracing::info!(equipment_id = %equipment.id, code = %equipment.code, "Equipment created");
        Ok(equipment)
    }

    pub async fn update(&self, id: Uuid, data: &UpdateEquipment) -> AppResult<Equipment> {
        let mut equipment = self.get_by_id(id).await?;
        equipment.apply_update(data, Utc::now());

        if let Some(other) = self.repository.equipment.find_by_code(&equipment.code).await? {
            if other.id != id {
                return Err(AppError::Conflict(DUPLICATE_CODE.to_string()));
            }
        }

        if !self.repository.equipment.replace(&equipment).await? {
            return Err(AppError::NotFound("Equipment not found".to_string()));
        }
        Ok(equipment)
    }

    /// Hard delete; existing work orders keep a dangling reference
    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        if !self.repository.equipment.delete(id).await? {
            return Err(AppError::NotFound("Equipment not found".to_string()));
        }
        tracing::info!(equipment_id = %id, "Equipment removed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::equipment::EquipmentKind;
    use chrono::NaiveDate;

    fn service() -> EquipmentService {
        EquipmentService::new(Repository::in_memory(), 10)
    }

    fn create(code: &str, kind: EquipmentKind, location: &str) -> CreateEquipment {
        CreateEquipment {
            code: code.into(),
            kind,
            brand: None,
            model: None,
            location: location.into(),
            purchase_date: None,
        }
    }

    #[tokio::test]
    async fn duplicate_code_is_rejected_before_insert() {
        let svc = service();
        svc.create(&create("NB-1", EquipmentKind::Notebook, "Office")).await.unwrap();
        let err = svc
            .create(&create(" NB-1 ", EquipmentKind::Notebook, "Office"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn blank_code_is_a_validation_error() {
        let err = service()
            .create(&create("   ", EquipmentKind::Other, "Office"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn list_filters_and_paginates() {
        let svc = service();
        for i in 0..25 {
            let kind = if i % 5 == 0 { EquipmentKind::Printer } else { EquipmentKind::Desktop };
            let location = if i < 3 { "Main LAB" } else { "Office" };
            svc.create(&create(&format!("EQ-{i:02}"), kind, location)).await.unwrap();
        }

        let page3 = svc
            .list(&EquipmentQuery { page: Some(3), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(page3.items.len(), 5);
        assert_eq!(page3.pages, 3);
        assert_eq!(page3.total, 25);

        let printers = svc
            .list(&EquipmentQuery { kind: Some(EquipmentKind::Printer), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(printers.total, 5);

        let lab = svc
            .list(&EquipmentQuery { location: Some("lab".into()), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(lab.total, 3);
    }

    #[tokio::test]
    async fn operational_listing_is_sorted_by_code() {
        let svc = service();
        let b = svc.create(&create("B", EquipmentKind::Monitor, "X")).await.unwrap();
        svc.create(&create("C", EquipmentKind::Monitor, "X")).await.unwrap();
        svc.create(&create("A", EquipmentKind::Monitor, "X")).await.unwrap();
        svc.update(
            b.id,
            &UpdateEquipment { status: Some(EquipmentStatus::Discarded), ..Default::default() },
        )
        .await
        .unwrap();

        let codes: Vec<String> = svc
            .list_operational()
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.code)
            .collect();
        assert_eq!(codes, vec!["A", "C"]);
    }

    #[tokio::test]
    async fn update_computes_and_clears_warranty() {
        let svc = service();
        let eq = svc.create(&create("PR-1", EquipmentKind::Projector, "Room")).await.unwrap();
        let purchase = NaiveDate::from_ymd_opt(2023, 8, 1).unwrap();

        let eq = svc
            .update(eq.id, &UpdateEquipment { purchase_date: Some(Some(purchase)), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(eq.warranty_end, NaiveDate::from_ymd_opt(2024, 8, 1));

        let eq = svc
            .update(eq.id, &UpdateEquipment { purchase_date: Some(None), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(eq.purchase_date, None);
        assert_eq!(eq.warranty_end, None);
    }

    #[tokio::test]
    async fn update_to_existing_code_conflicts() {
        let svc = service();
        svc.create(&create("A", EquipmentKind::Monitor, "X")).await.unwrap();
        let b = svc.create(&create("B", EquipmentKind::Monitor, "X")).await.unwrap();
        let err = svc
            .update(b.id, &UpdateEquipment { code: Some("A".into()), ..Default::default() })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn delete_then_get_is_not_found() {
        let svc = service();
        let eq = svc.create(&create("A", EquipmentKind::Monitor, "X")).await.unwrap();
        svc.delete(eq.id).await.unwrap();
        assert!(matches!(svc.get_by_id(eq.id).await, Err(AppError::NotFound(_))));
        assert!(matches!(svc.delete(eq.id).await, Err(AppError::NotFound(_))));
    }
}
