//! Equipment endpoints

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        equipment::{CreateEquipment, Equipment, EquipmentQuery, UpdateEquipment},
        Paginated,
    },
};

use super::{
    extract::{AppJson, AppPath, AppQuery},
    AuthenticatedUser,
};

/// List equipment with filters and pagination
#[utoipa::path(
    get,
    path = "/equipments",
    tag = "equipment",
    security(("bearer_auth" = [])),
    params(EquipmentQuery),
    responses(
        (status = 200, description = "One page of equipment, newest first", body = Paginated<Equipment>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_equipment(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_caller): AuthenticatedUser,
    AppQuery(query): AppQuery<EquipmentQuery>,
) -> AppResult<Json<Paginated<Equipment>>> {
    let page = state.services.equipment.list(&query).await?;
    Ok(Json(page))
}

/// Operational equipment, ordered by code
#[utoipa::path(
    get,
    path = "/equipments/operational",
    tag = "equipment",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Operational equipment", body = Vec<Equipment>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_operational(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_caller): AuthenticatedUser,
) -> AppResult<Json<Vec<Equipment>>> {
    let items = state.services.equipment.list_operational().await?;
    Ok(Json(items))
}

/// Get equipment by ID
#[utoipa::path(
    get,
    path = "/equipments/{id}",
    tag = "equipment",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Equipment ID")),
    responses(
        (status = 200, description = "Equipment details", body = Equipment),
        (status = 404, description = "Equipment not found")
    )
)]
pub async fn get_equipment(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_caller): AuthenticatedUser,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<Equipment>> {
    let equipment = state.services.equipment.get_by_id(id).await?;
    Ok(Json(equipment))
}

/// Register new equipment
#[utoipa::path(
    post,
    path = "/equipments",
    tag = "equipment",
    security(("bearer_auth" = [])),
    request_body = CreateEquipment,
    responses(
        (status = 201, description = "Equipment created", body = Equipment),
        (status = 400, description = "Invalid input or duplicate code"),
        (status = 403, description = "Staff only")
    )
)]
pub async fn create_equipment(
    State(state): State<crate::AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    AppJson(data): AppJson<CreateEquipment>,
) -> AppResult<(StatusCode, Json<Equipment>)> {
    caller.require_staff()?;

    let created = state.services.equipment.create(&data).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Update equipment; omitted or empty fields keep their value
#[utoipa::path(
    put,
    path = "/equipments/{id}",
    tag = "equipment",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Equipment ID")),
    request_body = UpdateEquipment,
    responses(
        (status = 200, description = "Equipment updated", body = Equipment),
        (status = 403, description = "Staff only"),
        (status = 404, description = "Equipment not found")
    )
)]
pub async fn update_equipment(
    State(state): State<crate::AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    AppPath(id): AppPath<Uuid>,
    AppJson(data): AppJson<UpdateEquipment>,
) -> AppResult<Json<Equipment>> {
    caller.require_staff()?;

    let updated = state.services.equipment.update(id, &data).await?;
    Ok(Json(updated))
}

/// Delete equipment
#[utoipa::path(
    delete,
    path = "/equipments/{id}",
    tag = "equipment",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Equipment ID")),
    responses(
        (status = 204, description = "Equipment deleted"),
        (status = 403, description = "Staff only"),
        (status = 404, description = "Equipment not found")
    )
)]
pub async fn delete_equipment(
    State(state): State<crate::AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<StatusCode> {
    caller.require_staff()?;

    state.services.equipment.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
