//! Work order endpoints

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        work_order::{CreateWorkOrder, UpdateWorkOrder, WorkOrderDetails, WorkOrderQuery},
        Paginated,
    },
};

use super::{
    extract::{AppJson, AppPath, AppQuery},
    AuthenticatedUser,
};

/// List work orders. Employees only see the tickets they opened.
#[utoipa::path(
    get,
    path = "/workorders",
    tag = "workorders",
    security(("bearer_auth" = [])),
    params(WorkOrderQuery),
    responses(
        (status = 200, description = "One page of work orders, newest first", body = Paginated<WorkOrderDetails>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_work_orders(
    State(state): State<crate::AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    AppQuery(query): AppQuery<WorkOrderQuery>,
) -> AppResult<Json<Paginated<WorkOrderDetails>>> {
    let page = state.services.work_orders.list(&query, &caller).await?;
    Ok(Json(page))
}

/// Open a work order
#[utoipa::path(
    post,
    path = "/workorders",
    tag = "workorders",
    security(("bearer_auth" = [])),
    request_body = CreateWorkOrder,
    responses(
        (status = 201, description = "Work order opened", body = WorkOrderDetails),
        (status = 400, description = "Invalid input"),
        (status = 404, description = "Equipment not found")
    )
)]
pub async fn open_work_order(
    State(state): State<crate::AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    AppJson(data): AppJson<CreateWorkOrder>,
) -> AppResult<(StatusCode, Json<WorkOrderDetails>)> {
    let order = state.services.work_orders.open(&data, &caller).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// Get a work order by ID
#[utoipa::path(
    get,
    path = "/workorders/{id}",
    tag = "workorders",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Work order ID")),
    responses(
        (status = 200, description = "Work order details", body = WorkOrderDetails),
        (status = 403, description = "Ticket belongs to another employee"),
        (status = 404, description = "Work order not found")
    )
)]
pub async fn get_work_order(
    State(state): State<crate::AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<WorkOrderDetails>> {
    let order = state.services.work_orders.get(id, &caller).await?;
    Ok(Json(order))
}

/// Change status, priority or technician
#[utoipa::path(
    put,
    path = "/workorders/{id}",
    tag = "workorders",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Work order ID")),
    request_body = UpdateWorkOrder,
    responses(
        (status = 200, description = "Work order updated", body = WorkOrderDetails),
        (status = 403, description = "Staff only"),
        (status = 404, description = "Work order not found")
    )
)]
pub async fn update_work_order(
    State(state): State<crate::AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    AppPath(id): AppPath<Uuid>,
    AppJson(data): AppJson<UpdateWorkOrder>,
) -> AppResult<Json<WorkOrderDetails>> {
    caller.require_staff()?;

    let order = state.services.work_orders.update(id, &data, &caller).await?;
    Ok(Json(order))
}

/// All work orders of an equipment, newest first
#[utoipa::path(
    get,
    path = "/workorders/history/{equipment_id}",
    tag = "workorders",
    security(("bearer_auth" = [])),
    params(("equipment_id" = Uuid, Path, description = "Equipment ID")),
    responses(
        (status = 200, description = "Work orders of the equipment", body = Vec<WorkOrderDetails>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn equipment_history(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_caller): AuthenticatedUser,
    AppPath(equipment_id): AppPath<Uuid>,
) -> AppResult<Json<Vec<WorkOrderDetails>>> {
    let orders = state.services.work_orders.history_for_equipment(equipment_id).await?;
    Ok(Json(orders))
}
