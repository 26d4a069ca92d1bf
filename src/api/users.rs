//! User management endpoints

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::user::{CreateUser, TechnicianSummary, UpdateUser, User},
};

use super::{
    extract::{AppJson, AppPath},
    AuthenticatedUser,
};

/// List all users
#[utoipa::path(
    get,
    path = "/users",
    tag = "users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All users, ordered by name", body = Vec<User>),
        (status = 403, description = "Admin only")
    )
)]
pub async fn list_users(
    State(state): State<crate::AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
) -> AppResult<Json<Vec<User>>> {
    caller.require_admin()?;

    let users = state.services.users.list().await?;
    Ok(Json(users))
}

/// Users that can be assigned to work orders
#[utoipa::path(
    get,
    path = "/users/technicians",
    tag = "users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Technicians and admins", body = Vec<TechnicianSummary>),
        (status = 403, description = "Staff only")
    )
)]
pub async fn list_technicians(
    State(state): State<crate::AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
) -> AppResult<Json<Vec<TechnicianSummary>>> {
    caller.require_staff()?;

    let technicians = state.services.users.technicians().await?;
    Ok(Json(technicians))
}

/// Get user details by ID
#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "users",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "User details", body = User),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user(
    State(state): State<crate::AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<User>> {
    caller.require_admin()?;

    let user = state.services.users.get_by_id(id).await?;
    Ok(Json(user))
}

/// Create a new user
#[utoipa::path(
    post,
    path = "/users",
    tag = "users",
    security(("bearer_auth" = [])),
    request_body = CreateUser,
    responses(
        (status = 201, description = "User created", body = User),
        (status = 400, description = "Invalid input or email already in use"),
        (status = 403, description = "Admin only")
    )
)]
pub async fn create_user(
    State(state): State<crate::AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    AppJson(user): AppJson<CreateUser>,
) -> AppResult<(StatusCode, Json<User>)> {
    caller.require_admin()?;

    let created = state.services.users.create_user(user).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Update an existing user
#[utoipa::path(
    put,
    path = "/users/{id}",
    tag = "users",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = UpdateUser,
    responses(
        (status = 200, description = "User updated", body = User),
        (status = 403, description = "Admin only"),
        (status = 404, description = "User not found")
    )
)]
pub async fn update_user(
    State(state): State<crate::AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    AppPath(id): AppPath<Uuid>,
    AppJson(user): AppJson<UpdateUser>,
) -> AppResult<Json<User>> {
    caller.require_admin()?;

    let updated = state.services.users.update_user(id, user).await?;
    Ok(Json(updated))
}

/// Delete a user
#[utoipa::path(
    delete,
    path = "/users/{id}",
    tag = "users",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 204, description = "User deleted"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "User not found")
    )
)]
pub async fn delete_user(
    State(state): State<crate::AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<StatusCode> {
    caller.require_admin()?;

    state.services.users.delete_user(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
