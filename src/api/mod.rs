//! REST API: handlers, the bearer-token extractor and the router

pub mod auth;
pub mod equipment;
pub mod extract;
pub mod health;
pub mod openapi;
pub mod stats;
pub mod users;
pub mod work_orders;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{error::AppError, models::user::Caller, AppState};

/// Extractor for the authenticated caller. The token is verified and the
/// user re-loaded on every request.
pub struct AuthenticatedUser(pub Caller);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::Authentication("Not authorized, no token".to_string()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::Authentication("Invalid authorization header format".to_string()))?;

        let caller = state.services.auth.authenticate(token).await?;
        Ok(AuthenticatedUser(caller))
    }
}

/// Create the application router with all routes
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Authentication
        .route("/auth/login", post(auth::login))
        .route("/auth/me", get(auth::me))
        // Equipment
        .route(
            "/equipments",
            get(equipment::list_equipment).post(equipment::create_equipment),
        )
        .route("/equipments/operational", get(equipment::list_operational))
        .route(
            "/equipments/:id",
            get(equipment::get_equipment)
                .put(equipment::update_equipment)
                .delete(equipment::delete_equipment),
        )
        // Work orders
        .route(
            "/workorders",
            get(work_orders::list_work_orders).post(work_orders::open_work_order),
        )
        .route(
            "/workorders/history/:equipment_id",
            get(work_orders::equipment_history),
        )
        .route(
            "/workorders/:id",
            get(work_orders::get_work_order).put(work_orders::update_work_order),
        )
        // Users
        .route("/users", get(users::list_users).post(users::create_user))
        .route("/users/technicians", get(users::list_technicians))
        .route(
            "/users/:id",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        // Statistics
        .route("/stats/dashboard", get(stats::dashboard))
        .with_state(state);

    Router::new()
        .nest("/api", api)
        .merge(openapi::create_openapi_router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
