//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{auth, equipment, health, stats, users, work_orders};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Maintenance API",
        version = "1.0.0",
        description = "Equipment inventory and maintenance work order REST API"
    ),
    servers(
        (url = "/api", description = "API")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Auth
        auth::login,
        auth::me,
        // Equipment
        equipment::list_equipment,
        equipment::list_operational,
        equipment::get_equipment,
        equipment::create_equipment,
        equipment::update_equipment,
        equipment::delete_equipment,
        // Work orders
        work_orders::list_work_orders,
        work_orders::open_work_order,
        work_orders::get_work_order,
        work_orders::update_work_order,
        work_orders::equipment_history,
        // Users
        users::list_users,
        users::list_technicians,
        users::get_user,
        users::create_user,
        users::update_user,
        users::delete_user,
        // Stats
        stats::dashboard,
    ),
    components(
        schemas(
            // Auth
            auth::LoginRequest,
            auth::LoginResponse,
            crate::models::user::Caller,
            // Equipment
            crate::models::equipment::Equipment,
            crate::models::equipment::EquipmentKind,
            crate::models::equipment::EquipmentStatus,
            crate::models::equipment::EquipmentRef,
            crate::models::equipment::CreateEquipment,
            crate::models::equipment::UpdateEquipment,
            // Work orders
            crate::models::work_order::WorkOrderDetails,
            crate::models::work_order::WorkOrderStatus,
            crate::models::work_order::Priority,
            crate::models::work_order::HistoryEntry,
            crate::models::work_order::CreateWorkOrder,
            crate::models::work_order::UpdateWorkOrder,
            // Users
            crate::models::user::User,
            crate::models::user::Role,
            crate::models::user::UserRef,
            crate::models::user::TechnicianSummary,
            crate::models::user::CreateUser,
            crate::models::user::UpdateUser,
            // Stats
            crate::services::stats::DashboardStats,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Authentication endpoints"),
        (name = "equipment", description = "Equipment inventory"),
        (name = "workorders", description = "Maintenance work orders"),
        (name = "users", description = "User management"),
        (name = "stats", description = "Dashboard statistics")
    )
)]
pub struct ApiDoc;

/// Registers the `bearer_auth` scheme referenced by protected paths
struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_route() {
        let doc = ApiDoc::openapi();
        for path in [
            "/auth/login",
            "/equipments",
            "/equipments/operational",
            "/workorders/{id}",
            "/workorders/history/{equipment_id}",
            "/users/technicians",
            "/stats/dashboard",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
