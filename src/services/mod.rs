//! Business logic services

pub mod auth;
pub mod equipment;
pub mod stats;
pub mod users;
pub mod work_orders;

use crate::{config::AppConfig, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub repository: Repository,
    pub auth: auth::AuthService,
    pub users: users::UsersService,
    pub equipment: equipment::EquipmentService,
    pub work_orders: work_orders::WorkOrdersService,
    pub stats: stats::StatsService,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, config: &AppConfig) -> Self {
        let page_size = config.pagination.page_size;
        Self {
            auth: auth::AuthService::new(repository.clone(), config.auth.clone()),
            users: users::UsersService::new(repository.clone()),
            equipment: equipment::EquipmentService::new(repository.clone(), page_size),
            work_orders: work_orders::WorkOrdersService::new(repository.clone(), page_size),
            stats: stats::StatsService::new(repository.clone()),
            repository,
        }
    }
}
