//! Business logic services

pub mod auth;
pub mod catalog;
pub mod claims;
pub mod lending;
pub mod support;
pub mod users;

use crate::{config::AppConfig, error::AppResult, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub auth: auth::AuthService,
    pub catalog: catalog::CatalogService,
    pub lending: lending::LendingService,
    pub claims: claims::ClaimsService,
    pub users: users::UsersService,
    pub support: support::SupportService,
    repository: Repository,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, config: &AppConfig) -> Self {
        Self {
            auth: auth::AuthService::new(repository.clone(), config.auth.clone()),
            catalog: catalog::CatalogService::new(repository.clone()),
            lending: lending::LendingService::new(repository.clone()),
            claims: claims::ClaimsService::new(repository.clone(), config.lending.saw_claim_ratio),
            users: users::UsersService::new(repository.clone(), config.lending.clone()),
            support: support::SupportService::new(repository.clone()),
            repository,
        }
    }

    /// Round-trip to the database, for readiness probes
    pub async fn check_database(&self) -> AppResult<()> {
        self.repository.ping().await
    }
}
