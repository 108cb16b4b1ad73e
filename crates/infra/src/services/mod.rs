//! Application services: one per loyalty component.
//!
//! Each operation opens one store transaction, applies the caller's store
//! filter, and commits explicitly. Any early return drops (rolls back) the
//! transaction.

use std::sync::Arc;

use chrono::FixedOffset;
use thiserror::Error;

use loyalty_auth::{AuthError, Hs256TokenService, PasswordError, TokenError};
use loyalty_core::{ConflictKind, DomainError};

use crate::clock::Clock;
use crate::notify::Notifier;
use crate::store::{LoyaltyStore, StoreError, UQ_CLIENTS_TAX_ID, UQ_STORES_NAME, UQ_USERS_EMAIL};

pub mod accounts;
pub mod clients;
pub mod dashboard;
pub mod redemptions;
pub mod visits;

pub use accounts::{AccountService, CreateUser, LoginOutcome};
pub use clients::{ClientRef, ClientRegistry, CreateClient};
pub use dashboard::DashboardAggregator;
pub use redemptions::RedemptionEngine;
pub use visits::{VisitLedger, VisitRecord};

/// Error returned by every service operation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("storage failure: {0}")]
    Storage(StoreError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        let conflict = match &err {
            StoreError::UniqueViolation { constraint } => match constraint.as_str() {
                UQ_CLIENTS_TAX_ID => Some(ConflictKind::DuplicateTaxId),
                UQ_USERS_EMAIL => Some(ConflictKind::DuplicateEmail),
                UQ_STORES_NAME => Some(ConflictKind::DuplicateStoreName),
                _ => None,
            },
            _ => None,
        };
        match conflict {
            Some(kind) => ServiceError::Domain(DomainError::conflict(kind)),
            None => ServiceError::Storage(err),
        }
    }
}

impl From<TokenError> for ServiceError {
    fn from(_: TokenError) -> Self {
        ServiceError::Auth(AuthError::Unauthenticated)
    }
}

impl From<PasswordError> for ServiceError {
    fn from(err: PasswordError) -> Self {
        match err {
            PasswordError::Empty => ServiceError::Domain(DomainError::validation("password is required")),
            PasswordError::Hash(msg) => ServiceError::Internal(msg),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Program-wide settings the services need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramSettings {
    pub default_visit_threshold: u32,
    pub default_gift_name: String,
    pub reference_offset: FixedOffset,
}

/// Collaborators shared by all services.
#[derive(Clone)]
pub struct ServiceDeps {
    pub store: Arc<dyn LoyaltyStore>,
    pub clock: Arc<dyn Clock>,
    pub notifier: Arc<dyn Notifier>,
    pub settings: ProgramSettings,
}

/// All services, wired over the same collaborators.
#[derive(Clone)]
pub struct LoyaltyServices {
    pub accounts: AccountService,
    pub clients: ClientRegistry,
    pub visits: VisitLedger,
    pub redemptions: RedemptionEngine,
    pub dashboard: DashboardAggregator,
}

impl LoyaltyServices {
    pub fn new(deps: ServiceDeps, tokens: Arc<Hs256TokenService>) -> Self {
        Self {
            accounts: AccountService::new(deps.clone(), tokens),
            clients: ClientRegistry::new(deps.clone()),
            visits: VisitLedger::new(deps.clone()),
            redemptions: RedemptionEngine::new(deps.clone()),
            dashboard: DashboardAggregator::new(deps),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_violations_become_conflicts() {
        let err: ServiceError = StoreError::UniqueViolation {
            constraint: UQ_CLIENTS_TAX_ID.to_string(),
        }
        .into();
        assert_eq!(err, ServiceError::Domain(DomainError::Conflict(ConflictKind::DuplicateTaxId)));

        let err: ServiceError = StoreError::UniqueViolation {
            constraint: "uq_other".to_string(),
        }
        .into();
        assert!(matches!(err, ServiceError::Storage(_)));
    }
}
