//! Tenant scoping policy.
//!
//! A store is the tenant boundary. Scope-locked callers only ever see their
//! own store's rows; everyone else sees all stores.
//!
//! - No IO
//! - No panics

use serde::Serialize;
use thiserror::Error;

use loyalty_core::StoreId;

use crate::Caller;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("authentication required")]
    Unauthenticated,

    /// Session claims carry a lock without a store (or lock an admin).
    #[error("inconsistent session scope")]
    InconsistentScope,

    #[error("forbidden: {0}")]
    Forbidden(String),
}

/// The visibility filter applied to every scoped read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "store_id", rename_all = "snake_case")]
pub enum StoreFilter {
    All,
    Only(StoreId),
}

impl StoreFilter {
    /// Whether a row attributed to `store` is visible under this filter.
    /// Rows without a store are only visible to unrestricted callers.
    pub fn admits(&self, store: Option<StoreId>) -> bool {
        match self {
            StoreFilter::All => true,
            StoreFilter::Only(s) => store == Some(*s),
        }
    }

    pub fn store(&self) -> Option<StoreId> {
        match self {
            StoreFilter::All => None,
            StoreFilter::Only(s) => Some(*s),
        }
    }
}

/// `Only(store)` for scope-locked callers, `All` otherwise.
pub fn allowed_store_filter(caller: &Caller) -> StoreFilter {
    match (caller.scope_locked(), caller.store_scope()) {
        (true, Some(store)) => StoreFilter::Only(store),
        _ => StoreFilter::All,
    }
}

pub fn require_admin(caller: &Caller) -> Result<(), AuthError> {
    if caller.role().is_admin() {
        Ok(())
    } else {
        Err(AuthError::Forbidden("admin role required".to_string()))
    }
}

/// A scope-locked caller may only write rows attributed to its own store.
pub fn ensure_store_writable(caller: &Caller, store: StoreId) -> Result<(), AuthError> {
    if allowed_store_filter(caller).admits(Some(store)) {
        Ok(())
    } else {
        Err(AuthError::Forbidden(format!(
            "caller is restricted to store {}",
            caller.store_scope().map(|s| s.to_string()).unwrap_or_default()
        )))
    }
}
