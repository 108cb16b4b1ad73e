use serde::{Deserialize, Serialize};

use loyalty_core::{StoreId, UserId};

use crate::{AuthError, Role};

/// The authenticated operator behind a request.
///
/// # Invariants
/// - `scope_locked` implies `store_scope` is set.
/// - an ADMIN is never scope-locked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    user_id: UserId,
    role: Role,
    store_scope: Option<StoreId>,
    scope_locked: bool,
}

impl Caller {
    pub fn new(
        user_id: UserId,
        role: Role,
        store_scope: Option<StoreId>,
        scope_locked: bool,
    ) -> Result<Self, AuthError> {
        if scope_locked && (store_scope.is_none() || role.is_admin()) {
            return Err(AuthError::InconsistentScope);
        }
        Ok(Self {
            user_id,
            role,
            store_scope,
            scope_locked,
        })
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn store_scope(&self) -> Option<StoreId> {
        self.store_scope
    }

    pub fn scope_locked(&self) -> bool {
        self.scope_locked
    }
}
