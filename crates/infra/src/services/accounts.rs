use std::sync::Arc;

use serde::Serialize;
use tracing::{info, instrument, warn};

use loyalty_auth::{
    AuthError, Caller, Hs256TokenService, Role, TokenValidator, hash_password, require_admin,
    verify_password_or_dummy,
};
use loyalty_core::{DomainError, Email, EntityKind, StoreId};
use loyalty_program::{NewStore, NewUser, Store, UserSummary, validate_threshold};

use super::{ServiceDeps, ServiceResult};

/// A successful login.
#[derive(Debug, Clone, Serialize)]
pub struct LoginOutcome {
    pub token: String,
    pub user: UserSummary,
}

/// Raw operator fields as submitted by an admin.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateUser {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Option<Role>,
    pub store_id: Option<StoreId>,
}

/// Credential store plus the admin-only account operations.
#[derive(Clone)]
pub struct AccountService {
    deps: ServiceDeps,
    tokens: Arc<Hs256TokenService>,
}

impl AccountService {
    pub fn new(deps: ServiceDeps, tokens: Arc<Hs256TokenService>) -> Self {
        Self { deps, tokens }
    }

    /// Check credentials and issue a session token.
    ///
    /// Unknown emails and wrong passwords are indistinguishable, including in
    /// timing.
    #[instrument(skip(self, password), err)]
    pub async fn authenticate(&self, email: &str, password: &str) -> ServiceResult<LoginOutcome> {
        let user = match Email::parse(email) {
            Ok(email) => {
                let mut tx = self.deps.store.begin().await?;
                tx.find_user_by_email(&email).await?
            }
            Err(_) => None,
        };

        if !verify_password_or_dummy(password, user.as_ref().map(|u| u.password_hash.as_str())) {
            warn!("login rejected");
            return Err(AuthError::InvalidCredentials.into());
        }
        let Some(user) = user else {
            return Err(AuthError::InvalidCredentials.into());
        };

        let caller = user.caller()?;
        let token = self.tokens.issue(&caller, self.deps.clock.now())?;
        info!(user_id = %user.id, role = %user.role, "login succeeded");
        Ok(LoginOutcome {
            token,
            user: user.summary(),
        })
    }

    /// Validate a bearer token into the caller it was issued for.
    pub fn resolve(&self, token: &str) -> ServiceResult<Caller> {
        let claims = self.tokens.validate(token, self.deps.clock.now())?;
        Ok(claims.caller()?)
    }

    pub async fn current_user(&self, caller: &Caller) -> ServiceResult<UserSummary> {
        let mut tx = self.deps.store.begin().await?;
        tx.get_user(caller.user_id())
            .await?
            .map(|u| u.summary())
            .ok_or_else(|| AuthError::Unauthenticated.into())
    }

    #[instrument(skip(self, caller, input), fields(email = %input.email), err)]
    pub async fn create_user(&self, caller: &Caller, input: CreateUser) -> ServiceResult<UserSummary> {
        require_admin(caller)?;

        let password_hash = hash_password(&input.password)?;
        let new_user = NewUser::new(&input.name, &input.email, password_hash, input.role, input.store_id)?;

        let mut tx = self.deps.store.begin().await?;
        if let Some(store) = new_user.store_id {
            if tx.get_store(store).await?.is_none() {
                return Err(DomainError::not_found(EntityKind::Store).into());
            }
        }
        let user = tx.insert_user(&new_user).await?;
        tx.commit().await?;

        info!(user_id = %user.id, role = %user.role, scope_locked = user.scope_locked, "user created");
        Ok(user.summary())
    }

    pub async fn list_users(&self, caller: &Caller) -> ServiceResult<Vec<UserSummary>> {
        require_admin(caller)?;
        let mut tx = self.deps.store.begin().await?;
        Ok(tx.list_users().await?.iter().map(|u| u.summary()).collect())
    }

    #[instrument(skip(self, caller), err)]
    pub async fn create_store(
        &self,
        caller: &Caller,
        name: &str,
        visit_threshold: Option<i64>,
    ) -> ServiceResult<Store> {
        require_admin(caller)?;
        let new_store = NewStore::new(name, visit_threshold, self.deps.settings.default_visit_threshold)?;

        let mut tx = self.deps.store.begin().await?;
        let store = tx.insert_store(&new_store).await?;
        tx.commit().await?;

        info!(store_id = %store.id, threshold = store.visit_threshold, "store created");
        Ok(store)
    }

    pub async fn list_stores(&self, caller: &Caller) -> ServiceResult<Vec<Store>> {
        require_admin(caller)?;
        let mut tx = self.deps.store.begin().await?;
        Ok(tx.list_stores().await?)
    }

    #[instrument(skip(self, caller), fields(store_id = %id), err)]
    pub async fn update_store_threshold(
        &self,
        caller: &Caller,
        id: StoreId,
        visit_threshold: i64,
    ) -> ServiceResult<Store> {
        require_admin(caller)?;
        let threshold = validate_threshold(visit_threshold)?;

        let mut tx = self.deps.store.begin().await?;
        let Some(store) = tx.update_store_threshold(id, threshold).await? else {
            return Err(DomainError::not_found(EntityKind::Store).into());
        };
        tx.commit().await?;

        info!(store_id = %store.id, threshold, "store threshold updated");
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ServiceError;
    use crate::services::testing::{add_store, admin, fixture, locked};
    use loyalty_core::ConflictKind;

    fn new_user(email: &str, role: Option<Role>, store: Option<StoreId>) -> CreateUser {
        CreateUser {
            name: "Op".into(),
            email: email.into(),
            password: "right".into(),
            role,
            store_id: store,
        }
    }

    #[tokio::test]
    async fn login_with_right_and_wrong_password() {
        let fx = fixture();
        fx.services
            .accounts
            .create_user(&admin(), new_user("Admin@X.com", Some(Role::Admin), None))
            .await
            .unwrap();

        let err = fx.services.accounts.authenticate("admin@x.com", "wrong").await.unwrap_err();
        assert_eq!(err, ServiceError::Auth(AuthError::InvalidCredentials));

        let err = fx.services.accounts.authenticate("ghost@x.com", "right").await.unwrap_err();
        assert_eq!(err, ServiceError::Auth(AuthError::InvalidCredentials));

        let ok = fx.services.accounts.authenticate(" ADMIN@x.com ", "right").await.unwrap();
        assert_eq!(ok.user.role, Role::Admin);

        let caller = fx.services.accounts.resolve(&ok.token).unwrap();
        assert_eq!(caller.role(), Role::Admin);
        assert_eq!(caller.user_id(), ok.user.id);
        assert_eq!(fx.services.accounts.current_user(&caller).await.unwrap(), ok.user);
    }

    #[tokio::test]
    async fn tokens_expire_after_their_ttl() {
        let fx = fixture();
        fx.services
            .accounts
            .create_user(&admin(), new_user("a@x.com", None, None))
            .await
            .unwrap();
        let ok = fx.services.accounts.authenticate("a@x.com", "right").await.unwrap();

        fx.clock.advance(chrono::Duration::hours(8));
        assert_eq!(
            fx.services.accounts.resolve(&ok.token),
            Err(ServiceError::Auth(AuthError::Unauthenticated))
        );
        assert_eq!(
            fx.services.accounts.resolve("garbage"),
            Err(ServiceError::Auth(AuthError::Unauthenticated))
        );
    }

    #[tokio::test]
    async fn store_assignment_locks_non_admins() {
        let fx = fixture();
        let store = add_store(&fx, "Centro", 10).await;
        let manager = fx
            .services
            .accounts
            .create_user(&admin(), new_user("m@x.com", Some(Role::Manager), Some(store.id)))
            .await
            .unwrap();
        assert!(manager.scope_locked);

        let ok = fx.services.accounts.authenticate("m@x.com", "right").await.unwrap();
        let caller = fx.services.accounts.resolve(&ok.token).unwrap();
        assert!(caller.scope_locked());
        assert_eq!(caller.store_scope(), Some(store.id));
    }

    #[tokio::test]
    async fn admin_operations_are_forbidden_before_validation() {
        let fx = fixture();
        let store = add_store(&fx, "Centro", 10).await;
        let manager = locked(Role::Manager, store.id);

        // Invalid input would be a validation error for an admin.
        let err = fx
            .services
            .accounts
            .create_user(&manager, new_user("not-an-email", None, None))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Auth(AuthError::Forbidden(_))));

        assert!(matches!(
            fx.services.accounts.create_store(&manager, "", None).await,
            Err(ServiceError::Auth(AuthError::Forbidden(_)))
        ));
        assert!(matches!(
            fx.services.accounts.list_users(&manager).await,
            Err(ServiceError::Auth(AuthError::Forbidden(_)))
        ));
        assert!(matches!(
            fx.services.accounts.list_stores(&manager).await,
            Err(ServiceError::Auth(AuthError::Forbidden(_)))
        ));
    }

    #[tokio::test]
    async fn duplicates_map_to_specific_conflicts() {
        let fx = fixture();
        fx.services.accounts.create_store(&admin(), "Centro", None).await.unwrap();
        assert_eq!(
            fx.services.accounts.create_store(&admin(), "Centro", Some(3)).await,
            Err(ServiceError::Domain(DomainError::Conflict(ConflictKind::DuplicateStoreName)))
        );

        fx.services.accounts.create_user(&admin(), new_user("a@x.com", None, None)).await.unwrap();
        assert_eq!(
            fx.services.accounts.create_user(&admin(), new_user("A@x.com", None, None)).await,
            Err(ServiceError::Domain(DomainError::Conflict(ConflictKind::DuplicateEmail)))
        );
    }

    #[tokio::test]
    async fn threshold_updates_are_validated() {
        let fx = fixture();
        let store = fx.services.accounts.create_store(&admin(), "Centro", None).await.unwrap();
        assert_eq!(store.visit_threshold, 10);

        let updated = fx.services.accounts.update_store_threshold(&admin(), store.id, 4).await.unwrap();
        assert_eq!(updated.visit_threshold, 4);

        assert!(matches!(
            fx.services.accounts.update_store_threshold(&admin(), store.id, 0).await,
            Err(ServiceError::Domain(DomainError::Validation(_)))
        ));
        assert_eq!(
            fx.services.accounts.update_store_threshold(&admin(), StoreId::new(99), 4).await,
            Err(ServiceError::Domain(DomainError::NotFound(EntityKind::Store)))
        );
    }
}
